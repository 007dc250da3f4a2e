//! Similarity and ranking utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity over embeddings
//! - Keyword overlap scoring
//! - Reciprocal Rank Fusion (RRF) for merging ranked result lists

use std::collections::HashSet;
use taskloom_core::memory::MemoryEntry;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank entries by cosine similarity to a query embedding.
///
/// Entries without embeddings are skipped; `score` is set to the similarity.
pub fn vector_search(
    entries: &[MemoryEntry],
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<MemoryEntry> {
    let mut scored: Vec<MemoryEntry> = entries
        .iter()
        .filter_map(|entry| {
            let emb = entry.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            (sim >= min_score).then(|| {
                let mut e = entry.clone();
                e.score = sim;
                e
            })
        })
        .collect();

    sort_by_score(&mut scored);
    scored.truncate(limit);
    scored
}

/// Lowercased words of at least two characters.
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of the query's words that occur in `content`.
pub fn keyword_score(query: &str, content: &str) -> f32 {
    let wanted = tokens(query);
    if wanted.is_empty() {
        return 0.0;
    }
    let have = tokens(content);
    let hits = wanted.iter().filter(|w| have.contains(*w)).count();
    hits as f32 / wanted.len() as f32
}

/// Rank entries by keyword overlap with `query`, dropping entries with no overlap.
pub fn keyword_search(entries: &[MemoryEntry], query: &str, limit: usize) -> Vec<MemoryEntry> {
    let mut scored: Vec<MemoryEntry> = entries
        .iter()
        .filter_map(|entry| {
            let score = keyword_score(query, &entry.content);
            (score > 0.0).then(|| {
                let mut e = entry.clone();
                e.score = score;
                e
            })
        })
        .collect();

    sort_by_score(&mut scored);
    scored.truncate(limit);
    scored
}

/// Reciprocal Rank Fusion (RRF) — merge two ranked result lists.
///
/// Each entry's final score = sum of 1/(k + rank) across both lists.
/// Standard value is k=60. Results are deduplicated by entry ID.
pub fn reciprocal_rank_fusion(
    keyword_results: &[MemoryEntry],
    vector_results: &[MemoryEntry],
    k: u32,
    limit: usize,
) -> Vec<MemoryEntry> {
    use std::collections::HashMap;

    let k = k as f32;
    let mut scores: HashMap<String, (f32, MemoryEntry)> = HashMap::new();

    for list in [keyword_results, vector_results] {
        for (rank, entry) in list.iter().enumerate() {
            let rrf_score = 1.0 / (k + rank as f32 + 1.0);
            scores
                .entry(entry.id.clone())
                .and_modify(|(score, _)| *score += rrf_score)
                .or_insert_with(|| (rrf_score, entry.clone()));
        }
    }

    let mut results: Vec<MemoryEntry> = scores
        .into_values()
        .map(|(score, mut entry)| {
            entry.score = score;
            entry
        })
        .collect();

    sort_by_score(&mut results);
    results.truncate(limit);
    results
}

fn sort_by_score(entries: &mut [MemoryEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, embedding: Option<Vec<f32>>) -> MemoryEntry {
        let mut e = MemoryEntry::new(id, format!("Content for {id}"));
        e.embedding = embedding;
        e
    }

    fn text(id: &str, content: &str) -> MemoryEntry {
        MemoryEntry::new(id, content)
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // 1 / sqrt(2)
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn vector_search_ranks_by_similarity() {
        let query = vec![1.0, 0.0, 0.0];
        let entries = vec![
            entry("a", Some(vec![0.0, 1.0, 0.0])),
            entry("b", Some(vec![1.0, 0.0, 0.0])),
            entry("c", Some(vec![0.5, 0.5, 0.0])),
            entry("d", None),
        ];

        let results = vector_search(&entries, &query, 10, 0.0);
        let ids: Vec<_> = results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn vector_search_respects_min_score_and_limit() {
        let query = vec![1.0, 0.0];
        let entries: Vec<_> = (0..10)
            .map(|i| entry(&format!("e{i}"), Some(vec![1.0, i as f32 * 0.1])))
            .collect();
        assert_eq!(vector_search(&entries, &query, 3, 0.0).len(), 3);
        assert_eq!(vector_search(&entries, &query, 10, 0.99).len(), 2);
    }

    #[test]
    fn keyword_score_counts_overlap() {
        assert_eq!(keyword_score("favorite color", "My favorite color is green"), 1.0);
        assert_eq!(keyword_score("favorite food", "My favorite color is green"), 0.5);
        assert_eq!(keyword_score("", "anything"), 0.0);
        assert_eq!(keyword_score("RUST", "rust, rust and more rust"), 1.0);
    }

    #[test]
    fn keyword_search_drops_unrelated() {
        let entries = vec![
            text("1", "The user prefers Rust"),
            text("2", "Python is also good"),
            text("3", "Rust has great performance and Rust is safe"),
        ];
        let results = keyword_search(&entries, "rust performance", 10);
        let ids: Vec<_> = results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["3", "1"]);
    }

    #[test]
    fn rrf_merges_two_lists() {
        let keyword = vec![entry("a", None), entry("b", None), entry("c", None)];
        let vector = vec![entry("b", None), entry("d", None), entry("a", None)];

        let results = reciprocal_rank_fusion(&keyword, &vector, 60, 10);
        assert_eq!(results[0].id, "b");
        assert_eq!(results[1].id, "a");
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn rrf_deduplicates_and_limits() {
        let list = vec![entry("x", None), entry("y", None)];
        assert_eq!(reciprocal_rank_fusion(&list, &list, 60, 10).len(), 2);
        assert_eq!(reciprocal_rank_fusion(&list, &list, 60, 1).len(), 1);
        assert!(reciprocal_rank_fusion(&[], &[], 60, 10).is_empty());
    }
}
