//! Internet search through DuckDuckGo's HTML endpoint.
//!
//! The HTML endpoint needs no API key. Result links come back wrapped in a
//! `/l/?uddg=<encoded target>` redirect, which is unwrapped before rendering.

use async_trait::async_trait;
use scraper::{Html, Selector};
use taskloom_core::capability::Capability;
use taskloom_core::error::CapabilityError;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/?q=";

/// One parsed search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

pub struct SearchInternet {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
}

impl SearchInternet {
    pub fn new(max_results: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) taskloom")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.into(),
            max_results,
        }
    }

    /// Point at a different search endpoint; the encoded query is appended to it.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Capability for SearchInternet {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'query' argument".into()))?;

        let url = format!("{}{}", self.endpoint, urlencoding::encode(query));
        debug!(%url, "Searching the internet");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CapabilityError::Network(format!(
                "Search failed with status: {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        let hits = parse_results(&html, self.max_results)?;
        Ok(render(&hits))
    }
}

fn selector(css: &str) -> Result<Selector, CapabilityError> {
    Selector::parse(css).map_err(|e| CapabilityError::ExecutionFailed {
        action: "search_internet".into(),
        reason: e.to_string(),
    })
}

/// Extract up to `limit` hits from a DuckDuckGo HTML result page.
pub fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>, CapabilityError> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result:not(.result--ad)")?;
    let title_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let hits = document
        .select(&result_sel)
        .filter_map(|result| {
            let anchor = result.select(&title_sel).next()?;
            let title = collapse(&anchor.text().collect::<String>());
            let link = unwrap_redirect(anchor.value().attr("href")?);
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| collapse(&s.text().collect::<String>()))
                .unwrap_or_default();
            (!title.is_empty() && !link.is_empty()).then_some(SearchHit {
                title,
                link,
                snippet,
            })
        })
        .take(limit)
        .collect();

    Ok(hits)
}

/// Resolve `//duckduckgo.com/l/?uddg=<target>&rut=...` to the target URL.
fn unwrap_redirect(href: &str) -> String {
    let Some(start) = href.find("uddg=") else {
        return href.to_string();
    };
    let encoded = &href[start + "uddg=".len()..];
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| encoded.to_string())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render hits as the function result text.
pub fn render(hits: &[SearchHit]) -> String {
    let mut out = String::from("Internet search results:\n");
    if hits.is_empty() {
        out.push_str("No results found.\n");
    }
    for hit in hits {
        out.push_str(&format!(
            "- {}. Source: {} - {}\n",
            hit.snippet, hit.title, hit.link
        ));
    }
    out
}
