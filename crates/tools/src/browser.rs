//! Page fetch — GET a URL and return its visible text.

use async_trait::async_trait;
use scraper::{Html, Node};
use taskloom_core::capability::Capability;
use taskloom_core::error::CapabilityError;
use tracing::debug;

/// Elements whose text never reaches the reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

pub struct Browser {
    client: reqwest::Client,
    max_chars: usize,
}

impl Browser {
    pub fn new(max_chars: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) taskloom")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, max_chars }
    }
}

#[async_trait]
impl Capability for Browser {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        let url = arguments["url"]
            .as_str()
            .map(str::trim)
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CapabilityError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        debug!(%url, "Browsing");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CapabilityError::Network(format!("HTTP {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| CapabilityError::Network(e.to_string()))?;

        let text = truncate_chars(&visible_text(&html), self.max_chars);
        Ok(format!("Website {url}:\n{text}"))
    }
}

/// Text content of a document with scripts and styles removed, one line per text run.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN.contains(&el.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[truncated]", &text[..cut]),
        None => text.to_string(),
    }
}
