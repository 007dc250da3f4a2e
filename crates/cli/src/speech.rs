//! Spoken replies through a LocalAI-style `/tts` endpoint.
//!
//! Failures are logged and swallowed: a reply that cannot be spoken has
//! still been printed.

use std::path::Path;

use taskloom_config::SpeechConfig;
use tracing::{debug, warn};

pub struct Speaker {
    client: reqwest::Client,
    api_base: String,
    model: String,
    player: String,
}

impl Speaker {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            player: config.player.clone(),
        }
    }

    /// Newlines make most voices stop abruptly, so they become sentence breaks.
    pub fn prepare(text: &str) -> String {
        text.replace('\n', ".")
    }

    pub async fn speak(&self, text: &str) {
        let path = std::env::temp_dir().join(format!("taskloom-{}.wav", uuid::Uuid::new_v4()));
        if let Err(e) = self.synthesize(text, &path).await {
            warn!(error = %e, "Text-to-speech failed");
        } else if let Err(e) = self.play(&path).await {
            warn!(error = %e, player = %self.player, "Audio playback failed");
        }
        let _ = tokio::fs::remove_file(&path).await;
    }

    async fn synthesize(&self, text: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let url = format!("{}/tts", self.api_base);
        debug!(%url, "Requesting speech");

        let body = serde_json::json!({
            "input": Self::prepare(text),
            "model": self.model,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let audio = response.bytes().await?;
        tokio::fs::write(path, &audio).await?;
        Ok(())
    }

    async fn play(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let status = tokio::process::Command::new(&self.player)
            .arg(path)
            .status()
            .await?;
        if !status.success() {
            return Err(format!("{} exited with {status}", self.player).into());
        }
        Ok(())
    }
}
