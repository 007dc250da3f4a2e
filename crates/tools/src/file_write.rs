//! File write — persist content under the configured data directory.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use taskloom_core::capability::Capability;
use taskloom_core::error::CapabilityError;
use tracing::info;

pub struct WriteFile {
    /// Every write lands somewhere below this directory.
    root: PathBuf,
}

impl WriteFile {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `filename` onto the root, refusing anything that could escape it.
    fn resolve(&self, filename: &str) -> Result<PathBuf, CapabilityError> {
        let relative = Path::new(filename);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.is_absolute() {
            return Err(CapabilityError::PermissionDenied(format!(
                "'{filename}' is outside the data directory"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Capability for WriteFile {
    async fn invoke(&self, arguments: serde_json::Value) -> Result<String, CapabilityError> {
        let filename = arguments["filename"]
            .as_str()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'filename' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| CapabilityError::InvalidArguments("Missing 'content' argument".into()))?;

        let path = self.resolve(filename)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        info!(path = %path.display(), bytes = content.len(), "File written");
        Ok(format!("File {} saved successfully.", path.display()))
    }
}
