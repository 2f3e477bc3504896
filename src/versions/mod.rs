//! Version counter and per-version artifact namespaces.
//!
//! The counter file is the only source of truth for the current version and
//! is re-read on every call. Each version owns one directory under the data
//! root:
//!
//! ```text
//! {data_dir}/{v}/topic.json
//! {data_dir}/{v}/video_script/video_script.json
//! {data_dir}/{v}/title_description/{title,description}.txt
//! {data_dir}/{v}/generated_image/{i}.jpg
//! {data_dir}/{v}/generated_audio/{i}.mp3
//! {data_dir}/{v}/generated_video/final_video_{v}.mp4
//! {data_dir}/{v}/publish_receipt.json
//! ```

mod namespace;

pub use namespace::{
    PublishReceipt, UploadMetadata, VersionNamespace, DEFAULT_DESCRIPTION, DEFAULT_TITLE,
};

use std::path::{Path, PathBuf};

use autoreel_common::{Result, Version};

use crate::storage;

#[derive(Debug, Clone)]
pub struct VersionRegistry {
    counter_file: PathBuf,
    data_dir: PathBuf,
}

impl VersionRegistry {
    pub fn new(counter_file: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            counter_file: counter_file.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The current version, read fresh from the counter file.
    ///
    /// An absent, empty, non-numeric or zero counter is rewritten as `1`.
    pub fn current(&self) -> Version {
        let raw = match std::fs::read_to_string(&self.counter_file) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.counter_file.display(), "Cannot read version counter: {e}");
                None
            }
        };

        if let Some(version) = raw
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .and_then(Version::new)
        {
            return version;
        }

        if raw.is_some() {
            tracing::warn!(path = %self.counter_file.display(), "Version counter is invalid, resetting to 1");
        }
        let initial = Version::initial();
        if let Err(e) = self.store(initial) {
            tracing::warn!(path = %self.counter_file.display(), "Cannot initialize version counter: {e}");
        }
        initial
    }

    /// Move the counter forward by exactly one and persist it.
    ///
    /// Only the orchestrator calls this, and only after a successful publish.
    pub fn advance(&self) -> Result<Version> {
        let next = self.current().next();
        self.store(next)?;
        tracing::info!(version = %next, "Version advanced");
        Ok(next)
    }

    /// The namespace for `version`, creating its directories if needed.
    pub fn namespace_for(&self, version: Version) -> Result<VersionNamespace> {
        let namespace = VersionNamespace::new(&self.data_dir, version);
        namespace.ensure_dirs()?;
        Ok(namespace)
    }

    /// The namespace for `version` without touching the filesystem.
    pub fn peek(&self, version: Version) -> VersionNamespace {
        VersionNamespace::new(&self.data_dir, version)
    }

    fn store(&self, version: Version) -> Result<()> {
        storage::write_atomic(&self.counter_file, version.to_string().as_bytes())
    }
}
