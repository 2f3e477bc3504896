use std::path::{Path, PathBuf};

use autoreel_common::{Result, Scene, ScriptEntry, Topic, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage;

const SCRIPT_DIR: &str = "video_script";
const METADATA_DIR: &str = "title_description";
const IMAGE_DIR: &str = "generated_image";
const AUDIO_DIR: &str = "generated_audio";
const VIDEO_DIR: &str = "generated_video";

pub const DEFAULT_TITLE: &str = "Latest News Update";
pub const DEFAULT_DESCRIPTION: &str = "Automated news video generated by autoreel";

/// Title and description handed to the publish engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
}

impl UploadMetadata {
    /// Blank fields are replaced by the defaults.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        let description = description.into();
        Self {
            title: if title.trim().is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title.trim().to_string()
            },
            description: if description.trim().is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                description.trim().to_string()
            },
        }
    }
}

impl Default for UploadMetadata {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Written once the publish engine reports success for a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub version: Version,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

/// Stage-output locations for one version.
#[derive(Debug, Clone)]
pub struct VersionNamespace {
    version: Version,
    root: PathBuf,
}

impl VersionNamespace {
    pub fn new(data_dir: &Path, version: Version) -> Self {
        Self {
            version,
            root: data_dir.join(version.to_string()),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [SCRIPT_DIR, METADATA_DIR, IMAGE_DIR, AUDIO_DIR, VIDEO_DIR] {
            std::fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn topic_path(&self) -> PathBuf {
        self.root.join("topic.json")
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_DIR).join("video_script.json")
    }

    pub fn title_path(&self) -> PathBuf {
        self.root.join(METADATA_DIR).join("title.txt")
    }

    pub fn description_path(&self) -> PathBuf {
        self.root.join(METADATA_DIR).join("description.txt")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join(IMAGE_DIR)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    pub fn image_path(&self, index: u32) -> PathBuf {
        self.image_dir().join(format!("{index}.jpg"))
    }

    pub fn audio_path(&self, index: u32) -> PathBuf {
        self.audio_dir().join(format!("{index}.mp3"))
    }

    pub fn video_path(&self) -> PathBuf {
        self.root
            .join(VIDEO_DIR)
            .join(format!("final_video_{}.mp4", self.version))
    }

    pub fn receipt_path(&self) -> PathBuf {
        self.root.join("publish_receipt.json")
    }

    /// The stored scene list, or `None` when it is absent, unparsable or empty.
    pub fn load_scenes(&self) -> Option<Vec<Scene>> {
        let path = self.script_path();
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<Vec<ScriptEntry>>(&bytes) {
            Ok(entries) if !entries.is_empty() => Some(Scene::from_entries(entries)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Script artifact is unparsable: {e}");
                None
            }
        }
    }

    pub fn write_scenes(&self, scenes: &[Scene]) -> Result<()> {
        let entries: Vec<ScriptEntry> = scenes.iter().map(Scene::to_entry).collect();
        storage::write_json(&self.script_path(), &entries)
    }

    pub fn has_metadata(&self) -> bool {
        self.title_path().is_file() && self.description_path().is_file()
    }

    /// Title and description, with defaults for anything absent or blank.
    pub fn read_metadata(&self) -> UploadMetadata {
        let title = std::fs::read_to_string(self.title_path()).unwrap_or_default();
        let description = std::fs::read_to_string(self.description_path()).unwrap_or_default();
        UploadMetadata::new(title, description)
    }

    pub fn write_metadata(&self, metadata: &UploadMetadata) -> Result<()> {
        storage::write_atomic(&self.title_path(), metadata.title.as_bytes())?;
        storage::write_atomic(&self.description_path(), metadata.description.as_bytes())
    }

    pub fn read_topic(&self) -> Option<Topic> {
        let bytes = std::fs::read(self.topic_path()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn write_topic(&self, topic: &Topic) -> Result<()> {
        storage::write_json(&self.topic_path(), topic)
    }

    pub fn read_receipt(&self) -> Option<PublishReceipt> {
        let bytes = std::fs::read(self.receipt_path()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn write_receipt(&self, receipt: &PublishReceipt) -> Result<()> {
        storage::write_json(&self.receipt_path(), receipt)
    }
}
