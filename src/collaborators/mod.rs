//! Seams to the services each stage delegates to.
//!
//! The pipeline only knows these traits. The submodules hold the concrete
//! implementations wired up by the binary: NewsAPI, an OpenAI-compatible
//! chat model, the Hugging Face inference API, the `edge-tts` CLI and
//! ffmpeg.

pub mod assembly;
pub mod images;
pub mod narration;
pub mod news;
pub mod script;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Result, Scene, ScriptEntry, Topic};
use reqwest::Client;

use crate::publish::PublishReport;
use crate::versions::UploadMetadata;

pub use assembly::FfmpegAssembler;
pub use images::HuggingFaceImages;
pub use narration::EdgeTtsNarrator;
pub use news::NewsApiSource;
pub use script::ChatScriptWriter;

/// Candidate topics, newest first.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn latest(&self) -> Result<Vec<Topic>>;
}

/// What the script writer is asked to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptBrief {
    pub title: String,
    pub description: String,
    pub duration_secs: u32,
    pub scene_count: u32,
}

impl ScriptBrief {
    pub fn new(topic: &Topic, duration_secs: u32, seconds_per_scene: u32) -> Self {
        Self {
            title: topic.title.clone(),
            description: topic.description.clone(),
            duration_secs,
            scene_count: (duration_secs / seconds_per_scene.max(1)).max(1),
        }
    }

    /// The natural-language brief.
    pub fn text(&self) -> String {
        format!(
            "A {}-second video about {}. Context: {}",
            self.duration_secs, self.title, self.description
        )
    }
}

#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// The ordered scene list. An unparsable model answer is an empty list,
    /// not an error.
    async fn write_script(&self, brief: &ScriptBrief) -> Result<Vec<ScriptEntry>>;

    /// Title and description for the finished video.
    async fn write_metadata(&self, topic: &Topic, scenes: &[Scene]) -> Result<UploadMetadata>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render `prompt` for scene `index` into `output`.
    async fn generate(&self, prompt: &str, index: u32, output: &Path) -> Result<()>;
}

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Synthesize `text` for scene `index` into `output`; resolves once the
    /// audio file is complete.
    async fn narrate(&self, text: &str, tone: &str, index: u32, output: &Path) -> Result<()>;
}

/// Image and narration of one scene, ready to be joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePair {
    pub index: u32,
    pub image: PathBuf,
    pub audio: PathBuf,
}

#[async_trait]
pub trait Assembler: Send + Sync {
    /// Join `pairs`, in the given order, into the video at `output`.
    ///
    /// Returns the indices of the scenes that made it into the video. An
    /// assembler may leave out a pair it cannot use.
    async fn assemble(&self, pairs: &[ScenePair], output: &Path) -> Result<Vec<u32>>;
}

/// Hands the finished video to the publishing target.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `media`. Progress and absorbed step failures go into
    /// `report`, whether or not publishing succeeds.
    async fn publish(
        &self,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> Result<()>;
}

/// HTTP client with a request timeout.
fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::warn!("Failed to build HTTP client with timeout: {}", e);
        Client::new()
    })
}
