//! Core type definitions shared by the pipeline, the stores and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one production run and its artifact namespace.
///
/// Versions start at 1 and only ever move forward by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    /// The version used when no valid counter exists.
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Build a version from a raw number; `0` is not a valid version.
    pub fn new(n: u32) -> Option<Self> {
        (n >= 1).then_some(Self(n))
    }

    /// The raw version number.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The version that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One phase of the production pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Script,
    Images,
    Narration,
    Assembly,
    Publish,
}

impl StageKind {
    /// All stages in the order the controller runs them.
    pub const ALL: [StageKind; 5] = [
        StageKind::Script,
        StageKind::Images,
        StageKind::Narration,
        StageKind::Assembly,
        StageKind::Publish,
    ];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Images => write!(f, "images"),
            Self::Narration => write!(f, "narration"),
            Self::Assembly => write!(f, "assembly"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

/// Derived completeness of a stage for a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// No expected output exists.
    Missing,
    /// Some, but not all, per-scene outputs exist.
    Partial,
    /// Every expected output exists.
    Complete,
}

impl StageStatus {
    pub fn is_complete(self) -> bool {
        self == StageStatus::Complete
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Partial => write!(f, "partial"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// A source topic that passed (or is about to pass) the dedup gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
}

fn default_source() -> String {
    "Unknown".to_string()
}

impl Topic {
    /// A topic entered by hand rather than fetched from a news source.
    pub fn manual(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: String::new(),
            source: "manual".to_string(),
            published_at: String::new(),
        }
    }
}

/// One script entry as stored in the per-version script artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
    pub dialogue: String,
    #[serde(default)]
    pub visual_prompt: String,
    #[serde(default)]
    pub voice_tone: String,
}

/// A positioned scene; `index` is 1-based, dense and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub index: u32,
    pub dialogue: String,
    pub visual_prompt: String,
    pub voice_tone: String,
}

impl Scene {
    /// Assign 1-based indices to script entries in their stored order.
    pub fn from_entries(entries: Vec<ScriptEntry>) -> Vec<Scene> {
        entries
            .into_iter()
            .zip(1u32..)
            .map(|(entry, index)| Scene {
                index,
                dialogue: entry.dialogue,
                visual_prompt: entry.visual_prompt,
                voice_tone: entry.voice_tone,
            })
            .collect()
    }

    /// The on-disk form of this scene (the index is implied by position).
    pub fn to_entry(&self) -> ScriptEntry {
        ScriptEntry {
            dialogue: self.dialogue.clone(),
            visual_prompt: self.visual_prompt.clone(),
            voice_tone: self.voice_tone.clone(),
        }
    }
}

/// Outcome of one production run as reported to the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub success: bool,
    pub version_used: Version,
    /// Stage that aborted the run, when `success` is false.
    pub failed_stage: Option<StageKind>,
    /// Error message for a failed run.
    pub error: Option<String>,
    /// Soft failures absorbed during the run.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// States the publish attempt passed through, when one was made.
    #[serde(default)]
    pub publish_trail: Vec<String>,
}
