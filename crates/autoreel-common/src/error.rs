//! Unified error type for autoreel.
//!
//! Every layer funnels its failures into [`Error`]. Only a few variants abort
//! a production run; the rest are absorbed by callers that fall back to a
//! safe default and log a warning.

use std::fmt;

use crate::types::{StageKind, Version};

/// Unified error type covering all failure modes in autoreel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required configuration or credential is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage produced no usable output.
    #[error("Stage {stage} failed: {message}")]
    StageFailed {
        /// The stage that failed.
        stage: StageKind,
        /// Human-readable error description.
        message: String,
    },

    /// A publish workflow step could not be completed.
    #[error("Publish step [{step}] failed: {message}")]
    Automation {
        /// Name of the workflow step.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// The browser session could not be created or was lost.
    #[error("Browser session error: {0}")]
    Session(String),

    /// An external tool (ffmpeg, edge-tts, chromedriver) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An HTTP collaborator call failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },

    /// The current version still holds work for another topic.
    #[error("Version {version} has unfinished work for \"{title}\"; resume it before starting a new topic")]
    UnfinishedVersion {
        /// The version that has not been published yet.
        version: Version,
        /// Title of the topic stored in that version.
        title: String,
    },

    /// The run was cancelled before it finished.
    #[error("Run cancelled")]
    Cancelled,
}

impl Error {
    /// Convenience constructor for [`Error::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Convenience constructor for [`Error::StageFailed`].
    pub fn stage_failed(stage: StageKind, message: impl Into<String>) -> Self {
        Error::StageFailed {
            stage,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Automation`].
    pub fn automation(step: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Automation {
            step: step.to_string(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Session`].
    pub fn session(msg: impl Into<String>) -> Self {
        Error::Session(msg.into())
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(msg: impl fmt::Display) -> Self {
        Error::Http(msg.to_string())
    }

    /// The pipeline stage this error should be attributed to, if any.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Error::StageFailed { stage, .. } => Some(*stage),
            Error::Automation { .. } | Error::Session(_) => Some(StageKind::Publish),
            _ => None,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
