//! Publishing through a web console that has no API.
//!
//! [`PublishEngine`] owns one long-lived browser session and walks the
//! console's upload workflow as a fixed sequence of [`Step`]s. Every control
//! is found through a [`StrategyResolver`] that tries alternative locators in
//! order, each with its own bounded wait. Whether a failed step ends the
//! attempt is decided by a table ([`workflow::STEPS`]), not at the call site.
//!
//! ```text
//! Idle -> SessionReady -> Navigated -> EntrySurfaceLocated -> FileSubmitted
//!      -> ProcessingWait -> MetadataEntry -> WizardStep(1..=3)
//!      -> VisibilitySet -> Confirmed
//! ```
//!
//! Any state can end in `Failed`.

mod engine;
pub mod resolver;
mod sanitize;
mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use serde::Serialize;

pub use engine::{PublishEngine, PublishOptions};
pub use resolver::{Condition, Resolved, StepFailure, Strategy, StrategyResolver};
pub use sanitize::sanitize_for_entry;
pub use session::{ChromeSessionFactory, PublishSession, SessionFactory};
pub use workflow::{FailurePolicy, Locators, Step};

/// Where an upload attempt is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PublishState {
    Idle,
    SessionReady,
    Navigated,
    EntrySurfaceLocated,
    FileSubmitted,
    ProcessingWait,
    MetadataEntry,
    WizardStep(u8),
    VisibilitySet,
    Confirmed,
    Failed,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WizardStep(page) => return write!(f, "wizard-step-{page}"),
            Self::Idle => "idle",
            Self::SessionReady => "session-ready",
            Self::Navigated => "navigated",
            Self::EntrySurfaceLocated => "entry-surface-located",
            Self::FileSubmitted => "file-submitted",
            Self::ProcessingWait => "processing-wait",
            Self::MetadataEntry => "metadata-entry",
            Self::VisibilitySet => "visibility-set",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Trail of one upload attempt, filled in as the workflow runs.
///
/// A failed attempt ends in [`PublishState::Failed`] and keeps the warnings
/// collected before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// States passed through, in order.
    pub transitions: Vec<PublishState>,
    /// Steps that failed without stopping the upload.
    pub warnings: Vec<String>,
    /// Whether the browser session from an earlier upload was used.
    pub reused_session: bool,
}

impl Default for PublishReport {
    fn default() -> Self {
        Self {
            transitions: vec![PublishState::Idle],
            warnings: Vec::new(),
            reused_session: false,
        }
    }
}

impl PublishReport {
    pub fn last_state(&self) -> PublishState {
        self.transitions.last().copied().unwrap_or(PublishState::Idle)
    }

    /// The transitions as `idle -> session-ready -> ...`.
    pub fn trail(&self) -> String {
        self.transitions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
