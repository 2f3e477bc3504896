//! Stage resumability.
//!
//! [`status`] derives each stage's completeness from the artifacts on disk;
//! [`StageController`] uses it to run only the work that is still missing.

mod controller;
pub mod status;

pub use controller::{Collaborators, ControllerSettings, RunReport, StageController};
pub use status::{NamespaceInventory, StageReport};
