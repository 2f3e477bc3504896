//! autoreel-common: shared types and errors.
//!
//! This crate provides the vocabulary used across autoreel:
//!
//! - **Error Handling**: the crate-wide [`Error`] and [`Result`] alias
//! - **Core Types**: [`Scene`], [`Topic`], [`Version`], [`StageKind`],
//!   [`StageStatus`] and the [`RunResult`] reported to callers
//!
//! # Examples
//!
//! ```
//! use autoreel_common::{Error, Result, StageKind, Version};
//!
//! let v = Version::initial();
//! assert_eq!(v.next().get(), 2);
//!
//! fn example() -> Result<()> {
//!     Err(Error::stage_failed(StageKind::Script, "no scenes"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
