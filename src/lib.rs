//! autoreel - short-video production pipeline
//!
//! Turns a topic into a published short video through five resumable stages:
//! script, images, narration, assembly and publish. Each production run owns
//! one [`versions::VersionNamespace`]; stages skip whatever output already
//! exists there, and the version only advances once publishing succeeds.
//!
//! - [`history`] - the dedup gate for topics
//! - [`versions`] - the version counter and per-version artifact layout
//! - [`pipeline`] - stage status and the resumable stage controller
//! - [`publish`] - browser automation for a console without an API
//! - [`studio`] - the orchestrator tying them together

pub mod collaborators;
pub mod config;
pub mod history;
pub mod pipeline;
pub mod publish;
pub mod storage;
pub mod studio;
pub mod tools;
pub mod versions;
