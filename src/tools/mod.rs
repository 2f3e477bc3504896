//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the command-line tools the pipeline shells
//! out to (ffmpeg, ffprobe, edge-tts, chromedriver). Paths from
//! [`ToolsConfig`] win when they exist; otherwise `PATH` is searched.

mod command;

pub use command::{ToolCommand, ToolOutput};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use autoreel_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";
pub const EDGE_TTS: &str = "edge-tts";
pub const CHROMEDRIVER: &str = "chromedriver";

const KNOWN_TOOLS: &[&str] = &[FFMPEG, FFPROBE, EDGE_TTS, CHROMEDRIVER];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version output, if it ran.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Resolve every known tool. Tools that are not found are omitted.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                FFPROBE => tools_config.ffprobe_path.as_deref(),
                EDGE_TTS => tools_config.edge_tts_path.as_deref(),
                CHROMEDRIVER => tools_config.chromedriver_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!("Configured path for {} does not exist: {:?}", name, p);
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!(tool = name, path = %path.display(), "Tool resolved");
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths, bypassing discovery.
    pub fn with_paths<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, P)>,
        P: Into<PathBuf>,
    {
        Self {
            tools: entries
                .into_iter()
                .map(|(name, path)| (name.to_string(), path.into()))
                .collect(),
        }
    }

    /// Path of the named tool, or [`Error::Tool`] if it was not found.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::tool(name, format!("{name} not found; is it installed and in PATH?")))
    }

    /// A [`ToolCommand`] for the named tool.
    pub fn command(&self, name: &str) -> Result<ToolCommand> {
        Ok(ToolCommand::new(self.require(name)?.to_path_buf()))
    }

    /// Check all known tools and report availability and version.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run the tool's version flag and return the first line of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        FFMPEG | FFPROBE => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        // Nothing is guaranteed to be installed, but discovery must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let registry = ToolRegistry::default();
        let err = registry.require(EDGE_TTS).unwrap_err();
        assert!(err.to_string().contains("edge-tts not found"));
    }

    #[test]
    fn check_all_lists_known_tools() {
        let infos = ToolRegistry::default().check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ffmpeg", "ffprobe", "edge-tts", "chromedriver"]);
        assert!(infos.iter().all(|i| !i.available));
    }

    #[test]
    fn configured_path_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").unwrap();

        let cfg = ToolsConfig {
            ffmpeg_path: Some(fake.clone()),
            ..Default::default()
        };
        let registry = ToolRegistry::discover(&cfg);
        assert_eq!(registry.require(FFMPEG).unwrap(), fake.as_path());
    }

    #[test]
    fn explicit_paths() {
        let registry = ToolRegistry::with_paths([(CHROMEDRIVER, "/opt/chromedriver")]);
        assert_eq!(
            registry.require(CHROMEDRIVER).unwrap(),
            Path::new("/opt/chromedriver")
        );
    }
}
