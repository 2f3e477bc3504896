//! Narration through the `edge-tts` command-line tool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};

use super::Narrator;
use crate::config::NarrationConfig;
use crate::tools::{ToolCommand, ToolRegistry, EDGE_TTS};

pub struct EdgeTtsNarrator {
    program: std::path::PathBuf,
    voice: String,
    rate: String,
    pitch: String,
    timeout: Duration,
}

impl EdgeTtsNarrator {
    pub fn new(config: &NarrationConfig, tools: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            program: tools.require(EDGE_TTS)?.to_path_buf(),
            voice: config.voice.clone(),
            rate: config.rate.clone(),
            pitch: config.pitch.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn command(&self, text: &str, output: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.arg("--voice")
            .arg(&self.voice)
            // Leading '-' values must be attached with '=' or they parse as flags.
            .arg(format!("--rate={}", self.rate))
            .arg(format!("--pitch={}", self.pitch))
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(output.to_string_lossy())
            .timeout(self.timeout);
        cmd
    }
}

#[async_trait]
impl Narrator for EdgeTtsNarrator {
    async fn narrate(&self, text: &str, tone: &str, index: u32, output: &Path) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::tool(EDGE_TTS, format!("scene {index} has no dialogue")));
        }
        tracing::debug!(scene = index, tone, "Synthesizing narration");

        // edge-tts writes progressively; render to a sibling file and rename.
        let partial = output.with_extension("part.mp3");
        if let Err(e) = self.command(text, &partial).execute().await {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, output)?;
        tracing::info!(scene = index, path = %output.display(), "Narration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrator() -> EdgeTtsNarrator {
        let tools = ToolRegistry::with_paths([(EDGE_TTS, "/usr/bin/edge-tts")]);
        EdgeTtsNarrator::new(&NarrationConfig::default(), &tools).unwrap()
    }

    #[test]
    fn command_carries_voice_settings() {
        let cmd = narrator().command("Hello there", Path::new("/tmp/1.mp3"));
        assert_eq!(
            cmd.get_args(),
            &[
                "--voice",
                "en-GB-RyanNeural",
                "--rate=-5%",
                "--pitch=-2Hz",
                "--text",
                "Hello there",
                "--write-media",
                "/tmp/1.mp3",
            ]
        );
    }

    #[test]
    fn requires_edge_tts() {
        let err = EdgeTtsNarrator::new(&NarrationConfig::default(), &ToolRegistry::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[tokio::test]
    async fn blank_dialogue_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("1.mp3");
        assert!(narrator().narrate("   ", "calm", 1, &out).await.is_err());
        assert!(!out.exists());
    }
}
