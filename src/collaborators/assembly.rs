//! Video assembly with ffmpeg.
//!
//! Every scene becomes its still image shown for exactly the length of its
//! narration, with a short fade at both ends. Scenes are then concatenated
//! in the order given and encoded to H.264/AAC.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};

use super::{Assembler, ScenePair};
use crate::config::AssemblyConfig;
use crate::tools::{ToolRegistry, FFMPEG, FFPROBE};

/// A scene pair with its measured narration length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedScene {
    pub pair: ScenePair,
    pub duration: f64,
}

pub struct FfmpegAssembler {
    tools: ToolRegistry,
    config: AssemblyConfig,
}

impl FfmpegAssembler {
    /// Fails when ffmpeg or ffprobe is not available.
    pub fn new(config: &AssemblyConfig, tools: &ToolRegistry) -> Result<Self> {
        tools.require(FFMPEG)?;
        tools.require(FFPROBE)?;
        Ok(Self {
            tools: tools.clone(),
            config: config.clone(),
        })
    }

    async fn probe_duration(&self, audio: &Path) -> Result<f64> {
        let output = self
            .tools
            .command(FFPROBE)?
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(audio.to_string_lossy())
            .timeout(Duration::from_secs(30))
            .execute()
            .await?;

        output
            .stdout
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                Error::tool(
                    FFPROBE,
                    format!("no duration for {}: {:?}", audio.display(), output.stdout.trim()),
                )
            })
    }
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    async fn assemble(&self, pairs: &[ScenePair], output: &Path) -> Result<Vec<u32>> {
        let mut timed = Vec::with_capacity(pairs.len());
        for pair in pairs {
            match self.probe_duration(&pair.audio).await {
                Ok(duration) => timed.push(TimedScene {
                    pair: pair.clone(),
                    duration,
                }),
                Err(e) => tracing::warn!(scene = pair.index, "Skipping scene: {e}"),
            }
        }
        if timed.is_empty() {
            return Err(Error::tool(FFMPEG, "no scene has usable audio"));
        }

        let partial = partial_path(output);
        let mut cmd = self.tools.command(FFMPEG)?;
        cmd.args(render_args(&timed, &partial, &self.config))
            .timeout(Duration::from_secs(self.config.timeout_secs));

        tracing::info!(scenes = timed.len(), output = %output.display(), "Rendering video");
        if let Err(e) = cmd.execute().await {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, output)?;
        Ok(timed.iter().map(|scene| scene.pair.index).collect())
    }
}

fn partial_path(output: &Path) -> PathBuf {
    output.with_extension("part.mp4")
}

/// The full ffmpeg argument list for `scenes`, writing to `output`.
pub fn render_args(scenes: &[TimedScene], output: &Path, config: &AssemblyConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".to_string(), "-hide_banner".to_string()];

    for scene in scenes {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            config.fps.to_string(),
            "-t".to_string(),
            format!("{:.3}", scene.duration),
            "-i".to_string(),
            scene.pair.image.to_string_lossy().into_owned(),
            "-i".to_string(),
            scene.pair.audio.to_string_lossy().into_owned(),
        ]);
    }

    let (w, h) = (config.width, config.height);
    let mut filter = String::new();
    let mut concat_inputs = String::new();
    for (i, scene) in scenes.iter().enumerate() {
        let fade = f64::from(config.fade_secs).min(scene.duration / 2.0);
        let fade_out_start = (scene.duration - fade).max(0.0);
        filter.push_str(&format!(
            "[{video}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p,\
             fade=t=in:st=0:d={fade:.3},fade=t=out:st={fade_out_start:.3}:d={fade:.3}[v{i}];",
            video = i * 2,
            fps = config.fps,
        ));
        concat_inputs.push_str(&format!("[v{i}][{audio}:a]", audio = i * 2 + 1));
    }
    filter.push_str(&format!(
        "{concat_inputs}concat=n={}:v=1:a=1[outv][outa]",
        scenes.len()
    ));

    args.extend([
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        "[outa]".to_string(),
        "-r".to_string(),
        config.fps.to_string(),
        "-c:v".to_string(),
        config.video_codec.clone(),
        "-preset".to_string(),
        config.preset.clone(),
        "-c:a".to_string(),
        config.audio_codec.clone(),
        "-threads".to_string(),
        config.threads.to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}
