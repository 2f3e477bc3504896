//! Runs the five stages for one version, skipping whatever is already done.

use std::path::PathBuf;
use std::sync::Arc;

use autoreel_common::{Error, Result, Scene, StageKind, Topic, Version};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::status::{assembly_indices, missing_indices, stage_status, NamespaceInventory};
use crate::collaborators::{
    Assembler, ImageGenerator, Narrator, Publisher, ScenePair, ScriptBrief, ScriptWriter,
};
use crate::publish::PublishReport;
use crate::versions::{PublishReceipt, VersionNamespace};

/// The services the stages delegate to.
#[derive(Clone)]
pub struct Collaborators {
    pub script: Arc<dyn ScriptWriter>,
    pub images: Arc<dyn ImageGenerator>,
    pub narrator: Arc<dyn Narrator>,
    pub assembler: Arc<dyn Assembler>,
    pub publisher: Arc<dyn Publisher>,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub video_duration_secs: u32,
    pub seconds_per_scene: u32,
    /// Image requests in flight at once.
    pub image_concurrency: usize,
    /// Narration requests in flight at once.
    pub narration_concurrency: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            video_duration_secs: 30,
            seconds_per_scene: 5,
            image_concurrency: 1,
            narration_concurrency: 1,
        }
    }
}

/// What a run did, as far as it got.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub version: Option<Version>,
    pub scene_count: usize,
    /// Scene indices that went into the video, in order.
    pub assembled: Vec<u32>,
    /// Stages that were already complete and skipped.
    pub skipped: Vec<StageKind>,
    /// Soft failures absorbed along the way.
    pub warnings: Vec<String>,
    /// The publish attempt, when one was made.
    pub publish: Option<PublishReport>,
}

impl RunReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

pub struct StageController {
    collaborators: Collaborators,
    settings: ControllerSettings,
    cancel: CancellationToken,
}

impl StageController {
    pub fn new(collaborators: Collaborators, settings: ControllerSettings) -> Self {
        Self {
            collaborators,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run at the next stage or scene boundary.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run script, images, narration, assembly and publish for the version
    /// owning `namespace`.
    ///
    /// # Errors
    ///
    /// - [`Error::StageFailed`] when the script has no scenes, no scene has
    ///   both an image and narration, or assembly produces no video.
    /// - [`Error::Automation`] / [`Error::Session`] when publishing fails.
    /// - [`Error::Cancelled`] when the token fires; outputs so far are kept.
    pub async fn run(&self, namespace: &VersionNamespace, topic: &Topic) -> Result<RunReport> {
        let mut report = RunReport::default();
        self.run_into(namespace, topic, &mut report).await?;
        Ok(report)
    }

    /// Like [`run`](Self::run), recording into `report` so the warnings and
    /// publish trail of a failed run stay available to the caller.
    pub async fn run_into(
        &self,
        namespace: &VersionNamespace,
        topic: &Topic,
        report: &mut RunReport,
    ) -> Result<()> {
        report.version = Some(namespace.version());
        tracing::info!(version = %namespace.version(), title = %topic.title, "Starting run");

        let scenes = self.script_stage(namespace, topic, report).await?;
        report.scene_count = scenes.len();

        self.per_scene_stage(StageKind::Images, namespace, &scenes, report)
            .await?;
        self.per_scene_stage(StageKind::Narration, namespace, &scenes, report)
            .await?;
        self.assembly_stage(namespace, report).await?;
        self.publish_stage(namespace, report).await?;

        tracing::info!(
            version = %namespace.version(),
            scenes = report.scene_count,
            warnings = report.warnings.len(),
            "Run complete"
        );
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::info!("Run cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    async fn script_stage(
        &self,
        namespace: &VersionNamespace,
        topic: &Topic,
        report: &mut RunReport,
    ) -> Result<Vec<Scene>> {
        self.check_cancelled()?;

        let scenes = match namespace.load_scenes() {
            Some(scenes) => {
                tracing::info!(scenes = scenes.len(), "Script already present, skipping");
                report.skipped.push(StageKind::Script);
                scenes
            }
            None => {
                let brief = ScriptBrief::new(
                    topic,
                    self.settings.video_duration_secs,
                    self.settings.seconds_per_scene,
                );
                let entries = self
                    .collaborators
                    .script
                    .write_script(&brief)
                    .await
                    .map_err(|e| Error::stage_failed(StageKind::Script, e.to_string()))?;
                if entries.is_empty() {
                    return Err(Error::stage_failed(
                        StageKind::Script,
                        "script generation produced no scenes",
                    ));
                }
                let scenes = Scene::from_entries(entries);
                namespace.write_scenes(&scenes)?;
                tracing::info!(scenes = scenes.len(), "Script saved");
                scenes
            }
        };

        if !namespace.has_metadata() {
            self.check_cancelled()?;
            match self.collaborators.script.write_metadata(topic, &scenes).await {
                Ok(metadata) => namespace.write_metadata(&metadata)?,
                Err(e) => report.warn(format!("title/description generation failed, defaults will be used: {e}")),
            }
        }
        Ok(scenes)
    }

    async fn per_scene_stage(
        &self,
        stage: StageKind,
        namespace: &VersionNamespace,
        scenes: &[Scene],
        report: &mut RunReport,
    ) -> Result<()> {
        self.check_cancelled()?;

        let inventory = NamespaceInventory::scan(namespace);
        let todo = missing_indices(stage, &inventory);
        if todo.is_empty() {
            tracing::info!(%stage, "All scenes present, skipping");
            report.skipped.push(stage);
            return Ok(());
        }
        tracing::info!(%stage, scenes = ?todo, "Generating missing scene outputs");

        let concurrency = match stage {
            StageKind::Images => self.settings.image_concurrency,
            _ => self.settings.narration_concurrency,
        }
        .max(1);

        let jobs: Vec<(&Scene, PathBuf)> = scenes
            .iter()
            .filter(|s| todo.contains(&s.index))
            .map(|s| {
                let path = match stage {
                    StageKind::Images => namespace.image_path(s.index),
                    _ => namespace.audio_path(s.index),
                };
                (s, path)
            })
            .collect();

        // Each job writes only its own index, so completion order is irrelevant.
        let results: Vec<(u32, Result<()>)> = stream::iter(jobs)
            .map(|(scene, path)| async move {
                if self.cancel.is_cancelled() {
                    return (scene.index, Err(Error::Cancelled));
                }
                let result = match stage {
                    StageKind::Images => {
                        self.collaborators
                            .images
                            .generate(&scene.visual_prompt, scene.index, &path)
                            .await
                    }
                    _ => {
                        self.collaborators
                            .narrator
                            .narrate(&scene.dialogue, &scene.voice_tone, scene.index, &path)
                            .await
                    }
                };
                (scene.index, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        self.check_cancelled()?;
        let mut failed: Vec<u32> = Vec::new();
        for (index, result) in results {
            if let Err(e) = result {
                failed.push(index);
                report.warn(format!("{stage} for scene {index} failed: {e}"));
            }
        }
        failed.sort_unstable();

        let status = stage_status(stage, &NamespaceInventory::scan(namespace));
        tracing::info!(%stage, %status, failed = ?failed, "Stage finished");
        Ok(())
    }

    async fn assembly_stage(&self, namespace: &VersionNamespace, report: &mut RunReport) -> Result<()> {
        self.check_cancelled()?;

        let inventory = NamespaceInventory::scan(namespace);
        if inventory.has_video {
            tracing::info!("Video already assembled, skipping");
            report.skipped.push(StageKind::Assembly);
            report.assembled = assembly_indices(&inventory);
            return Ok(());
        }

        let indices = assembly_indices(&inventory);
        for index in inventory.scenes.as_deref().unwrap_or_default() {
            if !indices.contains(index) {
                report.warn(format!("scene {index} lacks an image or narration and is left out"));
            }
        }
        if indices.is_empty() {
            return Err(Error::stage_failed(
                StageKind::Assembly,
                "no scene has both an image and narration",
            ));
        }

        let pairs: Vec<ScenePair> = indices
            .iter()
            .map(|&index| ScenePair {
                index,
                image: namespace.image_path(index),
                audio: namespace.audio_path(index),
            })
            .collect();

        let output = namespace.video_path();
        let used = self
            .collaborators
            .assembler
            .assemble(&pairs, &output)
            .await
            .map_err(|e| Error::stage_failed(StageKind::Assembly, e.to_string()))?;
        if !output.is_file() {
            return Err(Error::stage_failed(
                StageKind::Assembly,
                format!("assembler reported success but {} is missing", output.display()),
            ));
        }
        for index in indices.iter().filter(|i| !used.contains(i)) {
            report.warn(format!("scene {index} was dropped by the assembler"));
        }

        tracing::info!(scenes = ?used, path = %output.display(), "Video assembled");
        report.assembled = used;
        Ok(())
    }

    async fn publish_stage(&self, namespace: &VersionNamespace, report: &mut RunReport) -> Result<()> {
        self.check_cancelled()?;

        if let Some(receipt) = namespace.read_receipt() {
            tracing::info!(published_at = %receipt.published_at, "Already published, skipping");
            report.skipped.push(StageKind::Publish);
            return Ok(());
        }

        let metadata = namespace.read_metadata();
        let mut attempt = PublishReport::default();
        let outcome = self
            .collaborators
            .publisher
            .publish(&namespace.video_path(), &metadata, &mut attempt)
            .await;
        for warning in &attempt.warnings {
            report.warn(format!("publish: {warning}"));
        }
        report.publish = Some(attempt);
        outcome.map_err(|e| match e {
            Error::Automation { .. } | Error::Session(_) | Error::Cancelled => e,
            other => Error::stage_failed(StageKind::Publish, other.to_string()),
        })?;

        namespace.write_receipt(&PublishReceipt {
            version: namespace.version(),
            title: metadata.title,
            published_at: Utc::now(),
        })?;
        Ok(())
    }
}
