//! The top-level surface: topic intake, full runs, and maintenance.
//!
//! [`Studio`] is the only writer of the version counter. A version advances
//! exactly when a run's publish stage succeeds; any failure leaves it in
//! place so the next [`Studio::resume`] picks up the same namespace.

use std::sync::Arc;

use autoreel_common::{Error, Result, RunResult, Topic, Version};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collaborators::{
    ChatScriptWriter, EdgeTtsNarrator, FfmpegAssembler, HuggingFaceImages, NewsApiSource,
    NewsSource,
};
use crate::config::Config;
use crate::history::{fingerprint, is_usable_title, HistoryStats, HistoryStore, ProcessedItem};
use crate::pipeline::{
    Collaborators, ControllerSettings, NamespaceInventory, RunReport, StageController, StageReport,
};
use crate::publish::{ChromeSessionFactory, PublishEngine, PublishOptions};
use crate::tools::ToolRegistry;
use crate::versions::VersionRegistry;

pub struct Studio {
    registry: VersionRegistry,
    history: Mutex<HistoryStore>,
    news: Arc<dyn NewsSource>,
    collaborators: Collaborators,
    settings: ControllerSettings,
    /// Held for the whole of a run; runs never overlap.
    run_lock: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    engine: Option<Arc<PublishEngine>>,
}

impl Studio {
    pub fn new(
        registry: VersionRegistry,
        history: HistoryStore,
        news: Arc<dyn NewsSource>,
        collaborators: Collaborators,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            registry,
            history: Mutex::new(history),
            news,
            collaborators,
            settings,
            run_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
            engine: None,
        }
    }

    /// Wire up the production collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a credential is missing, [`Error::Tool`] when
    /// ffmpeg, ffprobe or edge-tts cannot be found. Nothing has run yet in
    /// either case.
    pub fn from_config(config: &Config, tools: &ToolRegistry) -> Result<Self> {
        config.require_secrets()?;
        let secret = |value: &Option<String>| value.clone().unwrap_or_default();

        let engine = Arc::new(PublishEngine::new(
            Box::new(ChromeSessionFactory::new(&config.publish, tools)),
            PublishOptions::from_config(&config.publish),
        ));
        let collaborators = Collaborators {
            script: Arc::new(ChatScriptWriter::new(&config.script, secret(&config.script.api_key))),
            images: Arc::new(HuggingFaceImages::new(&config.images, secret(&config.images.api_key))),
            narrator: Arc::new(EdgeTtsNarrator::new(&config.narration, tools)?),
            assembler: Arc::new(FfmpegAssembler::new(&config.assembly, tools)?),
            publisher: engine.clone(),
        };
        let settings = ControllerSettings {
            video_duration_secs: config.script.video_duration_secs,
            seconds_per_scene: config.script.seconds_per_scene,
            image_concurrency: config.images.max_concurrent,
            narration_concurrency: config.narration.max_concurrent,
        };

        let mut studio = Self::new(
            VersionRegistry::new(&config.paths.counter_file, &config.paths.data_dir),
            HistoryStore::open(&config.paths.history_file),
            Arc::new(NewsApiSource::new(&config.news, secret(&config.news.api_key))),
            collaborators,
            settings,
        );
        studio.engine = Some(engine);
        Ok(studio)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The newest news topic not seen before, recorded as processed.
    ///
    /// `Ok(None)` when every candidate is a duplicate or unusable.
    pub async fn fetch_topic(&self) -> Result<Option<Topic>> {
        let candidates = self.news.latest().await?;
        let total = candidates.len();
        for topic in candidates {
            if let Some(topic) = self.admit(topic)? {
                return Ok(Some(topic));
            }
        }
        tracing::info!(candidates = total, "No unseen topics available");
        Ok(None)
    }

    /// Pass a user-supplied topic through the same dedup gate as news.
    pub fn submit_topic(&self, topic: Topic) -> Result<Option<Topic>> {
        let admitted = self.admit(topic)?;
        if admitted.is_none() {
            tracing::info!("Topic was already processed");
        }
        Ok(admitted)
    }

    fn admit(&self, topic: Topic) -> Result<Option<Topic>> {
        if !is_usable_title(&topic.title) {
            return Ok(None);
        }
        let mut history = self.history.lock();
        if history.is_duplicate(&topic.title) {
            tracing::debug!(title = %topic.title, "Skipping duplicate topic");
            return Ok(None);
        }
        history.record(ProcessedItem::from_topic(&topic))?;
        tracing::info!(title = %topic.title, source = %topic.source, "Topic accepted");
        Ok(Some(topic))
    }

    /// Produce and publish a video about `topic` under the current version.
    ///
    /// A version that still holds work for a different topic is left
    /// untouched and the run is refused with [`Error::UnfinishedVersion`];
    /// [`Studio::resume`] finishes that work first.
    pub async fn run_pipeline(&self, topic: &Topic) -> RunResult {
        let _guard = self.run_lock.lock().await;
        let version = self.registry.current();
        let prepared = self.prepare_namespace(version, topic);
        self.execute(version, topic, prepared).await
    }

    /// Continue the current version from its stored topic.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the current version has no stored topic.
    pub async fn resume(&self) -> Result<RunResult> {
        let _guard = self.run_lock.lock().await;
        let version = self.registry.current();
        let topic = self
            .registry
            .peek(version)
            .read_topic()
            .ok_or_else(|| Error::config(format!("version {version} has no stored topic to resume")))?;
        tracing::info!(%version, title = %topic.title, "Resuming");
        let prepared = self.registry.namespace_for(version).map(|_| ());
        Ok(self.execute(version, &topic, prepared).await)
    }

    /// The topic the current version is still working on. The version only
    /// advances after publishing, so any stored topic is unfinished.
    pub fn pending_topic(&self) -> Option<Topic> {
        self.registry.peek(self.registry.current()).read_topic()
    }

    fn prepare_namespace(&self, version: Version, topic: &Topic) -> Result<()> {
        if let Some(stored) = self.registry.peek(version).read_topic() {
            if fingerprint(&stored.title) != fingerprint(&topic.title) {
                tracing::warn!(%version, pending = %stored.title, "Version has unfinished work for another topic");
                return Err(Error::UnfinishedVersion {
                    version,
                    title: stored.title,
                });
            }
            return self.registry.namespace_for(version).map(|_| ());
        }
        let namespace = self.registry.namespace_for(version)?;
        namespace.write_topic(topic)
    }

    async fn execute(&self, version: Version, topic: &Topic, prepared: Result<()>) -> RunResult {
        let run_id = Uuid::new_v4();
        let mut report = RunReport::default();
        let outcome = match prepared {
            Ok(()) => self.run_stages(version, topic, &mut report).await,
            Err(e) => Err(e),
        };

        let publish_trail: Vec<String> = report
            .publish
            .as_ref()
            .map(|attempt| attempt.transitions.iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        let mut result = RunResult {
            run_id,
            success: false,
            version_used: version,
            failed_stage: None,
            error: None,
            warnings: report.warnings,
            publish_trail,
        };

        match outcome {
            Ok(()) => match self.registry.advance() {
                Ok(next) => {
                    tracing::info!(%run_id, published = %version, next = %next, "Run succeeded");
                    result.success = true;
                }
                Err(e) => {
                    tracing::error!(%run_id, %version, "Published but could not advance version: {e}");
                    result.error = Some(format!("published, but the version counter was not advanced: {e}"));
                }
            },
            Err(e) => {
                tracing::error!(%run_id, %version, warnings = result.warnings.len(), "Run failed: {e}");
                result.failed_stage = e.stage();
                result.error = Some(e.to_string());
            }
        }
        result
    }

    async fn run_stages(&self, version: Version, topic: &Topic, report: &mut RunReport) -> Result<()> {
        let namespace = self.registry.namespace_for(version)?;
        StageController::new(self.collaborators.clone(), self.settings.clone())
            .with_cancellation(self.cancel.clone())
            .run_into(&namespace, topic, report)
            .await
    }

    pub fn clear_history(&self) -> Result<()> {
        self.history.lock().clear()
    }

    pub fn current_version(&self) -> Version {
        self.registry.current()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history.lock().stats()
    }

    /// Per-stage status of the current version.
    pub fn stage_report(&self) -> StageReport {
        let namespace = self.registry.peek(self.registry.current());
        StageReport::from_inventory(&NamespaceInventory::scan(&namespace))
    }

    /// Close the browser session, if one was opened.
    pub async fn shutdown(&self) {
        if let Some(engine) = &self.engine {
            engine.shutdown().await;
        }
    }
}
