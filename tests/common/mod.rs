//! Shared fakes for integration tests.
//!
//! Every fake writes real files where the production collaborator would, so
//! the stage controller's on-disk resumption logic is exercised unchanged.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use autoreel::collaborators::{
    Assembler, ImageGenerator, Narrator, NewsSource, Publisher, ScenePair, ScriptBrief,
    ScriptWriter,
};
use autoreel::history::HistoryStore;
use autoreel::pipeline::{Collaborators, ControllerSettings};
use autoreel::publish::{PublishReport, PublishState};
use autoreel::studio::Studio;
use autoreel::versions::{UploadMetadata, VersionRegistry};
use autoreel_common::{Error, Result, Scene, ScriptEntry, Topic};
use parking_lot::Mutex;
use tempfile::TempDir;

pub fn entry(dialogue: &str) -> ScriptEntry {
    ScriptEntry {
        dialogue: dialogue.to_string(),
        visual_prompt: format!("picture of {dialogue}"),
        voice_tone: "calm".to_string(),
    }
}

pub struct FakeScript {
    pub entries: Vec<ScriptEntry>,
    pub calls: AtomicUsize,
}

impl FakeScript {
    pub fn with_scenes(count: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: (1..=count).map(|i| entry(&format!("scene {i}"))).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ScriptWriter for FakeScript {
    async fn write_script(&self, _brief: &ScriptBrief) -> Result<Vec<ScriptEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.clone())
    }

    async fn write_metadata(&self, topic: &Topic, _scenes: &[Scene]) -> Result<UploadMetadata> {
        Ok(UploadMetadata::new(
            format!("{} explained", topic.title),
            topic.description.clone(),
        ))
    }
}

/// Writes `{kind}-{index}-{generation}` into each output so reruns are
/// distinguishable from the original files.
pub struct FakeMedia {
    kind: &'static str,
    failing: Mutex<HashSet<u32>>,
    pub generated: Mutex<Vec<u32>>,
    generation: AtomicUsize,
}

impl FakeMedia {
    pub fn new(kind: &'static str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failing: Mutex::new(HashSet::new()),
            generated: Mutex::new(Vec::new()),
            generation: AtomicUsize::new(1),
        })
    }

    pub fn fail_on(&self, index: u32) {
        self.failing.lock().insert(index);
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generated(&self) -> Vec<u32> {
        let mut indices = self.generated.lock().clone();
        indices.sort_unstable();
        indices
    }

    fn produce(&self, index: u32, output: &Path) -> Result<()> {
        if self.failing.lock().contains(&index) {
            return Err(Error::http(format!("{} service returned 503", self.kind)));
        }
        let generation = self.generation.load(Ordering::SeqCst);
        std::fs::write(output, format!("{}-{index}-{generation}", self.kind))?;
        self.generated.lock().push(index);
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for FakeMedia {
    async fn generate(&self, _prompt: &str, index: u32, output: &Path) -> Result<()> {
        self.produce(index, output)
    }
}

#[async_trait]
impl Narrator for FakeMedia {
    async fn narrate(&self, _text: &str, _tone: &str, index: u32, output: &Path) -> Result<()> {
        self.produce(index, output)
    }
}

/// Records the scene indices it was handed. Scenes marked with
/// [`FakeAssembler::drop_scene`] are left out of the video.
#[derive(Default)]
pub struct FakeAssembler {
    pub received: Mutex<Vec<Vec<u32>>>,
    dropped: Mutex<HashSet<u32>>,
}

impl FakeAssembler {
    pub fn drop_scene(&self, index: u32) {
        self.dropped.lock().insert(index);
    }
}

#[async_trait]
impl Assembler for FakeAssembler {
    async fn assemble(&self, pairs: &[ScenePair], output: &Path) -> Result<Vec<u32>> {
        self.received
            .lock()
            .push(pairs.iter().map(|p| p.index).collect());
        let dropped = self.dropped.lock().clone();
        std::fs::write(output, b"mp4")?;
        Ok(pairs
            .iter()
            .map(|p| p.index)
            .filter(|index| !dropped.contains(index))
            .collect())
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub failing: AtomicBool,
    pub published: Mutex<Vec<(String, UploadMetadata)>>,
    /// Reported as a non-fatal step failure on every attempt.
    pub warning: Mutex<Option<String>>,
}

impl FakePublisher {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn warn_with(&self, warning: &str) {
        *self.warning.lock() = Some(warning.to_string());
    }

    pub fn count(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> Result<()> {
        report.transitions.push(PublishState::SessionReady);
        if let Some(warning) = self.warning.lock().clone() {
            report.warnings.push(warning);
        }
        if self.failing.load(Ordering::SeqCst) {
            report.transitions.push(PublishState::Failed);
            return Err(Error::automation("confirm", "no confirm control could be clicked"));
        }
        self.published
            .lock()
            .push((media.display().to_string(), metadata.clone()));
        report.transitions.push(PublishState::Confirmed);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNews {
    pub topics: Mutex<Vec<Topic>>,
}

impl FakeNews {
    pub fn with_titles(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            topics: Mutex::new(
                titles
                    .iter()
                    .map(|t| Topic::manual(*t, format!("about {t}")))
                    .collect(),
            ),
        })
    }
}

#[async_trait]
impl NewsSource for FakeNews {
    async fn latest(&self) -> Result<Vec<Topic>> {
        Ok(self.topics.lock().clone())
    }
}

/// A studio wired to fakes inside a temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub script: Arc<FakeScript>,
    pub images: Arc<FakeMedia>,
    pub narrator: Arc<FakeMedia>,
    pub assembler: Arc<FakeAssembler>,
    pub publisher: Arc<FakePublisher>,
    pub news: Arc<FakeNews>,
}

impl Harness {
    pub fn new(scenes: usize) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            script: FakeScript::with_scenes(scenes),
            images: FakeMedia::new("image"),
            narrator: FakeMedia::new("audio"),
            assembler: Arc::new(FakeAssembler::default()),
            publisher: Arc::new(FakePublisher::default()),
            news: FakeNews::with_titles(&[]),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            script: self.script.clone(),
            images: self.images.clone(),
            narrator: self.narrator.clone(),
            assembler: self.assembler.clone(),
            publisher: self.publisher.clone(),
        }
    }

    pub fn registry(&self) -> VersionRegistry {
        VersionRegistry::new(
            self.dir.path().join("video_counter.txt"),
            self.dir.path().join("data"),
        )
    }

    pub fn history_path(&self) -> std::path::PathBuf {
        self.dir.path().join("history").join("history_manager.json")
    }

    pub fn studio(&self) -> Studio {
        Studio::new(
            self.registry(),
            HistoryStore::open(self.history_path()),
            self.news.clone(),
            self.collaborators(),
            ControllerSettings::default(),
        )
    }
}
