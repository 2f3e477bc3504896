//! Stage completeness derived from what exists on disk.
//!
//! [`NamespaceInventory::scan`] is the only function here that touches the
//! filesystem. Everything else is a pure function of the inventory, so
//! resumption decisions can be tested without creating files.

use std::collections::BTreeSet;
use std::path::Path;

use autoreel_common::{StageKind, StageStatus};
use serde::Serialize;

use crate::versions::VersionNamespace;

/// Snapshot of the artifacts present in one version namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInventory {
    /// Scene indices from a parsable, non-empty script; `None` otherwise.
    pub scenes: Option<Vec<u32>>,
    /// Indices with a non-empty image file.
    pub images: BTreeSet<u32>,
    /// Indices with a non-empty narration file.
    pub audio: BTreeSet<u32>,
    pub has_video: bool,
    pub has_receipt: bool,
}

impl NamespaceInventory {
    pub fn scan(namespace: &VersionNamespace) -> Self {
        Self {
            scenes: namespace
                .load_scenes()
                .map(|scenes| scenes.iter().map(|s| s.index).collect()),
            images: indexed_files(&namespace.image_dir(), "jpg"),
            audio: indexed_files(&namespace.audio_dir(), "mp3"),
            has_video: non_empty_file(&namespace.video_path()),
            has_receipt: namespace.receipt_path().is_file(),
        }
    }

    fn scene_indices(&self) -> &[u32] {
        self.scenes.as_deref().unwrap_or_default()
    }
}

/// Indices of files named `{index}.{ext}` with content.
fn indexed_files(dir: &Path, ext: &str) -> BTreeSet<u32> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return BTreeSet::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| non_empty_file(&entry.path()))
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension()?.to_str()? != ext {
                return None;
            }
            path.file_stem()?.to_str()?.parse::<u32>().ok()
        })
        .collect()
}

fn non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Completeness of `stage` given `inventory`.
pub fn stage_status(stage: StageKind, inventory: &NamespaceInventory) -> StageStatus {
    match stage {
        StageKind::Script => {
            if inventory.scenes.is_some() {
                StageStatus::Complete
            } else {
                StageStatus::Missing
            }
        }
        StageKind::Images => per_scene_status(inventory.scene_indices(), &inventory.images),
        StageKind::Narration => per_scene_status(inventory.scene_indices(), &inventory.audio),
        StageKind::Assembly => all_or_nothing(inventory.has_video),
        StageKind::Publish => all_or_nothing(inventory.has_receipt),
    }
}

fn per_scene_status(scenes: &[u32], present: &BTreeSet<u32>) -> StageStatus {
    let done = scenes.iter().filter(|i| present.contains(i)).count();
    match done {
        0 => StageStatus::Missing,
        n if n == scenes.len() => StageStatus::Complete,
        _ => StageStatus::Partial,
    }
}

fn all_or_nothing(present: bool) -> StageStatus {
    if present {
        StageStatus::Complete
    } else {
        StageStatus::Missing
    }
}

/// Scene indices whose output for `stage` still has to be produced, in
/// script order. Empty for stages without per-scene outputs.
pub fn missing_indices(stage: StageKind, inventory: &NamespaceInventory) -> Vec<u32> {
    let present = match stage {
        StageKind::Images => &inventory.images,
        StageKind::Narration => &inventory.audio,
        _ => return Vec::new(),
    };
    inventory
        .scene_indices()
        .iter()
        .copied()
        .filter(|i| !present.contains(i))
        .collect()
}

/// Scene indices that have both an image and narration, in script order.
pub fn assembly_indices(inventory: &NamespaceInventory) -> Vec<u32> {
    inventory
        .scene_indices()
        .iter()
        .copied()
        .filter(|i| inventory.images.contains(i) && inventory.audio.contains(i))
        .collect()
}

/// Status of every stage, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stages: Vec<(StageKind, StageStatus)>,
}

impl StageReport {
    pub fn from_inventory(inventory: &NamespaceInventory) -> Self {
        Self {
            stages: StageKind::ALL
                .iter()
                .map(|&stage| (stage, stage_status(stage, inventory)))
                .collect(),
        }
    }

    pub fn status(&self, stage: StageKind) -> StageStatus {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, status)| *status)
            .unwrap_or(StageStatus::Missing)
    }
}
