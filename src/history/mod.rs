//! Content deduplication gate.
//!
//! [`HistoryStore`] remembers every topic that entered a production run so
//! the same story is never produced twice. Titles are compared through a
//! [`fingerprint`] that ignores case and surrounding whitespace.
//!
//! The store is a single JSON file:
//!
//! ```json
//! {
//!   "processedTitles": [
//!     {"title": "...", "description": "...", "url": "...", "source": "...",
//!      "publishedAt": "...", "processedAt": "2026-01-01T00:00:00Z"}
//!   ],
//!   "titleHashes": ["<sha256 hex>"]
//! }
//! ```
//!
//! It is read once on open and rewritten in full after every mutation.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use autoreel_common::{Result, Topic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::storage;

/// Placeholder title some news sources return for retracted articles.
const REMOVED_SENTINEL: &str = "[Removed]";

/// Lowercase hex SHA-256 of the trimmed, case-folded text.
pub fn fingerprint(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Whether a title may enter the gate at all. Empty titles and the
/// removed-article sentinel are filtered before fingerprinting.
pub fn is_usable_title(title: &str) -> bool {
    let trimmed = title.trim();
    !trimmed.is_empty() && trimmed != REMOVED_SENTINEL
}

/// One recorded topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedItem {
    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            title: topic.title.clone(),
            description: topic.description.clone(),
            url: topic.url.clone(),
            source: topic.source.clone(),
            published_at: topic.published_at.clone(),
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile {
    #[serde(default)]
    processed_titles: Vec<ProcessedItem>,
    #[serde(default)]
    title_hashes: Vec<String>,
}

/// Summary returned by [`HistoryStore::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_processed: usize,
    /// Record count per source name.
    pub sources: BTreeMap<String, usize>,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    file: HistoryFile,
    seen: HashSet<String>,
}

impl HistoryStore {
    /// Load the store at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupted file
    /// is logged and also yields an empty store; it is overwritten by the
    /// next mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HistoryFile>(&bytes) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "History file is corrupted, starting empty: {e}");
                    HistoryFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HistoryFile::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Cannot read history file, starting empty: {e}");
                HistoryFile::default()
            }
        };

        let seen = file.title_hashes.iter().cloned().collect();
        tracing::debug!(
            path = %path.display(),
            records = file.processed_titles.len(),
            "History loaded"
        );
        Self { path, file, seen }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_duplicate(&self, text: &str) -> bool {
        self.seen.contains(&fingerprint(text))
    }

    /// Append `item` and persist. Returns `false` without writing when the
    /// title was already recorded.
    ///
    /// The in-memory store only changes once the file has been written.
    pub fn record(&mut self, item: ProcessedItem) -> Result<bool> {
        let hash = fingerprint(&item.title);
        if self.seen.contains(&hash) {
            return Ok(false);
        }
        tracing::info!(title = %item.title, source = %item.source, "Recording topic");
        self.file.title_hashes.push(hash.clone());
        self.file.processed_titles.push(item);
        if let Err(e) = self.persist() {
            self.file.title_hashes.pop();
            self.file.processed_titles.pop();
            return Err(e);
        }
        self.seen.insert(hash);
        Ok(true)
    }

    /// Forget every record and persist the empty store.
    pub fn clear(&mut self) -> Result<()> {
        storage::write_json(&self.path, &HistoryFile::default())?;
        self.file = HistoryFile::default();
        self.seen.clear();
        tracing::info!(path = %self.path.display(), "History cleared");
        Ok(())
    }

    pub fn items(&self) -> &[ProcessedItem] {
        &self.file.processed_titles
    }

    pub fn len(&self) -> usize {
        self.file.processed_titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.processed_titles.is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let mut sources = BTreeMap::new();
        for item in &self.file.processed_titles {
            *sources.entry(item.source.clone()).or_insert(0) += 1;
        }
        let times = self.file.processed_titles.iter().map(|i| i.processed_at);

        HistoryStats {
            total_processed: self.file.processed_titles.len(),
            sources,
            oldest_entry: times.clone().min(),
            newest_entry: times.max(),
        }
    }

    fn persist(&self) -> Result<()> {
        storage::write_json(&self.path, &self.file)
    }
}
