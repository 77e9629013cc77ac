//! Run-scoped download state
//!
//! One `RunContext` lives for a whole pipeline run and is handed to every
//! download, sequential or pooled. Seen URLs, seen content hashes, the local
//! path assigned to each URL and the download records sit behind a single
//! mutex; claiming a URL, assigning a path and registering a hash are each
//! one critical section.

use crate::fetcher::{DownloadRecord, layout};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct RunState {
    seen_urls: HashSet<String>,
    seen_hashes: HashMap<String, PathBuf>,
    paths_by_url: HashMap<String, PathBuf>,
    claimed_paths: HashSet<PathBuf>,
    records: Vec<DownloadRecord>,
}

/// Shared dedupe sets and download records for one run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    inner: Arc<Mutex<RunState>>,
}

impl RunContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a URL as seen. Returns false if it was already claimed in this run.
    pub async fn claim_url(&self, url: &str) -> bool {
        self.inner.lock().await.seen_urls.insert(url.to_string())
    }

    /// Whether a URL has been claimed
    pub async fn has_seen_url(&self, url: &str) -> bool {
        self.inner.lock().await.seen_urls.contains(url)
    }

    /// Local path for `url` inside `dir`.
    ///
    /// The first URL asking for a file name gets it; a later URL with the
    /// same name gets a name suffixed with a hash of its URL. A URL keeps the
    /// path it was first given.
    pub async fn assign_path(&self, url: &str, dir: &Path, filename: &str) -> PathBuf {
        let mut state = self.inner.lock().await;
        if let Some(path) = state.paths_by_url.get(url) {
            return path.clone();
        }

        let mut path = dir.join(filename);
        if state.claimed_paths.contains(&path) {
            path = dir.join(layout::unique_filename(filename, url));
        }
        state.claimed_paths.insert(path.clone());
        state.paths_by_url.insert(url.to_string(), path.clone());
        path
    }

    /// Register a content hash for a file.
    ///
    /// Returns the path already holding this content when the hash was seen
    /// before, in which case nothing is registered.
    pub async fn register_hash(&self, hash: &str, path: PathBuf) -> Option<PathBuf> {
        let mut state = self.inner.lock().await;
        if let Some(existing) = state.seen_hashes.get(hash) {
            return Some(existing.clone());
        }
        state.seen_hashes.insert(hash.to_string(), path);
        None
    }

    /// Append a download record
    pub async fn push_record(&self, record: DownloadRecord) {
        self.inner.lock().await.records.push(record);
    }

    /// Snapshot of every record appended so far
    pub async fn records(&self) -> Vec<DownloadRecord> {
        self.inner.lock().await.records.clone()
    }

    /// Number of distinct URLs claimed
    pub async fn seen_url_count(&self) -> usize {
        self.inner.lock().await.seen_urls.len()
    }
}
