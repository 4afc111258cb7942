// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watches a set of root directories (to depth 2) for append-only log files,
//! decodes newly appended lines, and emits batches to the Session Registry.
//!
//! Grounded in the same notify-watcher-plus-polling-fallback shape used
//! elsewhere in this workspace for single-file tailing, generalized here to
//! a whole directory tree with per-file debounce coalescing instead of one
//! timer per file.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::RawEntry;
use crate::parser::{self, SessionMetadata};

/// One coalesced observation from the tailer.
#[derive(Debug)]
pub enum TailEvent {
    /// A new candidate log file appeared.
    Added { path: PathBuf },
    /// New complete lines were read from a previously-seen (or new) file.
    Changed { path: PathBuf, entries: Vec<RawEntry>, metadata: SessionMetadata, byte_position: u64 },
    /// The file disappeared (rename, delete, rotation-away).
    Unlinked { path: PathBuf },
    /// The file could not be read; non-fatal, offset is unchanged.
    Error { path: PathBuf, detail: String },
}

/// Configuration for a `LogTailer`.
pub struct LogTailer {
    roots: Vec<PathBuf>,
    suffix: String,
    ignore_prefix: String,
    debounce: Duration,
    poll_interval: Duration,
}

impl LogTailer {
    pub fn new(roots: Vec<PathBuf>, suffix: impl Into<String>, ignore_prefix: impl Into<String>) -> Self {
        Self {
            roots,
            suffix: suffix.into(),
            ignore_prefix: ignore_prefix.into(),
            debounce: Duration::from_millis(250),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn is_tracked(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !name.ends_with(&self.suffix) {
            return false;
        }
        if !self.ignore_prefix.is_empty() && name.starts_with(&self.ignore_prefix) {
            return false;
        }
        true
    }

    /// Run the tailer until `shutdown` is cancelled. Decoded batches are
    /// sent on `tx`; the receiver is the Session Registry's ingestion loop.
    pub async fn run(self, tx: mpsc::Sender<TailEvent>, shutdown: CancellationToken) {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();

        let _watcher = self.spawn_watchers(raw_tx.clone());

        let mut offsets: HashMap<PathBuf, u64> = HashMap::new();
        let mut known: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();
        let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
        let mut poll_timer = tokio::time::interval(self.poll_interval);
        let mut debounce_timer = tokio::time::interval(Duration::from_millis(50));

        // Prime with whatever already exists on disk.
        for path in self.scan_existing() {
            let _ = raw_tx.send(path);
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("log tailer shutting down");
                    return;
                }
                Some(path) = raw_rx.recv() => {
                    pending.insert(path, Instant::now() + self.debounce);
                }
                _ = debounce_timer.tick() => {
                    let now = Instant::now();
                    let due: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, deadline)| **deadline <= now)
                        .map(|(p, _)| p.clone())
                        .collect();
                    for path in due {
                        pending.remove(&path);
                        self.process_path(&path, &mut offsets, &mut known, &tx).await;
                    }
                }
                _ = poll_timer.tick() => {
                    for path in self.scan_existing() {
                        if !known.contains(&path) {
                            let _ = raw_tx.send(path);
                        }
                    }
                    // Also re-check all known files in case a notify event was missed
                    // (common on network-mounted filesystems).
                    let tracked: Vec<PathBuf> = known.iter().cloned().collect();
                    for path in tracked {
                        self.process_path(&path, &mut offsets, &mut known, &tx).await;
                    }
                }
            }
        }
    }

    fn spawn_watchers(&self, raw_tx: mpsc::UnboundedSender<PathBuf>) -> Vec<RecommendedWatcher> {
        let mut watchers = Vec::new();
        for root in &self.roots {
            let dirs = depth2_dirs(root);
            for dir in dirs {
                let tx = raw_tx.clone();
                let handler = move |res: notify::Result<Event>| {
                    let Ok(event) = res else { return };
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                };
                match notify::recommended_watcher(handler) {
                    Ok(mut watcher) => {
                        if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                            warn!(path = %dir.display(), error = %e, "failed to watch directory");
                        } else {
                            watchers.push(watcher);
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to create file watcher"),
                }
            }
        }
        watchers
    }

    fn scan_existing(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            for dir in depth2_dirs(root) {
                let Ok(read_dir) = std::fs::read_dir(&dir) else { continue };
                for entry in read_dir.flatten() {
                    let path = entry.path();
                    if path.is_file() && self.is_tracked(&path) {
                        found.push(path);
                    }
                }
            }
        }
        found
    }

    async fn process_path(
        &self,
        path: &Path,
        offsets: &mut HashMap<PathBuf, u64>,
        known: &mut std::collections::HashSet<PathBuf>,
        tx: &mpsc::Sender<TailEvent>,
    ) {
        if !self.is_tracked(path) {
            return;
        }

        if !path.exists() {
            if known.remove(path) {
                offsets.remove(path);
                let _ = tx.send(TailEvent::Unlinked { path: path.to_path_buf() }).await;
            }
            return;
        }

        let first_sight = known.insert(path.to_path_buf());
        if first_sight {
            let _ = tx.send(TailEvent::Added { path: path.to_path_buf() }).await;
        }

        let offset = offsets.get(path).copied().unwrap_or(0);
        match read_new_lines(path, offset) {
            Ok((entries, metadata, new_offset)) => {
                offsets.insert(path.to_path_buf(), new_offset);
                if !entries.is_empty() || new_offset != offset {
                    let _ = tx
                        .send(TailEvent::Changed {
                            path: path.to_path_buf(),
                            entries,
                            metadata,
                            byte_position: new_offset,
                        })
                        .await;
                }
            }
            Err(detail) => {
                let _ = tx.send(TailEvent::Error { path: path.to_path_buf(), detail }).await;
            }
        }
    }
}

/// Read and decode complete lines appended since `offset`.
///
/// On truncation (file shorter than `offset`, e.g. replaced or rotated),
/// re-reads from byte 0 per §4.1's file-race handling. Invalid JSON lines
/// are skipped but still advance the returned offset past them, so a single
/// malformed line never stalls the tailer.
fn read_new_lines(
    path: &Path,
    offset: u64,
) -> Result<(Vec<RawEntry>, SessionMetadata, u64), String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let len = file.metadata().map_err(|e| e.to_string())?.len();
    let start = if offset > len { 0 } else { offset };

    file.seek(SeekFrom::Start(start)).map_err(|e| e.to_string())?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).map_err(|e| e.to_string())?;

    let mut entries = Vec::new();
    let mut metadata = SessionMetadata::default();
    let mut consumed: u64 = 0;

    for line in buf.split_inclusive('\n') {
        if !line.ends_with('\n') {
            // Partial trailing line: do not consume, stop here.
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        consumed += line.len() as u64;
        if trimmed.trim().is_empty() {
            continue;
        }
        if let Some(meta) = parser::extract_metadata(trimmed) {
            merge_metadata(&mut metadata, meta);
        }
        match parser::parse_line(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping malformed log line");
                // Offset still advances past the malformed line (see loop above).
            }
        }
    }

    Ok((entries, metadata, start + consumed))
}

fn merge_metadata(into: &mut SessionMetadata, from: SessionMetadata) {
    if into.session_id.is_none() {
        into.session_id = from.session_id;
    }
    if into.cwd.is_none() {
        into.cwd = from.cwd;
    }
    if into.git_branch.is_none() {
        into.git_branch = from.git_branch;
    }
    if into.started_at.is_none() {
        into.started_at = from.started_at;
    }
    // original_prompt tracks the *latest* non-empty user prompt, not the first.
    if let Some(prompt) = from.original_prompt {
        if !prompt.is_empty() {
            into.original_prompt = Some(prompt);
        }
    }
}

/// Directories to watch for a root: the root itself plus its immediate
/// subdirectories (depth 2 total).
fn depth2_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![root.to_path_buf()];
    if let Ok(read_dir) = std::fs::read_dir(root) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
    }
    dirs
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
