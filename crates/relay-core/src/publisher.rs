// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only change log with monotonic per-stream sequence numbers and a
//! live broadcast tail, so a client can either start from a snapshot and
//! follow along, or reconnect and ask for everything since the last `seq`
//! it saw.
//!
//! Grounded in the workspace's existing JSONL-append-plus-catchup pattern
//! for session state transitions, generalized from a fixed pair of logs
//! (state/hook) to one arbitrary stream of `ChangeRecord`s keyed by an
//! opaque primary key (the session id).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::warn;

use crate::model::{ChangeOp, ChangeRecord, Session};

const CHANNEL_CAPACITY: usize = 4096;

/// Publishes `ChangeRecord`s for one stream (e.g. one `/sessions` feed).
///
/// Every record gets the next sequence number before anything else happens
/// to it, so `seq` is gap-free and strictly increasing for the lifetime of
/// the process — callers rely on this to detect dropped broadcast messages
/// and fall back to `catchup`.
pub struct StatePublisher {
    log_path: Option<PathBuf>,
    file: Option<Mutex<File>>,
    seq: AtomicU64,
    tx: broadcast::Sender<ChangeRecord>,
}

impl StatePublisher {
    /// `log_path`, when given, is the JSONL file backing `catchup`; pass
    /// `None` for a purely in-memory (e.g. test) publisher.
    pub fn new(log_path: Option<PathBuf>) -> std::io::Result<Self> {
        let file = match &log_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Some(Mutex::new(OpenOptions::new().create(true).append(true).open(path)?))
            }
            None => None,
        };
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Ok(Self { log_path, file, seq: AtomicU64::new(0), tx })
    }

    /// Assign the next sequence number, persist, and broadcast a record.
    pub fn publish(&self, op: ChangeOp, pk: String, value: Option<Session>) -> ChangeRecord {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let record = ChangeRecord { seq, op, pk, value };

        if let Some(file) = &self.file {
            match serde_json::to_string(&record) {
                Ok(line) => {
                    let mut guard = file.lock().unwrap_or_else(|e| e.into_inner());
                    if let Err(e) = writeln!(guard, "{line}") {
                        warn!(error = %e, "failed to append change record");
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize change record"),
            }
        }

        // A lagging or absent subscriber is not an error: catchup covers it.
        let _ = self.tx.send(record.clone());
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.tx.subscribe()
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Every persisted record with `seq > since_seq`, in order. Used by a
    /// reconnecting client (or one skipping the initial snapshot) to fill
    /// the gap before resuming the live tail.
    pub fn catchup(&self, since_seq: u64) -> Vec<ChangeRecord> {
        let Some(path) = &self.log_path else { return Vec::new() };
        read_catchup(path, since_seq).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "failed to read change log for catchup");
            Vec::new()
        })
    }
}

fn read_catchup(path: &Path, since_seq: u64) -> std::io::Result<Vec<ChangeRecord>> {
    let file = File::open(path)?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChangeRecord>(&line) {
            Ok(record) if record.seq > since_seq => out.push(record),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "skipping unparseable change record during catchup"),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
