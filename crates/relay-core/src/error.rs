// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Error taxonomy for the derivation core. Deliberately small: per §7 of the
/// design, transient I/O and parse failures never propagate as errors at
/// all — they are logged and degrade to a no-op. `CoreError` exists only for
/// the handful of conditions a caller must actually react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The log file could not be read at all (permissions, race with an
    /// external process). Non-fatal: the tailer emits an error event and
    /// continues watching.
    UnreadableFile { path: String, detail: String },
    /// The publisher's persisted change-log directory could not be created
    /// or written. Fatal at startup.
    StateDirUnwritable { path: String, detail: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableFile { path, detail } => {
                write!(f, "unreadable log file {path}: {detail}")
            }
            Self::StateDirUnwritable { path, detail } => {
                write!(f, "state directory {path} unwritable: {detail}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
