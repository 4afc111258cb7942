// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY spawning and non-blocking I/O. One managed PTY always runs the same
//! shape of child: a `tmux attach` to a detached session the Terminal
//! Manager owns — there is no second backend to abstract over, so this
//! module exposes `NativePty` directly instead of a `Backend` trait.

pub mod nbio;
pub mod spawn;

pub use spawn::NativePty;

/// How a managed PTY's child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}
