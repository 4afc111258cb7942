// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Injectable wall-clock so timer-driven components (Status Deriver,
//! Periodic Re-evaluator) can be exercised deterministically in tests
//! instead of racing real time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::model::{now_ms, EpochMs};

/// A source of the current wall-clock time, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> EpochMs;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        now_ms()
    }
}

/// A clock whose value is set explicitly by the test driving it.
///
/// Cheaply cloneable: clones share the same underlying counter, so advancing
/// the clock from the test thread is visible to whatever holds a clone.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn new(start_ms: EpochMs) -> Self {
        Self { now: Arc::new(AtomicI64::new(start_ms)) }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_ms(&self, value: EpochMs) {
        self.now.store(value, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> EpochMs {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
