// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session derivation core: tails agent conversation logs, derives a live
//! status per session, and publishes a deduplicated change stream.
//!
//! This crate has no knowledge of HTTP, WebSockets, or PTYs — those live in
//! the `relayd` binary crate. Everything here is pure or I/O-isolated so the
//! properties in the daemon's test suite can be exercised with a fake clock.

pub mod clock;
pub mod error;
pub mod model;
pub mod parser;
pub mod publisher;
pub mod reevaluator;
pub mod registry;
pub mod status;
pub mod tailer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use model::{
    ChangeOp, ChangeRecord, ContentShape, Notification, NotificationKind, PendingTool, PrInfo,
    RawEntry, Role, Session, SessionStatus, StatusTuple,
};
pub use parser::parse_line;
pub use publisher::StatePublisher;
pub use reevaluator::{publish_event, PeriodicReevaluator};
pub use registry::{RegistryEvent, SessionRegistry};
pub use status::derive_status;
pub use tailer::{LogTailer, TailEvent};
