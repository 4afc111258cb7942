// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /sessions`: the State Publisher's change stream over HTTP, as
//! newline-delimited `ChangeRecord` JSON with `?from=<seq>` resumption
//! (§4.5/§6).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use relay_core::ChangeRecord;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

use crate::transport::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct SessionsQuery {
    from: Option<u64>,
}

/// Replays every persisted record after `from` (0 when absent — the full
/// snapshot-from-scratch case), then streams the live tail. A lagged
/// subscriber's stream simply ends, matching the documented
/// disconnect-and-resubscribe back-pressure policy.
pub async fn stream_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionsQuery>,
) -> impl IntoResponse {
    let since = query.from.unwrap_or(0);
    let catchup = state.publisher.catchup(since);
    let live = state.publisher.subscribe();

    let catchup_stream = futures_util::stream::iter(catchup.into_iter().map(|record| encode_line(&record)));
    let live_stream = BroadcastStream::new(live).map_while(|res| res.ok().map(|record| encode_line(&record)));

    let body = Body::from_stream(catchup_stream.chain(live_stream).map(Ok::<Bytes, std::io::Error>));

    Response::builder().header(header::CONTENT_TYPE, "application/json").body(body).unwrap_or_default()
}

fn encode_line(record: &ChangeRecord) -> Bytes {
    let mut line = serde_json::to_vec(record).unwrap_or_default();
    line.push(b'\n');
    Bytes::from(line)
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
