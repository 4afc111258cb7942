// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.11: an optional Claude API client that turns recent conversation
//! entries into a one-line session summary. Present only when
//! `ANTHROPIC_API_KEY` is configured; every failure mode degrades to
//! `None` rather than surfacing as an error (§7).

use std::sync::Once;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::host_terminal::EXTERNAL_CALL_TIMEOUT;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-3-5-haiku-20241022";

static CRYPTO_PROVIDER: Once = Once::new();

/// `reqwest`'s `rustls-no-provider` feature leaves installing a crypto
/// backend to the application. Safe to call more than once; only the first
/// call has effect.
fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    text: String,
}

/// Wraps a configured `reqwest::Client` for summary generation. Constructed
/// only when `ANTHROPIC_API_KEY` is present.
pub struct SummaryClient {
    client: reqwest::Client,
    api_key: String,
}

impl SummaryClient {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, api_key: api_key.into() })
    }

    /// Summarize `transcript_excerpt` in one sentence. Returns `None` on
    /// timeout or any non-2xx response rather than an error.
    pub async fn summarize(&self, transcript_excerpt: &str) -> Option<String> {
        let prompt = format!(
            "Summarize the following coding-agent session in one short sentence:\n\n{transcript_excerpt}"
        );
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: 64,
            messages: vec![RequestMessage { role: "user", content: &prompt }],
        };

        let request = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send();

        let response = match tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, request).await {
            Ok(Ok(resp)) if resp.status().is_success() => resp,
            _ => return None,
        };

        let parsed: MessagesResponse = response.json().await.ok()?;
        parsed.content.into_iter().next().map(|block| block.text.trim().to_owned())
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
