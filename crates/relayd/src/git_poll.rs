// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.12: polls `gh pr status` per session cwd/branch on the Re-evaluator's
//! cadence, populating `Session.pr`. Disabled entirely at startup when `gh`
//! isn't on `PATH`; every run failure degrades to "unavailable" rather than
//! an error (§7).

use relay_core::PrInfo;
use serde::Deserialize;
use tokio::process::Command;

use crate::host_terminal::EXTERNAL_CALL_TIMEOUT;

#[derive(Deserialize)]
struct GhPrStatus {
    current_branch: Option<GhPr>,
}

#[derive(Deserialize)]
struct GhPr {
    number: u64,
    url: String,
    #[serde(rename = "statusCheckRollup")]
    status_check_rollup: Option<Vec<GhCheck>>,
}

#[derive(Deserialize)]
struct GhCheck {
    conclusion: Option<String>,
}

/// Whether the `gh` CLI is present on `PATH`; checked once at startup.
pub fn gh_available() -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| dir.join("gh").is_file()))
        .unwrap_or(false)
}

/// `gh pr status --json number,url,state,statusCheckRollup` run in `cwd`.
/// Returns `None` on timeout, non-zero exit, or unparseable output.
pub async fn poll(cwd: &str) -> Option<PrInfo> {
    let output = tokio::time::timeout(
        EXTERNAL_CALL_TIMEOUT,
        Command::new("gh")
            .current_dir(cwd)
            .args(["pr", "status", "--json", "number,url,state,statusCheckRollup"])
            .output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        return None;
    }

    let parsed: GhPrStatus = serde_json::from_slice(&output.stdout).ok()?;
    let pr = parsed.current_branch?;
    let checks_status = pr.status_check_rollup.map(summarize_checks).unwrap_or_else(|| "none".to_owned());

    Some(PrInfo { number: pr.number, url: pr.url, checks_status })
}

fn summarize_checks(checks: Vec<GhCheck>) -> String {
    if checks.is_empty() {
        return "none".to_owned();
    }
    if checks.iter().any(|c| matches!(c.conclusion.as_deref(), Some("failure") | Some("cancelled"))) {
        "failing".to_owned()
    } else if checks.iter().all(|c| c.conclusion.as_deref() == Some("success")) {
        "passing".to_owned()
    } else {
        "pending".to_owned()
    }
}

#[cfg(test)]
#[path = "git_poll_tests.rs"]
mod tests;
