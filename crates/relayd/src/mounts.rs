// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.10: SSHFS-backed remote mount orchestration, persisted to
//! `~/.claude-code-ui/machines.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::host_terminal::EXTERNAL_CALL_TIMEOUT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineInfo {
    #[serde(flatten)]
    pub machine: Machine,
    pub status: MountStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountStatus {
    Unmounted,
    Mounted,
    Error,
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct MachinesFile {
    machines: Vec<Machine>,
}

/// Tracks configured machines and their current mount status. Mount
/// failures degrade a machine to `status: error`; they never panic the
/// daemon (§7 "external-tool unavailable").
pub struct MountManager {
    config_path: PathBuf,
    mount_root: PathBuf,
    machines: RwLock<Vec<MachineInfo>>,
}

impl MountManager {
    pub fn new(state_dir: &Path) -> Self {
        let config_path = state_dir.join("machines.json");
        let mount_root = state_dir.join("mounts");
        let machines = load_machines(&config_path)
            .into_iter()
            .map(|machine| MachineInfo { machine, status: MountStatus::Unmounted, error: None })
            .collect();
        Self { config_path, mount_root, machines: RwLock::new(machines) }
    }

    pub fn machines(&self) -> Vec<MachineInfo> {
        self.machines.read().clone()
    }

    /// `sshfs user@host:/ ~/.claude-code-ui/mounts/<name>/`, bounded by the
    /// shared 5s external-call timeout.
    pub async fn mount(&self, name: &str) -> anyhow::Result<()> {
        let Some(machine) = self.machines.read().iter().find(|m| m.machine.name == name).map(|m| m.machine.clone())
        else {
            anyhow::bail!("unknown machine: {name}");
        };

        let mount_point = self.mount_root.join(name);
        if let Err(e) = std::fs::create_dir_all(&mount_point) {
            self.set_error(name, e.to_string());
            return Err(e.into());
        }

        let remote = match (&machine.user, machine.port) {
            (Some(user), _) => format!("{user}@{}:/", machine.host),
            (None, _) => format!("{}:/", machine.host),
        };

        let mut cmd = Command::new("sshfs");
        cmd.arg(&remote).arg(&mount_point);
        if let Some(port) = machine.port {
            cmd.arg("-p").arg(port.to_string());
        }

        match tokio::time::timeout(EXTERNAL_CALL_TIMEOUT, cmd.status()).await {
            Ok(Ok(status)) if status.success() => {
                self.set_status(name, MountStatus::Mounted, None);
                Ok(())
            }
            Ok(Ok(status)) => {
                let reason = format!("sshfs exited with {status}");
                self.set_error(name, reason.clone());
                anyhow::bail!(reason)
            }
            Ok(Err(e)) => {
                self.set_error(name, e.to_string());
                Err(e.into())
            }
            Err(_) => {
                self.set_error(name, "sshfs timed out".to_owned());
                anyhow::bail!("sshfs timed out")
            }
        }
    }

    pub async fn unmount(&self, name: &str) -> anyhow::Result<()> {
        let mount_point = self.mount_root.join(name);
        let result = tokio::time::timeout(
            EXTERNAL_CALL_TIMEOUT,
            Command::new("umount").arg(&mount_point).status(),
        )
        .await;
        match result {
            Ok(Ok(status)) if status.success() => {
                self.set_status(name, MountStatus::Unmounted, None);
                Ok(())
            }
            _ => {
                warn!("failed to unmount {name}, leaving status as-is");
                Ok(())
            }
        }
    }

    fn set_status(&self, name: &str, status: MountStatus, error: Option<String>) {
        if let Some(entry) = self.machines.write().iter_mut().find(|m| m.machine.name == name) {
            entry.status = status;
            entry.error = error;
        }
    }

    fn set_error(&self, name: &str, reason: String) {
        self.set_status(name, MountStatus::Error, Some(reason));
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let machines: Vec<Machine> = self.machines.read().iter().map(|m| m.machine.clone()).collect();
        let contents = serde_json::to_string_pretty(&MachinesFile { machines })?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

fn load_machines(config_path: &Path) -> Vec<Machine> {
    match std::fs::read_to_string(config_path) {
        Ok(contents) => serde_json::from_str::<MachinesFile>(&contents).map(|f| f.machines).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// Wrap a `MountManager` for shared access across handlers.
pub fn shared(state_dir: &Path) -> Arc<MountManager> {
    Arc::new(MountManager::new(state_dir))
}

#[cfg(test)]
#[path = "mounts_tests.rs"]
mod tests;
