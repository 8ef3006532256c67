// ── Manager status types ──

use serde::{Deserialize, Serialize};

/// Coarse lifecycle phase of the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InstallationPhase {
    #[default]
    Startup,
    Config,
    Install,
}

/// Reply of the manager's status call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallerStatus {
    #[serde(default)]
    pub phase: InstallationPhase,
    /// Services currently running a long operation.
    #[serde(default)]
    pub busy_services: Vec<String>,
}

impl InstallerStatus {
    pub fn is_busy(&self) -> bool {
        !self.busy_services.is_empty()
    }
}

/// One step of a long-running manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub step: u32,
    pub total_steps: u32,
    #[serde(default)]
    pub message: String,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.step >= self.total_steps
    }
}
