// ── Issue domain types ──

use serde::{Deserialize, Serialize};

/// How much a reported issue should worry the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueSeverity {
    #[default]
    Warn,
    Error,
}

/// Where an issue was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum IssueSource {
    /// Found by probing the system.
    System,
    /// Caused by the current configuration.
    Config,
    #[default]
    Unknown,
}

impl From<String> for IssueSource {
    fn from(s: String) -> Self {
        match s.as_str() {
            "system" => Self::System,
            "config" => Self::Config,
            _ => Self::Unknown,
        }
    }
}

/// A problem one of the installer services wants the user to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub description: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub source: IssueSource,
    #[serde(default)]
    pub severity: IssueSeverity,
}

impl Issue {
    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}
