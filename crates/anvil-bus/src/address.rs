// ── Bus address resolution ──

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Well-known file the installer writes its bus address into.
pub const ADDRESS_FILE: &str = "/run/anvil/bus.address";

/// Address used when the well-known file is absent or blank.
pub const DEFAULT_ADDRESS: &str = "unix:path=/run/anvil/bus";

/// Resolved bus endpoint address.
///
/// Resolution happens once, at composition time, and the value travels
/// explicitly through configuration -- there is no process-wide cached
/// address. The string itself is opaque to this crate; transports parse
/// whatever scheme they support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusAddress(String);

impl BusAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Resolve from the system's well-known address file.
    pub fn from_system() -> Self {
        Self::from_file(ADDRESS_FILE)
    }

    /// Resolve from a specific address file.
    ///
    /// Uses the first non-blank line; a missing, unreadable, or blank
    /// file falls back to [`DEFAULT_ADDRESS`].
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match contents.lines().map(str::trim).find(|l| !l.is_empty()) {
                Some(line) => Self(line.to_owned()),
                None => {
                    debug!(path = %path.display(), "address file is blank, using default");
                    Self::default()
                }
            },
            Err(e) => {
                let path = path.display();
                debug!(%path, error = %e, "address file unreadable, using default");
                Self::default()
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BusAddress {
    fn default() -> Self {
        Self(DEFAULT_ADDRESS.to_owned())
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BusAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for BusAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BusAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}
