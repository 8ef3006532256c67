// ── Client configuration ──

use anvil_bus::BusAddress;
use serde::{Deserialize, Serialize};

/// Service name the installer answers under on the bus.
pub const INSTALLER_SERVICE: &str = "anvil.installer";

/// Settings for composing an [`InstallerClient`](crate::InstallerClient).
///
/// Built by the embedding application; the library reads nothing on its
/// own except the well-known address file, and only through
/// [`ClientConfig::from_system`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the bus lives.
    pub address: BusAddress,
    /// Which service's disappearance counts as a disconnect.
    pub service: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: BusAddress::default(),
            service: INSTALLER_SERVICE.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Resolve the address from the well-known file, keeping the
    /// default service name.
    pub fn from_system() -> Self {
        Self {
            address: BusAddress::from_system(),
            ..Self::default()
        }
    }
}
