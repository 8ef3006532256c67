// ── Network domain types ──

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Kind of a network interface, normalized from the wire string.
///
/// Values the service reports that this client does not know yet decode
/// to `Unknown` instead of failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case", from = "String")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Ethernet,
    Wireless,
    Bond,
    Loopback,
    Dummy,
    #[default]
    Unknown,
}

impl From<String> for DeviceKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ethernet" => Self::Ethernet,
            "wireless" => Self::Wireless,
            "bond" => Self::Bond,
            "loopback" => Self::Loopback,
            "dummy" => Self::Dummy,
            _ => Self::Unknown,
        }
    }
}

/// Carrier state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case", from = "String")]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
    Up,
    Down,
    #[default]
    Unknown,
}

impl From<String> for LinkState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "up" => Self::Up,
            "down" => Self::Down,
            _ => Self::Unknown,
        }
    }
}

// ── IpCidr ──────────────────────────────────────────────────────────

/// IP address with prefix length, rendered as `address/prefix`.
///
/// A bare address parses as a host route (/32 or /128).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpCidr {
    pub address: IpAddr,
    pub prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR address `{0}`")]
pub struct ParseCidrError(String);

impl IpCidr {
    pub fn new(address: IpAddr, prefix: u8) -> Self {
        Self { address, prefix }
    }

    fn host_prefix(address: IpAddr) -> u8 {
        if address.is_ipv4() { 32 } else { 128 }
    }
}

impl fmt::Display for IpCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl FromStr for IpCidr {
    type Err = ParseCidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = match s.split_once('/') {
            Some((address, prefix)) => {
                let address: IpAddr = address.parse().map_err(|_| ParseCidrError(s.to_owned()))?;
                let prefix: u8 = prefix.parse().map_err(|_| ParseCidrError(s.to_owned()))?;
                (address, prefix)
            }
            None => {
                let address: IpAddr = s.parse().map_err(|_| ParseCidrError(s.to_owned()))?;
                (address, Self::host_prefix(address))
            }
        };
        if prefix > Self::host_prefix(address) {
            return Err(ParseCidrError(s.to_owned()));
        }
        Ok(Self { address, prefix })
    }
}

impl TryFrom<String> for IpCidr {
    type Error = ParseCidrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpCidr> for String {
    fn from(cidr: IpCidr) -> Self {
        cidr.to_string()
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A network interface as reported by the installer.
///
/// `name` is the identity: the live set never holds two devices with
/// the same name. Updates replace the whole value, they are not merged
/// field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    #[serde(default)]
    pub kind: DeviceKind,
    #[serde(default)]
    pub addresses: Vec<IpCidr>,
    #[serde(default)]
    pub state: LinkState,
}

impl Device {
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }
}

// ── Connection ──────────────────────────────────────────────────────

/// A configured connection profile.
///
/// Holds device *names* only; a Connection never owns a Device. The
/// connection set is always replaced as a whole after topology changes,
/// never patched connection by connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    #[serde(default)]
    pub wireless: bool,
    #[serde(default)]
    pub devices: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cidr_parses_address_and_prefix() {
        let cidr: IpCidr = "192.168.1.10/24".parse().unwrap();
        assert_eq!(cidr.address, "192.168.1.10".parse::<IpAddr>().unwrap());
        assert_eq!(cidr.prefix, 24);
        assert_eq!(cidr.to_string(), "192.168.1.10/24");
    }

    #[test]
    fn bare_address_is_a_host_route() {
        let v4: IpCidr = "10.0.0.1".parse().unwrap();
        assert_eq!(v4.prefix, 32);

        let v6: IpCidr = "fd00::1".parse().unwrap();
        assert_eq!(v6.prefix, 128);
    }

    #[test]
    fn cidr_rejects_garbage_and_oversized_prefixes() {
        assert!("not-an-address/8".parse::<IpCidr>().is_err());
        assert!("192.168.1.1/33".parse::<IpCidr>().is_err());
        assert!("192.168.1.1/two".parse::<IpCidr>().is_err());
    }

    #[test]
    fn device_decodes_with_sparse_payload() {
        let device: Device = serde_json::from_value(json!({ "name": "eth0" })).unwrap();
        assert_eq!(device.name, "eth0");
        assert_eq!(device.kind, DeviceKind::Unknown);
        assert_eq!(device.state, LinkState::Unknown);
        assert!(device.addresses.is_empty());
    }

    #[test]
    fn device_decodes_full_payload() {
        let device: Device = serde_json::from_value(json!({
            "name": "wlan0",
            "kind": "wireless",
            "addresses": ["192.168.1.5/24"],
            "state": "up",
        }))
        .unwrap();
        assert_eq!(device.kind, DeviceKind::Wireless);
        assert!(device.is_up());
        assert_eq!(device.addresses, vec!["192.168.1.5/24".parse().unwrap()]);
    }

    #[test]
    fn unknown_kind_string_maps_to_unknown() {
        let device: Device =
            serde_json::from_value(json!({ "name": "x", "kind": "quantum" })).unwrap();
        assert_eq!(device.kind, DeviceKind::Unknown);
    }

    #[test]
    fn connection_decodes_device_references() {
        let conn: Connection = serde_json::from_value(json!({
            "id": "office",
            "wireless": false,
            "devices": ["eth0"],
        }))
        .unwrap();
        assert_eq!(conn.id, "office");
        assert_eq!(conn.devices, vec!["eth0"]);
        assert!(!conn.wireless);
    }
}
