//! Locating a MAC or IPv4 address on the ports of the snapshot's devices.

use crate::error::{Error, Result};
use crate::snapshot::TopologySnapshot;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Address shown when a MAC has no known IP.
pub const UNKNOWN_IP: &str = "?";

/// Where an address was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// First known IP of the MAC, or [`UNKNOWN_IP`].
    pub ip: String,
    /// The MAC address.
    pub mac: String,
    /// Device host → the port the MAC was learned on.
    pub devices: IndexMap<String, PortSighting>,
}

/// A port on which a MAC was learned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSighting {
    /// Port key.
    pub port: String,
    /// Port name.
    pub port_name: String,
    /// Total MACs learned on that port.
    pub port_macs_counter: usize,
}

/// What a query string was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A dotted IPv4 address.
    Ipv4,
    /// Six hex octets separated by `:` or `-`.
    Mac,
}

/// Classifies `query`, or `None` if it is neither kind.
pub fn classify(query: &str) -> Option<QueryKind> {
    if query.parse::<Ipv4Addr>().is_ok() {
        Some(QueryKind::Ipv4)
    } else if is_mac_address(query) {
        Some(QueryKind::Mac)
    } else {
        None
    }
}

/// Checks for `xx:xx:xx:xx:xx:xx` or `xx-xx-xx-xx-xx-xx`.
pub fn is_mac_address(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 17
        && bytes.iter().enumerate().all(|(i, b)| {
            if i % 3 == 2 {
                *b == b':' || *b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

/// Finds where the MAC or IPv4 address in `query` was seen.
///
/// The query is lowercased. An IPv4 address resolves to the first MAC whose
/// index entry lists it; a MAC must be present in the MAC index.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedQuery`] if the query is not an address or
/// is not known to the index.
pub fn search(snapshot: &TopologySnapshot, query: &str) -> Result<SearchHit> {
    let query = query.trim().to_lowercase();
    let (mac, ip) = match classify(&query) {
        Some(QueryKind::Ipv4) => snapshot
            .macs
            .iter()
            .find(|(_, ips)| ips.contains(&query))
            .map(|(mac, ips)| (mac.clone(), ips.first().cloned())),
        Some(QueryKind::Mac) => snapshot
            .macs
            .get(&query)
            .map(|ips| (query.clone(), ips.first().cloned())),
        None => None,
    }
    .ok_or_else(|| Error::UnrecognizedQuery(query.clone()))?;

    let ip = ip.unwrap_or_else(|| UNKNOWN_IP.to_string());
    Ok(locate(snapshot, mac, ip))
}

fn locate(snapshot: &TopologySnapshot, mac: String, ip: String) -> SearchHit {
    let mut devices = IndexMap::new();
    for (key, device) in &snapshot.devices {
        if *key == ip {
            continue;
        }
        for (port_id, port) in &device.ports {
            if port.macs.contains_key(&mac) {
                devices.insert(
                    device.host.clone(),
                    PortSighting {
                        port: port_id.clone(),
                        port_name: port.name.clone(),
                        port_macs_counter: port.mac_count(),
                    },
                );
            }
        }
    }
    log::debug!("{} ({}) seen on {} devices", mac, ip, devices.len());
    SearchHit { ip, mac, devices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TopologySnapshot {
        TopologySnapshot::from_json(
            r#"{
                "devices": {
                    "10.0.0.1": {
                        "host": "10.0.0.1",
                        "ports": {
                            "1": { "name": "uplink", "macs": { "02:00:00:00:00:aa": "1", "02:00:00:00:00:bb": "1" } }
                        }
                    },
                    "10.0.0.2": {
                        "host": "10.0.0.2",
                        "ports": {
                            "7": { "name": "access7", "macs": { "02:00:00:00:00:aa": "1" } }
                        }
                    }
                },
                "macs": {
                    "02:00:00:00:00:aa": ["10.0.0.50"],
                    "02:00:00:00:00:bb": [],
                    "02:00:00:00:00:cc": ["10.0.0.2"]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("10.30.1.1"), Some(QueryKind::Ipv4));
        assert_eq!(classify("10.30.1.1111"), None);
        assert_eq!(classify("08:f1:ea:54:3a:f0"), Some(QueryKind::Mac));
        assert_eq!(classify("08-F1-EA-54-3A-F0"), Some(QueryKind::Mac));
        assert_eq!(classify("08:f1:ea:54:3a:fg"), None);
        assert_eq!(classify("switch"), None);
    }

    #[test]
    fn test_search_by_mac() {
        let hit = search(&snapshot(), "02:00:00:00:00:AA").unwrap();
        assert_eq!(hit.mac, "02:00:00:00:00:aa");
        assert_eq!(hit.ip, "10.0.0.50");
        assert_eq!(hit.devices.len(), 2);
        assert_eq!(hit.devices["10.0.0.1"].port_name, "uplink");
        assert_eq!(hit.devices["10.0.0.1"].port_macs_counter, 2);
        assert_eq!(hit.devices["10.0.0.2"].port, "7");
    }

    #[test]
    fn test_search_by_ip() {
        let hit = search(&snapshot(), "10.0.0.50").unwrap();
        assert_eq!(hit.mac, "02:00:00:00:00:aa");
    }

    #[test]
    fn test_mac_without_ip() {
        let hit = search(&snapshot(), "02:00:00:00:00:bb").unwrap();
        assert_eq!(hit.ip, UNKNOWN_IP);
        assert_eq!(hit.devices.len(), 1);
    }

    #[test]
    fn test_device_own_address_excluded() {
        let hit = search(&snapshot(), "10.0.0.2").unwrap();
        assert_eq!(hit.mac, "02:00:00:00:00:cc");
        assert!(hit.devices.is_empty());
    }

    #[test]
    fn test_unrecognized() {
        assert!(matches!(
            search(&snapshot(), "not-an-address"),
            Err(Error::UnrecognizedQuery(_))
        ));
        assert!(matches!(
            search(&snapshot(), "02:00:00:00:00:ff"),
            Err(Error::UnrecognizedQuery(_))
        ));
        assert!(matches!(
            search(&snapshot(), "10.1.1.1"),
            Err(Error::UnrecognizedQuery(_))
        ));
    }
}
