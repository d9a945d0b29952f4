//! Per-device detail: internal addresses and the MACs learned on each port.

use crate::error::Result;
use crate::snapshot::TopologySnapshot;
use serde::{Deserialize, Serialize};

/// Interface name shown when an address is bound to an index the device
/// did not report as a port.
pub const UNKNOWN_INTERFACE: &str = "?";

/// Everything the detail panel shows for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDetail {
    /// Device key.
    pub key: String,
    /// Host name.
    pub host: String,
    /// Free-text device info.
    pub info: String,
    /// Addresses configured on the device.
    pub internal_ips: Vec<InternalIpRow>,
    /// Ports with at least one learned MAC, in port order.
    pub ports: Vec<PortDetail>,
}

/// One configured address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalIpRow {
    /// The address.
    pub address: String,
    /// Its mask.
    pub mask: String,
    /// Name of the interface it is bound to, or [`UNKNOWN_INTERFACE`].
    pub interface: String,
}

/// One port and its learned MACs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDetail {
    /// Port key.
    pub port_id: String,
    /// Port name.
    pub name: String,
    /// Learned MACs.
    pub macs: Vec<MacRow>,
}

/// A learned MAC with the addresses known for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacRow {
    /// The MAC address.
    pub mac: String,
    /// IP addresses from the MAC index; empty when none are known.
    pub ip_addresses: Vec<String>,
    /// VLAN the MAC was learned on.
    pub vlan: String,
}

/// Collects the detail view of device `key` from `snapshot`.
///
/// # Errors
///
/// Returns [`Error::UnknownDevice`](crate::Error::UnknownDevice) if the key
/// is not in the directory.
pub fn device_detail(snapshot: &TopologySnapshot, key: &str) -> Result<DeviceDetail> {
    let device = snapshot.device(key)?;

    let internal_ips = device
        .internal_ip
        .values()
        .map(|ip| InternalIpRow {
            address: ip.address.clone(),
            mask: ip.mask.clone(),
            interface: device
                .ports
                .get(&ip.interface_index)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| UNKNOWN_INTERFACE.to_string()),
        })
        .collect();

    let ports = device
        .ports
        .iter()
        .filter(|(_, port)| !port.macs.is_empty())
        .map(|(port_id, port)| PortDetail {
            port_id: port_id.clone(),
            name: port.name.clone(),
            macs: port
                .macs
                .iter()
                .map(|(mac, vlan)| MacRow {
                    mac: mac.clone(),
                    ip_addresses: snapshot.macs.get(mac).cloned().unwrap_or_default(),
                    vlan: vlan.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(DeviceDetail {
        key: key.to_string(),
        host: device.host.clone(),
        info: device.info.clone(),
        internal_ips,
        ports,
    })
}
