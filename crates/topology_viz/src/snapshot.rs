//! The "network place" snapshot consumed by the tree builder.
//!
//! A [`TopologySnapshot`] bundles the three inputs the upstream inventory
//! service publishes in one document:
//!
//! - `devices`: the device directory, keyed by device key,
//! - `macs`: the MAC→IP index,
//! - `tree`: the uplink graph, a device-keyed map whose ports may carry an
//!   `uplink` entry that is itself a one-entry device-keyed map.
//!
//! All maps are [`IndexMap`]s so the document order (which is the port
//! iteration order the tree must preserve) survives deserialization.
//!
//! # Examples
//!
//! ```
//! use topology_viz::TopologySnapshot;
//!
//! let snapshot = TopologySnapshot::from_json(r#"{
//!     "devices": {
//!         "SW1": {
//!             "host": "SW1",
//!             "info": "core switch",
//!             "ports": { "1": { "name": "ge-0/0/1", "macs": { "aa:bb:cc:dd:ee:01": "10" } } }
//!         }
//!     },
//!     "macs": { "aa:bb:cc:dd:ee:01": ["10.0.0.5"] },
//!     "tree": { "SW1": { "ports": {} } }
//! }"#).unwrap();
//!
//! assert_eq!(snapshot.root_keys().collect::<Vec<_>>(), vec!["SW1"]);
//! assert_eq!(snapshot.device("SW1").unwrap().host, "SW1");
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Device directory: device key → [`Device`].
pub type DeviceDirectory = IndexMap<String, Device>;

/// Uplink graph: device key → [`TopologyNode`].
pub type Topology = IndexMap<String, TopologyNode>;

/// MAC→IP index: MAC address → IP addresses seen for it.
pub type MacIpIndex = IndexMap<String, Vec<String>>;

/// A managed network element as reported by the inventory service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Host name or management address.
    pub host: String,

    /// Free-text description. The inventory joins the system description
    /// lines with `<br>`.
    #[serde(default)]
    pub info: String,

    /// Ports in the order the device reported them, keyed by interface index.
    #[serde(default)]
    pub ports: IndexMap<String, Port>,

    /// Addresses configured on the device itself, keyed by address.
    #[serde(default)]
    pub internal_ip: IndexMap<String, InternalIp>,

    /// Total number of MAC entries in the device's forwarding table.
    #[serde(default)]
    pub device_macs_counter: usize,
}

/// A physical or logical interface and the MACs it has learned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Interface name.
    pub name: String,

    /// Learned MAC address → VLAN id.
    #[serde(default)]
    pub macs: IndexMap<String, String>,
}

impl Port {
    /// Number of MAC addresses learned on this port.
    pub fn mac_count(&self) -> usize {
        self.macs.len()
    }
}

/// An IP address configured on a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalIp {
    /// The address.
    #[serde(rename = "ipAdEntAddr")]
    pub address: String,

    /// The network mask.
    #[serde(rename = "ipAdEntNetMask", default)]
    pub mask: String,

    /// Interface index the address is bound to (a port key of the device).
    #[serde(rename = "ipAdEntIfIndex", default)]
    pub interface_index: String,

    /// Physical address of that interface, when known.
    #[serde(rename = "ifPhyAddress", default, skip_serializing_if = "Option::is_none")]
    pub phy_address: Option<String>,
}

/// One device's entry in the uplink graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Host name, when the graph producer recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Device MAC counter used by the producer to pick the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_macs_counter: Option<usize>,

    /// Ports on which other devices were seen.
    #[serde(default)]
    pub ports: IndexMap<String, TopologyPort>,
}

/// A port entry in the uplink graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyPort {
    /// Port name as recorded by the graph producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,

    /// MAC count as recorded by the graph producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_macs_counter: Option<usize>,

    /// Device keys seen behind this port.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// The downstream subtree, a one-entry map `{child_key: node}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink: Option<Topology>,
}

impl TopologyNode {
    /// Creates an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `port` as an uplink to `child_key` whose own graph entry is `child`.
    ///
    /// ```
    /// use topology_viz::TopologyNode;
    ///
    /// let node = TopologyNode::new().with_uplink("1", "SW2", TopologyNode::new());
    /// assert!(node.ports["1"].uplink.as_ref().unwrap().contains_key("SW2"));
    /// ```
    pub fn with_uplink(
        mut self,
        port: impl Into<String>,
        child_key: impl Into<String>,
        child: TopologyNode,
    ) -> Self {
        let mut uplink = Topology::new();
        uplink.insert(child_key.into(), child);
        self.ports.entry(port.into()).or_default().uplink = Some(uplink);
        self
    }
}

/// One immutable "network place" document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// The device directory.
    #[serde(default)]
    pub devices: DeviceDirectory,

    /// The MAC→IP index.
    #[serde(default)]
    pub macs: MacIpIndex,

    /// The uplink graph.
    #[serde(default)]
    pub tree: Topology,
}

impl TopologySnapshot {
    /// Creates a snapshot from its three parts.
    pub fn new(devices: DeviceDirectory, macs: MacIpIndex, tree: Topology) -> Self {
        Self { devices, macs, tree }
    }

    /// Parses a snapshot document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the document is not valid.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a snapshot document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::Serialization`] if it is not a valid document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        log::debug!(
            "Loaded snapshot from {}: {} devices, {} roots",
            path.display(),
            snapshot.devices.len(),
            snapshot.tree.len()
        );
        Ok(snapshot)
    }

    /// Looks up a device by key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`] if the key is not in the directory.
    pub fn device(&self, key: &str) -> Result<&Device> {
        self.devices
            .get(key)
            .ok_or_else(|| Error::UnknownDevice(key.to_string()))
    }

    /// Root keys of the uplink graph, in document order.
    pub fn root_keys(&self) -> impl Iterator<Item = &str> {
        self.tree.keys().map(String::as_str)
    }

    /// Number of ports across all devices that have learned at least one MAC.
    pub fn active_port_count(&self) -> usize {
        self.devices
            .values()
            .flat_map(|d| d.ports.values())
            .filter(|p| p.mac_count() > 0)
            .count()
    }
}
