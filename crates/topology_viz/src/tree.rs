//! Construction of the nested topology view model.
//!
//! The builder walks the uplink graph from a root device and produces a
//! [`ViewNode`] per device and a [`BranchNode`] per port that has learned at
//! least one MAC address. A port that is an uplink in the graph carries the
//! downstream device's [`ViewNode`] as its nested child.
//!
//! Levels follow the renderer's layout: a device at level `d` draws its port
//! branches at `d` and the nested branch container at `d + 1`, so the nested
//! device sits at `d + 2`.
//!
//! # Examples
//!
//! ```
//! use topology_viz::snapshot::{Device, DeviceDirectory, Port, Topology, TopologyNode};
//! use topology_viz::tree;
//!
//! let mut devices = DeviceDirectory::new();
//! for key in ["SW1", "SW2"] {
//!     let mut port = Port { name: "p1".into(), ..Default::default() };
//!     port.macs.insert("aa:bb:cc:dd:ee:ff".into(), "1".into());
//!     let mut device = Device { host: key.into(), ..Default::default() };
//!     device.ports.insert("p1".into(), port);
//!     devices.insert(key.into(), device);
//! }
//!
//! let mut topology = Topology::new();
//! topology.insert("SW1".into(), TopologyNode::new().with_uplink("p1", "SW2", TopologyNode::new()));
//!
//! let root = tree::build("SW1", &topology, &devices, 1).unwrap();
//! assert_eq!(root.branches[0].label, "p1 (macs: 1)");
//! assert!(root.branches[0].is_sole);
//! assert_eq!(root.branches[0].nested.as_ref().unwrap().depth, 3);
//! ```

use crate::error::{Error, Result};
use crate::snapshot::{DeviceDirectory, Topology, TopologySnapshot};
use serde::{Deserialize, Serialize};

/// Level increment between a device and a device nested under one of its ports.
pub const NESTED_LEVEL_STEP: usize = 2;

/// Level of a root device.
pub const ROOT_LEVEL: usize = 1;

/// One device's rendered subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNode {
    /// Device key, used for detail lookups.
    pub key: String,
    /// Device host name.
    pub host: String,
    /// Host followed by the device info on the next line.
    pub label: String,
    /// Nesting level of this node.
    pub depth: usize,
    /// Port branches in the device's port order.
    pub branches: Vec<BranchNode>,
}

/// One port with learned MAC addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNode {
    /// Port key on the device.
    pub port_id: String,
    /// `"<name> (macs: <count>)"`.
    pub label: String,
    /// Number of learned MACs.
    pub mac_count: usize,
    /// The downstream device, if this port is an uplink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<ViewNode>>,
    /// Drawn as a straight line rather than a fork.
    #[serde(default)]
    pub is_sole: bool,
    /// Why the downstream subtree was dropped, when built with
    /// [`BuildOptions::prune_failed_subtrees`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ViewNode {
    /// Number of devices in this subtree, this one included.
    pub fn device_count(&self) -> usize {
        1 + self
            .branches
            .iter()
            .filter_map(|b| b.nested.as_deref())
            .map(ViewNode::device_count)
            .sum::<usize>()
    }

    /// Deepest device level in this subtree.
    pub fn max_depth(&self) -> usize {
        self.branches
            .iter()
            .filter_map(|b| b.nested.as_deref())
            .map(ViewNode::max_depth)
            .max()
            .unwrap_or(self.depth)
    }

    /// Finds the first node for `key` in depth-first order.
    pub fn find(&self, key: &str) -> Option<&ViewNode> {
        if self.key == key {
            return Some(self);
        }
        self.branches
            .iter()
            .filter_map(|b| b.nested.as_deref())
            .find_map(|n| n.find(key))
    }
}

/// Limits and failure policy for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Maximum number of devices on one root-to-leaf path.
    pub max_depth: usize,
    /// Keep a branch whose downstream build failed, without its subtree,
    /// instead of failing the whole build.
    pub prune_failed_subtrees: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            prune_failed_subtrees: false,
        }
    }
}

/// The outcome for one root of a forest built with
/// [`TreeBuilder::build_forest_lenient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForestEntry {
    /// The tree was built.
    Built {
        /// The root node.
        tree: ViewNode,
    },
    /// The tree could not be built.
    Failed {
        /// The root key.
        key: String,
        /// The error message.
        error: String,
    },
}

/// Builds [`ViewNode`] trees over one device directory.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    devices: &'a DeviceDirectory,
    options: BuildOptions,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder with default options.
    pub fn new(devices: &'a DeviceDirectory) -> Self {
        Self::with_options(devices, BuildOptions::default())
    }

    /// Creates a builder with the given options.
    ///
    /// A `max_depth` of 0 is raised to 1 so that a lone root still builds.
    pub fn with_options(devices: &'a DeviceDirectory, mut options: BuildOptions) -> Self {
        options.max_depth = options.max_depth.max(1);
        Self { devices, options }
    }

    /// Creates a builder over a snapshot's device directory.
    pub fn for_snapshot(snapshot: &'a TopologySnapshot, options: BuildOptions) -> Self {
        Self::with_options(&snapshot.devices, options)
    }

    /// Builds the tree rooted at `root_key`, which sits at level `depth`.
    ///
    /// `topology` may lack `root_key`; the device then simply has no uplinks.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownDevice`] if the root or an uplink target is not in
    ///   the device directory.
    /// - [`Error::MalformedTopology`] if an uplink entry does not name
    ///   exactly one device.
    /// - [`Error::CyclicTopology`] if a device reappears on its own path or
    ///   the path grows past [`BuildOptions::max_depth`].
    pub fn build(&self, root_key: &str, topology: &Topology, depth: usize) -> Result<ViewNode> {
        let mut path = Vec::new();
        let node = self.build_node(root_key, topology, depth, &mut path)?;
        log::debug!(
            "Built tree for {}: {} devices, deepest level {}",
            root_key,
            node.device_count(),
            node.max_depth()
        );
        Ok(node)
    }

    /// Builds one tree per root key of `topology`, in document order.
    ///
    /// # Errors
    ///
    /// Fails on the first root that fails to build; see [`TreeBuilder::build`].
    pub fn build_forest(&self, topology: &Topology) -> Result<Vec<ViewNode>> {
        topology
            .keys()
            .map(|key| self.build(key, topology, ROOT_LEVEL))
            .collect()
    }

    /// Builds one tree per root key, recording failures instead of aborting.
    pub fn build_forest_lenient(&self, topology: &Topology) -> Vec<ForestEntry> {
        topology
            .keys()
            .map(|key| match self.build(key, topology, ROOT_LEVEL) {
                Ok(tree) => ForestEntry::Built { tree },
                Err(e) => {
                    log::warn!("Failed to build tree for {}: {}", key, e);
                    ForestEntry::Failed {
                        key: key.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect()
    }

    fn build_node(
        &self,
        key: &str,
        topology: &Topology,
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<ViewNode> {
        if path.iter().any(|k| k == key) || path.len() >= self.options.max_depth {
            let mut path = path.clone();
            path.push(key.to_string());
            return Err(Error::CyclicTopology { path });
        }

        let device = self
            .devices
            .get(key)
            .ok_or_else(|| Error::UnknownDevice(key.to_string()))?;
        let links = topology.get(key);

        path.push(key.to_string());
        let mut branches = Vec::new();
        for (port_id, port) in &device.ports {
            if port.macs.is_empty() {
                continue;
            }

            let mut branch = BranchNode {
                port_id: port_id.clone(),
                label: format!("{} (macs: {})", port.name, port.mac_count()),
                mac_count: port.mac_count(),
                nested: None,
                is_sole: false,
                error: None,
            };

            if let Some(uplink) = links
                .and_then(|node| node.ports.get(port_id))
                .and_then(|p| p.uplink.as_ref())
            {
                match self.build_uplink(key, port_id, uplink, depth, path) {
                    Ok(nested) => branch.nested = Some(Box::new(nested)),
                    Err(e) if self.options.prune_failed_subtrees => {
                        log::warn!("Dropping subtree under {}/{}: {}", key, port_id, e);
                        branch.error = Some(e.to_string());
                    }
                    Err(e) => {
                        path.pop();
                        return Err(e);
                    }
                }
            }

            branches.push(branch);
        }
        path.pop();

        mark_sole_branch(&mut branches);

        Ok(ViewNode {
            key: key.to_string(),
            host: device.host.clone(),
            label: device_label(&device.host, &device.info),
            depth,
            branches,
        })
    }

    fn build_uplink(
        &self,
        key: &str,
        port_id: &str,
        uplink: &Topology,
        depth: usize,
        path: &mut Vec<String>,
    ) -> Result<ViewNode> {
        match uplink.first() {
            Some((child_key, _)) if uplink.len() == 1 => {
                let nested_depth = depth
                    .checked_add(NESTED_LEVEL_STEP)
                    .ok_or_else(|| Error::malformed(key, port_id, "nesting level overflows"))?;
                self.build_node(child_key, uplink, nested_depth, path)
            }
            Some(_) => Err(Error::malformed(
                key,
                port_id,
                format!("uplink names {} devices", uplink.len()),
            )),
            None => Err(Error::malformed(key, port_id, "uplink names no device")),
        }
    }
}

/// Builds the tree rooted at `root_key` with default [`BuildOptions`].
///
/// # Errors
///
/// See [`TreeBuilder::build`].
pub fn build(
    root_key: &str,
    topology: &Topology,
    devices: &DeviceDirectory,
    depth: usize,
) -> Result<ViewNode> {
    TreeBuilder::new(devices).build(root_key, topology, depth)
}

/// Flags the only branch of a node as sole when its nested device also has
/// exactly one branch.
pub fn mark_sole_branch(branches: &mut [BranchNode]) {
    if let [only] = branches {
        only.is_sole = only
            .nested
            .as_deref()
            .is_some_and(|nested| nested.branches.len() == 1);
    }
}

fn device_label(host: &str, info: &str) -> String {
    if info.is_empty() {
        host.to_string()
    } else {
        format!("{}\n{}", host, info)
    }
}
