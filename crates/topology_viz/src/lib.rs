//! # Topology Viz - Network Place Explorer
//!
//! Turns a discovered network topology (devices, their ports, the MAC
//! addresses learned on each port and the uplinks between devices) into a
//! nested tree view, and serves it over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  snapshot JSON  {devices, macs, tree}                        │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  TopologySnapshot ──► TreeBuilder ──► ViewNode forest        │
//! │        │                                  │                  │
//! │        ├──► device_detail                 ├──► render_html   │
//! │        └──► search                        └──► render_text   │
//! │                                                              │
//! │  ApiState (current snapshot, last write wins)                │
//! │        └──► axum router  /api/*  /ws/updates  /              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Building a tree
//!
//! ```
//! use topology_viz::{tree, TopologySnapshot};
//!
//! let snapshot = TopologySnapshot::from_json(r#"{
//!     "devices": {
//!         "SW1": { "host": "SW1", "ports": {
//!             "1": { "name": "p1", "macs": { "02:00:00:00:00:01": "1" } },
//!             "2": { "name": "p2", "macs": {} }
//!         } }
//!     },
//!     "tree": {}
//! }"#).unwrap();
//!
//! let root = tree::build("SW1", &snapshot.tree, &snapshot.devices, 1).unwrap();
//! assert_eq!(root.branches.len(), 1);
//! assert_eq!(root.branches[0].label, "p1 (macs: 1)");
//! ```

/// HTTP and WebSocket endpoints and the shared [`ApiState`].
pub mod api;

/// Per-device detail lookup.
pub mod detail;

/// Error types and result aliases.
pub mod error;

/// Snapshot-replaced notifications for WebSocket clients.
pub mod events;

/// HTML and text rendering of view trees.
pub mod render;

/// MAC/IP search.
pub mod search;

/// Server configuration and startup.
pub mod server;

/// The input document model.
pub mod snapshot;

/// The tree builder and its view model.
pub mod tree;

pub use api::ApiState;
pub use detail::{device_detail, DeviceDetail};
pub use error::{Error, Result};
pub use events::{EventBroadcaster, TopologyEvent};
pub use search::{search, SearchHit};
pub use server::{ServerConfig, TopologyServer};
pub use snapshot::{Device, Port, Topology, TopologyNode, TopologySnapshot};
pub use tree::{BranchNode, BuildOptions, TreeBuilder, ViewNode};

/// Version information from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
