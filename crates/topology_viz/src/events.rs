//! Real-time notifications for WebSocket clients.
//!
//! Every time the server's snapshot is replaced, an [`EventBroadcaster`]
//! fans a [`TopologyEvent::SnapshotReplaced`] out to all connected clients so
//! they can refetch the tree. The fan-out uses a Tokio `broadcast` channel;
//! a receiver that falls more than [`EVENT_BUFFER_SIZE`] events behind
//! misses the oldest ones.
//!
//! # Examples
//!
//! ```
//! use topology_viz::{EventBroadcaster, TopologyEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let broadcaster = EventBroadcaster::new();
//!     let mut receiver = broadcaster.subscribe();
//!
//!     broadcaster.broadcast(TopologyEvent::ping()).await;
//!
//!     let event = receiver.recv().await.unwrap();
//!     assert!(matches!(event, TopologyEvent::Ping { .. }));
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// The maximum number of events to buffer in the broadcast channel.
pub const EVENT_BUFFER_SIZE: usize = 256;

/// Events sent to visualization clients, tagged by `type` in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopologyEvent {
    /// A new snapshot replaced the previous one.
    SnapshotReplaced {
        /// Monotonic snapshot generation, starting at 1.
        generation: u64,
        /// Number of devices in the new snapshot.
        devices: usize,
        /// Root keys of the new uplink graph.
        roots: Vec<String>,
    },

    /// A client connected.
    Connected {
        /// The client's id.
        client_id: String,
    },

    /// Keep-alive.
    Ping {
        /// Unix timestamp in milliseconds.
        timestamp: i64,
    },

    /// The new snapshot was stored but its forest does not build.
    Error {
        /// Description of the error.
        message: String,
    },
}

impl TopologyEvent {
    /// Creates a `SnapshotReplaced` event.
    pub fn snapshot_replaced(generation: u64, devices: usize, roots: Vec<String>) -> Self {
        TopologyEvent::SnapshotReplaced {
            generation,
            devices,
            roots,
        }
    }

    /// Creates a `Ping` event with the current timestamp.
    pub fn ping() -> Self {
        TopologyEvent::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Creates an `Error` event.
    pub fn error(message: impl Into<String>) -> Self {
        TopologyEvent::Error {
            message: message.into(),
        }
    }

    /// Serializes the event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Fans [`TopologyEvent`]s out to connected clients and tracks who is
/// connected.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<TopologyEvent>,
    clients: Arc<RwLock<HashSet<String>>>,
    event_count: Arc<RwLock<u64>>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with no clients.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            sender,
            clients: Arc::new(RwLock::new(HashSet::new())),
            event_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<TopologyEvent> {
        self.sender.subscribe()
    }

    /// Sends `event` to every subscriber and returns how many received it.
    pub async fn broadcast(&self, event: TopologyEvent) -> usize {
        {
            let mut count = self.event_count.write().await;
            *count += 1;
        }
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    /// Adds a client and announces it.
    pub async fn register_client(&self, client_id: String) {
        self.clients.write().await.insert(client_id.clone());
        let _ = self.broadcast(TopologyEvent::Connected { client_id }).await;
    }

    /// Removes a client.
    pub async fn unregister_client(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Total number of events broadcast so far.
    pub async fn event_count(&self) -> u64 {
        *self.event_count.read().await
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
