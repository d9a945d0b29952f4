//! Error types for the topology visualization crate.

use thiserror::Error;

/// A specialized `Result` type for topology visualization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `topology_viz` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A device key (a root, or one reached through an uplink) is absent
    /// from the device directory.
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A topology entry does not have the expected shape.
    #[error("Malformed topology at {device}/{port}: {reason}")]
    MalformedTopology {
        /// The device whose topology entry is malformed.
        device: String,
        /// The port carrying the malformed uplink.
        port: String,
        /// What is wrong with the entry.
        reason: String,
    },

    /// The uplink relation loops back onto a device already on the path,
    /// or nests deeper than the configured limit.
    #[error("Cyclic topology: {}", path.join(" -> "))]
    CyclicTopology {
        /// The device keys from the root down to the offending device.
        path: Vec<String>,
    },

    /// No topology snapshot has been loaded yet.
    #[error("No topology snapshot loaded")]
    NoSnapshot,

    /// A search query is neither an IPv4 address nor a known MAC address.
    #[error("Unrecognized query: {0}")]
    UnrecognizedQuery(String),

    /// An error related to the web server (e.g., binding to a port).
    #[error("Server error: {0}")]
    Server(String),

    /// An error related to WebSocket communication.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error related to the server's configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds a [`Error::MalformedTopology`] for the given device and port.
    pub fn malformed(
        device: impl Into<String>,
        port: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedTopology {
            device: device.into(),
            port: port.into(),
            reason: reason.into(),
        }
    }
}
