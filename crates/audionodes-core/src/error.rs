//! Error types for audionodes-core.

use crate::table::NodeId;
use thiserror::Error;

/// Which kind of slot a request addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Input,
    Property,
    Binary,
    InputSocket,
    OutputSocket,
}

/// Error type for audionodes-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Registry(#[from] NodeRegistryError),

    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Node {0} is marked for deletion")]
    NodeMarkedForDeletion(NodeId),

    #[error("Invalid {kind:?} slot {slot} on node {node}")]
    InvalidSlot {
        node: NodeId,
        kind: SlotKind,
        slot: usize,
    },

    #[error("Socket type mismatch: {from}.out{from_socket} cannot feed {to}.in{to_socket}")]
    SocketTypeMismatch {
        from: NodeId,
        from_socket: usize,
        to: NodeId,
        to_socket: usize,
    },

    #[error("Cycle detected: scheduled {scheduled} of {required} nodes reachable from sinks")]
    CycleDetected { scheduled: usize, required: usize },

    #[error("Message queue full, update for node {node} dropped after {attempts} attempts")]
    QueueFull { node: NodeId, attempts: u32 },

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[cfg(feature = "device")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "device")]
    #[error("Failed to query supported stream configs")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "device")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "device")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "device")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "device")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),

    #[cfg(feature = "device")]
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Block size correction failed: requested {requested}, device provides {obtained}")]
    HalvingCorrectionFailed { requested: usize, obtained: usize },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors from node registry operations.
#[derive(Error, Debug)]
pub enum NodeRegistryError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Construction failed: {0}")]
    ConstructionFailed(String),
}
