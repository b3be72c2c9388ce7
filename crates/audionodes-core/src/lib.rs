//! Real-time node graph engine.
//!
//! A control thread creates nodes, sets their parameters and wires them into
//! a graph; a render thread evaluates the installed graph one fixed-size
//! block at a time without ever blocking on the control side.
//!
//! # Primary API
//!
//! - [`Engine`] / [`EngineBuilder`]: main entry point
//! - [`GraphUpdate`]: batch of links installed by [`GraphUpdate::finish`]
//! - [`Node`]: capability contract for node types
//! - [`NodeRegistry`]: constructors keyed by type name
//! - [`Renderer`]: render-thread handle, driven by the device or by hand
//!
//! # Feature-gated APIs
//!
//! - `"device"`: CPAL audio output (enabled by default)
//!
//! # Example
//!
//! ```ignore
//! use audionodes_core::prelude::*;
//!
//! let engine = Engine::builder().registry(registry).build()?;
//! let osc = engine.create_node("OscillatorNode")?;
//! let sink = engine.create_node("SinkNode")?;
//!
//! let mut batch = engine.begin_update();
//! batch.add_link(osc, 0, sink, 0)?;
//! batch.finish()?;
//! ```

pub mod compat;

pub mod error;
pub use error::{Error, NodeRegistryError, Result, SlotKind};

mod config;
pub use config::EngineConfig;

pub mod signal;
pub use signal::{Event, EventData, SignalBuffer, SocketType, EVENT_CAPACITY};

mod node;
pub use node::{InputValues, Node, NodeContext, NodeInputs, NodeLayout, NodeOutputs};

mod table;
pub use table::{NodeId, NodeSlot};

pub mod registry;
pub use registry::{NodeConstructor, NodeRegistry};

pub mod builder;
pub use builder::{build_schedule, ConstructionLink, NodeDescriptor, ResolvedLink, Schedule};

mod graph;
pub use graph::ExecutableGraph;

mod message;
pub use message::{Delivery, MessageKind};

mod swap;

mod stats;
pub use stats::{RenderStats, RenderStatsSnapshot};

mod callback;
pub use callback::{to_i16, RenderSample, Renderer};

mod update;
pub use update::{BuildReport, GraphUpdate};

mod system;
pub use system::{Engine, EngineBuilder, NodeState};

#[cfg(feature = "device")]
mod output;
#[cfg(feature = "device")]
pub use output::AudioOutput;

/// Common imports.
pub mod prelude {
    pub use crate::{
        BuildReport, Delivery, Engine, EngineBuilder, EngineConfig, Event, EventData, GraphUpdate,
        Node, NodeContext, NodeId, NodeInputs, NodeOutputs, NodeRegistry, Renderer, SocketType,
    };
}
