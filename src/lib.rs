//! # audionodes - Real-time Synthesis Engine
//!
//! A node graph rebuilt on demand by a control thread while a real-time
//! thread renders fixed-size blocks from whichever graph is installed.
//!
//! ## Architecture
//!
//! audionodes is an umbrella crate that coordinates:
//! - **audionodes-core** - Engine, graph builder, render driver, message queue, device output
//! - **audionodes-nodes** - Built-in node types (sink, oscillator, math, MIDI, capture)
//!
//! ## Quick Start
//!
//! ```ignore
//! use audionodes::prelude::*;
//!
//! let engine = Engine::builder()
//!     .registry(audionodes::default_registry())
//!     .build()?;
//!
//! let osc = engine.create_node("OscillatorNode")?;
//! let sink = engine.create_node("SinkNode")?;
//! engine.set_input_value(osc, OscillatorNode::FREQUENCY, 220.0)?;
//!
//! engine.update(|batch| batch.add_link(osc, 0, sink, 0))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `device` (default) - CPAL audio output

/// Re-export of audionodes-core for direct access
pub use audionodes_core as core;

/// Re-export of audionodes-nodes for direct access
pub use audionodes_nodes as nodes;

pub use audionodes_core::{
    // Engine
    BuildReport,
    Delivery,
    Engine,
    EngineBuilder,
    EngineConfig,
    GraphUpdate,
    NodeState,

    // Error
    Error,
    NodeRegistryError,
    Result,

    // Nodes
    Event,
    EventData,
    Node,
    NodeContext,
    NodeId,
    NodeInputs,
    NodeOutputs,
    NodeRegistry,
    SocketType,

    // Render
    RenderStatsSnapshot,
    Renderer,
};

pub use audionodes_nodes::{
    register_builtin_nodes, CaptureNode, MathNode, MathOperation, MidiInputNode, OscillatorNode,
    PitchBendNode, SinkNode, Waveform,
};

/// Registry with every built-in node type.
pub fn default_registry() -> NodeRegistry {
    let registry = NodeRegistry::new();
    register_builtin_nodes(&registry);
    registry
}

/// Prelude module for convenient imports.
///
/// ```ignore
/// use audionodes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::default_registry;
    pub use crate::nodes::{
        CaptureNode, MathNode, MathOperation, MidiInputNode, OscillatorNode, PitchBendNode,
        SinkNode, Waveform,
    };
    pub use crate::{Error, Result};
}
