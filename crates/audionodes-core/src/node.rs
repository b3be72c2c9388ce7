//! The capability contract every signal-processing node implements.
//!
//! Nodes are owned by the engine's node table and evaluated by the render
//! thread once per block. Parameter setters are only ever called by whichever
//! thread owns evaluation at that moment: the control thread while the node is
//! disconnected, the render thread (after draining the message queue) once it
//! is connected. The engine validates node and slot existence before calling
//! any setter, so implementations do not need to bounds-check slots.

use crate::builder::ResolvedLink;
use crate::signal::{Event, SignalBuffer, SocketType};

/// Construction parameters handed to node factories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeContext {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for NodeContext {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
        }
    }
}

/// Unified interface for all node types.
pub trait Node: Send {
    /// Input socket types, in socket order.
    fn inputs(&self) -> &[SocketType];

    /// Output socket types, in socket order.
    fn outputs(&self) -> &[SocketType];

    fn input_count(&self) -> usize {
        self.inputs().len()
    }

    fn output_count(&self) -> usize {
        self.outputs().len()
    }

    /// Number of integer property slots.
    fn property_count(&self) -> usize {
        0
    }

    /// Number of slots accepting binary payloads.
    fn binary_slot_count(&self) -> usize {
        0
    }

    /// Sinks are the roots of reachability analysis. Static per node type.
    fn is_sink(&self) -> bool {
        false
    }

    /// Compute one block.
    ///
    /// Every audio output holds exactly `inputs.block_size()` samples and is
    /// zeroed before the call; event outputs start empty.
    fn process(&mut self, inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>);

    /// Scalar used for input socket `slot` while nothing is linked to it.
    fn set_input_value(&mut self, slot: usize, value: f32);

    fn set_property_value(&mut self, _slot: usize, _value: i32) {}

    /// Takes ownership of `payload`.
    fn receive_binary(&mut self, _slot: usize, _payload: Vec<u8>) {}

    /// Adopt externally-set values from another node. Internal processing
    /// state is never copied.
    fn copy_input_values(&mut self, other: &InputValues) {
        for (slot, value) in other.inputs() {
            if slot < self.input_count() {
                self.set_input_value(slot, value);
            }
        }
        for (slot, value) in other.properties() {
            if slot < self.property_count() {
                self.set_property_value(slot, value);
            }
        }
    }

    /// The node became reachable from a sink.
    fn connect_callback(&mut self) {}

    /// The node stopped being reachable from a sink.
    fn disconnect_callback(&mut self) {}
}

/// Static shape of a node, captured once at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLayout {
    pub inputs: Vec<SocketType>,
    pub outputs: Vec<SocketType>,
    pub properties: usize,
    pub binary_slots: usize,
    pub is_sink: bool,
}

impl NodeLayout {
    pub fn of(node: &dyn Node) -> Self {
        Self {
            inputs: node.inputs().to_vec(),
            outputs: node.outputs().to_vec(),
            properties: node.property_count(),
            binary_slots: node.binary_slot_count(),
            is_sink: node.is_sink(),
        }
    }
}

/// Externally-set scalar inputs and properties of a node.
///
/// The control thread keeps one of these per node so duplicating a node
/// never has to read state the render thread may be using.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputValues {
    inputs: Vec<Option<f32>>,
    properties: Vec<Option<i32>>,
}

impl InputValues {
    pub fn new(layout: &NodeLayout) -> Self {
        Self {
            inputs: vec![None; layout.inputs.len()],
            properties: vec![None; layout.properties],
        }
    }

    pub fn record_input(&mut self, slot: usize, value: f32) {
        if let Some(entry) = self.inputs.get_mut(slot) {
            *entry = Some(value);
        }
    }

    pub fn record_property(&mut self, slot: usize, value: i32) {
        if let Some(entry) = self.properties.get_mut(slot) {
            *entry = Some(value);
        }
    }

    pub fn input(&self, slot: usize) -> Option<f32> {
        self.inputs.get(slot).copied().flatten()
    }

    pub fn property(&self, slot: usize) -> Option<i32> {
        self.properties.get(slot).copied().flatten()
    }

    /// Slots that have been set, with their values.
    pub fn inputs(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.map(|v| (slot, v)))
    }

    pub fn properties(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.properties
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.map(|v| (slot, v)))
    }
}

/// Read-only view of a node's inputs for one block.
pub struct NodeInputs<'a> {
    links: &'a [ResolvedLink],
    produced: &'a [Vec<SignalBuffer>],
    block_size: usize,
}

impl<'a> NodeInputs<'a> {
    pub(crate) fn new(
        links: &'a [ResolvedLink],
        produced: &'a [Vec<SignalBuffer>],
        block_size: usize,
    ) -> Self {
        Self {
            links,
            produced,
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn is_linked(&self, socket: usize) -> bool {
        self.links.get(socket).is_some_and(ResolvedLink::is_present)
    }

    fn source(&self, socket: usize) -> Option<&'a SignalBuffer> {
        match *self.links.get(socket)? {
            ResolvedLink::Present {
                source_position,
                source_socket,
            } => self.produced.get(source_position)?.get(source_socket),
            ResolvedLink::Absent => None,
        }
    }

    /// Samples feeding `socket`, or `None` when nothing is linked.
    #[inline]
    pub fn audio(&self, socket: usize) -> Option<&'a [f32]> {
        self.source(socket).and_then(SignalBuffer::as_audio)
    }

    /// Events feeding `socket`; empty when nothing is linked.
    #[inline]
    pub fn events(&self, socket: usize) -> &'a [Event] {
        self.source(socket)
            .and_then(SignalBuffer::as_events)
            .unwrap_or(&[])
    }
}

/// Writable view of a node's outputs for one block.
pub struct NodeOutputs<'a> {
    buffers: &'a mut [SignalBuffer],
}

impl<'a> NodeOutputs<'a> {
    pub(crate) fn new(buffers: &'a mut [SignalBuffer]) -> Self {
        Self { buffers }
    }

    #[inline]
    pub fn audio_mut(&mut self, socket: usize) -> Option<&mut [f32]> {
        match self.buffers.get_mut(socket)? {
            SignalBuffer::Audio(samples) => Some(samples),
            SignalBuffer::Events(_) => None,
        }
    }

    #[inline]
    pub fn events_mut(&mut self, socket: usize) -> Option<&mut Vec<Event>> {
        match self.buffers.get_mut(socket)? {
            SignalBuffer::Events(events) => Some(events),
            SignalBuffer::Audio(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
