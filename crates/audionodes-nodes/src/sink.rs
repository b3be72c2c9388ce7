//! Output sink.

use audionodes_core::{Node, NodeInputs, NodeOutputs, SocketType};

/// Forwards its audio input to the engine's output mix.
#[derive(Debug, Default)]
pub struct SinkNode;

impl SinkNode {
    pub fn new() -> Self {
        Self
    }
}

impl Node for SinkNode {
    fn inputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn is_sink(&self) -> bool {
        true
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        // Unlinked input leaves the zeroed output as silence.
        if let (Some(input), Some(output)) = (inputs.audio(0), outputs.audio_mut(0)) {
            output.copy_from_slice(input);
        }
    }

    fn set_input_value(&mut self, _slot: usize, _value: f32) {}
}
