//! Built-in node types: output sink, oscillator, arithmetic, MIDI input,
//! pitch bend and captured-audio playback.

use audionodes_core::NodeRegistry;

mod capture;
pub use capture::CaptureNode;

mod math;
pub use math::{MathNode, MathOperation};

mod midi_input;
pub use midi_input::MidiInputNode;

mod oscillator;
pub use oscillator::{OscillatorNode, Waveform};

mod pitch_bend;
pub use pitch_bend::PitchBendNode;

mod sink;
pub use sink::SinkNode;

/// Register every built-in node type under its type name.
pub fn register_builtin_nodes(registry: &NodeRegistry) {
    registry.register("SinkNode", |_ctx| Ok(Box::new(SinkNode::new())));
    registry.register("OscillatorNode", |ctx| Ok(Box::new(OscillatorNode::new(ctx))));
    registry.register("MathNode", |_ctx| Ok(Box::new(MathNode::new())));
    registry.register("PitchBendNode", |_ctx| Ok(Box::new(PitchBendNode::new())));
    registry.register("MidiInputNode", |_ctx| Ok(Box::new(MidiInputNode::new())));
    registry.register("CaptureNode", |ctx| Ok(Box::new(CaptureNode::new(ctx))));
}

/// Value of a signal-or-scalar input at sample `j`.
#[inline]
fn sample_or(signal: Option<&[f32]>, scalar: f32, j: usize) -> f32 {
    signal.map_or(scalar, |s| s[j])
}
