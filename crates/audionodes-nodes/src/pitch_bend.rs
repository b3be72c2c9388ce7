//! MIDI pitch bend to control signal.

use audionodes_core::{Node, NodeInputs, NodeOutputs, SocketType};

/// Center of the 14-bit pitch bend range.
const BEND_CENTER: f32 = 8192.0;

/// Turns the last pitch bend message of each block into a signal in
/// [-1, 1), ramped linearly from the previous block's value.
#[derive(Debug, Default)]
pub struct PitchBendNode {
    bend: f32,
}

impl PitchBendNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bend(&self) -> f32 {
        self.bend
    }
}

impl Node for PitchBendNode {
    fn inputs(&self) -> &[SocketType] {
        &[SocketType::Midi]
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        let target = inputs
            .events(0)
            .iter()
            .filter_map(|event| event.pitch_bend())
            .last()
            .map_or(self.bend, |value| (value as f32 - BEND_CENTER) / BEND_CENTER);

        if let Some(output) = outputs.audio_mut(0) {
            let n = output.len() as f32;
            for (j, out) in output.iter_mut().enumerate() {
                let j = j as f32;
                *out = (self.bend * (n - j) + target * j) / n;
            }
        }
        self.bend = target;
    }

    fn set_input_value(&mut self, _slot: usize, _value: f32) {}
}
