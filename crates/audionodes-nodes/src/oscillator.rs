//! Basic waveform oscillator.

use audionodes_core::{Node, NodeContext, NodeInputs, NodeOutputs, SocketType};

use crate::sample_or;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    /// Property values outside the known range fall back to sine.
    pub fn from_property(value: i32) -> Self {
        match value {
            1 => Waveform::Saw,
            2 => Waveform::Square,
            3 => Waveform::Triangle,
            _ => Waveform::Sine,
        }
    }

    /// Evaluate at `phase` in [0, 1).
    #[inline]
    pub fn evaluate(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Saw => phase * 2.0 - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                let p = phase * 4.0;
                if p < 1.0 {
                    p
                } else if p < 3.0 {
                    2.0 - p
                } else {
                    p - 4.0
                }
            }
        }
    }
}

/// Inputs: frequency (Hz), amplitude. Property 0: waveform.
pub struct OscillatorNode {
    frequency: f32,
    amplitude: f32,
    waveform: Waveform,
    phase: f32,
    sample_rate: f32,
}

impl OscillatorNode {
    pub const FREQUENCY: usize = 0;
    pub const AMPLITUDE: usize = 1;
    pub const WAVEFORM: usize = 0;

    pub fn new(ctx: &NodeContext) -> Self {
        Self {
            frequency: 440.0,
            amplitude: 1.0,
            waveform: Waveform::Sine,
            phase: 0.0,
            sample_rate: ctx.sample_rate as f32,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }
}

impl Node for OscillatorNode {
    fn inputs(&self) -> &[SocketType] {
        &[SocketType::Audio, SocketType::Audio]
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn property_count(&self) -> usize {
        1
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        let frequency = inputs.audio(Self::FREQUENCY);
        let amplitude = inputs.audio(Self::AMPLITUDE);
        let Some(output) = outputs.audio_mut(0) else {
            return;
        };

        for (j, out) in output.iter_mut().enumerate() {
            *out = self.waveform.evaluate(self.phase) * sample_or(amplitude, self.amplitude, j);
            let step = sample_or(frequency, self.frequency, j) / self.sample_rate;
            self.phase = (self.phase + step).rem_euclid(1.0);
        }
    }

    fn set_input_value(&mut self, slot: usize, value: f32) {
        match slot {
            Self::FREQUENCY => self.frequency = value,
            Self::AMPLITUDE => self.amplitude = value,
            _ => {}
        }
    }

    fn set_property_value(&mut self, slot: usize, value: i32) {
        if slot == Self::WAVEFORM {
            self.waveform = Waveform::from_property(value);
        }
    }
}
