//! Sample-wise arithmetic on two signals.

use audionodes_core::{Node, NodeInputs, NodeOutputs, SocketType};

use crate::sample_or;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Power,
}

impl MathOperation {
    pub fn from_property(value: i32) -> Self {
        match value {
            1 => MathOperation::Subtract,
            2 => MathOperation::Multiply,
            3 => MathOperation::Divide,
            4 => MathOperation::Min,
            5 => MathOperation::Max,
            6 => MathOperation::Power,
            _ => MathOperation::Add,
        }
    }

    /// Division by zero and non-finite powers yield zero.
    #[inline]
    pub fn apply(&self, a: f32, b: f32) -> f32 {
        match self {
            MathOperation::Add => a + b,
            MathOperation::Subtract => a - b,
            MathOperation::Multiply => a * b,
            MathOperation::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            MathOperation::Min => a.min(b),
            MathOperation::Max => a.max(b),
            MathOperation::Power => {
                let r = a.powf(b);
                if r.is_finite() {
                    r
                } else {
                    0.0
                }
            }
        }
    }
}

/// Inputs: a, b (scalar defaults 0). Property 0: operation.
#[derive(Debug, Default)]
pub struct MathNode {
    a: f32,
    b: f32,
    operation: MathOperation,
}

impl MathNode {
    pub const OPERATION: usize = 0;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Node for MathNode {
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
        let a = inputs.audio(0);
        let b = inputs.audio(1);
        let Some(output) = outputs.audio_mut(0) else {
            return;
        };

        for (j, out) in output.iter_mut().enumerate() {
            *out = self
                .operation
                .apply(sample_or(a, self.a, j), sample_or(b, self.b, j));
        }
    }

    fn set_input_value(&mut self, slot: usize, value: f32) {
        match slot {
            0 => self.a = value,
            1 => self.b = value,
            _ => {}
        }
    }

    fn set_property_value(&mut self, slot: usize, value: i32) {
        if slot == Self::OPERATION {
            self.operation = MathOperation::from_property(value);
        }
    }
}
