//! Built-in node tests
//!
//! Oscillator, math, MIDI and pitch bend nodes evaluated inside a running
//! graph.

use crate::helpers::tolerances::{DSP_EPSILON, PERCEPTUAL_EPSILON};
use crate::helpers::*;
use approx::assert_relative_eq;
use audionodes::prelude::*;

fn osc_to_sink(engine: &Engine) -> NodeId {
    let osc = engine.create_node("OscillatorNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine.update(|batch| batch.add_link(osc, 0, sink, 0)).unwrap();
    osc
}

/// Full-scale sine has RMS 1/sqrt(2).
#[test]
fn test_oscillator_rms() {
    let engine = test_engine();
    osc_to_sink(&engine);

    let output = render_blocks(&engine, 64);

    assert_has_audio(&output, 0.5);
    assert_relative_eq!(rms(&output), std::f32::consts::FRAC_1_SQRT_2, epsilon = 0.01);
    assert!(peak(&output) <= 1.0);
}

/// Amplitude set while connected takes effect from the next block.
#[test]
fn test_oscillator_amplitude_update() {
    let engine = test_engine();
    let osc = osc_to_sink(&engine);
    render_blocks(&engine, 2);

    engine
        .set_input_value(osc, OscillatorNode::AMPLITUDE, 0.5)
        .unwrap();
    let output = render_blocks(&engine, 16);

    assert_relative_eq!(peak(&output), 0.5, epsilon = PERCEPTUAL_EPSILON);
}

/// Square waveform only takes the two extreme values.
#[test]
fn test_oscillator_square() {
    let engine = test_engine();
    let osc = engine.create_node("OscillatorNode").unwrap();
    engine
        .set_property_value(osc, OscillatorNode::WAVEFORM, 2)
        .unwrap();
    engine
        .set_input_value(osc, OscillatorNode::AMPLITUDE, 0.25)
        .unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine.update(|batch| batch.add_link(osc, 0, sink, 0)).unwrap();

    let output = render_blocks(&engine, 8);
    assert!(output
        .iter()
        .all(|&s| (s.abs() - 0.25).abs() < DSP_EPSILON));
}

/// Oscillator scaled by a math node.
#[test]
fn test_math_multiply_chain() {
    let engine = test_engine();
    let osc = engine.create_node("OscillatorNode").unwrap();
    let gain = engine.create_node("MathNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine
        .set_property_value(gain, MathNode::OPERATION, 2)
        .unwrap();
    engine.set_input_value(gain, 1, 0.5).unwrap();

    engine
        .update(|batch| {
            batch.add_link(osc, 0, gain, 0)?;
            batch.add_link(gain, 0, sink, 0)
        })
        .unwrap();
    assert_eq!(engine.evaluation_order(), vec![osc, gain, sink]);

    let output = render_blocks(&engine, 32);
    assert_relative_eq!(peak(&output), 0.5, epsilon = PERCEPTUAL_EPSILON);
    assert_relative_eq!(
        rms(&output),
        0.5 * std::f32::consts::FRAC_1_SQRT_2,
        epsilon = 0.01
    );
}

/// Two unlinked scalars combined.
#[test]
fn test_math_constant_inputs() {
    let engine = test_engine();
    let math = engine.create_node("MathNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine.set_input_value(math, 0, 0.75).unwrap();
    engine.set_input_value(math, 1, 0.25).unwrap();
    engine
        .set_property_value(math, MathNode::OPERATION, 1)
        .unwrap();
    engine.update(|batch| batch.add_link(math, 0, sink, 0)).unwrap();

    let block = render_block(&engine);
    assert!(block.iter().all(|&s| (s - 0.5).abs() < DSP_EPSILON));
}

/// Pitch bend ramps from the previous value over one block, then holds.
#[test]
fn test_pitch_bend_ramp() {
    let engine = test_engine();
    let midi = engine.create_node("MidiInputNode").unwrap();
    let bend = engine.create_node("PitchBendNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine
        .update(|batch| {
            batch.add_link(midi, 0, bend, 0)?;
            batch.add_link(bend, 0, sink, 0)
        })
        .unwrap();

    // Value 0x3000: halfway up from center.
    engine.send_binary(midi, 0, vec![0xE0, 0x00, 0x60]).unwrap();

    let ramp = render_block(&engine);
    let n = TEST_BLOCK_SIZE as f32;
    for (j, &sample) in ramp.iter().enumerate() {
        assert_relative_eq!(sample, 0.5 * j as f32 / n, epsilon = 1e-6);
    }

    let held = render_block(&engine);
    assert!(held.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

/// Only the last bend in a block counts; running status is honored.
#[test]
fn test_pitch_bend_last_message_wins() {
    let engine = test_engine();
    let midi = engine.create_node("MidiInputNode").unwrap();
    let bend = engine.create_node("PitchBendNode").unwrap();
    let sink = engine.create_node("SinkNode").unwrap();
    engine
        .update(|batch| {
            batch.add_link(midi, 0, bend, 0)?;
            batch.add_link(bend, 0, sink, 0)
        })
        .unwrap();

    // Full down, then center via running status.
    engine
        .send_binary(midi, 0, vec![0xE0, 0x00, 0x00, 0x00, 0x40])
        .unwrap();
    render_block(&engine);

    let held = render_block(&engine);
    assert!(held.iter().all(|&s| s.abs() < 1e-6));
}
