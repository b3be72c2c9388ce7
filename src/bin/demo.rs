//! Plays a tone through the default output device.
//!
//! An oscillator feeds a math node scaling its output, which feeds the sink.
//! The tone glides up an octave over the run to exercise queued updates.

use std::thread;
use std::time::Duration;

use audionodes::prelude::*;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "audionodes-demo")]
#[command(version, about = "Play a tone through an audionodes graph", long_about = None)]
struct Args {
    /// Starting frequency in Hz
    #[arg(short, long, default_value_t = 220.0)]
    frequency: f32,

    /// Playback length in seconds
    #[arg(short, long, default_value_t = 3)]
    seconds: u64,

    /// Output gain applied by the math node
    #[arg(short, long, default_value_t = 0.2)]
    gain: f32,

    /// Waveform: 0 sine, 1 saw, 2 square, 3 triangle
    #[arg(short, long, default_value_t = 0)]
    waveform: i32,

    /// Samples per render block (power of two)
    #[arg(long, default_value_t = 512)]
    block_size: usize,

    /// Output device index (see --list-devices)
    #[arg(long)]
    device: Option<usize>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    if args.list_devices {
        for device in Engine::list_output_devices()? {
            println!("{device}");
        }
        return Ok(());
    }

    let mut builder = Engine::builder()
        .registry(default_registry())
        .block_size(args.block_size);
    if let Some(index) = args.device {
        builder = builder.output_device(index);
    }
    let engine = builder.build()?;

    let osc = engine.create_node("OscillatorNode")?;
    let gain = engine.create_node("MathNode")?;
    let sink = engine.create_node("SinkNode")?;

    engine.set_input_value(osc, OscillatorNode::FREQUENCY, args.frequency)?;
    engine.set_property_value(osc, OscillatorNode::WAVEFORM, args.waveform)?;
    engine.set_property_value(gain, MathNode::OPERATION, 2)?;
    engine.set_input_value(gain, 1, args.gain)?;

    let report = engine.update(|batch| {
        batch.add_link(osc, 0, gain, 0)?;
        batch.add_link(gain, 0, sink, 0)
    })?;
    tracing::info!(nodes = report.scheduled.len(), "graph installed");

    let steps = (args.seconds * 20).max(1);
    for step in 0..steps {
        let ratio = 2f32.powf(step as f32 / steps as f32);
        // Dropped glide steps are reported by the engine and harmless here.
        let _ = engine.set_input_value(osc, OscillatorNode::FREQUENCY, args.frequency * ratio);
        thread::sleep(Duration::from_millis(50));
    }

    let stats = engine.render_stats();
    tracing::info!(
        blocks = stats.blocks_rendered,
        silent = stats.silent_blocks,
        mismatches = stats.size_mismatches,
        stream_errors = stats.stream_errors,
        "render stats"
    );

    engine.shutdown();
    Ok(())
}
