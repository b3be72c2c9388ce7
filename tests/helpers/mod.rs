//! Test helpers and fixtures for audionodes integration tests
//!
//! Engines are headless: blocks are pulled through `Engine::renderer()` so
//! tests control every cycle and need no audio hardware.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (oscillators)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]


use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use audionodes::prelude::*;
use audionodes::NodeRegistryError;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Small block so tests stay fast and readable.
pub const TEST_BLOCK_SIZE: usize = 64;

/// Create a headless engine with every built-in node type registered.
pub fn test_engine() -> Engine {
    test_engine_with(EngineConfig {
        sample_rate: TEST_SAMPLE_RATE,
        block_size: TEST_BLOCK_SIZE,
        ..Default::default()
    })
}

/// Create a headless engine with a specific configuration.
pub fn test_engine_with(config: EngineConfig) -> Engine {
    Engine::builder()
        .config(config)
        .registry(default_registry())
        .headless()
        .build()
        .expect("Failed to create test engine")
}

/// Render one block as f32.
pub fn render_block(engine: &Engine) -> Vec<f32> {
    let mut block = vec![0.0f32; engine.block_size()];
    engine.renderer().render(&mut block);
    block
}

/// Render one block as device-format i16.
pub fn render_block_i16(engine: &Engine) -> Vec<i16> {
    let mut block = vec![0i16; engine.block_size()];
    engine.renderer().render(&mut block);
    block
}

/// Render `blocks` consecutive blocks into one buffer.
pub fn render_blocks(engine: &Engine, blocks: usize) -> Vec<f32> {
    (0..blocks).flat_map(|_| render_block(engine)).collect()
}

/// Encode samples as the little-endian f32 payload `CaptureNode` accepts.
pub fn pcm_payload(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

// =============================================================================
// Tap nodes
// =============================================================================

/// Observations shared between a tap node and its test.
#[derive(Default)]
pub struct TapCounters {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub processed: AtomicUsize,
    pub dropped: AtomicBool,
    /// Every scalar input value applied, in order.
    pub values: Mutex<Vec<f32>>,
}

impl TapCounters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn values(&self) -> Vec<f32> {
        self.values.lock().unwrap().clone()
    }
}

/// Shared evaluation log; each tap appends its label when processed.
pub type ProcessLog = Arc<Mutex<Vec<&'static str>>>;

/// Node that outputs the sum of its linked audio inputs plus a settable
/// constant, and records everything that happens to it.
pub struct TapNode {
    label: &'static str,
    inputs: Vec<SocketType>,
    sink: bool,
    value: f32,
    counters: Arc<TapCounters>,
    log: Option<ProcessLog>,
}

impl Node for TapNode {
    fn inputs(&self) -> &[SocketType] {
        &self.inputs
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn is_sink(&self) -> bool {
        self.sink
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        self.counters.processed.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.label);
        }
        let Some(out) = outputs.audio_mut(0) else {
            return;
        };
        out.fill(self.value);
        for socket in 0..self.inputs.len() {
            if let Some(input) = inputs.audio(socket) {
                for (o, i) in out.iter_mut().zip(input) {
                    *o += i;
                }
            }
        }
    }

    fn set_input_value(&mut self, _slot: usize, value: f32) {
        self.value = value;
        self.counters.values.lock().unwrap().push(value);
    }

    fn connect_callback(&mut self) {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn disconnect_callback(&mut self) {
        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for TapNode {
    fn drop(&mut self) {
        self.counters.dropped.store(true, Ordering::SeqCst);
    }
}

static NEXT_TAP: AtomicUsize = AtomicUsize::new(0);

/// Builder registering a one-off tap type and creating it on an engine.
pub struct Tap {
    label: &'static str,
    inputs: usize,
    sink: bool,
    value: f32,
    log: Option<ProcessLog>,
}

impl Tap {
    /// Tap with one unlinked input, outputting its settable constant.
    pub fn source(label: &'static str) -> Self {
        Self {
            label,
            inputs: 1,
            sink: false,
            value: 0.0,
            log: None,
        }
    }

    /// Sink tap with one input.
    pub fn sink(label: &'static str) -> Self {
        Self {
            sink: true,
            ..Self::source(label)
        }
    }

    pub fn inputs(mut self, count: usize) -> Self {
        self.inputs = count;
        self
    }

    pub fn value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    pub fn log(mut self, log: &ProcessLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn create(self, engine: &Engine) -> (NodeId, Arc<TapCounters>) {
        let counters = Arc::new(TapCounters::default());
        let type_name = format!("Tap{}", NEXT_TAP.fetch_add(1, Ordering::SeqCst));

        // The constructor runs once, so it can hand over its only node.
        let template = Mutex::new(Some(TapNode {
            label: self.label,
            inputs: vec![SocketType::Audio; self.inputs],
            sink: self.sink,
            value: self.value,
            counters: Arc::clone(&counters),
            log: self.log,
        }));
        engine.registry().register(type_name.clone(), move |_ctx| {
            template
                .lock()
                .unwrap()
                .take()
                .map(|node| Box::new(node) as Box<dyn Node>)
                .ok_or_else(|| NodeRegistryError::ConstructionFailed("tap already built".into()))
        });

        let id = engine
            .create_node(&type_name)
            .expect("Failed to create tap");
        engine.registry().unregister(&type_name);
        (id, counters)
    }
}

pub fn process_log() -> ProcessLog {
    Arc::new(Mutex::new(Vec::new()))
}
