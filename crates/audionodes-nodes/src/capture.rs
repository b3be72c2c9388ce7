//! Playback of externally captured audio.

use audionodes_core::{Node, NodeContext, NodeInputs, NodeOutputs, SocketType};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Blocks of audio the ring can hold before new samples are dropped.
const RING_BLOCKS: usize = 32;

/// Plays back mono f32 little-endian PCM pushed on binary slot 0.
///
/// Each block takes the oldest buffered samples; an underrun is filled with
/// silence. Connecting the node discards anything buffered while it was
/// idle, so playback starts from fresh input.
pub struct CaptureNode {
    producer: HeapProd<f32>,
    consumer: HeapCons<f32>,
    dropped: u64,
}

impl CaptureNode {
    pub fn new(ctx: &NodeContext) -> Self {
        let ring = HeapRb::<f32>::new(ctx.block_size.max(1) * RING_BLOCKS);
        let (producer, consumer) = ring.split();
        Self {
            producer,
            consumer,
            dropped: 0,
        }
    }

    /// Samples waiting to be played.
    pub fn buffered(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Samples lost because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Node for CaptureNode {
    fn inputs(&self) -> &[SocketType] {
        &[]
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Audio]
    }

    fn binary_slot_count(&self) -> usize {
        1
    }

    fn process(&mut self, _inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        if let Some(output) = outputs.audio_mut(0) {
            // Unread tail stays zeroed.
            self.consumer.pop_slice(output);
        }
    }

    fn set_input_value(&mut self, _slot: usize, _value: f32) {}

    fn receive_binary(&mut self, _slot: usize, payload: Vec<u8>) {
        for chunk in payload.chunks_exact(4) {
            let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if self.producer.try_push(sample).is_err() {
                self.dropped += 1;
            }
        }
    }

    fn connect_callback(&mut self) {
        self.consumer.clear();
    }
}
