//! Raw MIDI bytes to MIDI events.

use audionodes_core::{Event, Node, NodeInputs, NodeOutputs, SocketType, EVENT_CAPACITY};

/// Parses MIDI byte streams delivered on binary slot 0 and emits them at the
/// start of the next block.
///
/// Running status is honored and a message may span payloads. Real-time
/// bytes may appear anywhere, even between data bytes, and are skipped.
/// Other system messages and stray data bytes are skipped too. Events beyond
/// [`EVENT_CAPACITY`] per block are dropped.
#[derive(Debug)]
pub struct MidiInputNode {
    pending: Vec<Event>,
    running_status: Option<u8>,
    data: [u8; 2],
    data_len: usize,
}

impl Default for MidiInputNode {
    fn default() -> Self {
        Self {
            pending: Vec::with_capacity(EVENT_CAPACITY),
            running_status: None,
            data: [0; 2],
            data_len: 0,
        }
    }
}

impl MidiInputNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events waiting for the next block.
    pub fn pending(&self) -> &[Event] {
        &self.pending
    }

    fn parse(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                // Real-time: never routed, never interrupts a message.
                0xF8..=0xFF => {}
                0xF0..=0xF7 => {
                    self.running_status = None;
                    self.data_len = 0;
                }
                0x80..=0xEF => {
                    self.running_status = Some(byte);
                    self.data_len = 0;
                }
                _ => {
                    let Some(status) = self.running_status else {
                        continue;
                    };
                    self.data[self.data_len] = byte;
                    self.data_len += 1;

                    let len = data_len(status);
                    if self.data_len == len {
                        self.data_len = 0;
                        let data2 = if len == 2 { self.data[1] } else { 0 };
                        if self.pending.len() < EVENT_CAPACITY {
                            self.pending.push(Event::midi(0, status, self.data[0], data2));
                        }
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.running_status = None;
        self.data_len = 0;
    }
}

/// Data bytes following a channel status byte.
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

impl Node for MidiInputNode {
    fn inputs(&self) -> &[SocketType] {
        &[]
    }

    fn outputs(&self) -> &[SocketType] {
        &[SocketType::Midi]
    }

    fn binary_slot_count(&self) -> usize {
        1
    }

    fn process(&mut self, _inputs: &NodeInputs<'_>, outputs: &mut NodeOutputs<'_>) {
        if let Some(events) = outputs.events_mut(0) {
            events.extend_from_slice(&self.pending);
        }
        self.pending.clear();
    }

    fn set_input_value(&mut self, _slot: usize, _value: f32) {}

    fn receive_binary(&mut self, _slot: usize, payload: Vec<u8>) {
        self.parse(&payload);
    }

    fn disconnect_callback(&mut self) {
        self.reset();
    }
}
