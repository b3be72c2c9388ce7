//! Signal types carried between node sockets.

/// Events each event socket can hold per block before its buffer has to grow.
pub const EVENT_CAPACITY: usize = 128;

/// What a socket carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// One block of samples.
    Audio,
    /// Timestamped MIDI messages.
    Midi,
    /// Timestamped triggers without payload.
    Trigger,
}

impl SocketType {
    pub fn is_event(&self) -> bool {
        !matches!(self, SocketType::Audio)
    }
}

/// Payload of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventData {
    Midi { status: u8, data1: u8, data2: u8 },
    Trigger,
}

/// An event positioned inside the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Sample offset from the block start.
    pub frame: u32,
    pub data: EventData,
}

impl Event {
    pub fn midi(frame: u32, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            frame,
            data: EventData::Midi {
                status,
                data1,
                data2,
            },
        }
    }

    pub fn trigger(frame: u32) -> Self {
        Self {
            frame,
            data: EventData::Trigger,
        }
    }

    /// Pitch bend value (0..=16383) if this is a MIDI pitch bend message.
    pub fn pitch_bend(&self) -> Option<u16> {
        match self.data {
            EventData::Midi {
                status,
                data1,
                data2,
            } if status & 0xF0 == 0xE0 => {
                Some(((data2 as u16 & 0x7F) << 7) | (data1 as u16 & 0x7F))
            }
            _ => None,
        }
    }
}

/// Storage behind one output socket, allocated when a graph is built.
#[derive(Debug, Clone)]
pub enum SignalBuffer {
    Audio(Vec<f32>),
    Events(Vec<Event>),
}

impl SignalBuffer {
    pub(crate) fn for_socket(socket: SocketType, block_size: usize) -> Self {
        match socket {
            SocketType::Audio => SignalBuffer::Audio(vec![0.0; block_size]),
            SocketType::Midi | SocketType::Trigger => {
                SignalBuffer::Events(Vec::with_capacity(EVENT_CAPACITY))
            }
        }
    }

    /// Reset to silence / no events without releasing memory.
    #[inline]
    pub(crate) fn clear(&mut self) {
        match self {
            SignalBuffer::Audio(samples) => samples.fill(0.0),
            SignalBuffer::Events(events) => events.clear(),
        }
    }

    pub fn as_audio(&self) -> Option<&[f32]> {
        match self {
            SignalBuffer::Audio(samples) => Some(samples),
            SignalBuffer::Events(_) => None,
        }
    }

    pub fn as_events(&self) -> Option<&[Event]> {
        match self {
            SignalBuffer::Events(events) => Some(events),
            SignalBuffer::Audio(_) => None,
        }
    }
}
