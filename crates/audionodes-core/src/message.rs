//! Deferred parameter updates for nodes owned by the render thread.
//!
//! Once a node is part of the active graph only the render thread may touch
//! it, so setters are turned into messages and applied at the start of the
//! next block. Nodes outside the active graph are updated in place.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::compat::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::stats::RenderStats;
use crate::table::NodeSlot;

/// A single parameter change.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    SetInput { slot: usize, value: f32 },
    SetProperty { slot: usize, value: i32 },
    Binary { slot: usize, payload: Vec<u8> },
}

impl MessageKind {
    fn apply(self, node: &mut dyn Node) {
        match self {
            MessageKind::SetInput { slot, value } => node.set_input_value(slot, value),
            MessageKind::SetProperty { slot, value } => node.set_property_value(slot, value),
            MessageKind::Binary { slot, payload } => node.receive_binary(slot, payload),
        }
    }
}

/// A parameter change bound to its target node.
#[derive(Debug)]
pub(crate) struct PendingMessage {
    pub target: Arc<NodeSlot>,
    pub kind: MessageKind,
}

/// How an update reached its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Applied on the calling thread; the node was not connected.
    Applied,
    /// Queued for the render thread. A disconnected node still waiting on
    /// earlier queued updates gets this too.
    Queued,
}

/// Bounded FIFO from the control thread to the render thread.
pub(crate) struct MessageQueue {
    tx: Sender<PendingMessage>,
    rx: Receiver<PendingMessage>,
    /// Message popped while its node was busy; retried first next block.
    deferred: Mutex<Option<PendingMessage>>,
    retries: u32,
    backoff: Duration,
}

impl MessageQueue {
    pub(crate) fn new(capacity: usize, retries: u32, backoff: Duration) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            deferred: Mutex::new(None),
            retries,
            backoff,
        }
    }

    /// Deliver `message`, synchronously if its node is not connected and
    /// has nothing queued ahead of it.
    ///
    /// When the queue is full the call sleeps one backoff period between
    /// attempts. If every attempt fails the message and its payload are
    /// dropped.
    pub(crate) fn enqueue(&self, message: PendingMessage) -> Result<Delivery> {
        if !message.target.is_connected() && message.target.queued_messages() == 0 {
            let PendingMessage { target, kind } = message;
            kind.apply(&mut **target.lock());
            return Ok(Delivery::Applied);
        }

        // Counted before the push so the render thread can never see the
        // message while the count is still zero.
        let target = Arc::clone(&message.target);
        target.add_queued();
        let node = target.id();
        let attempts = self.retries + 1;
        let mut message = message;
        for attempt in 1..=attempts {
            match self.tx.try_send(message) {
                Ok(()) => return Ok(Delivery::Queued),
                Err(TrySendError::Full(returned)) | Err(TrySendError::Disconnected(returned)) => {
                    message = returned;
                }
            }
            if attempt < attempts {
                thread::sleep(self.backoff);
            }
        }

        drop(message);
        target.remove_queued();
        warn!(
            "Message queue full, dropping update for node {} after {} attempts",
            node, attempts
        );
        Err(Error::QueueFull { node, attempts })
    }

    /// Apply every queued message in order. Render thread only.
    ///
    /// Stops early if a target node is locked elsewhere; that message and
    /// everything behind it stay queued for the next block.
    pub(crate) fn drain(&self, stats: &RenderStats) {
        let Some(mut deferred) = self.deferred.try_lock() else {
            return;
        };

        loop {
            let message = match deferred.take() {
                Some(message) => message,
                None => match self.rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };

            let PendingMessage { target, kind } = message;
            if let Some(mut node) = target.try_lock() {
                kind.apply(&mut **node);
                drop(node);
                target.remove_queued();
                stats.record_message_applied();
                continue;
            }

            stats.record_message_deferred();
            *deferred = Some(PendingMessage { target, kind });
            break;
        }
    }

    /// Messages waiting for the render thread.
    pub(crate) fn pending(&self) -> usize {
        self.rx.len() + usize::from(self.deferred.lock().is_some())
    }

    /// Drop everything still queued.
    pub(crate) fn clear(&self) {
        if let Some(message) = self.deferred.lock().take() {
            message.target.remove_queued();
        }
        while let Ok(message) = self.rx.try_recv() {
            message.target.remove_queued();
        }
    }
}
