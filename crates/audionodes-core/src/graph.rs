//! Executable graph: an immutable render schedule.

use core::fmt;

use crate::builder::{ResolvedLink, Schedule};
use crate::compat::{Arc, Mutex};
use crate::node::{NodeInputs, NodeOutputs};
use crate::signal::SignalBuffer;
use crate::stats::RenderStats;
use crate::table::{NodeId, NodeSlot};

/// Output buffers of every scheduled node plus the sink mix.
///
/// Allocated once when the graph is built; evaluation only clears and
/// overwrites it.
struct Scratch {
    outputs: Vec<Vec<SignalBuffer>>,
    mix: Vec<f32>,
}

/// Ordered node handles with their resolved input wiring.
///
/// Every node reads only from nodes earlier in the order. The schedule never
/// changes after construction; a new graph is built and swapped in instead.
pub struct ExecutableGraph {
    order: Vec<Arc<NodeSlot>>,
    links: Vec<Vec<ResolvedLink>>,
    sinks: Vec<usize>,
    block_size: usize,
    scratch: Mutex<Scratch>,
}

impl ExecutableGraph {
    /// `slots` must be the live slots for `schedule.order`, in that order.
    pub(crate) fn new(schedule: Schedule, slots: Vec<Arc<NodeSlot>>, block_size: usize) -> Self {
        debug_assert_eq!(schedule.order.len(), slots.len());

        let outputs = slots
            .iter()
            .map(|slot| {
                slot.layout()
                    .outputs
                    .iter()
                    .map(|&socket| SignalBuffer::for_socket(socket, block_size))
                    .collect()
            })
            .collect();
        let sinks = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.layout().is_sink)
            .map(|(pos, _)| pos)
            .collect();

        Self {
            order: slots,
            links: schedule.links,
            sinks,
            block_size,
            scratch: Mutex::new(Scratch {
                outputs,
                mix: vec![0.0; block_size],
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Node ids in evaluation order.
    pub fn order(&self) -> Vec<NodeId> {
        self.order.iter().map(|slot| slot.id()).collect()
    }

    pub fn links(&self, position: usize) -> &[ResolvedLink] {
        self.links.get(position).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.order.iter().any(|slot| slot.id() == id)
    }

    /// Run one block and hand the summed sink output to `emit`.
    ///
    /// Returns `false` without calling `emit` if another evaluation of this
    /// graph is in progress. A node whose lock is held elsewhere is left
    /// silent for the block.
    pub(crate) fn evaluate(&self, stats: &RenderStats, emit: impl FnOnce(&[f32])) -> bool {
        let Some(mut scratch) = self.scratch.try_lock() else {
            return false;
        };
        let Scratch { outputs, mix } = &mut *scratch;

        for (position, slot) in self.order.iter().enumerate() {
            let (earlier, rest) = outputs.split_at_mut(position);
            let own = &mut rest[0];
            for buffer in own.iter_mut() {
                buffer.clear();
            }

            match slot.try_lock() {
                Some(mut node) => {
                    let inputs = NodeInputs::new(&self.links[position], earlier, self.block_size);
                    let mut produced = NodeOutputs::new(own);
                    node.process(&inputs, &mut produced);
                }
                None => stats.record_node_skipped(),
            }
        }

        mix.fill(0.0);
        for &position in &self.sinks {
            if let Some(samples) = outputs[position].first().and_then(SignalBuffer::as_audio) {
                for (acc, &s) in mix.iter_mut().zip(samples) {
                    *acc += s;
                }
            }
        }

        emit(mix);
        true
    }
}

impl fmt::Debug for ExecutableGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableGraph")
            .field("order", &self.order())
            .field("links", &self.links)
            .field("sinks", &self.sinks)
            .finish()
    }
}
