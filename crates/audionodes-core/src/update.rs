//! Graph edit batches.

use tracing::warn;

use crate::builder::ConstructionLink;
use crate::compat::Arc;
use crate::error::{Error, Result, SlotKind};
use crate::system::Engine;
use crate::table::{NodeId, NodeSlot, NodeTable};

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Evaluation order of the installed graph.
    pub scheduled: Vec<NodeId>,
    /// Nodes that became reachable from a sink.
    pub connected: Vec<NodeId>,
    /// Nodes that stopped being reachable from a sink.
    pub disconnected: Vec<NodeId>,
    /// Deleted nodes reclaimed by this rebuild.
    pub freed: Vec<NodeId>,
}

/// A batch of links replacing the current wiring on [`finish`](Self::finish).
///
/// Links are validated as they are added; a rejected link is reported and
/// leaves the rest of the batch intact. Nothing reaches the render thread
/// until the batch is finished.
#[must_use = "a graph update does nothing until finished"]
pub struct GraphUpdate<'a> {
    engine: &'a Engine,
    links: Vec<ConstructionLink>,
    rejected: usize,
}

impl<'a> GraphUpdate<'a> {
    pub(crate) fn new(engine: &'a Engine) -> Self {
        Self {
            engine,
            links: Vec::new(),
            rejected: 0,
        }
    }

    /// Add a link from `from`'s output socket to `to`'s input socket.
    pub fn add_link(
        &mut self,
        from: NodeId,
        from_socket: usize,
        to: NodeId,
        to_socket: usize,
    ) -> Result<()> {
        let link = ConstructionLink::new(from, from_socket, to, to_socket);
        match self.engine.validate_link(&link) {
            Ok(()) => {
                self.links.push(link);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected link {}.out{} -> {}.in{}: {}", from, from_socket, to, to_socket, e);
                self.rejected += 1;
                Err(e)
            }
        }
    }

    /// Links accepted so far.
    pub fn links(&self) -> &[ConstructionLink] {
        &self.links
    }

    /// Links refused by [`add_link`](Self::add_link).
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Build and install a graph from the accepted links.
    ///
    /// On failure the previous graph stays active and the batch is dropped.
    pub fn finish(self) -> Result<BuildReport> {
        self.engine.rebuild(&self.links)
    }
}

impl Engine {
    pub(crate) fn validate_link(&self, link: &ConstructionLink) -> Result<()> {
        let state = self.control.lock();
        let from = live_endpoint(&state.table, link.from)?;
        let to = live_endpoint(&state.table, link.to)?;

        let out_type = from
            .layout()
            .outputs
            .get(link.from_socket)
            .ok_or(Error::InvalidSlot {
                node: link.from,
                kind: SlotKind::OutputSocket,
                slot: link.from_socket,
            })?;
        let in_type = to
            .layout()
            .inputs
            .get(link.to_socket)
            .ok_or(Error::InvalidSlot {
                node: link.to,
                kind: SlotKind::InputSocket,
                slot: link.to_socket,
            })?;

        if out_type != in_type {
            return Err(Error::SocketTypeMismatch {
                from: link.from,
                from_socket: link.from_socket,
                to: link.to,
                to_socket: link.to_socket,
            });
        }
        Ok(())
    }
}

fn live_endpoint(table: &NodeTable, id: NodeId) -> Result<&Arc<NodeSlot>> {
    let slot = table.get(id).ok_or(Error::UnknownNode(id))?;
    if slot.is_marked_for_deletion() {
        return Err(Error::NodeMarkedForDeletion(id));
    }
    Ok(slot)
}
