//! Evaluation-order builder.
//!
//! Turns the live node set plus a batch of construction links into a linear
//! schedule: nodes that cannot reach a sink are pruned, the rest are ordered
//! producer-before-consumer, and every input socket is resolved against the
//! positions of that order.
//!
//! This module is pure: it sees ids and flags only, never live nodes, so the
//! same batch always yields the same schedule.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::error;

use crate::error::{Error, Result};
use crate::table::NodeId;

/// Directed link submitted while editing a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructionLink {
    pub from: NodeId,
    pub from_socket: usize,
    pub to: NodeId,
    pub to_socket: usize,
}

impl ConstructionLink {
    pub fn new(from: NodeId, from_socket: usize, to: NodeId, to_socket: usize) -> Self {
        Self {
            from,
            from_socket,
            to,
            to_socket,
        }
    }
}

/// What the builder needs to know about each live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub is_sink: bool,
    pub marked_for_deletion: bool,
    pub input_count: usize,
}

/// Input wiring of one socket, against positions in the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvedLink {
    /// Nothing linked; the node falls back to its own default.
    #[default]
    Absent,
    Present {
        source_position: usize,
        source_socket: usize,
    },
}

impl ResolvedLink {
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, ResolvedLink::Present { .. })
    }
}

/// Output of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Producer-before-consumer evaluation order.
    pub order: Vec<NodeId>,
    /// Per entry of `order`, one resolved link per input socket.
    pub links: Vec<Vec<ResolvedLink>>,
}

impl Schedule {
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Compute the evaluation schedule for `nodes` wired by `links`.
///
/// Links naming ids that are not in `nodes` are ignored. When several links
/// target the same input socket the last one submitted wins.
pub fn build_schedule(nodes: &[NodeDescriptor], links: &[ConstructionLink]) -> Result<Schedule> {
    let known: BTreeMap<NodeId, &NodeDescriptor> = nodes.iter().map(|n| (n.id, n)).collect();

    // Group by destination, preserving submission order inside each group.
    let mut incoming: BTreeMap<NodeId, Vec<&ConstructionLink>> = BTreeMap::new();
    for link in links {
        if known.contains_key(&link.from) && known.contains_key(&link.to) {
            incoming.entry(link.to).or_default().push(link);
        }
    }

    let to_process = reachable_from_sinks(&known, &incoming);

    let mut order = reverse_topological(&to_process, &incoming)?;
    order.reverse();

    let positions: BTreeMap<NodeId, usize> =
        order.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();

    let resolved = order
        .iter()
        .map(|id| {
            let input_count = known.get(id).map_or(0, |n| n.input_count);
            let mut sockets = vec![ResolvedLink::Absent; input_count];
            for link in incoming.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                let Some(&source_position) = positions.get(&link.from) else {
                    continue;
                };
                if let Some(socket) = sockets.get_mut(link.to_socket) {
                    *socket = ResolvedLink::Present {
                        source_position,
                        source_socket: link.from_socket,
                    };
                }
            }
            sockets
        })
        .collect();

    Ok(Schedule {
        order,
        links: resolved,
    })
}

/// Backward breadth-first search from every non-deleted sink. Deleted
/// sources are never entered.
fn reachable_from_sinks(
    known: &BTreeMap<NodeId, &NodeDescriptor>,
    incoming: &BTreeMap<NodeId, Vec<&ConstructionLink>>,
) -> BTreeSet<NodeId> {
    let mut visited: BTreeSet<NodeId> = known
        .values()
        .filter(|n| n.is_sink && !n.marked_for_deletion)
        .map(|n| n.id)
        .collect();
    let mut queue: VecDeque<NodeId> = visited.iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        for link in incoming.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            let deleted = known
                .get(&link.from)
                .map_or(true, |n| n.marked_for_deletion);
            if !deleted && visited.insert(link.from) {
                queue.push_back(link.from);
            }
        }
    }

    visited
}

/// Kahn's algorithm run from the sinks backwards: a node is emitted once
/// every consumer inside `to_process` has been emitted.
///
/// Returns consumers before producers.
fn reverse_topological(
    to_process: &BTreeSet<NodeId>,
    incoming: &BTreeMap<NodeId, Vec<&ConstructionLink>>,
) -> Result<Vec<NodeId>> {
    let mut forward_edges: BTreeMap<NodeId, usize> =
        to_process.iter().map(|&id| (id, 0)).collect();
    for (to, group) in incoming {
        if !to_process.contains(to) {
            continue;
        }
        for link in group {
            if let Some(count) = forward_edges.get_mut(&link.from) {
                *count += 1;
            }
        }
    }

    let mut queue: VecDeque<NodeId> = forward_edges
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut emitted = Vec::with_capacity(to_process.len());

    while let Some(id) = queue.pop_front() {
        emitted.push(id);
        for link in incoming.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(count) = forward_edges.get_mut(&link.from) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(link.from);
                }
            }
        }
    }

    if emitted.len() < to_process.len() {
        let stuck: Vec<NodeId> = forward_edges
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&id, _)| id)
            .collect();
        error!(
            "Graph contains a cycle involving nodes {:?}; keeping previous graph",
            stuck
        );
        return Err(Error::CycleDetected {
            scheduled: emitted.len(),
            required: to_process.len(),
        });
    }

    Ok(emitted)
}
