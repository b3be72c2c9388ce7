//! Generation-checked storage for live nodes.

use core::fmt;

use crate::compat::{Arc, AtomicBool, AtomicUsize, Mutex, MutexGuard, Ordering};
use crate::node::{InputValues, Node, NodeLayout};

/// Stable handle to a node.
///
/// Indices are reused after a node is reclaimed, but with a bumped
/// generation, so a stale id never addresses the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a single integer for hosts that cannot hold a struct.
    #[inline]
    pub fn to_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A node plus the bookkeeping the engine keeps next to it.
///
/// Shared between the table and any executable graph that schedules it.
/// The node itself sits behind a mutex that the render thread only ever
/// `try_lock`s; the control thread locks it while the node is disconnected.
pub struct NodeSlot {
    id: NodeId,
    type_name: String,
    layout: NodeLayout,
    node: Mutex<Box<dyn Node>>,
    values: Mutex<InputValues>,
    connected: AtomicBool,
    marked_for_deletion: AtomicBool,
    /// Messages for this node sitting in the render queue.
    queued: AtomicUsize,
}

impl NodeSlot {
    fn new(id: NodeId, type_name: String, node: Box<dyn Node>) -> Self {
        let layout = NodeLayout::of(node.as_ref());
        let values = InputValues::new(&layout);
        Self {
            id,
            type_name,
            layout,
            node: Mutex::new(node),
            values: Mutex::new(values),
            connected: AtomicBool::new(false),
            marked_for_deletion: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    #[inline]
    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion.load(Ordering::Acquire)
    }

    pub(crate) fn mark_for_deletion(&self) {
        self.marked_for_deletion.store(true, Ordering::Release);
    }

    /// Messages queued for this node and not yet applied.
    #[inline]
    pub(crate) fn queued_messages(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    pub(crate) fn add_queued(&self) {
        self.queued.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn remove_queued(&self) {
        self.queued.fetch_sub(1, Ordering::AcqRel);
    }

    /// Blocking access, control thread only.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Box<dyn Node>> {
        self.node.lock()
    }

    /// Non-blocking access for the render thread.
    #[inline]
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Box<dyn Node>>> {
        self.node.try_lock()
    }

    pub(crate) fn values(&self) -> MutexGuard<'_, InputValues> {
        self.values.lock()
    }
}

impl fmt::Debug for NodeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSlot")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("connected", &self.is_connected())
            .field("marked_for_deletion", &self.is_marked_for_deletion())
            .finish()
    }
}

struct Entry {
    generation: u32,
    slot: Option<Arc<NodeSlot>>,
}

/// Arena of live nodes, owned by the control side of the engine.
#[derive(Default)]
pub(crate) struct NodeTable {
    entries: Vec<Entry>,
    free: Vec<u32>,
    len: usize,
}

impl NodeTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, type_name: String, node: Box<dyn Node>) -> Arc<NodeSlot> {
        let (index, generation) = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.generation = entry.generation.wrapping_add(1);
                (index, entry.generation)
            }
            None => {
                self.entries.push(Entry {
                    generation: 0,
                    slot: None,
                });
                ((self.entries.len() - 1) as u32, 0)
            }
        };

        let slot = Arc::new(NodeSlot::new(
            NodeId { index, generation },
            type_name,
            node,
        ));
        self.entries[index as usize].slot = Some(Arc::clone(&slot));
        self.len += 1;
        slot
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Arc<NodeSlot>> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_ref())
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Arc<NodeSlot>> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let slot = entry.slot.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(slot)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<NodeSlot>> {
        self.entries.iter().filter_map(|entry| entry.slot.as_ref())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Empty the table, handing every slot to the caller.
    pub(crate) fn drain(&mut self) -> Vec<Arc<NodeSlot>> {
        let mut slots = Vec::with_capacity(self.len);
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(slot) = entry.slot.take() {
                self.free.push(index as u32);
                slots.push(slot);
            }
        }
        self.len = 0;
        slots
    }
}
