//! Engine: node lifecycle, parameter routing, graph rebuilds and output.

use tracing::{debug, warn};

use crate::builder::{build_schedule, ConstructionLink, NodeDescriptor};
use crate::callback::Renderer;
use crate::compat::{Arc, Mutex};
use crate::config::EngineConfig;
use crate::error::{Error, Result, SlotKind};
use crate::graph::ExecutableGraph;
use crate::message::{Delivery, MessageKind, MessageQueue, PendingMessage};
use crate::node::NodeContext;
use crate::registry::NodeRegistry;
use crate::stats::{RenderStats, RenderStatsSnapshot};
use crate::swap::{wait_until_released, ActiveGraph};
use crate::table::{NodeId, NodeSlot, NodeTable};
use crate::update::{BuildReport, GraphUpdate};

#[cfg(feature = "device")]
use crate::output::AudioOutput;

/// Control-side view of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub type_name: String,
    pub connected: bool,
    pub marked_for_deletion: bool,
}

/// State only the control thread touches.
pub(crate) struct ControlState {
    pub(crate) table: NodeTable,
    /// Deleted nodes waiting for their last outside reference to go away.
    retired: Vec<Arc<NodeSlot>>,
    /// Replaced graphs the render thread had not let go of in time.
    retired_graphs: Vec<Arc<ExecutableGraph>>,
}

/// Real-time synthesis engine.
///
/// All methods are called from the control side and may block briefly; the
/// render side only ever goes through [`Renderer`].
pub struct Engine {
    pub(crate) control: Mutex<ControlState>,
    registry: NodeRegistry,
    queue: Arc<MessageQueue>,
    active: Arc<ActiveGraph>,
    stats: Arc<RenderStats>,
    renderer: Renderer,
    #[cfg(feature = "device")]
    output: Mutex<Option<AudioOutput>>,
    config: EngineConfig,
}

impl Engine {
    /// Create a new engine builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    fn node_context(&self) -> NodeContext {
        NodeContext {
            sample_rate: self.config.sample_rate,
            block_size: self.config.block_size,
        }
    }

    /// Create a node of a registered type. It stays silent until a rebuild
    /// makes it reachable from a sink.
    pub fn create_node(&self, type_name: &str) -> Result<NodeId> {
        let node = self
            .registry
            .create(type_name, &self.node_context())
            .inspect_err(|e| warn!("Cannot create node: {}", e))?;

        let id = self
            .control
            .lock()
            .table
            .insert(type_name.to_string(), node)
            .id();
        debug!("Created {} {}", type_name, id);
        Ok(id)
    }

    /// Create a node of `type_name` carrying over the externally-set inputs
    /// and properties of `source`.
    pub fn copy_node(&self, source: NodeId, type_name: &str) -> Result<NodeId> {
        let mut node = self
            .registry
            .create(type_name, &self.node_context())
            .inspect_err(|e| warn!("Cannot create node: {}", e))?;

        let mut state = self.control.lock();
        let values = match state.table.get(source) {
            Some(slot) => slot.values().clone(),
            None => {
                warn!("Cannot copy unknown node {}", source);
                return Err(Error::UnknownNode(source));
            }
        };

        node.copy_input_values(&values);
        let slot = state.table.insert(type_name.to_string(), node);
        {
            let layout = slot.layout();
            let mut mirror = slot.values();
            for (index, value) in values.inputs().filter(|&(i, _)| i < layout.inputs.len()) {
                mirror.record_input(index, value);
            }
            for (index, value) in values.properties().filter(|&(i, _)| i < layout.properties) {
                mirror.record_property(index, value);
            }
        }
        debug!("Copied {} into {} {}", source, type_name, slot.id());
        Ok(slot.id())
    }

    /// Mark a node for deletion. It keeps rendering until the next rebuild
    /// drops it from the schedule and is freed once nothing references it.
    pub fn remove_node(&self, id: NodeId) -> Result<()> {
        let state = self.control.lock();
        match state.table.get(id) {
            Some(slot) => {
                slot.mark_for_deletion();
                debug!("Marked {} for deletion", id);
                Ok(())
            }
            None => {
                warn!("Cannot remove unknown node {}", id);
                Err(Error::UnknownNode(id))
            }
        }
    }

    /// Whether `id` names a node the engine still holds, including nodes
    /// marked for deletion but not yet reclaimed.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.control.lock().table.get(id).is_some()
    }

    pub fn node_state(&self, id: NodeId) -> Option<NodeState> {
        let state = self.control.lock();
        state.table.get(id).map(|slot| NodeState {
            type_name: slot.type_name().to_string(),
            connected: slot.is_connected(),
            marked_for_deletion: slot.is_marked_for_deletion(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.control.lock().table.len()
    }

    /// Set the scalar used by input `slot` while it is unlinked.
    pub fn set_input_value(&self, id: NodeId, slot: usize, value: f32) -> Result<Delivery> {
        self.send(id, SlotKind::Input, MessageKind::SetInput { slot, value })
    }

    pub fn set_property_value(&self, id: NodeId, slot: usize, value: i32) -> Result<Delivery> {
        self.send(id, SlotKind::Property, MessageKind::SetProperty { slot, value })
    }

    /// Hand `payload` to the node. It is dropped if delivery fails.
    pub fn send_binary(&self, id: NodeId, slot: usize, payload: Vec<u8>) -> Result<Delivery> {
        self.send(id, SlotKind::Binary, MessageKind::Binary { slot, payload })
    }

    fn send(&self, id: NodeId, kind: SlotKind, message: MessageKind) -> Result<Delivery> {
        // Held across enqueue so a rebuild cannot flip the node's connection
        // state between the check and the push.
        let state = self.control.lock();
        let Some(target) = state.table.get(id) else {
            warn!("Cannot update unknown node {}", id);
            return Err(Error::UnknownNode(id));
        };

        let layout = target.layout();
        let (slot, slot_count) = match &message {
            MessageKind::SetInput { slot, .. } => (*slot, layout.inputs.len()),
            MessageKind::SetProperty { slot, .. } => (*slot, layout.properties),
            MessageKind::Binary { slot, .. } => (*slot, layout.binary_slots),
        };
        if slot >= slot_count {
            warn!("Invalid {:?} slot {} on node {}", kind, slot, id);
            return Err(Error::InvalidSlot {
                node: id,
                kind,
                slot,
            });
        }

        match &message {
            MessageKind::SetInput { slot, value } => target.values().record_input(*slot, *value),
            MessageKind::SetProperty { slot, value } => {
                target.values().record_property(*slot, *value)
            }
            MessageKind::Binary { .. } => {}
        }

        self.queue.enqueue(PendingMessage {
            target: Arc::clone(target),
            kind: message,
        })
    }

    /// Start a batch of links.
    pub fn begin_update(&self) -> GraphUpdate<'_> {
        GraphUpdate::new(self)
    }

    /// Run `f` against a new batch and finish it.
    ///
    /// # Example
    /// ```ignore
    /// engine.update(|batch| {
    ///     batch.add_link(osc, 0, sink, 0)?;
    ///     Ok(())
    /// })?;
    /// ```
    pub fn update<F>(&self, f: F) -> Result<BuildReport>
    where
        F: FnOnce(&mut GraphUpdate<'_>) -> Result<()>,
    {
        let mut batch = self.begin_update();
        f(&mut batch)?;
        batch.finish()
    }

    /// Rebuild from `links` and install the result.
    pub(crate) fn rebuild(&self, links: &[ConstructionLink]) -> Result<BuildReport> {
        let mut state = self.control.lock();

        let descriptors: Vec<NodeDescriptor> = state
            .table
            .iter()
            .map(|slot| NodeDescriptor {
                id: slot.id(),
                is_sink: slot.layout().is_sink,
                marked_for_deletion: slot.is_marked_for_deletion(),
                input_count: slot.layout().inputs.len(),
            })
            .collect();
        let schedule = build_schedule(&descriptors, links)?;

        let slots: Vec<Arc<NodeSlot>> = schedule
            .order
            .iter()
            .filter_map(|&id| state.table.get(id).cloned())
            .collect();

        let mut report = BuildReport {
            scheduled: schedule.order.clone(),
            ..Default::default()
        };

        // Newly scheduled nodes must be connected before the render thread
        // can see them, so setters start going through the queue.
        for slot in slots.iter().filter(|slot| !slot.is_connected()) {
            slot.lock().connect_callback();
            slot.set_connected(true);
            report.connected.push(slot.id());
        }

        let graph = Arc::new(ExecutableGraph::new(
            schedule,
            slots,
            self.config.block_size,
        ));
        let previous = self.active.install(Some(Arc::clone(&graph)));

        if let Some(previous) = previous {
            self.release(&mut state, previous);
        }

        for slot in state.table.iter() {
            if slot.is_connected() && !graph.contains(slot.id()) {
                slot.lock().disconnect_callback();
                slot.set_connected(false);
                report.disconnected.push(slot.id());
            }
        }
        drop(graph);

        let deleted: Vec<NodeId> = state
            .table
            .iter()
            .filter(|slot| slot.is_marked_for_deletion())
            .map(|slot| slot.id())
            .collect();
        for id in deleted {
            if let Some(slot) = state.table.remove(id) {
                state.retired.push(slot);
            }
        }
        report.freed = purge(&mut state);

        debug!(
            "Installed graph of {} nodes ({} connected, {} disconnected, {} freed)",
            report.scheduled.len(),
            report.connected.len(),
            report.disconnected.len(),
            report.freed.len()
        );
        Ok(report)
    }

    /// Wait for the render thread to drop `previous`; keep it around if it
    /// does not do so in time.
    fn release(&self, state: &mut ControlState, previous: Arc<ExecutableGraph>) {
        let timeout = self.config.block_period() * self.config.release_timeout_blocks;
        if let Some(held) = wait_until_released(previous, timeout) {
            warn!(
                "Replaced graph still in use after {:?}; deferring its release",
                timeout
            );
            state.retired_graphs.push(held);
        }
    }

    /// Evaluation order of the active graph.
    pub fn evaluation_order(&self) -> Vec<NodeId> {
        self.active
            .load()
            .map(|graph| graph.order())
            .unwrap_or_default()
    }

    /// The active graph, for inspection.
    pub fn active_graph(&self) -> Option<Arc<ExecutableGraph>> {
        self.active.load()
    }

    /// Render-thread handle for driving the engine without a device.
    pub fn renderer(&self) -> Renderer {
        self.renderer.clone()
    }

    pub fn render_stats(&self) -> RenderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Parameter messages not yet applied by the render thread.
    pub fn pending_messages(&self) -> usize {
        self.queue.pending()
    }

    /// Open the configured output device, if it is not already open.
    #[cfg(feature = "device")]
    pub fn start_output(&self) -> Result<()> {
        let mut output = self.output.lock();
        if output.is_some() {
            return Ok(());
        }
        let opened = AudioOutput::open(&self.config, self.renderer())?;
        if opened.sample_rate() != self.config.sample_rate {
            warn!(
                "Device runs at {} Hz but nodes were configured for {} Hz",
                opened.sample_rate(),
                self.config.sample_rate
            );
        }
        tracing::info!("Audio output started on '{}'", opened.device_name());
        *output = Some(opened);
        Ok(())
    }

    /// Close the output device. Rendering stops until it is reopened.
    #[cfg(feature = "device")]
    pub fn stop_output(&self) {
        if let Some(output) = self.output.lock().take() {
            tracing::info!("Audio output stopped on '{}'", output.device_name());
        }
    }

    #[cfg(feature = "device")]
    pub fn is_output_running(&self) -> bool {
        self.output.lock().is_some()
    }

    /// List available output devices.
    #[cfg(feature = "device")]
    pub fn list_output_devices() -> Result<Vec<String>> {
        AudioOutput::list_devices()
    }

    /// Stop output, uninstall the graph and free every node.
    ///
    /// The engine stays usable afterwards, empty.
    pub fn shutdown(&self) {
        #[cfg(feature = "device")]
        self.stop_output();

        let mut state = self.control.lock();
        if let Some(previous) = self.active.install(None) {
            self.release(&mut state, previous);
        }
        self.queue.clear();

        for slot in state.table.iter().filter(|slot| slot.is_connected()) {
            slot.lock().disconnect_callback();
            slot.set_connected(false);
        }
        let slots = state.table.drain();
        let freed = slots.len();
        state.retired.extend(slots);
        purge(&mut state);
        if freed > 0 {
            debug!("Shut down engine, freed {} nodes", freed);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drop retired graphs and nodes nothing else references. Returns the ids
/// of the freed nodes.
fn purge(state: &mut ControlState) -> Vec<NodeId> {
    state
        .retired_graphs
        .retain(|graph| Arc::strong_count(graph) > 1);

    let mut freed = Vec::new();
    state.retired.retain(|slot| {
        if Arc::strong_count(slot) > 1 {
            true
        } else {
            freed.push(slot.id());
            false
        }
    });
    freed
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: Option<NodeRegistry>,
    #[cfg_attr(not(feature = "device"), allow(dead_code))]
    headless: bool,
}

impl EngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// Samples per render block.
    pub fn block_size(mut self, frames: usize) -> Self {
        self.config.block_size = frames;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn enqueue_retries(mut self, retries: u32) -> Self {
        self.config.enqueue_retries = retries;
        self
    }

    /// Set output device index.
    pub fn output_device(mut self, index: usize) -> Self {
        self.config.output_device_index = Some(index);
        self
    }

    /// Node types the engine can create. Defaults to an empty registry.
    pub fn registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Do not open an output device; drive the engine through
    /// [`Engine::renderer`] instead.
    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Build the engine and, unless headless, start audio output.
    ///
    /// A device that fails to open is reported and the engine runs without
    /// output.
    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;
        let config = self.config;

        let queue = Arc::new(MessageQueue::new(
            config.queue_capacity,
            config.enqueue_retries,
            config.block_period(),
        ));
        let active = Arc::new(ActiveGraph::new());
        let stats = Arc::new(RenderStats::new());
        let renderer = Renderer::new(
            Arc::clone(&active),
            Arc::clone(&queue),
            Arc::clone(&stats),
            config.block_size,
        );

        let engine = Engine {
            control: Mutex::new(ControlState {
                table: NodeTable::new(),
                retired: Vec::new(),
                retired_graphs: Vec::new(),
            }),
            registry: self.registry.unwrap_or_default(),
            queue,
            active,
            stats,
            renderer,
            #[cfg(feature = "device")]
            output: Mutex::new(None),
            config,
        };

        #[cfg(feature = "device")]
        if !self.headless {
            if let Err(e) = engine.start_output() {
                tracing::error!("Audio output unavailable, running without a device: {}", e);
            }
        }

        Ok(engine)
    }
}
