//! Atomic replacement of the active executable graph.

use std::thread;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use crate::compat::Arc;
use crate::graph::ExecutableGraph;

/// Slot holding the graph the render thread evaluates.
///
/// Readers see either the old or the new graph in full. Swapping never
/// allocates or traverses; dropping the old graph is left to the caller.
#[derive(Default)]
pub(crate) struct ActiveGraph {
    current: ArcSwapOption<ExecutableGraph>,
}

impl ActiveGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install `graph` and return the one it replaced.
    pub(crate) fn install(
        &self,
        graph: Option<Arc<ExecutableGraph>>,
    ) -> Option<Arc<ExecutableGraph>> {
        self.current.swap(graph)
    }

    /// Strong reference to the active graph, if any.
    #[inline]
    pub(crate) fn load(&self) -> Option<Arc<ExecutableGraph>> {
        self.current.load_full()
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.current.load().is_some()
    }
}

/// Wait for every other holder of `graph` to let go of it.
///
/// Returns the graph back if it is still referenced after `timeout`, so the
/// caller can keep it around instead of dropping it under the render thread.
pub(crate) fn wait_until_released(
    graph: Arc<ExecutableGraph>,
    timeout: Duration,
) -> Option<Arc<ExecutableGraph>> {
    let poll = (timeout / 16).max(Duration::from_micros(100));
    let deadline = Instant::now() + timeout;

    while Arc::strong_count(&graph) > 1 {
        if Instant::now() >= deadline {
            return Some(graph);
        }
        thread::sleep(poll);
    }
    None
}
