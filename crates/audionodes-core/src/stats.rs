//! Counters recorded by the render path.
//!
//! The render thread cannot log, so anything worth reporting from it is
//! counted here and read back by the control thread.

use crate::compat::{AtomicU64, Ordering};

/// Snapshot of [`RenderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStatsSnapshot {
    pub blocks_rendered: u64,
    pub silent_blocks: u64,
    pub size_mismatches: u64,
    pub messages_applied: u64,
    pub messages_deferred: u64,
    pub nodes_skipped_busy: u64,
    pub stream_errors: u64,
}

/// Render-thread counters. All updates are relaxed increments.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct RenderStats {
    blocks_rendered: AtomicU64,
    silent_blocks: AtomicU64,
    size_mismatches: AtomicU64,
    messages_applied: AtomicU64,
    messages_deferred: AtomicU64,
    nodes_skipped_busy: AtomicU64,
    stream_errors: AtomicU64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_block(&self) {
        self.blocks_rendered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_silent_block(&self) {
        self.silent_blocks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_size_mismatch(&self) {
        self.size_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_message_applied(&self) {
        self.messages_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_message_deferred(&self) {
        self.messages_deferred.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_node_skipped(&self) {
        self.nodes_skipped_busy.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            blocks_rendered: self.blocks_rendered.load(Ordering::Relaxed),
            silent_blocks: self.silent_blocks.load(Ordering::Relaxed),
            size_mismatches: self.size_mismatches.load(Ordering::Relaxed),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_deferred: self.messages_deferred.load(Ordering::Relaxed),
            nodes_skipped_busy: self.nodes_skipped_busy.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}
