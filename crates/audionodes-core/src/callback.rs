//! Render block driver, invoked once per fixed-size block.
//!
//! Nothing here blocks, allocates, or logs. Problems are recorded in
//! [`RenderStats`] for the control thread to report.

use crate::compat::Arc;
use crate::message::MessageQueue;
use crate::stats::RenderStats;
use crate::swap::ActiveGraph;

/// Sample formats the driver can write.
pub trait RenderSample: Copy + Send + 'static {
    const SILENCE: Self;

    /// Convert one mixed sample.
    fn from_mix(sample: f32) -> Self;
}

/// Convert a mixed sample to signed 16-bit.
///
/// Values at or beyond full scale saturate; everything else is scaled by
/// `i16::MAX` and truncated toward zero.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    if sample <= -1.0 {
        i16::MIN
    } else if sample >= 1.0 {
        i16::MAX
    } else {
        (sample * i16::MAX as f32) as i16
    }
}

impl RenderSample for i16 {
    const SILENCE: Self = 0;

    #[inline]
    fn from_mix(sample: f32) -> Self {
        to_i16(sample)
    }
}

impl RenderSample for f32 {
    const SILENCE: Self = 0.0;

    #[inline]
    fn from_mix(sample: f32) -> Self {
        sample.clamp(-1.0, 1.0)
    }
}

impl RenderSample for u16 {
    const SILENCE: Self = 1 << 15;

    #[inline]
    fn from_mix(sample: f32) -> Self {
        (to_i16(sample) as i32 + (1 << 15)) as u16
    }
}

/// Render-thread handle to an engine.
///
/// Cheap to clone; a device stream keeps one and calls [`Renderer::render`]
/// for every block.
#[derive(Clone)]
pub struct Renderer {
    active: Arc<ActiveGraph>,
    queue: Arc<MessageQueue>,
    stats: Arc<RenderStats>,
    block_size: usize,
}

impl Renderer {
    pub(crate) fn new(
        active: Arc<ActiveGraph>,
        queue: Arc<MessageQueue>,
        stats: Arc<RenderStats>,
        block_size: usize,
    ) -> Self {
        Self {
            active,
            queue,
            stats,
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }

    /// Render one mono block into `output`.
    ///
    /// `output` must hold exactly one block. Any other length is counted as a
    /// mismatch and leaves `output` untouched.
    pub fn render<S: RenderSample>(&self, output: &mut [S]) {
        if output.len() != self.block_size {
            self.stats.record_size_mismatch();
            return;
        }

        let Some(graph) = self.active.load() else {
            output.fill(S::SILENCE);
            self.stats.record_silent_block();
            return;
        };

        self.queue.drain(&self.stats);

        let evaluated = graph.evaluate(&self.stats, |mix| {
            for (out, &sample) in output.iter_mut().zip(mix) {
                *out = S::from_mix(sample);
            }
        });

        if evaluated {
            self.stats.record_block();
        } else {
            output.fill(S::SILENCE);
            self.stats.record_silent_block();
        }
    }
}

impl core::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("block_size", &self.block_size)
            .field("graph_installed", &self.active.is_installed())
            .finish()
    }
}
