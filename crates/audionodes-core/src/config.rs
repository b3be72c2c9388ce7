//! Audio engine configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for the audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Samples per render block (N).
    pub block_size: usize,
    /// In-flight parameter messages the render thread can have pending.
    pub queue_capacity: usize,
    /// Extra push attempts, one block period apart, before a message is dropped.
    pub enqueue_retries: u32,
    /// Block periods to wait for the render thread to let go of a replaced graph.
    pub release_timeout_blocks: u32,
    /// `None` selects the host's default output device.
    pub output_device_index: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
            queue_capacity: 64,
            enqueue_retries: 4,
            release_timeout_blocks: 4,
            output_device_index: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if !(16..=8192).contains(&self.block_size) || !self.block_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "block_size {} must be a power of two in 16-8192",
                self.block_size
            )));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Wall-clock duration of one render block.
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}
