//! Harness configuration.
//!
//! One `HarnessConfig` drives the whole run. Defaults come from
//! [`crate::defaults`]; the CLI can override individual values, and
//! `from_args` validates the combination before anything connects.

use std::time::Duration;

use anyhow::{ensure, Result};

use crate::cli::Args;
use crate::defaults;

/// All tunables for one benchmark run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Device page size in bytes; every address is a multiple of this.
    pub page_size: u64,

    /// Addressable span of the device in bytes.
    pub device_span: u64,

    /// Whether requests carry real payload bytes (deployment-wide toggle,
    /// must match the device peer's configuration).
    pub transfer_data: bool,

    /// Transport ceiling for a single payload.
    pub max_payload: u32,

    /// Activity log capacity in entries.
    pub log_capacity: usize,

    /// First intensity level and increment between levels (requests/s).
    pub intensity_tick: u32,

    /// Last intensity level of the ramp (requests/s).
    pub max_intensity: u32,

    /// Duration of one round at a single intensity.
    pub round_duration: Duration,

    /// Cooldown slept between rounds before the joint queue/log reset.
    pub settle_time: Duration,

    /// Minimum width of one throughput sampling window.
    pub sample_interval: Duration,

    /// Delay after round start before the first sample is taken.
    pub sample_warmup: Duration,

    /// Queue depth that triggers the one-shot backlog warning.
    pub queue_high_water: usize,

    /// Skip the priming fill before the first measured round.
    pub skip_fill: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            device_span: defaults::DEVICE_SPAN,
            transfer_data: false,
            max_payload: defaults::MAX_PAYLOAD,
            log_capacity: defaults::LOG_CAPACITY,
            intensity_tick: defaults::INTENSITY_TICK,
            max_intensity: defaults::MAX_INTENSITY,
            round_duration: defaults::ROUND_DURATION,
            settle_time: defaults::SETTLE_TIME,
            sample_interval: defaults::SAMPLE_INTERVAL,
            sample_warmup: defaults::SAMPLE_WARMUP,
            queue_high_water: defaults::QUEUE_HIGH_WATER,
            skip_fill: false,
        }
    }
}

impl HarnessConfig {
    /// Build and validate a configuration from parsed CLI arguments.
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self {
            page_size: args.page_size,
            device_span: args.device_span,
            transfer_data: args.transfer_data,
            max_payload: defaults::MAX_PAYLOAD,
            log_capacity: args.log_capacity,
            intensity_tick: args.intensity_tick,
            max_intensity: args.max_intensity,
            round_duration: args.round_duration,
            settle_time: args.settle_time,
            sample_interval: defaults::SAMPLE_INTERVAL,
            sample_warmup: defaults::SAMPLE_WARMUP,
            queue_high_water: defaults::QUEUE_HIGH_WATER,
            skip_fill: args.skip_fill,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page size must be positive");
        ensure!(
            self.device_span >= self.page_size && self.device_span % self.page_size == 0,
            "device span ({} bytes) must be a positive multiple of the page size ({} bytes)",
            self.device_span,
            self.page_size
        );
        ensure!(
            !self.transfer_data || self.page_size <= u64::from(self.max_payload),
            "page size {} exceeds the {} byte payload ceiling with data transfer enabled",
            self.page_size,
            self.max_payload
        );
        ensure!(self.intensity_tick > 0, "intensity tick must be positive");
        ensure!(
            self.max_intensity >= self.intensity_tick,
            "max intensity ({}) must be at least one tick ({})",
            self.max_intensity,
            self.intensity_tick
        );
        ensure!(
            !self.round_duration.is_zero(),
            "round duration must be positive"
        );
        ensure!(self.log_capacity > 0, "log capacity must be positive");
        Ok(())
    }

    /// Number of pages in the addressable span.
    pub fn page_count(&self) -> u64 {
        self.device_span / self.page_size
    }

    /// Target inter-arrival interval for a given intensity.
    pub fn target_interval(&self, intensity: u32) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(intensity.max(1)))
    }

    /// The ramp of intensity levels, tick..=max stepping by tick.
    pub fn intensity_levels(&self) -> impl Iterator<Item = u32> + '_ {
        (self.intensity_tick..=self.max_intensity).step_by(self.intensity_tick as usize)
    }
}
