//! Paced load generation.
//!
//! A [`PacedGenerator`] drives one benchmark round at a time: it sequences
//! addresses for the round's access pattern, stamps each request with the
//! harness clock, and paces emission at the target inter-arrival interval.
//!
//! Pacing is best-effort. The generator sleeps the target interval after each
//! emission (compensating for time already spent only in the synchronous
//! latency variant) and tolerates scheduling drift rather than chasing it; if
//! the consumer falls behind, emission continues at the nominal rate
//! regardless of backlog.

use std::time::Duration;

use anyhow::Result;
use hdrhistogram::Histogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::pipeline::RequestDescriptor;
use crate::protocol::{DeviceLink, Direction, RequestHeader};
use crate::session::Session;

/// The four benchmarked access patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPattern {
    SeqRead,
    RandRead,
    SeqWrite,
    RandWrite,
}

impl AccessPattern {
    /// All patterns in benchmark order: reads first, then writes.
    pub const ALL: [AccessPattern; 4] = [
        AccessPattern::SeqRead,
        AccessPattern::RandRead,
        AccessPattern::SeqWrite,
        AccessPattern::RandWrite,
    ];

    pub fn direction(self) -> Direction {
        match self {
            AccessPattern::SeqRead | AccessPattern::RandRead => Direction::Read,
            AccessPattern::SeqWrite | AccessPattern::RandWrite => Direction::Write,
        }
    }

    pub fn is_random(self) -> bool {
        matches!(self, AccessPattern::RandRead | AccessPattern::RandWrite)
    }
}

impl std::fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessPattern::SeqRead => write!(f, "Logical Sequential Read"),
            AccessPattern::RandRead => write!(f, "Uniformly Random Read"),
            AccessPattern::SeqWrite => write!(f, "Logical Sequential Write"),
            AccessPattern::RandWrite => write!(f, "Uniformly Random Write"),
        }
    }
}

/// Per-pattern address source.
///
/// Sequential walks the span page by page from offset 0, wrapping at the end,
/// and advances after every emission regardless of direction. Random draws a
/// page index uniformly and independently per request; the upper bound is
/// exclusive so every address stays inside the span.
#[derive(Debug)]
pub enum AddressSequencer {
    Sequential { next: u64 },
    Random { rng: StdRng },
}

impl AddressSequencer {
    pub fn for_pattern(pattern: AccessPattern) -> Self {
        if pattern.is_random() {
            AddressSequencer::Random {
                rng: StdRng::from_entropy(),
            }
        } else {
            AddressSequencer::Sequential { next: 0 }
        }
    }

    pub fn next_address(&mut self, page_size: u64, device_span: u64) -> u64 {
        match self {
            AddressSequencer::Sequential { next } => {
                let address = *next;
                *next = (*next + page_size) % device_span;
                address
            }
            AddressSequencer::Random { rng } => {
                page_size * rng.gen_range(0..device_span / page_size)
            }
        }
    }
}

/// Outcome of one throughput round.
#[derive(Debug, Clone)]
pub struct ThroughputRound {
    pub pattern: AccessPattern,
    pub intensity: u32,
    /// Windowed throughput samples in KB/s, in sampling order.
    pub samples: Vec<f64>,
    /// Requests emitted into the pipeline during the round.
    pub emitted: u64,
}

impl ThroughputRound {
    /// Arithmetic mean of the samples, or `None` when the round was too short
    /// for any sampling window ("insufficient data" — never NaN).
    pub fn mean_kb_per_sec(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
        }
    }
}

/// Outcome of one latency round.
#[derive(Debug, Clone)]
pub struct LatencyRound {
    pub pattern: AccessPattern,
    pub intensity: u32,
    pub requests: u64,
    /// Sum of device-reported processing times, microseconds.
    pub total_time_used_us: u64,
    /// 99th percentile processing time, microseconds.
    pub p99_us: Option<u64>,
}

impl LatencyRound {
    /// Mean device processing time in milliseconds, or `None` for an empty
    /// round.
    pub fn mean_ms(&self) -> Option<f64> {
        if self.requests == 0 {
            None
        } else {
            Some(self.total_time_used_us as f64 / self.requests as f64 / 1000.0)
        }
    }

    pub fn p99_ms(&self) -> Option<f64> {
        self.p99_us.map(|us| us as f64 / 1000.0)
    }
}

/// Drives one (pattern, intensity) round at a time.
pub struct PacedGenerator {
    config: HarnessConfig,
    session: Session,
}

impl PacedGenerator {
    pub fn new(config: HarnessConfig, session: Session) -> Self {
        Self { config, session }
    }

    /// Run one paced round, emitting page-sized requests into the submission
    /// pipeline and sampling windowed throughput from the activity log.
    ///
    /// A sample is taken once the accumulated window exceeds the minimum
    /// sampling interval and at least the warmup time has passed since round
    /// start; the window then restarts at the sampling point.
    pub async fn throughput_round(&self, pattern: AccessPattern, intensity: u32) -> ThroughputRound {
        let cfg = &self.config;
        let interval = cfg.target_interval(intensity);
        let round_duration_us = cfg.round_duration.as_micros() as u64;
        let sample_interval_us = cfg.sample_interval.as_micros() as u64;
        let warmup_us = cfg.sample_warmup.as_micros() as u64;

        let mut sequencer = AddressSequencer::for_pattern(pattern);
        let mut samples = Vec::new();
        let mut emitted: u64 = 0;

        let round_start = self.session.clock.now_us();
        let mut window_start = round_start;

        debug!(%pattern, intensity, "round started");
        loop {
            let now = self.session.clock.now_us();
            if now.saturating_sub(round_start) >= round_duration_us {
                break;
            }
            if self.session.cancel.is_cancelled() {
                debug!(%pattern, intensity, "round cancelled");
                break;
            }

            let address = sequencer.next_address(cfg.page_size, cfg.device_span);
            self.session.queue.enqueue(RequestDescriptor {
                direction: pattern.direction(),
                address,
                size: cfg.page_size as u32,
                issue_timestamp: now,
            });
            emitted += 1;

            if now - window_start >= sample_interval_us && now - round_start >= warmup_us {
                let kb_per_sec = self.session.log.lock().query_throughput(window_start, now);
                samples.push(kb_per_sec);
                window_start = now;
            }

            sleep(interval).await;
        }

        if samples.is_empty() {
            warn!(
                %pattern,
                intensity,
                "round produced no throughput samples (too short for the sampling window)"
            );
        }
        debug!(
            %pattern,
            intensity,
            emitted,
            samples = samples.len(),
            backlog = self.session.queue.depth(),
            "round finished"
        );

        ThroughputRound {
            pattern,
            intensity,
            samples,
            emitted,
        }
    }

    /// Run one latency round, issuing each request synchronously on the
    /// device link and averaging the device-reported processing times.
    ///
    /// The pacing sleep is compensated: after each exchange the generator
    /// sleeps `max(0, target_interval - time_spent)` so the offered rate
    /// approximates the target even when exchanges are slow.
    pub async fn latency_round(
        &self,
        link: &mut DeviceLink,
        pattern: AccessPattern,
        intensity: u32,
    ) -> Result<LatencyRound> {
        let cfg = &self.config;
        let interval_us = cfg.target_interval(intensity).as_micros() as u64;
        let round_duration_us = cfg.round_duration.as_micros() as u64;

        let mut sequencer = AddressSequencer::for_pattern(pattern);
        let mut histogram = Histogram::<u64>::new(3)?;
        let mut total_time_used_us: u64 = 0;
        let mut requests: u64 = 0;

        let round_start = self.session.clock.now_us();

        debug!(%pattern, intensity, "latency round started");
        loop {
            let now = self.session.clock.now_us();
            if now.saturating_sub(round_start) >= round_duration_us {
                break;
            }
            if self.session.cancel.is_cancelled() {
                debug!(%pattern, intensity, "latency round cancelled");
                break;
            }

            let header = RequestHeader {
                direction: pattern.direction(),
                address: sequencer.next_address(cfg.page_size, cfg.device_span),
                size: cfg.page_size as u32,
                issue_timestamp: now,
            };
            let time_used_us = link.issue(&header).await?;

            histogram.record(time_used_us.max(1))?;
            total_time_used_us += time_used_us;
            requests += 1;

            let spent_us = self.session.clock.now_us().saturating_sub(now);
            if interval_us > spent_us {
                sleep(Duration::from_micros(interval_us - spent_us)).await;
            }
        }

        let p99_us = if requests == 0 {
            None
        } else {
            Some(histogram.value_at_percentile(99.0))
        };

        Ok(LatencyRound {
            pattern,
            intensity,
            requests,
            total_time_used_us,
            p99_us,
        })
    }
}
