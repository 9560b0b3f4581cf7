//! Benchmark orchestration.
//!
//! The driver sequences the intensity ramp across the four access patterns,
//! primes the device before the first measured round, supervises the pipeline
//! worker, and enforces the cooldown between rounds: sleep the settle time,
//! then clear the submission queue and the activity log under a joint lock so
//! the next round starts from empty state.

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::cli::BenchMode;
use crate::config::HarnessConfig;
use crate::generator::{AccessPattern, PacedGenerator};
use crate::pipeline::PipelineWorker;
use crate::protocol::{DeviceLink, Direction, RequestHeader};
use crate::results::{BenchReport, IntensityRow};
use crate::session::Session;

pub struct Driver {
    config: HarnessConfig,
    session: Session,
}

impl Driver {
    pub fn new(config: HarnessConfig, session: Session) -> Self {
        Self { config, session }
    }

    /// Bring the device to a steady, non-empty state with a full sequential
    /// fill: one synchronous write per page across the addressable span.
    /// Not timed and not logged as a benchmark result.
    pub async fn prime_device(&self, link: &mut DeviceLink) -> Result<()> {
        if self.config.skip_fill {
            info!("skipping priming fill");
            return Ok(());
        }

        let pages = self.config.page_count();
        info!(pages, "priming device with a full sequential fill");
        for page in 0..pages {
            if self.session.cancel.is_cancelled() {
                info!("priming fill cancelled");
                return Ok(());
            }
            let header = RequestHeader {
                direction: Direction::Write,
                address: page * self.config.page_size,
                size: self.config.page_size as u32,
                issue_timestamp: self.session.clock.now_us(),
            };
            link.issue(&header).await.context("priming fill failed")?;
        }
        info!("priming fill complete");
        Ok(())
    }

    /// Run the full throughput benchmark: prime, hand the link to the
    /// pipeline worker, then ramp each pattern through the intensity levels.
    pub async fn run_throughput(&self, mut link: DeviceLink) -> Result<BenchReport> {
        self.prime_device(&mut link).await?;

        let worker = PipelineWorker::new(self.session.clone(), link);
        let mut worker_handle = tokio::spawn(worker.run());

        let generator = PacedGenerator::new(self.config.clone(), self.session.clone());
        let mut report = BenchReport::new(
            BenchMode::Throughput,
            self.config.page_size,
            self.config.device_span,
        );

        for pattern in AccessPattern::ALL {
            if self.session.cancel.is_cancelled() {
                break;
            }
            info!(%pattern, "starting intensity ramp");

            let mut rows = Vec::new();
            for intensity in self.config.intensity_levels() {
                if self.session.cancel.is_cancelled() {
                    break;
                }

                let round = generator.throughput_round(pattern, intensity).await;
                info!(
                    %pattern,
                    intensity,
                    mean_kb_per_sec = round.mean_kb_per_sec(),
                    "round complete"
                );
                rows.push(IntensityRow::from(&round));

                self.cooldown().await;
                self.reap_worker_failure(&mut worker_handle).await?;
            }
            report.add_pattern(pattern, rows);
        }

        worker_handle.abort();
        Ok(report)
    }

    /// Run the full latency benchmark. The driver keeps the link and the
    /// generator issues every request synchronously itself; the pipeline
    /// never enters the picture.
    pub async fn run_latency(&self, mut link: DeviceLink) -> Result<BenchReport> {
        self.prime_device(&mut link).await?;

        let generator = PacedGenerator::new(self.config.clone(), self.session.clone());
        let mut report = BenchReport::new(
            BenchMode::Latency,
            self.config.page_size,
            self.config.device_span,
        );

        for pattern in AccessPattern::ALL {
            if self.session.cancel.is_cancelled() {
                break;
            }
            info!(%pattern, "starting intensity ramp");

            let mut rows = Vec::new();
            for intensity in self.config.intensity_levels() {
                if self.session.cancel.is_cancelled() {
                    break;
                }

                let round = generator.latency_round(&mut link, pattern, intensity).await?;
                info!(%pattern, intensity, mean_ms = round.mean_ms(), "round complete");
                rows.push(IntensityRow::from(&round));

                self.cooldown().await;
            }
            report.add_pattern(pattern, rows);
        }

        Ok(report)
    }

    /// Settle, then clear queue and log jointly so the next round starts
    /// from empty state.
    async fn cooldown(&self) {
        sleep(self.config.settle_time).await;
        let drained = self.session.queue.depth();
        if drained > 0 {
            debug!(backlog = drained, "queue still backlogged after settle; clearing");
        }
        self.session.reset_round();
    }

    /// Propagate a worker failure as a fatal harness error.
    ///
    /// The worker only ever finishes early on its own for a protocol fault or
    /// a panic; a cancellation-driven exit is reaped by the caller's own
    /// cancel checks instead.
    async fn reap_worker_failure(&self, handle: &mut JoinHandle<Result<()>>) -> Result<()> {
        if !handle.is_finished() || self.session.cancel.is_cancelled() {
            return Ok(());
        }
        match handle.await {
            Ok(Ok(())) => Err(anyhow!("pipeline worker exited unexpectedly")),
            Ok(Err(e)) => Err(e.context("pipeline worker failed")),
            Err(join) => Err(anyhow!(join).context("pipeline worker panicked")),
        }
    }
}
