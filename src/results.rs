//! Result collection and output.
//!
//! One table per access pattern on stdout, one row per intensity level, plus
//! an optional structured JSON dump of the whole report for post-processing.
//! Rows whose round produced no samples are flagged as insufficient data
//! rather than propagating a not-a-number into the report.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::BenchMode;
use crate::generator::{AccessPattern, LatencyRound, ThroughputRound};

/// One row of a per-pattern table.
#[derive(Debug, Clone, Serialize)]
pub struct IntensityRow {
    /// Offered intensity in requests/second.
    pub intensity: u32,
    /// Mean of the round's throughput samples (KB/s) or mean device
    /// processing time (ms), depending on the mode. `None` means the round
    /// produced no samples.
    pub metric: Option<f64>,
    /// Throughput samples taken, or requests issued, during the round.
    pub samples: u64,
    /// 99th percentile processing time in ms (latency mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_ms: Option<f64>,
}

impl From<&ThroughputRound> for IntensityRow {
    fn from(round: &ThroughputRound) -> Self {
        Self {
            intensity: round.intensity,
            metric: round.mean_kb_per_sec(),
            samples: round.samples.len() as u64,
            p99_ms: None,
        }
    }
}

impl From<&LatencyRound> for IntensityRow {
    fn from(round: &LatencyRound) -> Self {
        Self {
            intensity: round.intensity,
            metric: round.mean_ms(),
            samples: round.requests,
            p99_ms: round.p99_ms(),
        }
    }
}

/// All rows collected for one access pattern.
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub pattern: AccessPattern,
    pub rows: Vec<IntensityRow>,
}

/// The complete output of one harness run.
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub harness_version: &'static str,
    pub mode: BenchMode,
    pub generated_at: DateTime<Utc>,
    pub page_size: u64,
    pub device_span: u64,
    pub patterns: Vec<PatternReport>,
}

impl BenchReport {
    pub fn new(mode: BenchMode, page_size: u64, device_span: u64) -> Self {
        Self {
            harness_version: crate::VERSION,
            mode,
            generated_at: Utc::now(),
            page_size,
            device_span,
            patterns: Vec::new(),
        }
    }

    pub fn add_pattern(&mut self, pattern: AccessPattern, rows: Vec<IntensityRow>) {
        self.patterns.push(PatternReport { pattern, rows });
    }

    /// Print one table per pattern to stdout.
    pub fn print_tables(&self) {
        let request_label = format!("Intensity (#{}K-Reqs/s)", self.page_size / 1024);
        let (title, metric_label) = match self.mode {
            BenchMode::Throughput => ("Throughput Benchmark", "Throughput (KB/s)"),
            BenchMode::Latency => ("Latency Benchmark", "Latency (ms)"),
        };

        for pattern in &self.patterns {
            println!("{} - {}:", title, pattern.pattern);
            println!("  {:>22}   {:>18}", request_label, metric_label);
            for row in &pattern.rows {
                match row.metric {
                    Some(value) => println!("  {:>22}   {:>18.2}", row.intensity, value),
                    None => println!("  {:>22}   {:>18}", row.intensity, "insufficient data"),
                }
            }
            println!();
        }
    }

    /// Write the whole report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path)
            .with_context(|| format!("cannot create results file {}", path.display()))?;
        let json = serde_json::to_string_pretty(self).context("results serialization failed")?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("cannot write results file {}", path.display()))?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
