//! Command-line interface.
//!
//! The only required argument is the device peer's socket path; everything
//! else defaults to the reference deployment values in [`crate::defaults`].
//! Clap rejects a missing or extra positional argument with a usage error.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

/// FlashBench - a rate-paced workload and measurement harness for simulated
/// flash storage devices
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Filesystem path of the device peer's listening socket
    pub socket: PathBuf,

    /// Benchmark variant to run
    #[clap(long, value_enum, default_value_t = BenchMode::Throughput)]
    pub mode: BenchMode,

    /// Transfer real payload bytes with each request (must match the device
    /// peer's data-transfer configuration)
    #[clap(long, default_value_t = false)]
    pub transfer_data: bool,

    /// Write structured results to this file as JSON
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Device page size in bytes
    #[clap(long, default_value_t = defaults::PAGE_SIZE)]
    pub page_size: u64,

    /// Addressable span of the device in bytes
    #[clap(long, default_value_t = defaults::DEVICE_SPAN)]
    pub device_span: u64,

    /// Activity log capacity in entries
    #[clap(long, default_value_t = defaults::LOG_CAPACITY)]
    pub log_capacity: usize,

    /// First intensity level and increment between levels (requests/s)
    #[clap(long, default_value_t = defaults::INTENSITY_TICK)]
    pub intensity_tick: u32,

    /// Final intensity level of the ramp (requests/s)
    #[clap(long, default_value_t = defaults::MAX_INTENSITY)]
    pub max_intensity: u32,

    /// Duration of one benchmark round (e.g. "5s", "500ms")
    #[clap(long, value_parser = parse_duration, default_value = "5s")]
    pub round_duration: Duration,

    /// Cooldown between rounds (e.g. "2s")
    #[clap(long, value_parser = parse_duration, default_value = "2s")]
    pub settle_time: Duration,

    /// Skip the sequential priming fill before the first measured round
    #[clap(long, default_value_t = false)]
    pub skip_fill: bool,
}

/// Benchmark variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchMode {
    /// Paced asynchronous submission; reports sampled throughput in KB/s
    #[clap(name = "throughput")]
    Throughput,

    /// Synchronous issuance; reports mean device processing time in ms
    #[clap(name = "latency")]
    Latency,
}

impl std::fmt::Display for BenchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchMode::Throughput => write!(f, "Throughput"),
            BenchMode::Latency => write!(f, "Latency"),
        }
    }
}

/// Parse duration from string (e.g. "500ms", "10s", "5m").
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in duration: {}", num_str))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs_f64(num),
        "m" => Duration::from_secs_f64(num * 60.0),
        _ => return Err(format!("invalid duration unit: {}", unit)),
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
    }

    #[test]
    fn socket_path_is_required() {
        assert!(Args::try_parse_from(["flashbench"]).is_err());
    }

    #[test]
    fn extra_positional_is_rejected() {
        assert!(Args::try_parse_from(["flashbench", "/tmp/dev.sock", "extra"]).is_err());
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let args = Args::try_parse_from(["flashbench", "/tmp/dev.sock"]).unwrap();
        assert_eq!(args.mode, BenchMode::Throughput);
        assert_eq!(args.page_size, 4096);
        assert_eq!(args.device_span, 40_263_680);
        assert_eq!(args.intensity_tick, 200);
        assert_eq!(args.max_intensity, 4000);
        assert_eq!(args.round_duration, Duration::from_secs(5));
        assert_eq!(args.settle_time, Duration::from_secs(2));
        assert!(!args.transfer_data);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
