//! End-to-end harness runs against the mock device with a shrunken
//! configuration.

mod common;

use std::time::Duration;

use common::MockDevice;
use flashbench::driver::Driver;
use flashbench::protocol::DeviceLink;
use flashbench::{BenchMode, HarnessConfig, Session};

fn short_config() -> HarnessConfig {
    HarnessConfig {
        page_size: 4096,
        device_span: 4096 * 16,
        intensity_tick: 1000,
        max_intensity: 1000,
        round_duration: Duration::from_millis(400),
        settle_time: Duration::from_millis(50),
        sample_interval: Duration::from_millis(50),
        sample_warmup: Duration::from_millis(100),
        ..Default::default()
    }
}

#[tokio::test]
async fn throughput_run_produces_one_row_per_pattern_and_level() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("device.sock");
    let device = MockDevice::spawn(&socket, false, 0);

    let config = short_config();
    let link = DeviceLink::connect(&socket, &config).await.unwrap();
    let session = Session::new(&config);
    let driver = Driver::new(config, session);

    let report = driver.run_throughput(link).await.unwrap();

    assert_eq!(report.mode, BenchMode::Throughput);
    assert_eq!(report.patterns.len(), 4);
    for pattern in &report.patterns {
        assert_eq!(pattern.rows.len(), 1);
        let row = &pattern.rows[0];
        assert_eq!(row.intensity, 1000);
        // The mock device completes instantly, so sampled throughput over a
        // drained pipeline must be positive.
        let mean = row.metric.expect("round produced samples");
        assert!(mean > 0.0, "mean throughput was {mean} KB/s");
    }

    // Priming fill plus four measured rounds all went over one connection.
    assert!(device.request_count() > 16);
    device.shutdown();
}

#[tokio::test]
async fn latency_run_reports_mean_device_processing_time() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("device.sock");
    let device = MockDevice::spawn(&socket, false, 2_000);

    let config = short_config();
    let link = DeviceLink::connect(&socket, &config).await.unwrap();
    let session = Session::new(&config);
    let driver = Driver::new(config, session);

    let report = driver.run_latency(link).await.unwrap();

    assert_eq!(report.mode, BenchMode::Latency);
    assert_eq!(report.patterns.len(), 4);
    for pattern in &report.patterns {
        let row = &pattern.rows[0];
        assert!(row.samples > 0);
        // Every completion reports 2000 us, so the mean is exactly 2 ms.
        assert_eq!(row.metric, Some(2.0));
        assert_eq!(row.p99_ms, Some(2.0));
    }

    device.shutdown();
}

#[tokio::test]
async fn cancelled_run_still_returns_a_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("device.sock");
    let device = MockDevice::spawn(&socket, false, 0);

    let config = short_config();
    let link = DeviceLink::connect(&socket, &config).await.unwrap();
    let session = Session::new(&config);
    session.cancel.cancel();
    let driver = Driver::new(config, session);

    let report = driver.run_throughput(link).await.unwrap();
    assert!(report.patterns.is_empty());

    device.shutdown();
}
