//! FlashBench entry point.
//!
//! Connects to the device peer named on the command line, runs the selected
//! benchmark variant across all four access patterns, prints one table per
//! pattern, and optionally writes structured JSON results.
//!
//! Any protocol fault is terminal: the error is reported with the failing
//! operation and the process exits non-zero. Ctrl+C requests a graceful early
//! stop through the session's cancel flag; the current round finishes its
//! in-flight exchange and the partial report is still produced.

use anyhow::{Context, Result};
use clap::Parser;
use flashbench::{
    cli::{Args, BenchMode},
    config::HarnessConfig,
    driver::Driver,
    logging,
    protocol::DeviceLink,
    session::Session,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let config = HarnessConfig::from_args(&args)?;

    info!(
        version = flashbench::VERSION,
        mode = %args.mode,
        "starting flashbench"
    );

    let link = DeviceLink::connect(&args.socket, &config)
        .await
        .with_context(|| {
            format!(
                "cannot connect to device peer at `{}`",
                args.socket.display()
            )
        })?;

    let session = Session::new(&config);

    // Ctrl+C requests a graceful stop; emission and dequeueing both observe
    // the flag.
    {
        let cancel = session.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; stopping after the in-flight exchange");
                cancel.cancel();
            }
        });
    }

    let driver = Driver::new(config.clone(), session);
    let report = match args.mode {
        BenchMode::Throughput => driver.run_throughput(link).await?,
        BenchMode::Latency => driver.run_latency(link).await?,
    };

    report.print_tables();

    if let Some(path) = &args.output {
        report.write_json(path)?;
        info!("results written to `{}`", path.display());
    }

    info!("flashbench finished");
    Ok(())
}
