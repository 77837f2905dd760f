// File: src/main.rs
//
// ledger-harness binary: run the built-in transfer scenario against the
// configured node executables and report the outcome.

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use ledger_harness::{HarnessConfig, ScenarioDriver};

fn setup_logger() -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .level_for("ledger_harness", log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = HarnessConfig::parse();
    setup_logger()?;

    info!(
        "ledger-harness v{}: {} participants, delegate {}, node {}",
        ledger_harness::VERSION,
        config.participants,
        config.delegate_exe.display(),
        config.node_exe.display()
    );

    let driver = ScenarioDriver::new(config);
    match driver.run().await {
        Ok(report) => {
            info!("scenario passed: {} participants", report.participants);
            for transfer in &report.transfers {
                info!(
                    "  {} -> {}: {} units converged in {:?}",
                    transfer.from, transfer.to, transfer.amount, transfer.elapsed
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("scenario failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
