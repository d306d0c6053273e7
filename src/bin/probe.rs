//! Connection self-test: open the sensor, read a few frames, print stats.
//!
//! Usage: `vibrawatch-probe [PORT]`
//!
//! Without a port the device is auto-detected. Settings come from
//! `vibrawatch.toml` in the working directory if present, then from
//! `VIBRAWATCH_*` environment variables.

use anyhow::Context;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vibrawatch::{AcquisitionConfig, AcquisitionError, ConnectionManager};

const SAMPLES: usize = 10;
const SAMPLE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::args().nth(1);
    let config = AcquisitionConfig::load(Some(Path::new("vibrawatch.toml")))
        .context("Failed to load configuration")?;
    let manager = ConnectionManager::serial(config);

    let port = match manager.connect(port.as_deref()).await {
        Ok(port) => port,
        Err(AcquisitionError::NoPortSelected { matches, available }) => {
            eprintln!("Could not pick a port automatically ({matches} candidate(s)).");
            if available.is_empty() {
                eprintln!("No serial ports found.");
            } else {
                eprintln!("Available ports:");
                for port in &available {
                    eprintln!("  {port}");
                }
                eprintln!("Re-run with a port argument, e.g. vibrawatch-probe {}", available[0].id);
            }
            std::process::exit(2);
        }
        Err(e) => {
            for suggestion in e.recovery_suggestions() {
                eprintln!("  - {suggestion}");
            }
            return Err(e).context("Connection failed");
        }
    };

    println!("Connected to {port}");
    manager.start_capture().await.context("Failed to start capture")?;

    for n in 1..=SAMPLES {
        match manager.pop(SAMPLE_TIMEOUT).await {
            Some(record) => println!(
                "  sample {n:>2}: rms={} max={} crest={}",
                fmt_field(record.f64("rms")),
                fmt_field(record.f64("max")),
                fmt_field(record.f64("crest")),
            ),
            None => println!("  sample {n:>2}: timed out after {SAMPLE_TIMEOUT:?}"),
        }
    }

    let stats = manager.status().stats;
    println!(
        "Received {} | lost {} ({:.1}%) | ignored {} | dropped {} | buffered {}",
        stats.received,
        stats.lost,
        stats.loss_percent(),
        stats.ignored,
        stats.dropped,
        stats.buffer_size
    );

    manager.disconnect().await;
    Ok(())
}

fn fmt_field(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}
