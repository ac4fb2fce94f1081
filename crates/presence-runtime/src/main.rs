//! # Presence-Chain Runtime
//!
//! Entry point: configuration, telemetry, wiring, then JSON lines on
//! stdin/stdout until EOF or Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, warn};

use presence_runtime::container::RuntimeConfig;
use presence_runtime::PresenceRuntime;
use presence_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the protocol
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;
    if config.security.dev_mode {
        warn!("Development mode: using a generated codec secret, codes will not survive a restart");
    }
    config
        .validate_for_production()
        .context("Refusing to start")?;

    info!("===========================================");
    info!("  Presence-Chain Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let runtime = Arc::new(PresenceRuntime::new(config));
    let serving = Arc::clone(&runtime);
    let mut server = tokio::spawn(async move {
        serving
            .serve(BufReader::new(stdin()), stdout())
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("Server task panicked")?.context("I/O error while serving")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            runtime.shutdown();
            server
                .await
                .context("Server task panicked")?
                .context("I/O error while serving")?;
        }
    }

    info!("Shutdown complete");
    Ok(())
}
