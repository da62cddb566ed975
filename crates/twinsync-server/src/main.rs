//! Twinsync server: runs the substation test stand in real time.
//!
//! ```bash
//! twinsync-server --config crates/twinsync-server/config/teststand.toml
//! twinsync-server --step-size 1.0 --log-level debug
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use twinsync_engine::ShutdownHandle;
use twinsync_models::SubstationProvider;
use twinsync_store::AccessGate;

use crate::config::ServerConfig;

/// Twinsync server
#[derive(Parser, Debug)]
#[command(name = "twinsync-server")]
#[command(version, about = "Real-time digital twin of a district heating substation")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the synchronization step size, in seconds
    #[arg(long)]
    step_size: Option<f64>,

    /// Override the model reference
    #[arg(long)]
    model: Option<String>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_overrides(cli.step_size, cli.model.clone());

    if let Err(e) = run(config).await {
        error!(error = format!("{e:#}"), "twinsync server failed");
        return Err(e);
    }
    Ok(())
}

async fn run(config: ServerConfig) -> Result<()> {
    let sync = config.sync_config();
    sync.validate().context("invalid [sync] section")?;
    let definitions = config.layout()?;
    let provider = SubstationProvider::new(config.model_params());

    info!(
        model = %config.model.reference,
        step_size = sync.step_size,
        variables = definitions.len(),
        "starting twinsync server"
    );

    let driver = twinsync_engine::start(&provider, &config.model.reference, definitions, sync)
        .context("failed to start the synchronization driver")?;

    let users = config.user_database();
    if users.is_empty() {
        warn!("no users configured, external writes will be rejected");
    }
    // This binary has no network front end to hand the gate to. It only
    // checks that anonymous sessions see the published initial outputs.
    let gate = AccessGate::new(Arc::clone(driver.store()), users);
    let outputs = gate
        .anonymous()
        .read_all(driver.store().output_names())
        .context("failed to read initial outputs")?;
    drop(gate);
    for (name, value) in outputs.iter() {
        debug!(%name, %value, "initial output");
    }
    info!(
        users = config.users.len(),
        outputs = outputs.len(),
        "twin running, press Ctrl+C to stop"
    );

    tokio::spawn(shutdown_on_signal(driver.shutdown_handle()));

    let report = tokio::task::spawn_blocking(move || driver.run_until_shutdown())
        .await
        .context("driver task panicked")?;

    info!(
        total_ms = report.total_ms,
        cycles_completed = report.metrics.cycles_completed,
        cycles_failed = report.metrics.cycles_failed,
        firings_skipped = report.metrics.firings_skipped,
        sim_time = ?report.sim_time,
        "twinsync server stopped"
    );
    if !report.timer_joined || !report.worker_joined {
        warn!(
            timer_joined = report.timer_joined,
            worker_joined = report.worker_joined,
            "driver threads did not stop cleanly"
        );
    }
    Ok(())
}

/// Request driver shutdown on Ctrl+C or SIGTERM.
async fn shutdown_on_signal(handle: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!(error = %e, "failed to listen for Ctrl+C");
                            return;
                        }
                        info!("received Ctrl+C");
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                info!("received Ctrl+C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("received Ctrl+C");
    }

    handle.request();
}
