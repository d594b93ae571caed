//! # nakt-sim
//!
//! Runs one overlay simulation and prints its report as JSON on stdout.
//!
//! ```text
//! nakt-sim [config.json]
//! ```
//!
//! Without an argument the path comes from `NK_CONFIG`; without either, the
//! built-in demo scenario runs. Logs go to stderr (see `overlay-telemetry`).

use anyhow::{Context, Result};
use overlay_telemetry::{init_telemetry, TelemetryConfig};
use sim_runtime::{Simulation, SimulationConfig};
use tracing::info;

fn load_config() -> Result<SimulationConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NK_CONFIG").ok());

    let mut config = match path {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            SimulationConfig::load(&path)
                .with_context(|| format!("failed to load configuration from {path}"))?
        }
        None => {
            info!("No configuration given, running the demo scenario");
            SimulationConfig::demo()
        }
    };
    config
        .apply_env_overrides()
        .context("invalid NK_* environment override")?;
    Ok(config)
}

fn main() -> Result<()> {
    let _guard = init_telemetry(TelemetryConfig::from_env()).context("failed to start logging")?;

    let config = load_config()?;
    let mut simulation = Simulation::new(config).context("configuration rejected")?;
    let report = simulation.run().context("simulation aborted")?;

    println!("{}", report.to_json().context("failed to render report")?);
    Ok(())
}
