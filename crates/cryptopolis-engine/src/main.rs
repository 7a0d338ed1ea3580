//! Headless engine binary for the Cryptopolis simulation.
//!
//! Loads configuration, starts (or resumes) a session, places the opening
//! build order, and drives the day loop in real time until a win or lose
//! condition, the day limit, or Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `cryptopolis-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Validate configuration
//! 4. Restore the snapshot at `session.snapshot_path`, or start fresh
//! 5. Place the opening build order on a fresh session
//! 6. Run the session loop
//! 7. Log the result and write the final snapshot

mod error;
mod narrator;

use std::path::Path;

use cryptopolis_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use cryptopolis_core::economy::PlacementRequest;
use cryptopolis_core::runner::{self, Command};
use cryptopolis_core::tick::Session;
use cryptopolis_events::Filter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::narrator::SummaryLogger;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "cryptopolis-config.yaml";

/// Command channel depth.
const COMMAND_BUFFER: usize = 32;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, startup, or the final snapshot fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("cryptopolis-engine starting");
    if !from_file {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }

    // 3. Validate.
    config.validate()?;
    info!(
        name = %config.session.name,
        seed = config.session.seed,
        day_interval_ms = config.session.day_interval_ms,
        starting_treasury = %config.session.starting_treasury,
        max_days = config.session.max_days,
        "Configuration loaded"
    );

    // 4. Restore or start fresh.
    let mut session = open_session(&config)?;
    session.subscribe(Filter::All, narrator::handler());

    // 5. Opening build order.
    if session.state().day() == 0 && session.state().buildings.is_empty() {
        for build in &config.session.opening_builds {
            let request = PlacementRequest::new(build.building_type, build.x, build.y);
            if let Err(err) = session.place_building(request) {
                warn!(
                    building_type = ?build.building_type,
                    x = build.x,
                    y = build.y,
                    error = %err,
                    "Opening build rejected"
                );
            }
        }
        info!(
            buildings = session.state().building_count(),
            treasury = %session.state().balance(),
            "Opening build order placed"
        );
    }

    // 6. Run the session.
    let (tx, mut rx) = mpsc::channel(COMMAND_BUFFER);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            if tx.send(Command::Stop).await.is_err() {
                debug!("Session loop already finished");
            }
        }
    });

    let mut callback = SummaryLogger;
    let result =
        runner::run_session(&mut session, &mut rx, config.session.max_days, &mut callback)
            .await?;

    // 7. Log results and persist.
    runner::log_session_end(&result);
    if let Some(path) = &config.session.snapshot_path {
        write_snapshot(&session, path)?;
    }

    info!(
        end_reason = ?result.end_reason,
        final_day = result.final_day,
        "cryptopolis-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from [`CONFIG_PATH`], falling back to defaults.
///
/// Returns whether the file was found.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((SimulationConfig::from_file(config_path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.session.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Resume from the configured snapshot if one exists, otherwise start fresh.
fn open_session(config: &SimulationConfig) -> Result<Session, EngineError> {
    let Some(path) = config.session.snapshot_path.as_deref().filter(|p| p.exists()) else {
        return Ok(Session::new(config)?);
    };
    let json = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (session, warning) = Session::restore(&json, config)?;
    match warning {
        Some(err) => warn!(path = %path.display(), error = %err, "Snapshot discarded"),
        None => info!(
            path = %path.display(),
            day = session.state().day(),
            "Session resumed from snapshot"
        ),
    }
    Ok(session)
}

fn write_snapshot(session: &Session, path: &Path) -> Result<(), EngineError> {
    let json = session.snapshot()?;
    std::fs::write(path, json).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), day = session.state().day(), "Snapshot written");
    Ok(())
}
