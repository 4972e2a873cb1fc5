//! Player Movement Server - authoritative movement simulation
//!
//! Entry point for the simulation process. It handles:
//! - Loading configuration from the environment
//! - Running the fixed-step movement driver
//! - Feeding scripted bots and logging snapshots in demo mode

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use player_move_server::config::Config;
use player_move_server::game::bots::{populate_demo_world, run_bots};
use player_move_server::game::{DriverHandle, SimulationDriver};
use player_move_server::movement::MovementInterceptor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Player Movement Server");
    info!(
        tps = config.simulation_tps,
        snapshot_interval = config.snapshot_interval_ticks,
        max_backlog = config.max_backlog_commands,
        "Simulation settings"
    );

    let interceptor = MovementInterceptor::with_base_solver(config.movement);
    let (mut driver, handle) = SimulationDriver::new(&config, interceptor);

    let bots = populate_demo_world(&mut driver, config.demo_seed)?;
    tokio::spawn(run_bots(bots, handle.clone(), config.simulation_tps));
    tokio::spawn(log_snapshots(handle));

    let max_ticks = (config.demo_ticks > 0).then_some(config.demo_ticks);

    tokio::select! {
        driver = driver.run(max_ticks) => {
            info!(ticks = driver.tick(), "Demo run finished");
        }
        _ = shutdown_signal() => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Log every snapshot as JSON at debug level
async fn log_snapshots(handle: DriverHandle) {
    let mut snapshots = handle.subscribe();
    loop {
        match snapshots.recv().await {
            Ok(snapshot) => match serde_json::to_string(&snapshot) {
                Ok(json) => debug!(tick = snapshot.tick, snapshot = %json, "Movement snapshot"),
                Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Snapshot logger lagging");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
