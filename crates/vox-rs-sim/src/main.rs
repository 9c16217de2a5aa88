mod config;
mod error;
mod scenario;
mod simulation;

use std::time::Duration;

use config::SimConfig;
use scenario::Scenario;
use simulation::Simulation;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "sim.toml".into());
    let config = match SimConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let sim_config = &config.simulation;
    info!("vox-rs-sim v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Scenario: {}, tick: {} ms, max ticks: {}",
        sim_config.scenario,
        sim_config.tick_interval_ms,
        if sim_config.max_ticks == 0 {
            "unlimited".to_string()
        } else {
            sim_config.max_ticks.to_string()
        }
    );

    let scenario = match Scenario::load(&sim_config.scenario) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario {}: {e}", sim_config.scenario);
            std::process::exit(1);
        }
    };

    let mut sim = match &sim_config.load_snapshot {
        Some(path) => {
            let restored = std::fs::read_to_string(path)
                .map_err(|source| error::SimError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|json| Simulation::from_snapshot(scenario, &json));
            match restored {
                Ok(sim) => {
                    info!("Restored networks from {path}");
                    sim
                }
                Err(e) => {
                    eprintln!("Failed to restore snapshot {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => Simulation::new(scenario),
    };
    sim.report();

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let mut tick_interval =
        tokio::time::interval(Duration::from_millis(sim_config.tick_interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                sim.step();

                let tick = sim.current_tick();
                let interval = sim_config.report_interval;
                if interval > 0 && tick.is_multiple_of(interval) {
                    sim.report();
                }
                if sim_config.max_ticks > 0 && tick >= sim_config.max_ticks {
                    info!("Reached {tick} ticks");
                    break;
                }
                if sim_config.stop_when_idle && sim.is_idle() {
                    info!("Scenario finished at tick {tick}");
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    sim.report();

    if let Some(path) = &sim_config.save_snapshot {
        info!("Saving networks to {path}...");
        let written = sim.snapshot_json().and_then(|json| {
            std::fs::write(path, json).map_err(|source| error::SimError::Io {
                path: path.clone(),
                source,
            })
        });
        if let Err(e) = written {
            error!("Failed to save snapshot: {e}");
        }
    }

    info!(
        "Simulation stopped after {} ticks ({} network(s), {} block(s)).",
        sim.current_tick(),
        sim.engine().redstone().network_count(),
        sim.world().len()
    );
}
