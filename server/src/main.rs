// mmo_world_server/server/src/main.rs
use anyhow::Context;
use mmo_world_server_core::core::config::ServerConfig;
use mmo_world_server_core::operational::monitoring::metrics::{init_logging, MetricsSystem};
use mmo_world_server_core::server::instance::MmoGameServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        eprintln!("Backtrace:\n{:?}", std::backtrace::Backtrace::capture());
    }));

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
    }

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(&path).with_context(|| format!("Failed to load config from {}", path))?,
        None => {
            info!("No config file given, using defaults");
            ServerConfig::default()
        }
    };
    let config = Arc::new(config);
    info!("Starting {} with {:?}", config.name, config);

    let metrics = match config.metrics_port {
        Some(port) => match MetricsSystem::new(port) {
            Ok(metrics) => {
                info!("Prometheus exporter listening on port {}", port);
                Some(Arc::new(metrics))
            }
            Err(e) => {
                warn!("Metrics disabled: {:?}", e);
                None
            }
        },
        None => None,
    };

    let game = MmoGameServer::new(config.clone()).context("Failed to build the world")?;
    let tcp = game.bind().await.context("Failed to bind TCP listener")?;

    let stats_game = game.clone();
    let stats_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATS_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let world = stats_game.world();
            let stats = world.aoi().stats();
            if let Some(metrics) = &metrics {
                metrics.update_player_count(world.player_count());
                info!("Uptime {}s", metrics.uptime_secs());
            }
            info!(
                "Players online: {}, occupied cells: {}/{}, busiest cell: {}",
                world.player_count(),
                stats.occupied_cells,
                stats.total_cells,
                stats.max_occupants_per_cell
            );
        }
    });

    let mut server_task = tokio::spawn(tcp.clone().run());

    let finished = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            tcp.shutdown();
            (&mut server_task).await
        }
        finished = &mut server_task => finished,
    };

    stats_task.abort();
    match finished {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server stopped with error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
    Ok(())
}
