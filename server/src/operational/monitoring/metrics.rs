// mmo_world_server/server/src/operational/monitoring/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Instant;

pub struct MetricsSystem {
    start_time: Instant,
}

impl MetricsSystem {
    /// Installs the Prometheus exporter on `port` and registers the world metrics.
    pub fn new(port: u16) -> Result<Self> {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;

        describe_gauge!("world_players_connected", "Number of players currently online");
        describe_counter!("world_broadcast_messages_total", "Messages delivered by broadcasts");
        describe_counter!("world_send_failures_total", "Messages that could not be queued for a client");
        describe_counter!("world_decode_errors_total", "Inbound payloads that failed to decode");
        describe_counter!("world_dropped_requests_total", "Inbound requests dropped without handling");

        Ok(MetricsSystem {
            start_time: Instant::now(),
        })
    }

    pub fn update_player_count(&self, count: usize) {
        gauge!("world_players_connected").set(count as f64);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mmo_world_server_core=info,warn".into()),
        )
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
