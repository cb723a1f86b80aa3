use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use textlens_api::{metrics, ServerConfig, ServerEvent};
use textlens_engine::{FixtureRecognizer, TextRecognizer};
use textlens_server::LifecycleManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let http_port = config.http_port;
    let ws_port = config.ws_port;

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let mut manager = LifecycleManager::new(config, || {
        Arc::new(FixtureRecognizer::default()) as Arc<dyn TextRecognizer>
    });
    if metrics_enabled {
        manager = manager.with_metrics(metrics::init_metrics());
        info!("metrics enabled, serving /metrics");
    }
    let manager = Arc::new(manager);

    manager
        .start(http_port, ws_port)
        .await
        .map_err(|e| anyhow::anyhow!("failed to start server: {e}"))?;

    let http_address = manager.server_address().await;
    let ws_address = manager.websocket_address().await;
    info!(address = %http_address, "HTTP endpoint");
    info!(address = %ws_address, "WebSocket endpoint");

    // Mirror server activity into the process log.
    let (subscription, mut events) = manager.subscribe();
    let observer = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ServerEvent::RequestLogged(entry) => info!("{}", entry.formatted()),
                    ServerEvent::ConnectionCount(count) => {
                        info!(count, "websocket connections")
                    }
                }
            }
            manager.unsubscribe(subscription);
        })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    manager.stop().await;
    observer.abort();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("textlens=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
