use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notification_hub::bus::{BusBridge, BusTransport, LocalTransport, RedisTransport};
use notification_hub::config::Settings;
use notification_hub::hub::{ConnectionLimits, Hub};
use notification_hub::notification::{NotificationPublisher, UnreadCounter, ZeroUnreadCounter};
use notification_hub::server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");
    if settings.server.cors_origins.is_empty() {
        tracing::warn!("No CORS origins configured, browser WebSocket clients will be refused");
    }

    // Start the hub
    let limits = ConnectionLimits {
        max_connections_per_user: settings.hub.max_connections_per_user,
    };
    let (hub, hub_worker) = Hub::new(limits, settings.hub.delivery_buffer);
    tokio::spawn(hub_worker.run());

    // Pick the bus transport
    let transport: Arc<dyn BusTransport> = if settings.redis.enabled {
        let transport = RedisTransport::connect(&settings.redis.url)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", settings.redis.url))?;
        Arc::new(transport)
    } else {
        tracing::warn!("Redis disabled, publishes are delivered to this process only");
        Arc::new(LocalTransport::new(hub.clone()))
    };

    let counter: Arc<dyn UnreadCounter> = Arc::new(ZeroUnreadCounter);
    let publisher = NotificationPublisher::new(transport, counter.clone());

    // Create application state
    let state = AppState::new(settings.clone(), hub.clone(), publisher, counter);
    tracing::info!("Application state initialized");

    // Start the bus bridge in background
    let (shutdown_signal, bridge_handle) = if settings.redis.enabled {
        let bridge = Arc::new(BusBridge::new(
            settings.redis.clone(),
            hub.clone(),
            settings.hub.delivery_timeout(),
        ));
        let shutdown_signal = bridge.shutdown_signal();
        let handle = tokio::spawn(async move {
            if let Err(e) = bridge.start().await {
                tracing::error!(error = %e, "Bus bridge failed");
            }
        });
        (shutdown_signal, Some(handle))
    } else {
        (broadcast::channel(1).0, None)
    };
    drop(hub);

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    if let Some(handle) = bridge_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the bus bridge
    let _ = shutdown_tx.send(());
}
