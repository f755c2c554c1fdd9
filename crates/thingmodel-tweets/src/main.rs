//! Tweet adapter binary.
//!
//! Streams statuses from the configured feed, registers geo-tagged tweets in
//! an in-memory warehouse, forwards them to the WebSocket sink and serves a
//! read-only status API. Stops cleanly on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;

use thingmodel_tweets::api::{self, ApiState};
use thingmodel_tweets::config;
use thingmodel_tweets::error::IngestError;
use thingmodel_tweets::feed::{self, HttpStreamFeed};
use thingmodel_tweets::ingest::TweetAdapter;
use thingmodel_tweets::wait_for_stop;
use thingmodel_sink::WebSocketSink;
use thingmodel_warehouse::Warehouse;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("THINGMODEL_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration, the adapter cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let warehouse = Arc::new(Warehouse::new());
    let sink = WebSocketSink::spawn(
        config.adapter.name.clone(),
        config.adapter.endpoint.clone(),
        config.adapter.sink_queue,
    );
    let adapter = TweetAdapter::new(Arc::clone(&warehouse), sink.handle())
        .expect("tweet type declaration is valid");

    // Cooperative stop shared by the adapter and the status API
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);
    {
        let stop_tx = Arc::clone(&stop_tx);
        tokio::spawn(async move {
            shutdown_signal().await;
            stop_tx.send_replace(true);
        });
    }

    // Status API
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind status API address, is another process using this port?");
    let state = ApiState {
        warehouse: Arc::clone(&warehouse),
        ingest: Arc::clone(adapter.stats()),
        sink: Some(Arc::clone(sink.handle().stats())),
    };
    let api_task = tokio::spawn(api::serve(listener, state, wait_for_stop(stop_rx.clone())));

    // Feed
    let client = feed::http_client().expect("failed to build HTTP client");
    tracing::info!(
        adapter = %config.adapter.name,
        endpoint = %config.adapter.endpoint,
        feed = %config.feed.url,
        "starting tweet adapter"
    );

    let feed = HttpStreamFeed::connect_until_stopped(
        &client,
        &config.feed.url,
        config.feed.token.as_deref(),
        stop_rx.clone(),
    )
    .await;
    let result = match feed {
        Some(Ok(mut feed)) => adapter.run(&mut feed, stop_rx).await,
        Some(Err(e)) => Err(IngestError::from(e)),
        None => {
            tracing::info!("stop requested before the feed connected");
            Ok(())
        }
    };
    if let Err(e) = &result {
        tracing::error!("ingestion ended with error: {}", e);
    }

    // Tear down: stop the API, then let the sink writer drain
    stop_tx.send_replace(true);
    match api_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("status API failed: {}", e),
        Err(e) => tracing::error!("status API task failed: {}", e),
    }

    let ingest = adapter.stats().snapshot();
    drop(adapter);
    let delivered = sink.shutdown().await;
    tracing::info!(
        received = ingest.received,
        registered = ingest.registered,
        unchanged = ingest.unchanged,
        skipped_without_location = ingest.skipped_without_location,
        control = ingest.control,
        failed = ingest.failed,
        things = warehouse.len(),
        sink_delivered = delivered.delivered,
        sink_dropped = delivered.dropped,
        "tweet adapter shut down"
    );

    if result.is_err() {
        std::process::exit(1);
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
