use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ingest::Ingestor;
use crate::poll::Poller;
use crate::trail::TrailCache;

use super::api::ingest as ingest_handlers;
use super::api::trail as trail_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::Config;

const FIX_QUEUE_DEPTH: usize = 256;

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();

    let cache = Arc::new(TrailCache::new(config.store.resolve()));
    if !cache.is_available() {
        log::warn!("no location store configured; trail operations degrade to empty");
    }

    let (fix_tx, fix_rx) = mpsc::channel(FIX_QUEUE_DEPTH);
    let (mut ingestor, status_rx) =
        Ingestor::spawn(cache.clone(), fix_rx, config.ingest.write_window);
    let (mut poller, snapshot_rx) = Poller::spawn(cache.clone(), config.poll.interval);

    let state = AppState {
        config: Arc::new(config),
        cache,
        fix_tx,
        status_rx,
        snapshot_rx,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Ingress
        .route("/api/fix", post(ingest_handlers::submit_fix))
        .route("/api/fix/error", post(ingest_handlers::submit_error))
        // Trail reads
        .route("/api/trail", get(trail_handlers::trail))
        .route("/api/trail/live", get(trail_handlers::live))
        .route("/api/trail/status", get(trail_handlers::status))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Shutting down workers");
    poller.stop().await;
    ingestor.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {}", e);
    }
}
