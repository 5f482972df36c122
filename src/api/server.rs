//! HTTP server implementation

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::EngineSlot;
use crate::Result;

/// Router with middleware, without binding a socket
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new().nest("/api", routes::api_routes(state)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors),
    )
}

/// Load the engine off the async runtime and publish it into `slot`
#[cfg(feature = "local-models")]
fn spawn_engine_loader(config: AppConfig, slot: Arc<EngineSlot>) {
    tokio::task::spawn_blocking(move || {
        info!("Loading index and models...");
        match crate::rag::RetrievalEngine::load(&config) {
            Ok(engine) => {
                info!(
                    "Engine ready: {} verses (build {})",
                    engine.len(),
                    crate::index::artifacts::short_id(engine.build_id())
                );
                slot.install(engine);
            }
            Err(e) => {
                tracing::error!("Failed to load search engine: {}", e);
                slot.mark_failed(e.to_string());
            }
        }
    });
}

#[cfg(not(feature = "local-models"))]
fn spawn_engine_loader(_config: AppConfig, slot: Arc<EngineSlot>) {
    warn!("Built without local-models: the search endpoint will answer 500");
    slot.mark_failed("built without the local-models feature");
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16) -> Result<()> {
    info!("Starting verserag API server...");

    let slot = Arc::new(EngineSlot::new());
    spawn_engine_loader(config.clone(), Arc::clone(&slot));

    let state = AppState {
        engine: slot,
        relevance_threshold: config.server.relevance_threshold,
    };
    let app = build_app(state, &config.server.cors_origins);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health  - Health check");
    info!("  POST /api/search  - Verse search");

    axum::serve(listener, app).await?;

    Ok(())
}
