//! HTTP server entry point and Axum router setup.
//!
//! Loads configuration, prepares the model gateway (training a model on first
//! run), configures routes, and starts the Axum server.

mod bootstrap;
mod dto;
mod error;
mod flash;
mod handlers;
mod views;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use matrisk_config::AppConfig;
use matrisk_core::ModelGateway;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::flash::FlashStore;

/// Shared server state accessible from all handlers.
///
/// The gateway is read-only once built; only the flash store changes per request.
pub struct ServerState {
    pub config: AppConfig,
    pub gateway: ModelGateway,
    pub flashes: FlashStore,
}

impl ServerState {
    pub fn new(config: AppConfig, gateway: ModelGateway) -> Self {
        Self {
            config,
            gateway,
            flashes: FlashStore::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let default_filter = if config.debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .compact()
        .init();

    let gateway = bootstrap::init_gateway(&config).await;
    if !gateway.is_ready() {
        tracing::warn!("Serving without a model; predictions will fail until one is trained");
    }

    let addr = config.bind_addr();
    let app = app(Arc::new(ServerState::new(config, gateway)));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with every route, the static file service and middleware.
pub fn app(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict::predict))
        .route("/api/predict", post(handlers::predict::api_predict))
        .route("/model_info", get(handlers::model::model_info))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .fallback(handlers::not_found)
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(cors)
        .with_state(state)
}
