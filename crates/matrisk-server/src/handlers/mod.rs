//! HTTP route handlers for the prediction server.

pub mod model;
pub mod predict;

use std::any::Any;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use matrisk_core::HealthStatus;
use tracing::error;

use crate::flash;
use crate::views;
use crate::ServerState;

/// Input form. Pending flash messages are shown once.
pub async fn index(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let Some(id) = flash::cookie_id(&headers) else {
        return Html(views::index(&[])).into_response();
    };
    let flashes = state.flashes.take(id);
    ([(SET_COOKIE, flash::expire_cookie(id))], Html(views::index(&flashes))).into_response()
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthStatus> {
    Json(state.gateway.health())
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found()))
}

/// Renders the 500 page for a panicking handler.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::internal_error())).into_response()
}
