//! Model information page.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};

use crate::flash::{self, Flash};
use crate::views;
use crate::ServerState;

/// Shows the loaded model's name, feature columns and importance table.
pub async fn model_info(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let (Some(model), Some(preprocessor)) = (state.gateway.model(), state.gateway.preprocessor())
    else {
        return flash::redirect_with(&state.flashes, &headers, Flash::error("Model not loaded."));
    };

    let features = preprocessor.feature_columns().unwrap_or_default();
    let importance = model.feature_importance().unwrap_or_default();
    Html(views::model_info(model.name(), features, importance)).into_response()
}
