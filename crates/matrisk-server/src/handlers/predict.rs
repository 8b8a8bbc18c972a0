//! Prediction handlers for the HTML form and the JSON API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use matrisk_core::{FeatureRecord, RiskError};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dto::PredictResponse;
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::views;
use crate::ServerState;

/// Handles the input form: renders results, or flashes the error and
/// redirects back to the form.
pub async fn predict(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    let fail = |message: String| flash::redirect_with(&state.flashes, &headers, Flash::error(message));

    let pairs = match form {
        Ok(Form(pairs)) => pairs,
        Err(e) => {
            warn!("Rejected prediction form: {}", e);
            return fail(format!("Error making prediction: {}", e.body_text()));
        }
    };

    let features = match FeatureRecord::from_form(pairs) {
        Ok(features) => features,
        Err(e) => {
            warn!("{}", e);
            return fail(e.to_string());
        }
    };

    match state.gateway.assess(&features) {
        Ok(assessment) => {
            info!(
                "Predicted {} ({}) with {}",
                assessment.info.risk_level, assessment.info.confidence, assessment.model_name
            );
            Html(views::results(&features, &assessment)).into_response()
        }
        Err(RiskError::ModelUnavailable) => {
            fail("Model not loaded. Please contact administrator.".to_string())
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            fail(format!("Error making prediction: {}", e))
        }
    }
}

/// JSON values that count as "no data".
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Handles `POST /api/predict` with a JSON object of features.
pub async fn api_predict(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let data: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            error!("API prediction failed: {}", e);
            AppError::Internal(e.to_string())
        })?
    };

    if is_empty_payload(&data) {
        return Err(AppError::BadRequest("No data provided".into()));
    }
    let Value::Object(object) = &data else {
        return Err(AppError::Internal("Expected a JSON object of features".into()));
    };

    let features = FeatureRecord::from_json_object(object);
    let assessment = state.gateway.assess(&features).map_err(|e| {
        error!("API prediction failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(PredictResponse {
        success: true,
        prediction: assessment.info,
        model_name: assessment.model_name,
    }))
}
