//! Data transfer objects for JSON responses.

use matrisk_core::RiskInfo;
use serde::Serialize;

/// Response from the JSON prediction endpoint.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: RiskInfo,
    pub model_name: String,
}
