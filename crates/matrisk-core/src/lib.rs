//! Core domain types and error definitions for matrisk.
//!
//! This crate provides the pieces shared by every matrisk component:
//!
//! - [`RiskError`] — Error type for request parsing and prediction
//! - [`FeatureRecord`] and [`FeatureValue`] — One request's named measurements
//! - [`Prediction`] — Class index plus probability vector from a model
//! - [`RiskInfo`] — Human-readable interpretation of a prediction
//! - [`RiskModel`] and [`Preprocessor`] — Contracts for model collaborators
//! - [`ModelGateway`] — Read-only context holding the loaded model
//!
//! # Example
//!
//! ```rust
//! use matrisk_core::{interpret, Prediction};
//!
//! let prediction = Prediction::new(2, vec![0.05, 0.15, 0.80]);
//! let info = interpret(&prediction, None).unwrap();
//!
//! assert_eq!(info.risk_level, "High Risk");
//! assert_eq!(info.confidence, "80.0%");
//! assert_eq!(info.color, "danger");
//! ```

mod features;
mod gateway;
mod interpret;

pub use features::{FeatureRecord, FeatureValue, NUMERIC_FIELDS};
pub use gateway::{
    Assessment, FeatureImportance, HealthStatus, LabelEncoder, LabelEncoders, ModelGateway, Preprocessor,
    RiskModel,
};
pub use interpret::{
    guidance_for, interpret, resolve_label, ClassProbability, Guidance, RiskInfo, RiskTier,
    TARGET_COLUMN_CANDIDATES,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while adapting a request or running a prediction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// A numeric form field did not parse as a floating point number.
    #[error("Invalid value for {field}. Please enter a valid number.")]
    InvalidNumber { field: String },

    /// The model or its preprocessor is not loaded.
    #[error("Model not loaded")]
    ModelUnavailable,

    /// A feature the model needs was absent from the request.
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    /// A feature was present but could not be encoded.
    #[error("Invalid feature '{field}': {message}")]
    InvalidFeature { field: String, message: String },

    /// The model produced no class probabilities.
    #[error("Model returned an empty probability vector")]
    EmptyProbabilities,

    /// Any other failure inside the model collaborator.
    #[error("Prediction failed: {0}")]
    Prediction(String),
}

impl RiskError {
    /// Creates an invalid-feature error.
    pub fn invalid_feature(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFeature {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Output of a model for a single feature record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class index (nominally 0, 1 or 2).
    pub class_index: usize,
    /// Probability assigned to each class, indexed by class.
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Creates a new prediction.
    pub fn new(class_index: usize, probabilities: Vec<f64>) -> Self {
        Self { class_index, probabilities }
    }

    /// Builds a prediction by taking the argmax of a probability vector.
    ///
    /// Returns `None` for an empty vector. The first maximum wins ties.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Option<Self> {
        let class_index = probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })?
            .0;
        Some(Self { class_index, probabilities })
    }

    /// Highest probability in the vector.
    pub fn max_probability(&self) -> Option<f64> {
        self.probabilities.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_maximum() {
        let p = Prediction::from_probabilities(vec![0.4, 0.4, 0.2]).unwrap();
        assert_eq!(p.class_index, 0);

        let p = Prediction::from_probabilities(vec![0.1, 0.2, 0.7]).unwrap();
        assert_eq!(p.class_index, 2);
    }

    #[test]
    fn argmax_of_empty_vector_is_none() {
        assert!(Prediction::from_probabilities(vec![]).is_none());
        assert_eq!(Prediction::new(0, vec![]).max_probability(), None);
    }

    #[test]
    fn invalid_number_message_names_the_field() {
        let err = RiskError::InvalidNumber { field: "BS".into() };
        assert_eq!(
            err.to_string(),
            "Invalid value for BS. Please enter a valid number."
        );
    }
}
