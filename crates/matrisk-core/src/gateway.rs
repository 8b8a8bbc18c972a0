//! Model collaborator contracts and the process-wide model gateway.
//!
//! Optional capabilities (label encoders, feature columns, feature importance)
//! are declared through trait methods with `None` defaults, so callers ask the
//! collaborator what it supports instead of probing it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interpret::{interpret, RiskInfo};
use crate::{FeatureRecord, Prediction, RiskError};

/// Bidirectional mapping between category labels and class indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits an encoder over the sorted unique values.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Creates an encoder with an explicit class order.
    pub fn from_classes(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// Known classes in index order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Maps a label to its class index.
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// Maps a class index back to its label, `None` when out of range.
    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

/// Label encoders keyed by column name.
pub type LabelEncoders = BTreeMap<String, LabelEncoder>;

/// Contribution of one feature to the model's predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Feature preprocessor paired with a model.
pub trait Preprocessor: Send + Sync {
    /// Encoders for categorical columns, including the target if encoded.
    fn label_encoders(&self) -> Option<&LabelEncoders> {
        None
    }

    /// Feature columns in the order the model consumes them.
    fn feature_columns(&self) -> Option<&[String]> {
        None
    }
}

/// A loaded predictive model.
pub trait RiskModel: Send + Sync {
    /// Display name of the selected estimator.
    fn name(&self) -> &str;

    /// Predicts the class of a single feature record.
    fn predict_single(&self, features: &FeatureRecord) -> Result<Prediction, RiskError>;

    /// The preprocessor this model was trained with, if any.
    fn preprocessor(&self) -> Option<Arc<dyn Preprocessor>>;

    /// Per-feature importance table, most important first.
    fn feature_importance(&self) -> Option<&[FeatureImportance]> {
        None
    }
}

/// Liveness report for the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub preprocessor_loaded: bool,
}

/// A successful prediction together with its interpretation.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub prediction: Prediction,
    pub info: RiskInfo,
    pub model_name: String,
}

/// Read-only context holding the model and preprocessor handles.
///
/// Built once during startup and shared by every request afterwards.
#[derive(Clone, Default)]
pub struct ModelGateway {
    model: Option<Arc<dyn RiskModel>>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
}

impl fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGateway")
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("preprocessor_loaded", &self.preprocessor.is_some())
            .finish()
    }
}

impl ModelGateway {
    /// A gateway with neither handle populated.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A gateway for a loaded model, taking the preprocessor from the model.
    pub fn from_model(model: Arc<dyn RiskModel>) -> Self {
        let preprocessor = model.preprocessor();
        Self {
            model: Some(model),
            preprocessor,
        }
    }

    pub fn model(&self) -> Option<&dyn RiskModel> {
        self.model.as_deref()
    }

    pub fn preprocessor(&self) -> Option<&dyn Preprocessor> {
        self.preprocessor.as_deref()
    }

    /// Both handles are populated.
    pub fn is_ready(&self) -> bool {
        self.model.is_some() && self.preprocessor.is_some()
    }

    /// Reports which handles are loaded.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: if self.is_ready() { "healthy" } else { "unhealthy" },
            model_loaded: self.model.is_some(),
            preprocessor_loaded: self.preprocessor.is_some(),
        }
    }

    /// Runs the model on a record and interprets the result.
    pub fn assess(&self, features: &FeatureRecord) -> Result<Assessment, RiskError> {
        let (Some(model), Some(preprocessor)) = (&self.model, &self.preprocessor) else {
            return Err(RiskError::ModelUnavailable);
        };

        let prediction = model.predict_single(features)?;
        debug!(
            "Predicted class {} with probabilities {:?}",
            prediction.class_index, prediction.probabilities
        );
        let info = interpret(&prediction, preprocessor.label_encoders())?;

        Ok(Assessment {
            prediction,
            info,
            model_name: model.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoCapabilities;

    impl Preprocessor for NoCapabilities {}

    struct FixedModel {
        prediction: Prediction,
        preprocessor: Arc<dyn Preprocessor>,
    }

    impl RiskModel for FixedModel {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn predict_single(&self, _features: &FeatureRecord) -> Result<Prediction, RiskError> {
            Ok(self.prediction.clone())
        }

        fn preprocessor(&self) -> Option<Arc<dyn Preprocessor>> {
            Some(self.preprocessor.clone())
        }
    }

    fn fixed(class_index: usize, probabilities: Vec<f64>) -> ModelGateway {
        ModelGateway::from_model(Arc::new(FixedModel {
            prediction: Prediction::new(class_index, probabilities),
            preprocessor: Arc::new(NoCapabilities),
        }))
    }

    #[test]
    fn empty_gateway_is_unhealthy() {
        let health = ModelGateway::empty().health();
        assert_eq!(
            health,
            HealthStatus {
                status: "unhealthy",
                model_loaded: false,
                preprocessor_loaded: false,
            }
        );
    }

    #[test]
    fn loaded_gateway_is_healthy() {
        let health = fixed(0, vec![1.0]).health();
        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded && health.preprocessor_loaded);
    }

    #[test]
    fn assess_requires_loaded_model() {
        let err = ModelGateway::empty().assess(&FeatureRecord::new()).unwrap_err();
        assert_eq!(err, RiskError::ModelUnavailable);
    }

    #[test]
    fn assess_interprets_model_output() {
        let assessment = fixed(1, vec![0.2, 0.7, 0.1])
            .assess(&FeatureRecord::new())
            .unwrap();
        assert_eq!(assessment.model_name, "Fixed");
        assert_eq!(assessment.info.risk_level, "Medium Risk");
        assert_eq!(assessment.info.confidence, "70.0%");
    }

    #[test]
    fn label_encoder_round_trips_sorted_classes() {
        let enc = LabelEncoder::fit(["mid", "high", "low", "mid"]);
        assert_eq!(enc.classes(), ["high", "low", "mid"]);
        assert_eq!(enc.transform("low"), Some(1));
        assert_eq!(enc.inverse_transform(2), Some("mid"));
        assert_eq!(enc.inverse_transform(3), None);
    }
}
