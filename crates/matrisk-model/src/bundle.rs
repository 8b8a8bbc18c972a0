//! Trained model handle and its JSON bundle on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use matrisk_core::{FeatureImportance, FeatureRecord, Prediction, Preprocessor, RiskError, RiskModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::Classifier;
use crate::preprocess::FittedPreprocessor;
use crate::train::TrainingMetrics;
use crate::ModelError;

const BUNDLE_VERSION: u32 = 1;

/// On-disk layout of a model bundle.
#[derive(Debug, Serialize, Deserialize)]
struct ModelBundle {
    version: u32,
    model_name: String,
    classifier: Classifier,
    preprocessor: FittedPreprocessor,
    #[serde(default)]
    feature_importance: Option<Vec<FeatureImportance>>,
    #[serde(default)]
    metrics: Option<TrainingMetrics>,
}

/// A trained classifier paired with the preprocessor it was fitted with.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    name: String,
    classifier: Classifier,
    preprocessor: Arc<FittedPreprocessor>,
    feature_importance: Option<Vec<FeatureImportance>>,
    metrics: Option<TrainingMetrics>,
}

impl TrainedModel {
    pub fn new(
        classifier: Classifier,
        preprocessor: FittedPreprocessor,
        feature_importance: Option<Vec<FeatureImportance>>,
        metrics: Option<TrainingMetrics>,
    ) -> Self {
        Self {
            name: classifier.name().to_string(),
            classifier,
            preprocessor: Arc::new(preprocessor),
            feature_importance,
            metrics,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics.as_ref()
    }

    /// Writes the bundle as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ModelError::io(parent, e))?;
        }
        let bundle = ModelBundle {
            version: BUNDLE_VERSION,
            model_name: self.name.clone(),
            classifier: self.classifier.clone(),
            preprocessor: (*self.preprocessor).clone(),
            feature_importance: self.feature_importance.clone(),
            metrics: self.metrics.clone(),
        };
        let json = serde_json::to_string(&bundle)?;
        fs::write(path, json).map_err(|e| ModelError::io(path, e))
    }

    /// Reads a bundle written by [`TrainedModel::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        let bundle: ModelBundle = serde_json::from_str(&content)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(ModelError::UnsupportedVersion(bundle.version));
        }
        info!("Loaded model bundle '{}' from {}", bundle.model_name, path.display());
        Ok(Self {
            name: bundle.model_name,
            classifier: bundle.classifier,
            preprocessor: Arc::new(bundle.preprocessor),
            feature_importance: bundle.feature_importance,
            metrics: bundle.metrics,
        })
    }
}

impl RiskModel for TrainedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_single(&self, features: &FeatureRecord) -> Result<Prediction, RiskError> {
        let x = self.preprocessor.transform(features)?;
        let probabilities = self.classifier.predict_proba(x.view());
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(RiskError::Prediction("model produced non-finite probabilities".into()));
        }
        Prediction::from_probabilities(probabilities).ok_or(RiskError::EmptyProbabilities)
    }

    fn preprocessor(&self) -> Option<Arc<dyn Preprocessor>> {
        Some(self.preprocessor.clone() as Arc<dyn Preprocessor>)
    }

    fn feature_importance(&self) -> Option<&[FeatureImportance]> {
        self.feature_importance.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Algorithm;
    use matrisk_data::Dataset;

    fn tiny_model() -> TrainedModel {
        let csv = "Age,BS,RiskLevel\n20,80,low risk\n22,85,low risk\n40,150,high risk\n42,160,high risk\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let pre = FittedPreprocessor::fit(&ds, "RiskLevel").unwrap();
        let (x, y) = pre.encode_dataset(&ds).unwrap();
        let classifier = Algorithm::GaussianNaiveBayes.fit(&x, &y, pre.n_classes());
        TrainedModel::new(classifier, pre, None, None)
    }

    #[test]
    fn predicts_with_target_labels() {
        let model = tiny_model();
        let record = FeatureRecord::new().with_numeric("Age", 41.0).with_numeric("BS", 155.0);

        let prediction = model.predict_single(&record).unwrap();
        assert_eq!(prediction.class_index, 1);

        let encoders = model.preprocessor().unwrap();
        let label = matrisk_core::resolve_label(prediction.class_index, encoders.label_encoders());
        assert_eq!(label, "High Risk");
    }

    #[test]
    fn missing_feature_is_reported() {
        let record = FeatureRecord::new().with_numeric("Age", 41.0);
        assert_eq!(
            tiny_model().predict_single(&record).unwrap_err(),
            RiskError::MissingFeature("BS".into())
        );
    }

    #[test]
    fn save_then_load_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/trained_model.json");
        let model = tiny_model();
        model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        let record = FeatureRecord::new().with_numeric("Age", 21.0).with_numeric("BS", 82.0);
        assert_eq!(loaded.name(), "Gaussian Naive Bayes");

        let before = model.predict_single(&record).unwrap();
        let after = loaded.predict_single(&record).unwrap();
        assert_eq!(before.class_index, after.class_index);
        for (a, b) in before.probabilities.iter().zip(&after.probabilities) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn absent_or_corrupt_bundle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trained_model.json");
        assert!(matches!(TrainedModel::load(&path), Err(ModelError::Io { .. })));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(TrainedModel::load(&path), Err(ModelError::Bundle(_))));
    }
}
