//! Model selection over the candidate classifiers.

use std::path::Path;

use matrisk_core::FeatureImportance;
use matrisk_data::{Dataset, TARGET_COLUMN};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::{Algorithm, Classifier};
use crate::preprocess::FittedPreprocessor;
use crate::{ModelError, TrainedModel};

/// Share of rows held out for model selection.
const TEST_FRACTION: f64 = 0.2;

/// Shuffles per feature when estimating permutation importance.
const PERMUTATION_REPEATS: usize = 5;

/// Held-out accuracy of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub accuracy: f64,
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub best_model: String,
    pub candidates: Vec<CandidateScore>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl TrainingMetrics {
    /// Held-out accuracy of the selected model.
    pub fn best_accuracy(&self) -> Option<f64> {
        self.candidates
            .iter()
            .find(|c| c.name == self.best_model)
            .map(|c| c.accuracy)
    }
}

/// Trains on the CSV at `dataset_path` and saves the bundle to `model_path`.
pub fn train_risk_model(
    dataset_path: &Path,
    model_path: &Path,
    seed: u64,
) -> Result<(TrainedModel, TrainingMetrics), ModelError> {
    info!("Training model from {}", dataset_path.display());
    let dataset = Dataset::from_csv(dataset_path)?;
    let (model, metrics) = train_from_dataset(&dataset, seed)?;
    model.save(model_path)?;
    info!("Model saved to {}", model_path.display());
    Ok((model, metrics))
}

fn split_indices(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64 * TEST_FRACTION).round() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Fits every candidate on a seeded 80/20 split and keeps the most accurate.
pub fn train_from_dataset(
    dataset: &Dataset,
    seed: u64,
) -> Result<(TrainedModel, TrainingMetrics), ModelError> {
    if dataset.len() < 2 {
        return Err(ModelError::NotEnoughRows(dataset.len()));
    }

    let preprocessor = FittedPreprocessor::fit(dataset, TARGET_COLUMN)?;
    let (x, y) = preprocessor.encode_dataset(dataset)?;
    let n_classes = preprocessor.n_classes();

    let (train_idx, test_idx) = split_indices(dataset.len(), seed);
    let x_train = x.select(Axis(0), &train_idx);
    let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
    let x_test = x.select(Axis(0), &test_idx);
    let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();

    let mut candidates = Vec::new();
    let mut best: Option<(Classifier, f64)> = None;
    for algorithm in Algorithm::ALL {
        let classifier = algorithm.fit(&x_train, &y_train, n_classes);
        let accuracy = classifier.accuracy(&x_test, &y_test);
        info!("  - {}: accuracy {:.3}", algorithm.name(), accuracy);
        candidates.push(CandidateScore {
            name: algorithm.name().to_string(),
            accuracy,
        });
        if best.as_ref().map_or(true, |(_, b)| accuracy > *b) {
            best = Some((classifier, accuracy));
        }
    }
    let (classifier, accuracy) = best.ok_or(ModelError::NoCandidates)?;
    info!("Best model: {} ({:.3})", classifier.name(), accuracy);

    let importance = permutation_importance(
        &classifier,
        &x_test,
        &y_test,
        preprocessor.columns(),
        seed,
    );

    let metrics = TrainingMetrics {
        best_model: classifier.name().to_string(),
        candidates,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    };
    let model = TrainedModel::new(classifier, preprocessor, Some(importance), Some(metrics.clone()));
    Ok((model, metrics))
}

/// Mean accuracy drop when each feature column is shuffled, most important first.
pub fn permutation_importance(
    classifier: &Classifier,
    x: &Array2<f64>,
    y: &[usize],
    columns: &[String],
    seed: u64,
) -> Vec<FeatureImportance> {
    let baseline = classifier.accuracy(x, y);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut importance: Vec<FeatureImportance> = columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let drop: f64 = (0..PERMUTATION_REPEATS)
                .map(|_| {
                    let mut shuffled = x.clone();
                    let mut column = shuffled.column(j).to_vec();
                    column.shuffle(&mut rng);
                    shuffled
                        .column_mut(j)
                        .iter_mut()
                        .zip(column)
                        .for_each(|(cell, v)| *cell = v);
                    baseline - classifier.accuracy(&shuffled, y)
                })
                .sum();
            FeatureImportance {
                feature: name.clone(),
                importance: drop / PERMUTATION_REPEATS as f64,
            }
        })
        .collect();

    importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    importance
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrisk_core::{FeatureRecord, ModelGateway, Preprocessor, RiskModel};
    use std::sync::Arc;

    fn synthetic_dataset(rows: usize) -> Dataset {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        matrisk_data::ensure_sample_data(&path, 42, rows).unwrap();
        Dataset::from_csv(&path).unwrap()
    }

    #[test]
    fn split_holds_out_a_fifth() {
        let (train, test) = split_indices(100, 1);
        assert_eq!((train.len(), test.len()), (80, 20));

        let (train, test) = split_indices(2, 1);
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    #[test]
    fn trains_and_selects_best_candidate() {
        let (model, metrics) = train_from_dataset(&synthetic_dataset(300), 42).unwrap();

        assert_eq!(metrics.candidates.len(), 3);
        assert_eq!(metrics.train_rows + metrics.test_rows, 300);
        let best = metrics.best_accuracy().unwrap();
        assert!(metrics.candidates.iter().all(|c| c.accuracy <= best));
        assert_eq!(model.name(), metrics.best_model);
        assert!(best > 0.5, "best accuracy {}", best);
    }

    #[test]
    fn importance_covers_every_feature_in_order() {
        let (model, _) = train_from_dataset(&synthetic_dataset(300), 42).unwrap();
        let importance = model.feature_importance().unwrap();

        assert_eq!(importance.len(), 6);
        assert!(importance
            .windows(2)
            .all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn trained_model_serves_predictions_through_gateway() {
        let (model, _) = train_from_dataset(&synthetic_dataset(300), 42).unwrap();
        let gateway = ModelGateway::from_model(Arc::new(model));

        let record = FeatureRecord::new()
            .with_numeric("Age", 30.0)
            .with_numeric("SystolicBP", 120.0)
            .with_numeric("DiastolicBP", 80.0)
            .with_numeric("BS", 90.0)
            .with_numeric("BodyTemp", 98.6)
            .with_numeric("HeartRate", 80.0);
        let assessment = gateway.assess(&record).unwrap();

        assert_eq!(assessment.prediction.probabilities.len(), 3);
        assert!(["Low Risk", "Medium Risk", "High Risk"].contains(&assessment.info.risk_level.as_str()));
        assert!(gateway.preprocessor().unwrap().feature_columns().is_some());
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let ds = Dataset::from_reader("Age,RiskLevel\n30,low risk\n".as_bytes()).unwrap();
        assert!(matches!(train_from_dataset(&ds, 42), Err(ModelError::NotEnoughRows(1))));
    }

    #[test]
    fn training_writes_a_loadable_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data/pregnancy_data.csv");
        let bundle = dir.path().join("models/trained_model.json");
        matrisk_data::ensure_sample_data(&data, 42, 200).unwrap();

        let (model, _) = train_risk_model(&data, &bundle, 42).unwrap();
        let loaded = TrainedModel::load(&bundle).unwrap();

        assert_eq!(loaded.name(), model.name());
        assert_eq!(
            loaded.preprocessor().unwrap().feature_columns(),
            model.preprocessor().unwrap().feature_columns()
        );
    }
}
