//! Concrete risk model for matrisk: preprocessing, classifiers, and bundles.
//!
//! This crate provides the model collaborator consumed by the server through
//! the [`RiskModel`](matrisk_core::RiskModel) contract:
//!
//! - [`FittedPreprocessor`] — Standard scaling and label encoding fitted on a dataset
//! - [`Classifier`] — Logistic regression, Gaussian naive Bayes, or k-nearest neighbours
//! - [`train_risk_model`] — Fits all candidates, keeps the most accurate, saves a bundle
//! - [`TrainedModel`] — A loaded bundle that predicts single feature records
//!
//! # Example
//!
//! ```rust,ignore
//! use matrisk_model::{train_risk_model, TrainedModel};
//! use std::path::Path;
//!
//! let bundle = Path::new("models/trained_model.json");
//! let model = match TrainedModel::load(bundle) {
//!     Ok(model) => model,
//!     Err(_) => train_risk_model(Path::new("data/pregnancy_data.csv"), bundle, 42)?.0,
//! };
//! ```

mod bundle;
mod classifier;
mod preprocess;
mod train;

pub use bundle::TrainedModel;
pub use classifier::{Algorithm, Classifier, GaussianNb, KNearest, SoftmaxRegression};
pub use preprocess::{ColumnEncoding, FittedPreprocessor};
pub use train::{
    permutation_importance, train_from_dataset, train_risk_model, CandidateScore, TrainingMetrics,
};

use matrisk_data::DataError;
use thiserror::Error;

/// Errors that can occur while training, saving, or loading a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Reading the dataset failed.
    #[error("Dataset error: {0}")]
    Data(#[from] DataError),

    /// Filesystem access to a model bundle failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The model bundle could not be encoded or decoded.
    #[error("Invalid model bundle: {0}")]
    Bundle(#[from] serde_json::Error),

    /// The bundle was written by an incompatible version.
    #[error("Unsupported model bundle version {0}")]
    UnsupportedVersion(u32),

    /// A dataset cell could not be encoded.
    #[error("Row {row}: cannot encode '{value}' in column '{column}'")]
    BadCell {
        row: usize,
        column: String,
        value: String,
    },

    /// The dataset has no columns besides the target.
    #[error("Dataset has no feature columns")]
    NoFeatures,

    /// Too few rows to split into train and test sets.
    #[error("Need at least 2 rows to train, got {0}")]
    NotEnoughRows(usize),

    /// No candidate classifier was fitted.
    #[error("No candidate classifiers")]
    NoCandidates,
}

impl ModelError {
    /// Creates an IO error with path context.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
