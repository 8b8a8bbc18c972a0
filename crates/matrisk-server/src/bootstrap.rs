//! Startup sequence: directories, demo data, and the model gateway.

use std::fs;
use std::sync::Arc;

use matrisk_config::AppConfig;
use matrisk_core::{ModelGateway, RiskModel};
use matrisk_model::{train_risk_model, TrainedModel};
use tracing::{error, info, warn};

/// Creates the working directories the server reads from and writes to.
pub fn create_directories(config: &AppConfig) {
    for dir in config.required_dirs() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create {}: {}", dir.display(), e);
        }
    }
}

/// Loads the saved model bundle, if one is readable.
pub fn load_gateway(config: &AppConfig) -> Option<ModelGateway> {
    match TrainedModel::load(&config.model_path) {
        Ok(model) => {
            info!("Model and preprocessor loaded successfully ({})", model.name());
            Some(ModelGateway::from_model(Arc::new(model)))
        }
        Err(e) => {
            warn!("Model not available at {}: {}", config.model_path.display(), e);
            None
        }
    }
}

/// Builds the gateway, synthesizing data and training a model when no
/// bundle exists. Blocks until training finishes.
pub async fn init_gateway(config: &AppConfig) -> ModelGateway {
    create_directories(config);

    let synthetic = &config.synthetic;
    if let Err(e) =
        matrisk_data::ensure_sample_data(&config.dataset_path, synthetic.seed, synthetic.samples)
    {
        warn!("Failed to create sample data: {}", e);
    }

    if let Some(gateway) = load_gateway(config) {
        return gateway;
    }

    info!("No trained model found. Training new model...");
    let dataset_path = config.dataset_path.clone();
    let model_path = config.model_path.clone();
    let seed = synthetic.seed;
    let trained =
        tokio::task::spawn_blocking(move || train_risk_model(&dataset_path, &model_path, seed))
            .await;

    match trained {
        Ok(Ok((model, metrics))) => {
            info!(
                "Model trained: {} (test accuracy {:.3}, {} train / {} test rows)",
                metrics.best_model,
                metrics.best_accuracy().unwrap_or_default(),
                metrics.train_rows,
                metrics.test_rows
            );
            ModelGateway::from_model(Arc::new(model))
        }
        Ok(Err(e)) => {
            error!("Error during model training: {}", e);
            ModelGateway::empty()
        }
        Err(e) => {
            error!("Model training task failed: {}", e);
            ModelGateway::empty()
        }
    }
}
