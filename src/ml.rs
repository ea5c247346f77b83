//! Intent classification: bag-of-words encoding, dataset construction,
//! classifier backends, trained bundles and the training pipeline.
//!
//! ```text
//! IntentCatalog ─ build_dataset ─ vectorize ─ ClassifierBackend::fit ─┐
//!                                                                     ↓
//!                         B.mlp.json + B_words.bin + B_classes.bin + B_intents.json
//!                                                                     ↓
//!                                   TrainedBundle::load ─ predict(text) → tag
//! ```

pub mod artifact;
pub mod backend;
pub mod dataset;
pub mod encoder;
#[cfg(feature = "mlp")]
pub mod network;
pub mod trainer;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Hyperparameters for classifier training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Passes over the training set.
    pub epochs: usize,
    /// Rows per gradient update.
    pub batch_size: usize,
    /// Width of each hidden layer.
    pub hidden_layers: Vec<usize>,
    /// Dropout rate applied after every hidden layer.
    pub dropout: f32,
    /// Initial SGD learning rate.
    pub learning_rate: f32,
    /// Nesterov momentum factor.
    pub momentum: f32,
    /// Per-update learning rate decay.
    pub decay: f32,
    /// Seed for weight initialization, dropout and shuffling.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 5,
            hidden_layers: vec![128, 64],
            dropout: 0.5,
            learning_rate: 0.01,
            momentum: 0.9,
            decay: 1e-6,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Check that the values describe a trainable network.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ChatError::config("epochs must be greater than zero"));
        }
        if self.batch_size == 0 {
            return Err(ChatError::config("batch_size must be greater than zero"));
        }
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(ChatError::config(
                "hidden_layers must list at least one non-zero layer width",
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ChatError::config("dropout must be in [0, 1)"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ChatError::config("learning_rate must be positive"));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ChatError::config("momentum must be in [0, 1)"));
        }
        if self.decay < 0.0 {
            return Err(ChatError::config("decay must not be negative"));
        }
        Ok(())
    }
}

/// Training statistics reported by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Mean cross-entropy loss per epoch.
    pub epoch_losses: Vec<f32>,
    /// Number of epochs completed.
    pub epochs: usize,
    /// Loss of the last epoch.
    pub final_loss: f32,
    /// Accuracy on the training rows, dropout disabled.
    pub training_accuracy: f32,
    /// Training time in milliseconds.
    pub training_time_ms: u64,
}
