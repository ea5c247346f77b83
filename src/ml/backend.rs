//! Classifier backends.
//!
//! A [`ClassifierBackend`] knows how to fit a classifier on a
//! [`TrainingMatrix`] and how to materialize one from disk. The backend is
//! picked by the classifier file extension; when no compiled-in backend
//! claims a file, loading fails with [`ChatError::BackendUnavailable`].

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::{ChatError, Result};
use crate::ml::dataset::TrainingMatrix;
use crate::ml::{TrainingConfig, TrainingStats};

/// A trained model mapping a bag-of-words vector to class probabilities.
pub trait Classifier: Send + Sync {
    /// Probability distribution over the output classes.
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>>;

    /// Expected feature vector length.
    fn input_size(&self) -> usize;

    /// Number of output classes.
    fn output_size(&self) -> usize;

    /// Persist the classifier.
    fn save(&self, path: &Path) -> Result<()> {
        Err(ChatError::backend_unavailable(format!(
            "{} classifiers cannot be saved to {}",
            self.name(),
            path.display()
        )))
    }

    fn name(&self) -> &'static str;
}

/// Result of [`ClassifierBackend::fit`].
pub struct FitOutcome {
    pub classifier: Box<dyn Classifier>,
    pub stats: TrainingStats,
}

/// A trainable model family with its own on-disk format.
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extension (without the leading dot) of saved classifiers.
    fn extension(&self) -> &'static str;

    /// Train a new classifier. `on_epoch` receives `(epoch, mean_loss)`.
    fn fit(
        &self,
        matrix: &TrainingMatrix,
        config: &TrainingConfig,
        rng: &mut StdRng,
        on_epoch: &mut dyn FnMut(usize, f32),
    ) -> Result<FitOutcome>;

    /// Materialize a classifier saved by this backend.
    fn load(&self, path: &Path) -> Result<Box<dyn Classifier>>;

    /// Whether `path` looks like a file written by this backend.
    fn handles(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.extension());
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&suffix) && name.len() > suffix.len())
    }
}

/// Index of the largest value. Ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// The compiled-in trainable backend, if any.
pub fn default_backend() -> Option<Arc<dyn ClassifierBackend>> {
    #[cfg(feature = "mlp")]
    {
        Some(Arc::new(crate::ml::network::MlpBackend::new()))
    }
    #[cfg(not(feature = "mlp"))]
    {
        None
    }
}

/// The backend able to read the classifier at `path`.
pub fn backend_for(path: &Path) -> Result<Arc<dyn ClassifierBackend>> {
    match default_backend() {
        Some(backend) if backend.handles(path) => Ok(backend),
        Some(backend) => Err(ChatError::backend_unavailable(format!(
            "no backend reads {} (the {} backend expects *.{})",
            path.display(),
            backend.name(),
            backend.extension()
        ))),
        None => Err(ChatError::backend_unavailable(
            "no classifier backend is compiled into this build",
        )),
    }
}
