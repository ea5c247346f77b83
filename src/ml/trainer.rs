//! Offline training: intents in, bundle files out.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::analysis::analyzer::Analyzer;
use crate::error::{ChatError, Result};
use crate::intent::IntentCatalog;
use crate::ml::artifact::{ArtifactPaths, write_analyzer_name, write_string_list};
use crate::ml::backend::{ClassifierBackend, default_backend};
use crate::ml::dataset::{build_dataset, vectorize};
use crate::ml::{TrainingConfig, TrainingStats};

/// Milestones reported while training.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    DatasetBuilt {
        documents: usize,
        vocabulary: usize,
        labels: usize,
    },
    Vectorized {
        rows: usize,
    },
    Epoch {
        epoch: usize,
        epochs: usize,
        loss: f32,
    },
    Saved {
        base: PathBuf,
    },
}

/// Files written by a successful [`Trainer::train`] call.
#[derive(Debug, Clone, Serialize)]
pub struct TrainedArtifacts {
    pub model_path: PathBuf,
    pub words_path: PathBuf,
    pub classes_path: PathBuf,
    pub intents_path: PathBuf,
    pub stats: TrainingStats,
}

type ProgressCallback = Arc<dyn Fn(TrainingEvent) + Send + Sync>;

/// Trains a classifier from an intent catalog and persists the bundle.
pub struct Trainer {
    config: TrainingConfig,
    analyzer: Arc<dyn Analyzer>,
    backend: Option<Arc<dyn ClassifierBackend>>,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.name())
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl Trainer {
    /// Trainer using the compiled-in backend, if any.
    pub fn new(config: TrainingConfig, analyzer: Arc<dyn Analyzer>) -> Self {
        Trainer {
            config,
            analyzer,
            backend: default_backend(),
            progress: None,
        }
    }

    /// Replace the backend. `None` makes [`Trainer::train`] fail with
    /// [`ChatError::BackendUnavailable`].
    pub fn with_backend(mut self, backend: Option<Arc<dyn ClassifierBackend>>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TrainingEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn report(&self, event: TrainingEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    /// Train on `catalog` and write a new bundle under `output_dir`.
    ///
    /// `epochs` and `batch_size` override the configured values.
    pub fn train<P: AsRef<Path>>(
        &self,
        catalog: &IntentCatalog,
        output_dir: P,
        epochs: usize,
        batch_size: usize,
    ) -> Result<TrainedArtifacts> {
        let backend = self.backend.as_ref().ok_or_else(|| {
            ChatError::backend_unavailable("no classifier backend is compiled into this build")
        })?;

        let config = TrainingConfig {
            epochs,
            batch_size,
            ..self.config.clone()
        };
        config.validate()?;

        let dataset = build_dataset(catalog, self.analyzer.as_ref())?;
        self.report(TrainingEvent::DatasetBuilt {
            documents: dataset.documents.len(),
            vocabulary: dataset.vocabulary.len(),
            labels: dataset.labels.len(),
        });

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let matrix = vectorize(
            &dataset.vocabulary,
            &dataset.labels,
            &dataset.documents,
            &mut rng,
        )?;
        self.report(TrainingEvent::Vectorized {
            rows: matrix.rows(),
        });

        let total = config.epochs;
        let mut on_epoch = |epoch: usize, loss: f32| {
            self.report(TrainingEvent::Epoch {
                epoch,
                epochs: total,
                loss,
            });
        };
        let outcome = backend.fit(&matrix, &config, &mut rng, &mut on_epoch)?;

        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).map_err(|e| ChatError::write(output_dir, e))?;
        let paths = reserve_paths(output_dir, backend.extension())?;

        let written = outcome
            .classifier
            .save(&paths.model)
            .and_then(|_| write_string_list(&paths.words, dataset.vocabulary.words()))
            .and_then(|_| write_string_list(&paths.classes, dataset.labels.labels()))
            .and_then(|_| write_analyzer_name(&paths.analyzer, self.analyzer.name()))
            .and_then(|_| catalog.save(&paths.intents));
        if let Err(e) = written {
            warn!("Discarding partial bundle {}: {e}", paths.base.display());
            for path in [
                &paths.model,
                &paths.words,
                &paths.classes,
                &paths.analyzer,
                &paths.intents,
            ] {
                let _ = fs::remove_file(path);
            }
            return Err(e);
        }

        info!(
            "Saved {} bundle {} ({} words, {} labels)",
            backend.name(),
            paths.base.display(),
            dataset.vocabulary.len(),
            dataset.labels.len()
        );
        self.report(TrainingEvent::Saved {
            base: paths.base.clone(),
        });

        Ok(TrainedArtifacts {
            model_path: paths.model,
            words_path: paths.words,
            classes_path: paths.classes,
            intents_path: paths.intents,
            stats: outcome.stats,
        })
    }
}

/// Claim the first free `model_<timestamp>[_n]` base in `dir`.
///
/// The classifier file is created with `create_new`, so two runs writing to
/// the same directory in the same second never end up with the same base.
fn reserve_paths(dir: &Path, extension: &str) -> Result<ArtifactPaths> {
    let stamp = Local::now().format("model_%Y%m%d_%H%M%S").to_string();
    let mut suffix = 0;
    loop {
        let name = match suffix {
            0 => stamp.clone(),
            n => format!("{stamp}_{n}"),
        };
        suffix += 1;

        let paths = ArtifactPaths::from_base(&dir.join(name), extension);
        if paths.any_exists() {
            continue;
        }
        match OpenOptions::new().write(true).create_new(true).open(&paths.model) {
            Ok(_) => return Ok(paths),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ChatError::write(&paths.model, e)),
        }
    }
}

/// Write vocabulary and label sidecars next to `model_path` without training.
///
/// This is the degraded path for builds without a classifier backend: the
/// sidecars are produced so that a classifier trained elsewhere can be dropped
/// in at `model_path`.
pub fn write_vocab_sidecars<P: AsRef<Path>>(
    catalog: &IntentCatalog,
    model_path: P,
    analyzer: &dyn Analyzer,
) -> Result<(PathBuf, PathBuf)> {
    let paths = ArtifactPaths::from_model_path(model_path.as_ref());
    let dataset = build_dataset(catalog, analyzer)?;
    if dataset.vocabulary.is_empty() || dataset.labels.is_empty() {
        warn!(
            "Writing sidecars for {} with {} words and {} labels",
            paths.base.display(),
            dataset.vocabulary.len(),
            dataset.labels.len()
        );
    }

    if let Some(parent) = paths.words.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ChatError::write(parent, e))?;
    }
    write_string_list(&paths.words, dataset.vocabulary.words())?;
    write_string_list(&paths.classes, dataset.labels.labels())?;
    write_analyzer_name(&paths.analyzer, analyzer.name())?;

    info!("Wrote vocabulary sidecars for {}", paths.base.display());
    Ok((paths.words, paths.classes))
}
