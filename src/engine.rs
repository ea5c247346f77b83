//! Active model selection.
//!
//! [`ModelSelection`] owns which trained bundle answers chat turns, the
//! response catalog, and the display metadata (`version`, `label`). Loading
//! happens outside the lock; only the final swap is guarded, so a failed load
//! never disturbs the bundle that is currently serving.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::analysis::analyzer::Analyzer;
use crate::error::Result;
use crate::intent::IntentCatalog;
use crate::ml::artifact::{ArtifactPaths, TrainedBundle};
use crate::ml::backend::default_backend;

/// Display metadata of the active model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelMetadata {
    /// Classifier file of the active bundle, `None` in fallback mode.
    pub path: Option<PathBuf>,
    pub version: u64,
    pub label: String,
}

/// What a single prediction runs against.
#[derive(Debug, Clone)]
pub struct ActiveModel {
    pub bundle: Arc<TrainedBundle>,
    pub intents: Option<Arc<IntentCatalog>>,
}

type Observer = Arc<dyn Fn(&ModelMetadata) + Send + Sync>;

#[derive(Default)]
struct SelectionState {
    path: Option<PathBuf>,
    bundle: Option<Arc<TrainedBundle>>,
    intents: Option<Arc<IntentCatalog>>,
    version: u64,
    label: String,
}

impl SelectionState {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            path: self.path.clone(),
            version: self.version,
            label: self.label.clone(),
        }
    }
}

/// Shared holder of the active bundle and its metadata.
pub struct ModelSelection {
    analyzer: Arc<dyn Analyzer>,
    state: Mutex<SelectionState>,
    observers: RwLock<Vec<Observer>>,
}

impl std::fmt::Debug for ModelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSelection")
            .field("analyzer", &self.analyzer.name())
            .field("metadata", &self.get_active_metadata())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl ModelSelection {
    /// A selection in fallback mode. `analyzer` normalizes text for every
    /// bundle loaded through this selection.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        ModelSelection {
            analyzer,
            state: Mutex::new(SelectionState::default()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Load the bundle at `path` and make it active.
    ///
    /// On failure the previously active bundle stays in place.
    pub fn set_active_bundle<P: AsRef<Path>>(&self, path: P) -> Result<ModelMetadata> {
        let path = path.as_ref();
        let bundle = match TrainedBundle::load(path, Arc::clone(&self.analyzer)) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Keeping current model, cannot load {}: {e}", path.display());
                return Err(e);
            }
        };
        Ok(self.install(bundle, Some(path.to_path_buf())))
    }

    /// Make an already loaded bundle active.
    ///
    /// A catalog carried by the bundle replaces the response catalog.
    pub fn install(&self, bundle: TrainedBundle, path: Option<PathBuf>) -> ModelMetadata {
        let intents = bundle.intents().cloned().map(Arc::new);
        let metadata = {
            let mut state = self.state.lock();
            state.path = path;
            state.bundle = Some(Arc::new(bundle));
            if intents.is_some() {
                state.intents = intents;
            }
            state.metadata()
        };

        info!(
            "Active model: {}",
            metadata
                .path
                .as_deref()
                .map_or_else(|| "<in-memory>".to_string(), |p| p.display().to_string())
        );
        self.notify(&metadata);
        metadata
    }

    /// Drop the active bundle and answer with the fallback responder.
    pub fn clear_active_bundle(&self) -> ModelMetadata {
        let metadata = {
            let mut state = self.state.lock();
            state.path = None;
            state.bundle = None;
            state.metadata()
        };
        info!("Active model cleared, using keyword fallback");
        self.notify(&metadata);
        metadata
    }

    /// Replace the catalog responses are drawn from.
    pub fn set_intents(&self, catalog: IntentCatalog) -> ModelMetadata {
        let metadata = {
            let mut state = self.state.lock();
            state.intents = Some(Arc::new(catalog));
            state.metadata()
        };
        self.notify(&metadata);
        metadata
    }

    pub fn set_label<S: Into<String>>(&self, label: S) -> ModelMetadata {
        let metadata = {
            let mut state = self.state.lock();
            state.label = label.into();
            state.metadata()
        };
        self.notify(&metadata);
        metadata
    }

    /// Increment the version, optionally replacing the label. Returns the new
    /// version.
    pub fn bump_version(&self, label: Option<String>) -> u64 {
        let metadata = {
            let mut state = self.state.lock();
            state.version += 1;
            if let Some(label) = label {
                state.label = label;
            }
            state.metadata()
        };
        debug!("Model version bumped to {}", metadata.version);
        self.notify(&metadata);
        metadata.version
    }

    pub fn get_active_metadata(&self) -> ModelMetadata {
        self.state.lock().metadata()
    }

    /// The active bundle and catalog, or `None` in fallback mode.
    pub fn snapshot(&self) -> Option<ActiveModel> {
        let state = self.state.lock();
        state.bundle.as_ref().map(|bundle| ActiveModel {
            bundle: Arc::clone(bundle),
            intents: state.intents.clone(),
        })
    }

    /// The response catalog, whether or not a bundle is active.
    pub fn intents(&self) -> Option<Arc<IntentCatalog>> {
        self.state.lock().intents.clone()
    }

    pub fn has_active_bundle(&self) -> bool {
        self.state.lock().bundle.is_some()
    }

    /// Register `observer` to run after every successful mutation.
    ///
    /// Observers run without any lock held and may call back into the
    /// selection, including `subscribe`. An observer added during a
    /// notification is first called on the next mutation.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&ModelMetadata) + Send + Sync + 'static,
    {
        self.observers.write().push(Arc::new(observer));
    }

    fn notify(&self, metadata: &ModelMetadata) {
        let observers: Vec<Observer> = self.observers.read().clone();
        for observer in observers {
            observer(metadata);
        }
    }
}

/// Most recently modified classifier file in `dir` whose sidecars exist.
pub fn latest_bundle<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
    let backend = default_backend()?;
    let entries = fs::read_dir(dir.as_ref()).ok()?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !backend.handles(&path) {
            continue;
        }
        let paths = ArtifactPaths::from_model_path(&path);
        if !paths.words.exists() || !paths.classes.exists() {
            debug!("Skipping {} without sidecars", path.display());
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, path));
        }
    }
    newest.map(|(_, path)| path)
}
