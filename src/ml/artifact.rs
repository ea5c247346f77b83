//! Trained artifact bundles.
//!
//! A bundle is a classifier plus the exact vocabulary and label ordering it was
//! trained with. Given a base identifier `B` the files are:
//!
//! | file               | contents                                      |
//! |--------------------|-----------------------------------------------|
//! | `B.<backend ext>`  | classifier parameters                         |
//! | `B_words.bin`      | vocabulary, bincode-encoded `Vec<String>`     |
//! | `B_classes.bin`    | labels, bincode-encoded `Vec<String>`         |
//! | `B_intents.json`   | optional copy of the catalog used to train    |
//! | `B_analyzer.txt`   | name of the analyzer the vocabulary came from |

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::analysis::analyzer::Analyzer;
use crate::error::{ChatError, Result};
use crate::intent::IntentCatalog;
use crate::ml::backend::{Classifier, argmax, backend_for, default_backend};
use crate::ml::dataset::{LabelSet, Vocabulary};
use crate::ml::encoder::BagOfWordsEncoder;

const WORDS_SUFFIX: &str = "_words.bin";
const CLASSES_SUFFIX: &str = "_classes.bin";
const INTENTS_SUFFIX: &str = "_intents.json";
const ANALYZER_SUFFIX: &str = "_analyzer.txt";

/// File locations of one bundle, all derived from a single base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub base: PathBuf,
    pub model: PathBuf,
    pub words: PathBuf,
    pub classes: PathBuf,
    pub intents: PathBuf,
    pub analyzer: PathBuf,
}

impl ArtifactPaths {
    /// Paths for base `base` and a classifier with extension `extension`.
    pub fn from_base(base: &Path, extension: &str) -> Self {
        ArtifactPaths {
            base: base.to_path_buf(),
            model: with_suffix(base, &format!(".{extension}")),
            words: with_suffix(base, WORDS_SUFFIX),
            classes: with_suffix(base, CLASSES_SUFFIX),
            intents: with_suffix(base, INTENTS_SUFFIX),
            analyzer: with_suffix(base, ANALYZER_SUFFIX),
        }
    }

    /// Paths for an existing classifier file.
    ///
    /// The base is the model path without the compiled-in backend extension,
    /// or without its last extension when the backend does not claim the file.
    pub fn from_model_path(model: &Path) -> Self {
        let base = default_backend()
            .filter(|backend| backend.handles(model))
            .and_then(|backend| {
                let name = model.file_name()?.to_str()?;
                let stem = name.strip_suffix(&format!(".{}", backend.extension()))?;
                Some(model.with_file_name(stem))
            })
            .unwrap_or_else(|| model.with_extension(""));

        ArtifactPaths {
            model: model.to_path_buf(),
            words: with_suffix(&base, WORDS_SUFFIX),
            classes: with_suffix(&base, CLASSES_SUFFIX),
            intents: with_suffix(&base, INTENTS_SUFFIX),
            analyzer: with_suffix(&base, ANALYZER_SUFFIX),
            base,
        }
    }

    /// Whether any file of this bundle already exists.
    pub fn any_exists(&self) -> bool {
        [
            &self.model,
            &self.words,
            &self.classes,
            &self.intents,
            &self.analyzer,
        ]
            .iter()
            .any(|path| path.exists())
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write an ordered list of strings as a bincode sidecar.
pub fn write_string_list(path: &Path, items: &[String]) -> Result<()> {
    let bytes = bincode::serialize(items)
        .map_err(|e| ChatError::other(format!("cannot encode {}: {e}", path.display())))?;
    fs::write(path, bytes).map_err(|e| ChatError::write(path, e))
}

/// Read a bincode sidecar written by [`write_string_list`].
pub fn read_string_list(path: &Path, what: &str) -> Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| {
        ChatError::artifact_missing(format!("{what} file {}: {e}", path.display()))
    })?;
    bincode::deserialize(&bytes).map_err(|e| {
        ChatError::artifact_missing(format!("{what} file {} is unreadable: {e}", path.display()))
    })
}

/// Record which analyzer produced a bundle's vocabulary.
pub fn write_analyzer_name(path: &Path, name: &str) -> Result<()> {
    fs::write(path, format!("{name}\n")).map_err(|e| ChatError::write(path, e))
}

/// Reject a bundle whose vocabulary was built by a different analyzer.
///
/// Bundles without the analyzer file predate it and are accepted.
fn check_analyzer(path: &Path, expected: &str) -> Result<()> {
    let recorded = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, skipping analyzer check", path.display());
            return Ok(());
        }
        Err(e) => {
            return Err(ChatError::artifact_missing(format!(
                "analyzer file {}: {e}",
                path.display()
            )));
        }
    };

    let recorded = recorded.trim();
    if recorded != expected {
        return Err(ChatError::artifact_missing(format!(
            "bundle was trained with the {recorded} analyzer but {expected} is in use"
        )));
    }
    Ok(())
}

/// Tag predicted for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub tag: String,
    pub confidence: f32,
}

/// A loaded classifier with its vocabulary, labels and optional intents.
pub struct TrainedBundle {
    classifier: Box<dyn Classifier>,
    encoder: BagOfWordsEncoder,
    labels: LabelSet,
    intents: Option<IntentCatalog>,
    paths: Option<ArtifactPaths>,
}

impl std::fmt::Debug for TrainedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedBundle")
            .field("classifier", &self.classifier.name())
            .field("vocabulary_size", &self.encoder.vocabulary().len())
            .field("labels", &self.labels.labels())
            .field("has_intents", &self.intents.is_some())
            .field("model", &self.paths.as_ref().map(|p| &p.model))
            .finish()
    }
}

impl TrainedBundle {
    /// Load the bundle whose classifier lives at `model_path`.
    ///
    /// Fails with [`ChatError::ArtifactMissing`] when a sibling file is absent
    /// or unreadable, when the parts do not fit together or when the bundle
    /// was trained with a different analyzer, and with
    /// [`ChatError::BackendUnavailable`] when no backend reads the classifier.
    pub fn load<P: AsRef<Path>>(model_path: P, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        let paths = ArtifactPaths::from_model_path(model_path.as_ref());
        debug!("Loading bundle {}", paths.base.display());

        let words = read_string_list(&paths.words, "vocabulary")?;
        let labels = read_string_list(&paths.classes, "labels")?;
        check_analyzer(&paths.analyzer, analyzer.name())?;
        if !paths.model.exists() {
            return Err(ChatError::artifact_missing(format!(
                "classifier file {} does not exist",
                paths.model.display()
            )));
        }

        let classifier = backend_for(&paths.model)?.load(&paths.model)?;

        let intents = if paths.intents.exists() {
            Some(IntentCatalog::load(&paths.intents).map_err(|e| {
                ChatError::artifact_missing(format!(
                    "intents file {}: {e}",
                    paths.intents.display()
                ))
            })?)
        } else {
            None
        };

        let mut bundle = Self::from_parts(
            classifier,
            Vocabulary::from_words(words),
            LabelSet::from_labels(labels),
            analyzer,
        )?;
        bundle.intents = intents;
        info!(
            "Loaded bundle {} ({} words, {} labels)",
            paths.base.display(),
            bundle.vocabulary().len(),
            bundle.labels().len()
        );
        bundle.paths = Some(paths);
        Ok(bundle)
    }

    /// Assemble a bundle from in-memory parts.
    pub fn from_parts(
        classifier: Box<dyn Classifier>,
        vocabulary: Vocabulary,
        labels: LabelSet,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(ChatError::artifact_missing("label set is empty"));
        }
        if classifier.input_size() != vocabulary.len() {
            return Err(ChatError::artifact_missing(format!(
                "classifier expects {} features but the vocabulary has {} words",
                classifier.input_size(),
                vocabulary.len()
            )));
        }
        if classifier.output_size() != labels.len() {
            return Err(ChatError::artifact_missing(format!(
                "classifier emits {} classes but the label set has {} tags",
                classifier.output_size(),
                labels.len()
            )));
        }

        Ok(TrainedBundle {
            classifier,
            encoder: BagOfWordsEncoder::new(vocabulary, analyzer),
            labels,
            intents: None,
            paths: None,
        })
    }

    /// Attach the catalog used for response lookup.
    pub fn with_intents(mut self, intents: IntentCatalog) -> Self {
        self.intents = Some(intents);
        self
    }

    /// Most likely tag and its probability.
    pub fn classify(&self, text: &str) -> Result<Prediction> {
        let features = self.encoder.encode(text).map_err(into_inference)?;
        let probabilities = self
            .classifier
            .predict_proba(&features)
            .map_err(into_inference)?;

        if probabilities.len() != self.labels.len() {
            return Err(ChatError::inference(format!(
                "classifier returned {} scores for {} labels",
                probabilities.len(),
                self.labels.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ChatError::inference("classifier returned non-finite scores"));
        }

        let index = argmax(&probabilities)
            .ok_or_else(|| ChatError::inference("classifier returned no scores"))?;
        let tag = self
            .labels
            .get(index)
            .ok_or_else(|| ChatError::inference(format!("no label at index {index}")))?;

        Ok(Prediction {
            tag: tag.to_string(),
            confidence: probabilities[index],
        })
    }

    /// Most likely tag for `text`. Ties go to the lowest label index.
    pub fn predict(&self, text: &str) -> Result<String> {
        self.classify(text).map(|prediction| prediction.tag)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.encoder.vocabulary()
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn intents(&self) -> Option<&IntentCatalog> {
        self.intents.as_ref()
    }

    pub fn paths(&self) -> Option<&ArtifactPaths> {
        self.paths.as_ref()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }
}

fn into_inference(e: ChatError) -> ChatError {
    match e {
        ChatError::Inference(_) => e,
        other => ChatError::inference(other.to_string()),
    }
}
