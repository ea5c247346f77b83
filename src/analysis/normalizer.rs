//! Process-wide text normalization.
//!
//! Everything that turns text into tokens (the encoder, the dataset builder,
//! trained bundles) goes through an `Arc<dyn Analyzer>` so the strategy can be
//! swapped. The lemma strategy is built once per process behind a
//! [`OnceLock`]: the first caller runs the initialization, concurrent first
//! callers block until it finishes, and the outcome (success or failure) is
//! cached. A failed initialization is never retried; callers that want to keep
//! going use [`shared_or_degraded`], which substitutes [`SimpleAnalyzer`].

use std::sync::{Arc, Once, OnceLock};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::english::EnglishAnalyzer;
use crate::analysis::analyzer::simple::SimpleAnalyzer;
use crate::analysis::token_filter::stem::LemmaStemmer;
use crate::error::{ChatError, Result};

/// Outcome of building the lemma analyzer, cached for the process.
type LemmaInit = std::result::Result<Arc<dyn Analyzer>, String>;

static LEMMA_ANALYZER: OnceLock<LemmaInit> = OnceLock::new();
static DEGRADED_WARNING: Once = Once::new();

/// Selectable normalization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerKind {
    /// Word/punctuation tokens, lowercased, reduced to lemmas.
    #[default]
    Lemma,
    /// Unicode words, lowercased. Needs no linguistic resources.
    Simple,
}

/// The process-wide lemma analyzer, initialized on first use.
pub fn shared() -> Result<Arc<dyn Analyzer>> {
    lemma_init()
        .clone()
        .map_err(|msg| ChatError::analysis(format!("Normalization unavailable: {msg}")))
}

fn lemma_init() -> &'static LemmaInit {
    LEMMA_ANALYZER.get_or_init(|| {
        debug!("Loading lemma resources");
        lemma_analyzer(LemmaStemmer::english())
    })
}

fn lemma_analyzer(stemmer: Result<LemmaStemmer>) -> LemmaInit {
    stemmer
        .and_then(EnglishAnalyzer::with_stemmer)
        .map(|analyzer| Arc::new(analyzer) as Arc<dyn Analyzer>)
        .map_err(|e| e.to_string())
}

/// The lemma analyzer, or the simple analyzer if lemma resources failed.
///
/// The degradation is logged once per process.
pub fn shared_or_degraded() -> Arc<dyn Analyzer> {
    degrade(lemma_init())
}

fn degrade(init: &LemmaInit) -> Arc<dyn Analyzer> {
    match init {
        Ok(analyzer) => Arc::clone(analyzer),
        Err(msg) => {
            DEGRADED_WARNING.call_once(|| {
                warn!("Normalization unavailable: {msg}; falling back to simple tokenization");
            });
            Arc::new(SimpleAnalyzer::new())
        }
    }
}

/// Resolve a configured strategy to an analyzer.
pub fn for_kind(kind: NormalizerKind) -> Arc<dyn Analyzer> {
    match kind {
        NormalizerKind::Lemma => shared_or_degraded(),
        NormalizerKind::Simple => Arc::new(SimpleAnalyzer::new()),
    }
}

/// Run `text` through `analyzer` and collect the surviving token texts.
pub fn normalize(analyzer: &dyn Analyzer, text: &str) -> Result<Vec<String>> {
    Ok(analyzer
        .analyze(text)?
        .filter(|token| !token.is_stopped())
        .map(|token| token.text)
        .collect())
}

/// Normalize with the process-wide default strategy.
pub fn normalize_text(text: &str) -> Result<Vec<String>> {
    normalize(shared_or_degraded().as_ref(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_is_initialized_once() {
        let first = shared().unwrap();
        let second = shared().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "english");
    }

    #[test]
    fn test_concurrent_first_use_yields_one_instance() {
        let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(shared)).collect();
        let analyzers: Vec<Arc<dyn Analyzer>> =
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

        for analyzer in &analyzers[1..] {
            assert!(Arc::ptr_eq(&analyzers[0], analyzer));
        }
    }

    #[test]
    fn test_failed_lemma_table_degrades_to_simple() {
        let init = lemma_analyzer(LemmaStemmer::from_table(""));
        assert!(init.is_err());

        let analyzer = degrade(&init);
        assert_eq!(analyzer.name(), "simple");
        assert_eq!(
            normalize(analyzer.as_ref(), "Dogs bark!").unwrap(),
            vec!["dogs", "bark"]
        );

        // Degrading twice still works after the warning has been issued.
        assert_eq!(degrade(&init).name(), "simple");
    }

    #[test]
    fn test_loaded_lemma_table_is_kept() {
        let init = lemma_analyzer(LemmaStemmer::english());
        assert_eq!(degrade(&init).name(), "english");
    }

    #[test]
    fn test_normalize_text() {
        let tokens = normalize_text("Hello there, friends!").unwrap();
        assert_eq!(tokens, vec!["hello", "there", ",", "friend", "!"]);
    }

    #[test]
    fn test_for_kind() {
        assert_eq!(for_kind(NormalizerKind::Lemma).name(), "english");
        assert_eq!(for_kind(NormalizerKind::Simple).name(), "simple");
    }

    #[test]
    fn test_normalizer_kind_serde() {
        let kind: NormalizerKind = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(kind, NormalizerKind::Simple);
        assert_eq!(NormalizerKind::default(), NormalizerKind::Lemma);
    }
}
