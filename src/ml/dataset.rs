//! Dataset construction from an intent catalog.

use ahash::AHashMap;
use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::normalizer::normalize;
use crate::error::{ChatError, Result};
use crate::intent::IntentCatalog;
use crate::ml::encoder::encode_tokens;

/// Tokens never admitted to the vocabulary.
pub const IGNORED_TOKENS: [&str; 5] = ["?", "!", "¿", ".", ","];

/// Ordered, distinct normalized tokens. Position `i` is feature `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Wrap words exactly as given (e.g. as read back from a bundle).
    pub fn from_words(words: Vec<String>) -> Self {
        Vocabulary { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Token → position map. First occurrence wins.
    pub fn index(&self) -> AHashMap<String, usize> {
        let mut index = AHashMap::with_capacity(self.words.len());
        for (position, word) in self.words.iter().enumerate() {
            index.entry(word.clone()).or_insert(position);
        }
        index
    }
}

/// Ordered, distinct intent tags. Position `i` is output class `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn from_labels(labels: Vec<String>) -> Self {
        LabelSet { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn position(&self, tag: &str) -> Option<usize> {
        self.labels.iter().position(|label| label == tag)
    }
}

/// Normalized tokens of one pattern and the tag it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingDocument {
    pub tokens: Vec<String>,
    pub tag: String,
}

/// Output of [`build_dataset`].
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub vocabulary: Vocabulary,
    pub labels: LabelSet,
    pub documents: Vec<TrainingDocument>,
}

/// Feature rows and one-hot target rows, shuffled together.
#[derive(Debug, Clone, Default)]
pub struct TrainingMatrix {
    pub features: Vec<Vec<f32>>,
    pub targets: Vec<Vec<f32>>,
}

impl TrainingMatrix {
    pub fn rows(&self) -> usize {
        self.features.len()
    }

    pub fn input_size(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    pub fn output_size(&self) -> usize {
        self.targets.first().map_or(0, Vec::len)
    }
}

/// Build the vocabulary, label set and documents for `catalog`.
///
/// Tags are collected in first-seen order. The vocabulary is the set of all
/// normalized pattern tokens minus [`IGNORED_TOKENS`], sorted ascending.
pub fn build_dataset(catalog: &IntentCatalog, analyzer: &dyn Analyzer) -> Result<Dataset> {
    let mut words: Vec<String> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut documents = Vec::new();

    for intent in &catalog.intents {
        if intent.tag.is_empty() {
            warn!(
                "Skipping intent with an empty tag ({} patterns)",
                intent.patterns.len()
            );
            continue;
        }

        for pattern in &intent.patterns {
            let tokens = normalize(analyzer, pattern)?;
            words.extend(tokens.iter().cloned());
            documents.push(TrainingDocument {
                tokens,
                tag: intent.tag.clone(),
            });
        }

        if !labels.contains(&intent.tag) {
            labels.push(intent.tag.clone());
        }
    }

    words.retain(|word| !IGNORED_TOKENS.contains(&word.as_str()));
    words.sort();
    words.dedup();

    debug!(
        "Built dataset: {} documents, {} words, {} labels",
        documents.len(),
        words.len(),
        labels.len()
    );

    Ok(Dataset {
        vocabulary: Vocabulary::from_words(words),
        labels: LabelSet::from_labels(labels),
        documents,
    })
}

/// Turn documents into a shuffled feature matrix and one-hot targets.
///
/// One permutation is applied to both matrices, so row `i` of `features`
/// still belongs with row `i` of `targets`.
pub fn vectorize<R: Rng + ?Sized>(
    vocabulary: &Vocabulary,
    labels: &LabelSet,
    documents: &[TrainingDocument],
    rng: &mut R,
) -> Result<TrainingMatrix> {
    if vocabulary.is_empty() || labels.is_empty() {
        return Err(ChatError::empty_dataset(format!(
            "vocabulary has {} words and label set has {} tags",
            vocabulary.len(),
            labels.len()
        )));
    }

    let index = vocabulary.index();
    let mut rows = Vec::with_capacity(documents.len());

    for document in documents {
        let class = labels.position(&document.tag).ok_or_else(|| {
            ChatError::malformed(format!("tag `{}` is not in the label set", document.tag))
        })?;

        let mut target = vec![0.0; labels.len()];
        target[class] = 1.0;
        rows.push((
            encode_tokens(&document.tokens, &index, vocabulary.len()),
            target,
        ));
    }

    rows.shuffle(rng);
    let (features, targets) = rows.into_iter().unzip();

    Ok(TrainingMatrix { features, targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::simple::SimpleAnalyzer;
    use crate::analysis::normalizer;
    use crate::intent::Intent;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn greet_catalog() -> IntentCatalog {
        IntentCatalog::from_json_str(
            r#"{"intents":[{"tag":"greet","patterns":["hello","hi"],"responses":["hey"]}]}"#,
        )
        .unwrap()
    }

    fn sample_catalog() -> IntentCatalog {
        IntentCatalog::new(vec![
            Intent::new(
                "greet",
                vec!["Hello!".into(), "Hi there, friend".into()],
                vec!["hey".into()],
            ),
            Intent::new(
                "bye",
                vec!["Bye".into(), "See you later?".into()],
                vec!["bye".into()],
            ),
            Intent::new(
                "greet",
                vec!["good morning".into()],
                vec!["morning".into()],
            ),
        ])
    }

    #[test]
    fn test_greet_scenario() {
        let analyzer = normalizer::shared_or_degraded();
        let dataset = build_dataset(&greet_catalog(), analyzer.as_ref()).unwrap();

        assert!(dataset.vocabulary.contains("hello"));
        assert!(dataset.vocabulary.contains("hi"));
        assert_eq!(dataset.labels.labels(), ["greet".to_string()]);
        assert_eq!(dataset.documents.len(), 2);
    }

    #[test]
    fn test_vocabulary_sorted_deduplicated_without_punctuation() {
        let analyzer = normalizer::shared_or_degraded();
        let dataset = build_dataset(&sample_catalog(), analyzer.as_ref()).unwrap();

        let words = dataset.vocabulary.words();
        let mut expected = words.to_vec();
        expected.sort();
        expected.dedup();
        assert_eq!(words, expected.as_slice());

        for ignored in IGNORED_TOKENS {
            assert!(!dataset.vocabulary.contains(ignored));
        }
        assert!(dataset.vocabulary.contains("friend"));
    }

    #[test]
    fn test_labels_first_seen_order() {
        let analyzer = SimpleAnalyzer::new();
        let dataset = build_dataset(&sample_catalog(), &analyzer).unwrap();

        assert_eq!(dataset.labels.labels(), ["greet".to_string(), "bye".to_string()]);
        assert_eq!(dataset.documents.len(), 5);
        assert_eq!(dataset.documents[4].tag, "greet");
    }

    #[test]
    fn test_documents_keep_punctuation_tokens() {
        let analyzer = normalizer::shared_or_degraded();
        let dataset = build_dataset(&sample_catalog(), analyzer.as_ref()).unwrap();

        if analyzer.name() == "english" {
            assert_eq!(dataset.documents[0].tokens, vec!["hello", "!"]);
        }
    }

    #[test]
    fn test_empty_catalog() {
        let analyzer = SimpleAnalyzer::new();
        let dataset = build_dataset(&IntentCatalog::default(), &analyzer).unwrap();

        assert!(dataset.vocabulary.is_empty());
        assert!(dataset.labels.is_empty());
        assert!(dataset.documents.is_empty());

        let mut rng = StdRng::seed_from_u64(0);
        let result = vectorize(
            &dataset.vocabulary,
            &dataset.labels,
            &dataset.documents,
            &mut rng,
        );
        assert!(matches!(result, Err(ChatError::EmptyDataset(_))));
    }

    #[test]
    fn test_vectorize_shapes() {
        let analyzer = SimpleAnalyzer::new();
        let dataset = build_dataset(&sample_catalog(), &analyzer).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let matrix = vectorize(
            &dataset.vocabulary,
            &dataset.labels,
            &dataset.documents,
            &mut rng,
        )
        .unwrap();

        assert_eq!(matrix.rows(), dataset.documents.len());
        assert_eq!(matrix.targets.len(), dataset.documents.len());
        assert_eq!(matrix.input_size(), dataset.vocabulary.len());
        assert_eq!(matrix.output_size(), dataset.labels.len());
        for target in &matrix.targets {
            assert_eq!(target.iter().filter(|&&v| v == 1.0).count(), 1);
        }
    }

    #[test]
    fn test_vectorize_preserves_pairing() {
        let analyzer = SimpleAnalyzer::new();
        // Every pattern has a word unique to its tag, so each feature row
        // identifies the tag its target row must carry.
        let catalog = IntentCatalog::new(vec![
            Intent::new("a", vec!["alpha".into(), "apple".into()], vec![]),
            Intent::new("b", vec!["beta".into(), "banana".into()], vec![]),
            Intent::new("c", vec!["gamma".into(), "cherry".into()], vec![]),
        ]);
        let dataset = build_dataset(&catalog, &analyzer).unwrap();

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let matrix = vectorize(
                &dataset.vocabulary,
                &dataset.labels,
                &dataset.documents,
                &mut rng,
            )
            .unwrap();

            for (features, target) in matrix.features.iter().zip(&matrix.targets) {
                let word_index = features.iter().position(|&v| v == 1.0).unwrap();
                let word = &dataset.vocabulary.words()[word_index];
                let class = target.iter().position(|&v| v == 1.0).unwrap();
                let document = dataset
                    .documents
                    .iter()
                    .find(|d| d.tokens.contains(word))
                    .unwrap();
                assert_eq!(dataset.labels.get(class), Some(document.tag.as_str()));
            }
        }
    }

    #[test]
    fn test_vocabulary_index() {
        let vocab = Vocabulary::from_words(vec!["b".into(), "a".into()]);
        let index = vocab.index();
        assert_eq!(index.get("b"), Some(&0));
        assert_eq!(index.get("a"), Some(&1));
    }
}
