//! Bag-of-words encoding against a frozen vocabulary.
//!
//! Position `i` of an encoded vector is `1.0` when `vocabulary[i]` occurs among
//! the normalized tokens of the text and `0.0` otherwise. Order and repetition
//! do not matter, and tokens outside the vocabulary are ignored.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::normalizer::normalize;
use crate::error::Result;
use crate::ml::dataset::Vocabulary;

/// Encode `text` against `vocabulary` using `analyzer` for normalization.
pub fn encode(text: &str, vocabulary: &Vocabulary, analyzer: &dyn Analyzer) -> Result<Vec<f32>> {
    let tokens = normalize(analyzer, text)?;
    Ok(encode_tokens(&tokens, &vocabulary.index(), vocabulary.len()))
}

/// Encode already-normalized tokens given a token → position index.
pub fn encode_tokens<S: AsRef<str>>(
    tokens: &[S],
    index: &AHashMap<String, usize>,
    width: usize,
) -> Vec<f32> {
    let mut bag = vec![0.0; width];
    for token in tokens {
        if let Some(&position) = index.get(token.as_ref()) {
            bag[position] = 1.0;
        }
    }
    bag
}

/// Reusable encoder that keeps the vocabulary index around between calls.
pub struct BagOfWordsEncoder {
    vocabulary: Vocabulary,
    index: AHashMap<String, usize>,
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for BagOfWordsEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BagOfWordsEncoder")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl BagOfWordsEncoder {
    pub fn new(vocabulary: Vocabulary, analyzer: Arc<dyn Analyzer>) -> Self {
        let index = vocabulary.index();
        Self {
            vocabulary,
            index,
            analyzer,
        }
    }

    /// Normalize and encode `text`.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = normalize(self.analyzer.as_ref(), text)?;
        Ok(self.encode_tokens(&tokens))
    }

    pub fn encode_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<f32> {
        encode_tokens(tokens, &self.index, self.vocabulary.len())
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::simple::SimpleAnalyzer;
    use crate::analysis::normalizer;

    fn vocabulary(words: &[&str]) -> Vocabulary {
        Vocabulary::from_words(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_encode_presence() {
        let vocab = vocabulary(&["hello", "world"]);
        let analyzer = SimpleAnalyzer::new();

        let bag = encode("Hello world!", &vocab, &analyzer).unwrap();
        assert_eq!(bag, vec![1.0, 1.0]);
    }

    #[test]
    fn test_encode_length_and_values() {
        let vocab = vocabulary(&["a", "b", "c", "d"]);
        let analyzer = normalizer::shared_or_degraded();

        for text in ["", "a", "zzz yyy", "d c b a a a", "¿qué?"] {
            let bag = encode(text, &vocab, analyzer.as_ref()).unwrap();
            assert_eq!(bag.len(), vocab.len());
            assert!(bag.iter().all(|&v| v == 0.0 || v == 1.0));
        }
    }

    #[test]
    fn test_encode_order_and_repetition_insensitive() {
        let vocab = vocabulary(&["dog", "hello", "hi"]);
        let analyzer = normalizer::shared_or_degraded();

        let a = encode("hello dogs hi", &vocab, analyzer.as_ref()).unwrap();
        let b = encode("hi hi dogs hello", &vocab, analyzer.as_ref()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let vocab = vocabulary(&["hello"]);
        let analyzer = SimpleAnalyzer::new();

        let bag = encode("completely unrelated words", &vocab, &analyzer).unwrap();
        assert_eq!(bag, vec![0.0]);
    }

    #[test]
    fn test_empty_vocabulary() {
        let vocab = Vocabulary::default();
        let analyzer = SimpleAnalyzer::new();
        assert!(encode("hello", &vocab, &analyzer).unwrap().is_empty());
    }

    #[test]
    fn test_reusable_encoder() {
        let encoder = BagOfWordsEncoder::new(
            vocabulary(&["bye", "hello"]),
            Arc::new(SimpleAnalyzer::new()),
        );

        assert_eq!(encoder.encode("ok bye").unwrap(), vec![1.0, 0.0]);
        assert_eq!(encoder.encode_tokens(&["hello"]), vec![0.0, 1.0]);
        assert_eq!(encoder.vocabulary().len(), 2);
    }
}
