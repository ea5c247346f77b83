//! Dictionary-assisted English lemma reducer.
//!
//! Works like the noun pass of a WordNet morphological processor: an
//! exception table resolves irregular forms first, then a small set of
//! detachment rules strips regular plural endings. Words that are not purely
//! alphabetic (numbers, contractions, punctuation) are returned unchanged.
//!
//! # Examples
//!
//! ```
//! use agent_chat::analysis::token_filter::stem::Stemmer;
//! use agent_chat::analysis::token_filter::stem::lemma::LemmaStemmer;
//!
//! let stemmer = LemmaStemmer::english().unwrap();
//!
//! assert_eq!(stemmer.stem("dogs"), "dog");
//! assert_eq!(stemmer.stem("children"), "child");
//! assert_eq!(stemmer.stem("hello"), "hello");
//! ```

use ahash::AHashMap;

use crate::analysis::token_filter::stem::Stemmer;
use crate::error::{ChatError, Result};

/// Exception table shipped with the crate.
const ENGLISH_EXCEPTIONS: &str = include_str!("english_exceptions.txt");

/// Plural endings that drop a trailing `es`.
const ES_SUFFIXES: [&str; 5] = ["sses", "ches", "shes", "xes", "zes"];

/// Endings that look plural but usually belong to a singular noun.
const SINGULAR_ENDINGS: [&str; 3] = ["ss", "us", "is"];

/// Lemma reducer backed by an irregular-form table.
#[derive(Debug, Clone)]
pub struct LemmaStemmer {
    exceptions: AHashMap<String, String>,
}

impl LemmaStemmer {
    /// Build a stemmer from the bundled English exception table.
    pub fn english() -> Result<Self> {
        Self::from_table(ENGLISH_EXCEPTIONS)
    }

    /// Build a stemmer from a whitespace-separated `inflected lemma` table.
    ///
    /// Blank lines and lines starting with `#` are ignored. Any other line must
    /// hold exactly two fields.
    pub fn from_table(table: &str) -> Result<Self> {
        let mut exceptions = AHashMap::new();

        for (line_no, line) in table.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [inflected, lemma] => {
                    exceptions.insert(inflected.to_lowercase(), lemma.to_lowercase());
                }
                _ => {
                    return Err(ChatError::analysis(format!(
                        "Invalid lemma table entry at line {}: {line:?}",
                        line_no + 1
                    )));
                }
            }
        }

        if exceptions.is_empty() {
            return Err(ChatError::analysis("Lemma table has no entries"));
        }

        Ok(LemmaStemmer { exceptions })
    }

    /// Number of irregular forms known to this stemmer.
    pub fn len(&self) -> usize {
        self.exceptions.len()
    }

    /// Whether the exception table is empty.
    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    fn detach(word: &str) -> Option<String> {
        let length = word.chars().count();
        if length <= 3 || SINGULAR_ENDINGS.iter().any(|s| word.ends_with(s)) {
            return None;
        }

        if length > 4 && word.ends_with("ies") {
            return Some(format!("{}y", &word[..word.len() - 3]));
        }

        if ES_SUFFIXES.iter().any(|s| word.ends_with(s)) {
            return Some(word[..word.len() - 2].to_string());
        }

        if length > 4 && word.ends_with("men") {
            return Some(format!("{}man", &word[..word.len() - 3]));
        }

        word.strip_suffix('s').map(str::to_string)
    }
}

impl Stemmer for LemmaStemmer {
    fn stem(&self, word: &str) -> String {
        if let Some(lemma) = self.exceptions.get(word) {
            return lemma.clone();
        }

        if !word.chars().all(char::is_alphabetic) {
            return word.to_string();
        }

        Self::detach(word).unwrap_or_else(|| word.to_string())
    }

    fn name(&self) -> &'static str {
        "lemma"
    }
}
