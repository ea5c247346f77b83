//! Stemming token filter and stemmer implementations.

use std::fmt::{Debug, Formatter};

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Trait for word reduction algorithms.
pub trait Stemmer: Send + Sync {
    /// Reduce a word to its canonical form.
    fn stem(&self, word: &str) -> String;

    /// Get the name of this stemmer.
    fn name(&self) -> &'static str;
}

pub mod lemma;

pub use lemma::LemmaStemmer;

/// Filter that applies a [`Stemmer`] to every non-stopped token.
pub struct StemFilter {
    stemmer: Box<dyn Stemmer>,
}

impl Debug for StemFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemFilter")
            .field("stemmer", &self.stemmer.name())
            .finish()
    }
}

impl StemFilter {
    /// Create a stem filter with a custom stemmer.
    pub fn with_stemmer(stemmer: Box<dyn Stemmer>) -> Self {
        StemFilter { stemmer }
    }

    /// Create a stem filter backed by the bundled English lemma table.
    pub fn lemma() -> Result<Self> {
        Ok(StemFilter {
            stemmer: Box::new(LemmaStemmer::english()?),
        })
    }

    /// Name of the wrapped stemmer.
    pub fn stemmer_name(&self) -> &'static str {
        self.stemmer.name()
    }
}

impl Filter for StemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered_tokens = tokens
            .map(|token| {
                if token.is_stopped() || token.is_punctuation() {
                    token
                } else {
                    let stemmed = self.stemmer.stem(&token.text);
                    token.with_text(stemmed)
                }
            })
            .collect::<Vec<_>>();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}
