//! Token filter implementations for token transformation.
//!
//! Filters rewrite the token stream produced by a tokenizer.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseFilter`] - Converts tokens to lowercase
//! - [`stem::StemFilter`] - Reduces words to a canonical form (lemma or stem)
//!
//! # Filter Chaining
//!
//! ```text
//! Tokenizer → Lowercase → Lemma → Normalized tokens
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform a token stream.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod stem;
