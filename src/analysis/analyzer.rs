//! Analyzer trait definition and implementations.
//!
//! Analyzers combine a tokenizer and filters into a complete normalization
//! pipeline:
//!
//! ```text
//! Raw Text → Analyzer → Token Stream
//!             ↓
//!         Tokenizer
//!             ↓
//!         Filter 1 .. N
//! ```
//!
//! # Available Implementations
//!
//! - [`EnglishAnalyzer`](english::EnglishAnalyzer) - Word/punctuation tokens, lowercased and lemmatized
//! - [`SimpleAnalyzer`](simple::SimpleAnalyzer) - Unicode words, lowercased; needs no resources
//! - [`PipelineAnalyzer`](pipeline::PipelineAnalyzer) - Custom tokenizer + filter chains

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that turn raw text into a token stream.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;
}

pub mod english;
pub mod pipeline;
pub mod simple;
