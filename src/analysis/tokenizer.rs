//! Tokenizer implementations for text analysis.
//!
//! Tokenizers are the first step in the analysis pipeline, responsible for
//! splitting input text into tokens.
//!
//! # Available Tokenizers
//!
//! - [`regex::RegexTokenizer`] - Word and punctuation tokens from a regular expression
//! - [`unicode_word::UnicodeWordTokenizer`] - Uses Unicode word boundaries, drops punctuation
//!
//! # Examples
//!
//! ```
//! use agent_chat::analysis::tokenizer::Tokenizer;
//! use agent_chat::analysis::tokenizer::regex::RegexTokenizer;
//!
//! let tokenizer = RegexTokenizer::word_and_punctuation().unwrap();
//! let tokens: Vec<_> = tokenizer.tokenize("Hello world!").unwrap().collect();
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[2].text, "!");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so tokenizers can be shared by every
/// session through the process-wide normalizer.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod regex;
pub mod unicode_word;
