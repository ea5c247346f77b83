//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows through the analysis pipeline: the
//! tokenizer produces them, filters rewrite them, and the normalizer collects
//! their text.
//!
//! # Examples
//!
//! ```
//! use agent_chat::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.start_offset, 6);
//! assert_eq!(token.end_offset, 11);
//! ```

use serde::{Deserialize, Serialize};

/// A token represents a single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the original token stream (0-based)
    pub position: usize,

    /// The byte offset where this token starts in the original text
    pub start_offset: usize,

    /// The byte offset where this token ends in the original text
    pub end_offset: usize,

    /// Whether this token has been marked as stopped (removed) by a filter
    pub stopped: bool,
}

impl Token {
    /// Create a new token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
            stopped: false,
        }
    }

    /// Create a new token with explicit byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stopped: false,
        }
    }

    /// Replace the token text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Mark this token as stopped.
    pub fn stop(mut self) -> Self {
        self.stopped = true;
        self
    }

    /// Check if this token is stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// True when the token consists only of punctuation/symbol characters.
    pub fn is_punctuation(&self) -> bool {
        !self.text.is_empty()
            && self
                .text
                .chars()
                .all(|c| !c.is_alphanumeric() && !c.is_whitespace() && c != '_')
    }
}

/// A stream of tokens flowing through the pipeline.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 0);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 0);
        assert_eq!(token.start_offset, 0);
        assert_eq!(token.end_offset, 5);
        assert!(!token.is_stopped());
    }

    #[test]
    fn test_token_with_text_keeps_offsets() {
        let token = Token::with_offsets("Running", 2, 10, 17).with_text("run");
        assert_eq!(token.text, "run");
        assert_eq!(token.position, 2);
        assert_eq!(token.start_offset, 10);
        assert_eq!(token.end_offset, 17);
    }

    #[test]
    fn test_token_stop() {
        let token = Token::new("the", 0).stop();
        assert!(token.is_stopped());
    }

    #[test]
    fn test_punctuation_detection() {
        assert!(Token::new("?", 0).is_punctuation());
        assert!(Token::new("¿", 0).is_punctuation());
        assert!(!Token::new("hi", 0).is_punctuation());
        assert!(!Token::new("don't", 0).is_punctuation());
        assert!(!Token::new("", 0).is_punctuation());
    }
}
