//! Text analysis for agent-chat.
//!
//! Tokenization, lowercasing and lemma reduction, assembled into analyzers
//! and exposed through the process-wide [`normalizer`].

pub mod analyzer;
pub mod normalizer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
