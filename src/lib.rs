//! # agent-chat
//!
//! A small conversational core built around intent classification.
//!
//! ## Features
//!
//! - Pluggable text analysis (lemma or simple normalization)
//! - Bag-of-words encoding against a frozen vocabulary
//! - A feed-forward classifier trained from a hand-written intents file
//! - Atomic model swapping with observer notifications
//! - Keyword fallback whenever no trained model can answer
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agent_chat::analysis::normalizer;
//! use agent_chat::engine::ModelSelection;
//! use agent_chat::session::ChatSession;
//!
//! let selection = Arc::new(ModelSelection::new(normalizer::shared_or_degraded()));
//! selection.set_active_bundle("models/model_20240101_120000.mlp.json").ok();
//!
//! let mut session = ChatSession::new(selection);
//! println!("{}", session.submit("hello there"));
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod intent;
pub mod ml;
pub mod session;

pub mod prelude {
    pub use crate::engine::{ModelMetadata, ModelSelection};
    pub use crate::error::{ChatError, Result};
    pub use crate::intent::{Intent, IntentCatalog};
    pub use crate::ml::artifact::TrainedBundle;
    pub use crate::ml::trainer::Trainer;
    pub use crate::session::ChatSession;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
