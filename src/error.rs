//! Error types for the agent-chat library.
//!
//! All fallible operations return [`ChatError`] through the crate-wide
//! [`Result`] alias. The variants mirror the failure taxonomy of the chat core:
//! intent file problems (`NotFound`, `Malformed`, `Write`), bundle problems
//! (`ArtifactMissing`, `BackendUnavailable`), training problems
//! (`EmptyDataset`) and prediction failures (`Inference`).
//!
//! # Examples
//!
//! ```
//! use agent_chat::error::{ChatError, Result};
//!
//! fn load_something() -> Result<()> {
//!     Err(ChatError::malformed("missing key `intents`"))
//! }
//!
//! match load_something() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for agent-chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    /// An intent file (or other required input) does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An intent file is not valid JSON or violates the expected structure.
    #[error("Malformed intents: {0}")]
    Malformed(String),

    /// A trained bundle is incomplete or its parts do not belong together.
    #[error("Artifact missing: {0}")]
    ArtifactMissing(String),

    /// No classifier backend can train or materialize the model.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The intent catalog yields nothing trainable.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// The classifier failed while producing a prediction.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Persisting a file failed.
    #[error("Write error at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Analysis-related errors (tokenization, lemma resources, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Invalid configuration values.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors not covered by a more specific variant.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors carrying `anyhow` context (CLI layer)
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with ChatError.
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create a new not-found error.
    pub fn not_found<P: Into<PathBuf>>(path: P) -> Self {
        ChatError::NotFound(path.into())
    }

    /// Create a new malformed-intents error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        ChatError::Malformed(msg.into())
    }

    /// Create a new artifact-missing error.
    pub fn artifact_missing<S: Into<String>>(msg: S) -> Self {
        ChatError::ArtifactMissing(msg.into())
    }

    /// Create a new backend-unavailable error.
    pub fn backend_unavailable<S: Into<String>>(msg: S) -> Self {
        ChatError::BackendUnavailable(msg.into())
    }

    /// Create a new empty-dataset error.
    pub fn empty_dataset<S: Into<String>>(msg: S) -> Self {
        ChatError::EmptyDataset(msg.into())
    }

    /// Create a new inference error.
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        ChatError::Inference(msg.into())
    }

    /// Create a new write error for the given path.
    pub fn write<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        ChatError::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        ChatError::Analysis(msg.into())
    }

    /// Create a new config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ChatError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ChatError::Other(msg.into())
    }

    /// Whether the caller can keep going in fallback mode after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChatError::BackendUnavailable(_)
                | ChatError::ArtifactMissing(_)
                | ChatError::Inference(_)
        )
    }
}
