//! Intent catalog loading, saving and response lookup.
//!
//! The catalog is a JSON document of the form
//!
//! ```json
//! {"intents": [{"tag": "greet", "patterns": ["hello"], "responses": ["Hi!"]}]}
//! ```
//!
//! Unknown keys are ignored on load. Saving writes pretty-printed UTF-8 with
//! non-ASCII text preserved as-is.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Reply used whenever no response can be selected for a tag.
pub const NOT_UNDERSTOOD: &str = "I don't understand.";

/// A labeled category of user utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Unique key of the intent.
    pub tag: String,
    /// Example user utterances.
    pub patterns: Vec<String>,
    /// Candidate replies.
    pub responses: Vec<String>,
}

impl Intent {
    pub fn new<S: Into<String>>(tag: S, patterns: Vec<String>, responses: Vec<String>) -> Self {
        Intent {
            tag: tag.into(),
            patterns,
            responses,
        }
    }
}

/// Ordered collection of intents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCatalog {
    pub intents: Vec<Intent>,
}

impl IntentCatalog {
    pub fn new(intents: Vec<Intent>) -> Self {
        IntentCatalog { intents }
    }

    /// Load a catalog from a JSON file.
    ///
    /// Fails with [`ChatError::NotFound`] when the file does not exist and
    /// [`ChatError::Malformed`] when it is not a valid catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ChatError::not_found(path),
            ErrorKind::InvalidData => {
                ChatError::malformed(format!("{} is not valid UTF-8", path.display()))
            }
            _ => ChatError::Io(e),
        })?;

        let catalog = Self::from_json_str(&content)?;
        debug!(
            "Loaded {} intents from {}",
            catalog.intents.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ChatError::malformed(e.to_string()))
    }

    /// Serialize the catalog as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the catalog to `path`, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ChatError::write(parent, e))?;
        }
        fs::write(path, json).map_err(|e| ChatError::write(path, e))?;

        debug!("Saved {} intents to {}", self.intents.len(), path.display());
        Ok(())
    }

    /// First intent with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Intent> {
        self.intents.iter().find(|intent| intent.tag == tag)
    }

    /// Tags in catalog order.
    pub fn tags(&self) -> Vec<&str> {
        self.intents.iter().map(|intent| intent.tag.as_str()).collect()
    }

    /// Total number of patterns across all intents.
    pub fn pattern_count(&self) -> usize {
        self.intents.iter().map(|intent| intent.patterns.len()).sum()
    }

    /// Total number of responses across all intents.
    pub fn response_count(&self) -> usize {
        self.intents.iter().map(|intent| intent.responses.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Pick a response for `tag` uniformly at random.
    ///
    /// The first intent with this tag that has responses is used. Unknown tags
    /// and tags without any responses yield [`NOT_UNDERSTOOD`].
    pub fn respond<R: Rng + ?Sized>(&self, tag: &str, rng: &mut R) -> String {
        self.intents
            .iter()
            .filter(|intent| intent.tag == tag)
            .find(|intent| !intent.responses.is_empty())
            .and_then(|intent| intent.responses.choose(rng))
            .cloned()
            .unwrap_or_else(|| NOT_UNDERSTOOD.to_string())
    }
}
