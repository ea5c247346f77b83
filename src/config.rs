//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! {"models_directory": "./models", "normalizer": "simple", "training": {"epochs": 200}}
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::NormalizerKind;
use crate::error::{ChatError, Result};
use crate::ml::TrainingConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Where trained bundles are written and searched.
    pub models_directory: PathBuf,
    /// Default intent file.
    pub intents_path: PathBuf,
    /// Text normalization strategy.
    pub normalizer: NormalizerKind,
    pub training: TrainingConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            models_directory: PathBuf::from("./models"),
            intents_path: PathBuf::from("./intents.json"),
            normalizer: NormalizerKind::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ChatError::not_found(path),
            _ => ChatError::Io(e),
        })?;

        let config: ChatConfig = serde_json::from_str(&content)
            .map_err(|e| ChatError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.models_directory.as_os_str().is_empty() {
            return Err(ChatError::config("models_directory must not be empty"));
        }
        self.training.validate()
    }
}
