//! Output formatting for CLI commands.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::args::{ChatArgs, OutputFormat};
use crate::engine::ModelMetadata;
use crate::error::Result;
use crate::session::Turn;

/// Result structure for training.
#[derive(Debug, Serialize)]
pub struct TrainingResult {
    pub model_path: PathBuf,
    pub words_path: PathBuf,
    pub classes_path: PathBuf,
    pub intents_path: Option<PathBuf>,
    pub epochs: usize,
    pub final_loss: Option<f32>,
    pub training_accuracy: Option<f32>,
    pub duration_ms: u64,
    /// True when no backend was available and only sidecars were written.
    pub degraded: bool,
    pub label: String,
}

/// Result structure for a one-shot prediction.
#[derive(Debug, Serialize)]
pub struct PredictionResult {
    pub text: String,
    pub tag: String,
    pub confidence: f32,
    pub response: String,
}

/// Summary of an intents file.
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub path: PathBuf,
    pub intents: usize,
    pub patterns: usize,
    pub responses: usize,
    pub vocabulary_size: usize,
    pub tags: Vec<String>,
    pub normalizer: String,
}

/// Final state of an interactive chat.
#[derive(Debug, Serialize)]
pub struct TranscriptResult {
    pub session_id: String,
    pub model: ModelMetadata,
    pub turns: Vec<Turn>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &ChatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &ChatArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    if let serde_json::Value::Object(obj) = &value {
        for (key, val) in obj {
            if val.is_null() {
                continue;
            }
            println!("{}: {}", key.replace('_', " "), format_value(val));
        }
    } else {
        println!("{}", format_value(&value));
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &ChatArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(obj) => {
            let formatted_fields = obj
                .iter()
                .map(|(k, v)| format!("{k}={}", format_value(v)))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{{{formatted_fields}}}")
        }
        serde_json::Value::Null => "-".to_string(),
    }
}
