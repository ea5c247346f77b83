//! Command line argument parsing for the agent-chat CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// agent-chat - A small intent-classification chat bot
#[derive(Parser, Debug, Clone)]
#[command(name = "agent-chat")]
#[command(about = "Train and chat with a small intent-classification bot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ChatArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "AGENT_CHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ChatArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start an interactive chat
    Chat(ChatCommandArgs),

    /// Train a new model bundle from an intents file
    Train(TrainArgs),

    /// Classify text with a trained bundle
    Predict(PredictArgs),

    /// Check an intents file and summarize it
    Validate(ValidateArgs),
}

/// Which bundle to answer with; none means keyword fallback.
#[derive(Args, Debug, Clone, Default)]
pub struct BundleSelector {
    /// Classifier file of the bundle to load
    #[arg(short, long, value_name = "MODEL_FILE", conflicts_with = "latest")]
    pub bundle: Option<PathBuf>,

    /// Load the newest bundle found in this directory (default: the
    /// configured models directory)
    #[arg(long, value_name = "MODELS_DIR", num_args = 0..=1)]
    pub latest: Option<Option<PathBuf>>,
}

/// Arguments for interactive chat
#[derive(Parser, Debug, Clone)]
pub struct ChatCommandArgs {
    #[command(flatten)]
    pub selector: BundleSelector,

    /// Intents file responses are drawn from
    #[arg(short, long, value_name = "INTENTS_FILE")]
    pub intents: Option<PathBuf>,

    /// Display label of the active model
    #[arg(long)]
    pub label: Option<String>,
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Intents file to train on
    #[arg(short, long, value_name = "INTENTS_FILE")]
    pub intents: Option<PathBuf>,

    /// Directory the bundle is written to
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Number of training epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Mini-batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Display label recorded for the new model
    #[arg(long)]
    pub label: Option<String>,

    /// Seed for reproducible training
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for one-shot prediction
#[derive(Parser, Debug, Clone)]
pub struct PredictArgs {
    /// Classifier file of the bundle to use
    #[arg(short, long, value_name = "MODEL_FILE")]
    pub bundle: PathBuf,

    /// Text to classify
    #[arg(value_name = "TEXT", required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl PredictArgs {
    pub fn joined_text(&self) -> String {
        self.text.join(" ")
    }
}

/// Arguments for intents validation
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Intents file to check
    #[arg(short, long, value_name = "INTENTS_FILE")]
    pub intents: Option<PathBuf>,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
