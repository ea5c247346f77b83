//! Command implementations for the agent-chat CLI.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use chrono::Local;
use crossbeam_channel::unbounded;
use log::{info, warn};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::normalizer;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::ChatConfig;
use crate::engine::{ModelSelection, latest_bundle};
use crate::error::{ChatError, Result};
use crate::intent::{IntentCatalog, NOT_UNDERSTOOD};
use crate::ml::artifact::TrainedBundle;
use crate::ml::dataset::build_dataset;
use crate::ml::trainer::{TrainedArtifacts, Trainer, TrainingEvent, write_vocab_sidecars};
use crate::session::ChatSession;

/// Execute a CLI command.
pub fn execute_command(args: ChatArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Chat(chat_args) => run_chat(chat_args, &config, &args),
        Command::Train(train_args) => run_train(train_args, &config, &args),
        Command::Predict(predict_args) => run_predict(predict_args, &config, &args),
        Command::Validate(validate_args) => run_validate(validate_args, &config, &args),
    }
}

fn load_config(args: &ChatArgs) -> Result<ChatConfig> {
    match &args.config {
        Some(path) => Ok(ChatConfig::load(path)
            .with_context(|| format!("cannot use config file {}", path.display()))?),
        None => Ok(ChatConfig::default()),
    }
}

fn load_intents(path: &Path) -> Result<IntentCatalog> {
    Ok(IntentCatalog::load(path)
        .with_context(|| format!("cannot read intents from {}", path.display()))?)
}

/// Interactive chat loop.
fn run_chat(args: &ChatCommandArgs, config: &ChatConfig, cli_args: &ChatArgs) -> Result<()> {
    let analyzer = normalizer::for_kind(config.normalizer);
    let selection = Arc::new(ModelSelection::new(analyzer));
    selection.subscribe(|metadata| {
        info!(
            "Model is now {} v{} {}",
            metadata
                .path
                .as_deref()
                .map_or_else(|| "keyword fallback".to_string(), |p| p.display().to_string()),
            metadata.version,
            metadata.label
        );
    });

    match &args.intents {
        Some(path) => {
            selection.set_intents(load_intents(path)?);
        }
        None if config.intents_path.exists() => {
            selection.set_intents(load_intents(&config.intents_path)?);
        }
        None => {}
    }

    if let Some(model) = resolve_bundle(&args.selector, config) {
        if let Err(e) = selection.set_active_bundle(&model) {
            if !e.is_recoverable() {
                return Err(e);
            }
            eprintln!("Could not load {}: {e}", model.display());
            eprintln!("Continuing with keyword replies.");
        }
    }
    if let Some(label) = &args.label {
        selection.set_label(label.clone());
    }

    let mut session = ChatSession::new(Arc::clone(&selection));
    if cli_args.verbosity() > 0 {
        println!("Chat started. Type /quit to leave, /history or /meta to inspect.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                for turn in session.history() {
                    println!("{:?}: {}", turn.sender, turn.text);
                }
            }
            "/meta" => {
                let metadata = selection.get_active_metadata();
                println!(
                    "model: {}",
                    metadata
                        .path
                        .as_deref()
                        .map_or_else(|| "-".to_string(), |p| p.display().to_string())
                );
                println!("version: {}", metadata.version);
                println!("label: {}", metadata.label);
            }
            "/clear" => {
                selection.clear_active_bundle();
            }
            command if command.starts_with("/bump") => {
                let label = command.trim_start_matches("/bump").trim();
                let label = (!label.is_empty()).then(|| label.to_string());
                println!("version: {}", selection.bump_version(label));
            }
            command if command.starts_with("/load ") => {
                let path = PathBuf::from(command.trim_start_matches("/load ").trim());
                match selection.set_active_bundle(&path) {
                    Ok(metadata) => println!("loaded {} (v{})", path.display(), metadata.version),
                    Err(e) => println!("{e}"),
                }
            }
            _ => println!("{}", session.submit(&line)),
        }
    }

    if cli_args.output_format == OutputFormat::Json {
        output_result(
            "Chat ended",
            &TranscriptResult {
                session_id: session.id().to_string(),
                model: selection.get_active_metadata(),
                turns: session.history().to_vec(),
            },
            cli_args,
        )?;
    }
    Ok(())
}

fn resolve_bundle(selector: &BundleSelector, config: &ChatConfig) -> Option<PathBuf> {
    if let Some(path) = &selector.bundle {
        return Some(path.clone());
    }
    let dir = selector
        .latest
        .as_ref()?
        .as_deref()
        .unwrap_or(config.models_directory.as_path());

    let found = latest_bundle(dir);
    if found.is_none() {
        warn!("No trained bundle found in {}", dir.display());
    }
    found
}

/// Train a new bundle on a worker thread, printing progress as it arrives.
fn run_train(args: &TrainArgs, config: &ChatConfig, cli_args: &ChatArgs) -> Result<()> {
    let intents_path = args.intents.as_ref().unwrap_or(&config.intents_path);
    let output_dir = args.output.clone().unwrap_or_else(|| config.models_directory.clone());
    let catalog = load_intents(intents_path)?;

    let mut training = config.training.clone();
    if args.seed.is_some() {
        training.seed = args.seed;
    }
    let epochs = args.epochs.unwrap_or(training.epochs);
    let batch_size = args.batch_size.unwrap_or(training.batch_size);
    let analyzer = normalizer::for_kind(config.normalizer);

    if cli_args.verbosity() > 0 {
        println!(
            "Training on {} ({} intents, {} patterns)",
            intents_path.display(),
            catalog.intents.len(),
            catalog.pattern_count()
        );
    }

    let (sender, receiver) = unbounded();
    let trainer = Trainer::new(training, Arc::clone(&analyzer)).with_progress(move |event| {
        let _ = sender.send(event);
    });

    let worker = {
        let catalog = catalog.clone();
        let output_dir = output_dir.clone();
        thread::spawn(move || trainer.train(&catalog, &output_dir, epochs, batch_size))
    };

    let report_every = (epochs / 10).max(1);
    for event in receiver.iter() {
        if cli_args.verbosity() == 0 {
            continue;
        }
        match event {
            TrainingEvent::DatasetBuilt {
                documents,
                vocabulary,
                labels,
            } => eprintln!("{documents} documents, {vocabulary} words, {labels} labels"),
            TrainingEvent::Vectorized { rows } => eprintln!("{rows} training rows"),
            TrainingEvent::Epoch {
                epoch,
                epochs,
                loss,
            } if epoch % report_every == 0 || epoch == epochs => {
                eprintln!("epoch {epoch}/{epochs} loss {loss:.4}")
            }
            TrainingEvent::Epoch { .. } => {}
            TrainingEvent::Saved { base } => eprintln!("saved {}", base.display()),
        }
    }

    let outcome = worker
        .join()
        .map_err(|_| ChatError::other("training worker panicked"))?;

    let result = match outcome {
        Ok(artifacts) => trained_result(artifacts, analyzer, args.label.as_deref())?,
        Err(ChatError::BackendUnavailable(reason)) => {
            warn!("Training unavailable ({reason}); writing vocabulary sidecars only");
            degraded_sidecars(&catalog, &output_dir, analyzer.as_ref(), args)?
        }
        Err(e) => return Err(e),
    };

    output_result("Training finished", &result, cli_args)
}

/// Reload a freshly trained bundle and describe it.
fn trained_result(
    artifacts: TrainedArtifacts,
    analyzer: Arc<dyn Analyzer>,
    label: Option<&str>,
) -> Result<TrainingResult> {
    TrainedBundle::load(&artifacts.model_path, analyzer)?;

    Ok(TrainingResult {
        model_path: artifacts.model_path,
        words_path: artifacts.words_path,
        classes_path: artifacts.classes_path,
        intents_path: Some(artifacts.intents_path),
        epochs: artifacts.stats.epochs,
        final_loss: Some(artifacts.stats.final_loss),
        training_accuracy: Some(artifacts.stats.training_accuracy),
        duration_ms: artifacts.stats.training_time_ms,
        degraded: false,
        label: label.unwrap_or_default().to_string(),
    })
}

/// Sidecars for a classifier trained elsewhere, written next to a
/// placeholder model path.
fn degraded_sidecars(
    catalog: &IntentCatalog,
    output_dir: &Path,
    analyzer: &dyn Analyzer,
    args: &TrainArgs,
) -> Result<TrainingResult> {
    let stamp = Local::now().format("model_%Y%m%d_%H%M%S");
    let placeholder = output_dir.join(format!("{stamp}.pending"));
    let (words_path, classes_path) = write_vocab_sidecars(catalog, &placeholder, analyzer)?;

    Ok(TrainingResult {
        model_path: placeholder,
        words_path,
        classes_path,
        intents_path: None,
        epochs: 0,
        final_loss: None,
        training_accuracy: None,
        duration_ms: 0,
        degraded: true,
        label: args.label.clone().unwrap_or_default(),
    })
}

/// Classify one piece of text.
fn run_predict(args: &PredictArgs, config: &ChatConfig, cli_args: &ChatArgs) -> Result<()> {
    let analyzer = normalizer::for_kind(config.normalizer);
    let bundle = TrainedBundle::load(&args.bundle, analyzer)?;
    let text = args.joined_text();
    let prediction = bundle.classify(&text)?;

    let mut rng = rand::rng();
    let response = match bundle.intents() {
        Some(intents) => intents.respond(&prediction.tag, &mut rng),
        None if config.intents_path.exists() => {
            load_intents(&config.intents_path)?.respond(&prediction.tag, &mut rng)
        }
        None => NOT_UNDERSTOOD.to_string(),
    };

    output_result(
        "Prediction",
        &PredictionResult {
            text,
            tag: prediction.tag,
            confidence: prediction.confidence,
            response,
        },
        cli_args,
    )
}

/// Load an intents file and report what training would see.
fn run_validate(args: &ValidateArgs, config: &ChatConfig, cli_args: &ChatArgs) -> Result<()> {
    let path = args.intents.as_ref().unwrap_or(&config.intents_path);
    let catalog = load_intents(path)?;
    let analyzer = normalizer::for_kind(config.normalizer);
    let dataset = build_dataset(&catalog, analyzer.as_ref())?;

    output_result(
        "Intents file is valid",
        &ValidationResult {
            path: path.clone(),
            intents: catalog.intents.len(),
            patterns: catalog.pattern_count(),
            responses: catalog.response_count(),
            vocabulary_size: dataset.vocabulary.len(),
            tags: dataset.labels.labels().to_vec(),
            normalizer: analyzer.name().to_string(),
        },
        cli_args,
    )
}
