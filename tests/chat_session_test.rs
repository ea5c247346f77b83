use std::sync::Arc;

use tempfile::TempDir;

use agent_chat::analysis::analyzer::simple::SimpleAnalyzer;
use agent_chat::analysis::normalizer;
use agent_chat::engine::ModelSelection;
use agent_chat::error::{ChatError, Result};
use agent_chat::fallback::{FAREWELL_REPLY, GREETING_REPLY};
use agent_chat::intent::{Intent, IntentCatalog, NOT_UNDERSTOOD};
use agent_chat::ml::artifact::TrainedBundle;
use agent_chat::ml::backend::Classifier;
use agent_chat::ml::dataset::{LabelSet, Vocabulary};
use agent_chat::session::{ChatSession, EMPTY_INPUT_PROMPT, Sender, SessionState};

/// Puts all probability mass on the first label.
struct GreetClassifier;

impl Classifier for GreetClassifier {
    fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f32>> {
        Ok(vec![0.97, 0.03])
    }

    fn input_size(&self) -> usize {
        2
    }

    fn output_size(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "greet-only"
    }
}

fn greet_bundle() -> TrainedBundle {
    TrainedBundle::from_parts(
        Box::new(GreetClassifier),
        Vocabulary::from_words(vec!["hello".into(), "hi".into()]),
        LabelSet::from_labels(vec!["greet".into(), "bye".into()]),
        Arc::new(SimpleAnalyzer::new()),
    )
    .unwrap()
}

fn greet_intents() -> IntentCatalog {
    IntentCatalog::new(vec![
        Intent::new(
            "greet",
            vec!["hello".into()],
            vec!["hola".into(), "hello there".into()],
        ),
        Intent::new("bye", vec!["bye".into()], vec!["adios".into()]),
    ])
}

#[test]
fn fallback_mode_answers_with_keywords() {
    let selection = Arc::new(ModelSelection::new(normalizer::shared_or_degraded()));
    let mut session = ChatSession::new(selection);

    assert_eq!(session.submit("hello there"), GREETING_REPLY);
    assert_eq!(session.submit("ok bye"), FAREWELL_REPLY);
    assert_eq!(session.submit("zzzz"), NOT_UNDERSTOOD);
    assert_eq!(session.submit(""), EMPTY_INPUT_PROMPT);

    let history = session.history();
    assert_eq!(history.len(), 8);
    assert!(
        history
            .iter()
            .step_by(2)
            .all(|turn| turn.sender == Sender::User)
    );
    assert!(
        history
            .iter()
            .skip(1)
            .step_by(2)
            .all(|turn| turn.sender == Sender::Bot)
    );
}

#[test]
fn model_replies_are_drawn_from_the_predicted_intent() {
    let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
    selection.install(greet_bundle().with_intents(greet_intents()), None);
    let mut session = ChatSession::with_seed(Arc::clone(&selection), 1);

    for text in ["hello", "anything at all", "bye"] {
        let reply = session.submit(text);
        assert!(["hola", "hello there"].contains(&reply.as_str()), "got {reply}");
        assert_eq!(session.state(), SessionState::Idle);
    }
}

#[test]
fn clearing_the_model_returns_to_fallback() {
    let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
    selection.install(greet_bundle().with_intents(greet_intents()), None);
    let mut session = ChatSession::new(Arc::clone(&selection));

    assert_ne!(session.submit("ok bye"), FAREWELL_REPLY);
    selection.clear_active_bundle();
    assert_eq!(session.submit("ok bye"), FAREWELL_REPLY);
}

#[test]
fn failed_swap_keeps_serving_previous_model() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
    selection.install(greet_bundle().with_intents(greet_intents()), None);
    let before = selection.get_active_metadata();
    let mut session = ChatSession::new(Arc::clone(&selection));

    let missing = temp_dir.path().join("model_missing.mlp.json");
    let result = selection.set_active_bundle(&missing);
    assert!(matches!(result, Err(ChatError::ArtifactMissing(_))));

    assert_eq!(selection.get_active_metadata(), before);
    let reply = session.submit("hello");
    assert!(reply == "hola" || reply == "hello there");
    Ok(())
}

#[cfg(feature = "mlp")]
#[test]
fn trained_bundle_drives_a_conversation() -> Result<()> {
    use agent_chat::ml::TrainingConfig;
    use agent_chat::ml::trainer::Trainer;

    let temp_dir = TempDir::new()?;
    let analyzer = normalizer::shared_or_degraded();
    let config = TrainingConfig {
        hidden_layers: vec![16],
        dropout: 0.0,
        learning_rate: 0.05,
        seed: Some(3),
        ..Default::default()
    };
    let catalog = IntentCatalog::new(vec![
        Intent::new(
            "greet",
            vec!["hello".into(), "hi".into(), "good morning".into()],
            vec!["Greetings!".into()],
        ),
        Intent::new(
            "thanks",
            vec!["thanks".into(), "thank you".into(), "much appreciated".into()],
            vec!["You're welcome!".into()],
        ),
    ]);
    let artifacts =
        Trainer::new(config, Arc::clone(&analyzer)).train(&catalog, temp_dir.path(), 200, 2)?;

    let selection = Arc::new(ModelSelection::new(analyzer));
    selection.set_active_bundle(&artifacts.model_path)?;
    let mut session = ChatSession::new(selection);

    assert_eq!(session.submit("good morning"), "Greetings!");
    assert_eq!(session.submit("thank you"), "You're welcome!");
    Ok(())
}
