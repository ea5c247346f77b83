//! Conversation state for one user.
//!
//! A [`ChatSession`] records every turn and decides who answers: the active
//! trained bundle when there is one, the keyword [`FallbackResponder`]
//! otherwise. Prediction failures never reach the caller; the turn is answered
//! by the fallback and the failure is logged.

use std::sync::Arc;

use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::ModelSelection;
use crate::fallback::FallbackResponder;
use crate::intent::NOT_UNDERSTOOD;

/// Reply to input that is empty after trimming.
pub const EMPTY_INPUT_PROMPT: &str = "Please write a message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    AwaitingEngine,
}

pub struct ChatSession {
    id: Uuid,
    selection: Arc<ModelSelection>,
    fallback: FallbackResponder,
    history: Vec<Turn>,
    state: SessionState,
    rng: StdRng,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("turns", &self.history.len())
            .field("state", &self.state)
            .finish()
    }
}

impl ChatSession {
    pub fn new(selection: Arc<ModelSelection>) -> Self {
        Self::with_rng(selection, StdRng::from_rng(&mut rand::rng()))
    }

    /// Session whose response sampling is reproducible.
    pub fn with_seed(selection: Arc<ModelSelection>, seed: u64) -> Self {
        Self::with_rng(selection, StdRng::seed_from_u64(seed))
    }

    fn with_rng(selection: Arc<ModelSelection>, rng: StdRng) -> Self {
        let id = Uuid::new_v4();
        debug!("Session {id} started");
        ChatSession {
            id,
            selection,
            fallback: FallbackResponder::new(),
            history: Vec::new(),
            state: SessionState::Idle,
            rng,
        }
    }

    /// Record `text`, produce a reply, record the reply and return it.
    pub fn submit(&mut self, text: &str) -> String {
        self.push(Sender::User, text.to_string());

        let reply = if text.trim().is_empty() {
            EMPTY_INPUT_PROMPT.to_string()
        } else {
            self.reply_to(text)
        };

        self.push(Sender::Bot, reply.clone());
        reply
    }

    fn reply_to(&mut self, text: &str) -> String {
        let Some(active) = self.selection.snapshot() else {
            return self.fallback.respond(text).to_string();
        };

        self.state = SessionState::AwaitingEngine;
        let prediction = active.bundle.predict(text);
        self.state = SessionState::Idle;

        match prediction {
            Ok(tag) => {
                debug!("Session {}: predicted `{tag}`", self.id);
                match active.intents {
                    Some(intents) => intents.respond(&tag, &mut self.rng),
                    None => NOT_UNDERSTOOD.to_string(),
                }
            }
            Err(e) => {
                warn!("Session {}: prediction failed, using fallback: {e}", self.id);
                self.fallback.respond(text).to_string()
            }
        }
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.history.push(Turn { sender, text });
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn selection(&self) -> &Arc<ModelSelection> {
        &self.selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::simple::SimpleAnalyzer;
    use crate::error::{ChatError, Result};
    use crate::fallback::{FAREWELL_REPLY, GREETING_REPLY};
    use crate::intent::{Intent, IntentCatalog};
    use crate::ml::artifact::TrainedBundle;
    use crate::ml::backend::Classifier;
    use crate::ml::dataset::{LabelSet, Vocabulary};

    struct FirstClassClassifier;

    impl Classifier for FirstClassClassifier {
        fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn input_size(&self) -> usize {
            2
        }

        fn output_size(&self) -> usize {
            2
        }

        fn name(&self) -> &'static str {
            "first-class"
        }
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn predict_proba(&self, _features: &[f32]) -> Result<Vec<f32>> {
            Err(ChatError::inference("weights corrupted"))
        }

        fn input_size(&self) -> usize {
            2
        }

        fn output_size(&self) -> usize {
            2
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn bundle(classifier: Box<dyn Classifier>) -> TrainedBundle {
        TrainedBundle::from_parts(
            classifier,
            Vocabulary::from_words(vec!["hello".into(), "hi".into()]),
            LabelSet::from_labels(vec!["greet".into(), "bye".into()]),
            Arc::new(SimpleAnalyzer::new()),
        )
        .unwrap()
    }

    fn greet_intents() -> IntentCatalog {
        IntentCatalog::new(vec![Intent::new(
            "greet",
            vec!["hello".into()],
            vec!["hola".into(), "hello there".into()],
        )])
    }

    fn fallback_session() -> ChatSession {
        ChatSession::new(Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new()))))
    }

    #[test]
    fn test_empty_input() {
        let mut session = fallback_session();

        assert_eq!(session.submit(""), EMPTY_INPUT_PROMPT);
        assert_eq!(session.submit("   \t"), EMPTY_INPUT_PROMPT);
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[0].sender, Sender::User);
        assert_eq!(session.history()[1].text, EMPTY_INPUT_PROMPT);
    }

    #[test]
    fn test_fallback_mode() {
        let mut session = fallback_session();

        assert_eq!(session.submit("hello there"), GREETING_REPLY);
        assert_eq!(session.submit("ok bye"), FAREWELL_REPLY);
        assert_eq!(session.submit("zzzz"), NOT_UNDERSTOOD);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_history_records_both_sides() {
        let mut session = fallback_session();
        session.submit("hello");

        assert_eq!(
            session.history(),
            &[
                Turn {
                    sender: Sender::User,
                    text: "hello".into()
                },
                Turn {
                    sender: Sender::Bot,
                    text: GREETING_REPLY.into()
                },
            ]
        );
    }

    #[test]
    fn test_model_reply_comes_from_intents() {
        let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
        selection.install(bundle(Box::new(FirstClassClassifier)), None);
        selection.set_intents(greet_intents());
        let mut session = ChatSession::with_seed(selection, 7);

        for _ in 0..10 {
            let reply = session.submit("zzz");
            assert!(reply == "hola" || reply == "hello there", "got {reply}");
        }
    }

    #[test]
    fn test_model_without_intents() {
        let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
        selection.install(bundle(Box::new(FirstClassClassifier)), None);
        let mut session = ChatSession::new(selection);

        assert_eq!(session.submit("hello"), NOT_UNDERSTOOD);
    }

    #[test]
    fn test_inference_failure_uses_fallback_for_that_turn() {
        let selection = Arc::new(ModelSelection::new(Arc::new(SimpleAnalyzer::new())));
        selection.install(bundle(Box::new(BrokenClassifier)), None);
        selection.set_intents(greet_intents());
        let mut session = ChatSession::new(Arc::clone(&selection));

        assert_eq!(session.submit("hello"), GREETING_REPLY);
        assert_eq!(session.state(), SessionState::Idle);

        selection.install(bundle(Box::new(FirstClassClassifier)), None);
        let reply = session.submit("hello");
        assert!(reply == "hola" || reply == "hello there");
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(fallback_session().id(), fallback_session().id());
    }
}
