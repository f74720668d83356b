use crate::backend::QuizBackend;
use crate::config::WidgetConfig;
use crate::session::QuizSession;
use crate::types::{Identity, QuestionSpec};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub question: QuestionSpec,
    pub countdown_seconds: u32,
    pub backend: Arc<dyn QuizBackend>,
}

impl AppState {
    pub fn new(config: &WidgetConfig, backend: Arc<dyn QuizBackend>) -> Self {
        Self {
            question: QuestionSpec::builtin(),
            countdown_seconds: config.countdown_seconds,
            backend,
        }
    }

    /// Create a session for a newly mounted widget
    pub fn new_session(&self, identity: Identity) -> QuizSession {
        let session = QuizSession::new(
            identity,
            self.question.clone(),
            self.countdown_seconds,
            self.backend.clone(),
        );
        tracing::info!(
            "Created session {} for {} (backend: {})",
            session.id(),
            session.identity(),
            self.backend.name()
        );
        session
    }
}
