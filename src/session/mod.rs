//! Quiz session state machine
//!
//! One session per mounted widget. All transitions go through the `phase`
//! field under a single lock:
//!
//! ```text
//! Idle -> QuestionHidden -> QuestionVisible -> Submitting -> Resolved
//!   \__________________________________________________________/
//!                  (prior submission found at start)
//! ```
//!
//! Network calls are made with the lock released. Responses that arrive
//! after `close()` are dropped.

mod result;
mod submit;
#[cfg(test)]
mod test_harness;
mod timer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::backend::QuizBackend;
use crate::protocol::{HostMessage, ResultView, SessionView};
use crate::types::*;

pub use result::{derive, ResultDescriptor};
pub use submit::SubmitOutcome;

/// Errors returned for calls the current phase does not allow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot {op} while session is {phase:?}")]
    InvalidPhase { op: &'static str, phase: Phase },

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Session is closed")]
    Closed,
}

impl SessionError {
    /// Machine-readable code sent to the client
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidPhase { .. } => "INVALID_PHASE",
            SessionError::AlreadyStarted => "ALREADY_STARTED",
            SessionError::UnknownOption(_) => "UNKNOWN_OPTION",
            SessionError::Closed => "SESSION_CLOSED",
        }
    }
}

/// Message shown inline to the participant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserNotice {
    #[error("Please select an answer!")]
    NoOptionSelected,

    #[error("Submission failed. Check your network and try again.")]
    NetworkFailure,

    #[error("Submission was rejected: {0}")]
    Rejected(String),

    #[error("An answer was already recorded for this username.")]
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// No earlier answer; the question can be revealed
    Fresh,
    /// An earlier answer exists; the session is resolved
    AlreadySubmitted,
}

/// State pushed to subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    State(SessionView),
    Host(HostMessage),
}

/// Mutable session state, owned by one `QuizSession`
#[derive(Debug, Clone)]
pub struct SubmissionState {
    pub selected_answer: Option<String>,
    pub phase: Phase,
    pub time_remaining: u32,
    pub prior_submission: Option<PriorSubmission>,
    pub result: Option<SubmissionResult>,
    pub error: Option<UserNotice>,
    /// Answer carried by the in-flight or completed submission
    pub submitted_answer: Option<String>,
    /// Display-only: the participant closed the result dialog
    pub dialog_dismissed: bool,
    lookup_started: bool,
}

impl SubmissionState {
    fn new() -> Self {
        Self {
            selected_answer: None,
            phase: Phase::Idle,
            time_remaining: 0,
            prior_submission: None,
            result: None,
            error: None,
            submitted_answer: None,
            dialog_dismissed: false,
            lookup_started: false,
        }
    }

    pub fn descriptor(&self) -> Option<ResultDescriptor> {
        derive(
            self.prior_submission.as_ref(),
            self.result.as_ref(),
            self.selected_answer.as_deref(),
        )
    }
}

struct SessionInner {
    id: SessionId,
    identity: Identity,
    question: QuestionSpec,
    countdown_seconds: u32,
    backend: Arc<dyn QuizBackend>,
    state: Mutex<SubmissionState>,
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

/// Handle to a quiz session. Clones share the same session.
#[derive(Clone)]
pub struct QuizSession {
    inner: Arc<SessionInner>,
}

impl QuizSession {
    pub fn new(
        identity: Identity,
        question: QuestionSpec,
        countdown_seconds: u32,
        backend: Arc<dyn QuizBackend>,
    ) -> Self {
        let (events, _rx) = broadcast::channel(64);
        Self {
            inner: Arc::new(SessionInner {
                id: ulid::Ulid::new().to_string(),
                identity,
                question,
                countdown_seconds: countdown_seconds.max(1),
                backend,
                state: Mutex::new(SubmissionState::new()),
                ticker: std::sync::Mutex::new(None),
                closed: AtomicBool::new(false),
                events,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> SubmissionState {
        self.inner.state.lock().await.clone()
    }

    pub async fn view(&self) -> SessionView {
        let state = self.inner.state.lock().await;
        self.build_view(&state)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Look up a prior submission, then wait for `reveal()`.
    ///
    /// The lookup is best-effort: any failure proceeds as if the identity
    /// had never answered.
    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        self.ensure_open()?;
        {
            let mut state = self.inner.state.lock().await;
            if state.phase != Phase::Idle {
                return Err(SessionError::InvalidPhase {
                    op: "start",
                    phase: state.phase,
                });
            }
            if state.lookup_started {
                return Err(SessionError::AlreadyStarted);
            }
            state.lookup_started = true;
        }

        let lookup = self.inner.backend.check(&self.inner.identity).await;

        let mut state = self.inner.state.lock().await;
        self.ensure_open()?;

        let outcome = match lookup {
            Ok(check) if check.has_submitted => {
                tracing::info!(
                    "Session {}: {} already submitted (correct: {})",
                    self.inner.id,
                    self.inner.identity,
                    check.is_correct
                );
                state.prior_submission = Some(PriorSubmission {
                    answer: check.answer,
                    is_correct: check.is_correct,
                });
                state.phase = Phase::Resolved;
                StartOutcome::AlreadySubmitted
            }
            Ok(_) => {
                tracing::info!(
                    "Session {}: no prior submission for {}",
                    self.inner.id,
                    self.inner.identity
                );
                state.phase = Phase::QuestionHidden;
                StartOutcome::Fresh
            }
            Err(e) => {
                tracing::warn!(
                    "Session {}: submission check failed ({}), continuing as fresh",
                    self.inner.id,
                    e
                );
                state.phase = Phase::QuestionHidden;
                StartOutcome::Fresh
            }
        };

        self.publish(&state);
        Ok(outcome)
    }

    /// Show the question and start the countdown
    pub async fn reveal(&self) -> Result<(), SessionError> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        if state.phase != Phase::QuestionHidden {
            return Err(SessionError::InvalidPhase {
                op: "reveal",
                phase: state.phase,
            });
        }

        state.phase = Phase::QuestionVisible;
        state.time_remaining = self.inner.countdown_seconds;
        self.start_ticker();

        tracing::info!(
            "Session {}: question revealed, {}s on the clock",
            self.inner.id,
            state.time_remaining
        );
        self.publish(&state);
        Ok(())
    }

    pub async fn select_option(&self, answer: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        if state.phase != Phase::QuestionVisible {
            return Err(SessionError::InvalidPhase {
                op: "select an option",
                phase: state.phase,
            });
        }
        if !self.inner.question.has_option(answer) {
            return Err(SessionError::UnknownOption(answer.to_string()));
        }

        state.selected_answer = Some(answer.to_string());
        state.error = None;
        self.publish(&state);
        Ok(())
    }

    /// Dismiss the result dialog and tell the enclosing frame.
    ///
    /// Returns false if the dialog was already dismissed.
    pub async fn close_result_dialog(&self) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        if state.phase != Phase::Resolved {
            return Err(SessionError::InvalidPhase {
                op: "close the result dialog",
                phase: state.phase,
            });
        }
        if state.dialog_dismissed {
            return Ok(false);
        }

        state.dialog_dismissed = true;
        self.publish(&state);
        let _ = self
            .inner
            .events
            .send(SessionEvent::Host(HostMessage::close_quest_iframe()));
        Ok(true)
    }

    /// Tear the session down. Pending responses are discarded on arrival.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_ticker();
        tracing::info!("Session {} closed", self.inner.id);
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn build_view(&self, state: &SubmissionState) -> SessionView {
        let revealed = matches!(state.phase, Phase::QuestionVisible | Phase::Submitting);
        SessionView {
            phase: state.phase,
            time_remaining: state.time_remaining,
            prompt: revealed.then(|| self.inner.question.prompt.clone()),
            options: if revealed {
                self.inner.question.options.clone()
            } else {
                Vec::new()
            },
            selected_answer: state.selected_answer.clone(),
            error: state.error.as_ref().map(|e| e.to_string()),
            result: state.descriptor().as_ref().map(ResultView::from),
            show_result_dialog: state.phase == Phase::Resolved && !state.dialog_dismissed,
            loading: state.phase == Phase::Submitting,
        }
    }

    fn publish(&self, state: &SubmissionState) {
        // No subscribers is fine
        let _ = self
            .inner
            .events
            .send(SessionEvent::State(self.build_view(state)));
    }
}

#[cfg(test)]
mod tests {
    use super::test_harness::{session_with, ScriptedBackend, SubmitScript};
    use super::*;

    #[tokio::test]
    async fn test_start_fresh() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);

        let outcome = session.start().await.unwrap();
        assert_eq!(outcome, StartOutcome::Fresh);

        let state = session.snapshot().await;
        assert_eq!(state.phase, Phase::QuestionHidden);
        assert!(state.prior_submission.is_none());
        assert_eq!(backend.check_count(), 1);
    }

    #[tokio::test]
    async fn test_start_with_prior_submission_resolves() {
        let backend = ScriptedBackend::prior("Valorant", false);
        let session = session_with(&backend);

        let outcome = session.start().await.unwrap();
        assert_eq!(outcome, StartOutcome::AlreadySubmitted);

        let state = session.snapshot().await;
        assert_eq!(state.phase, Phase::Resolved);
        assert_eq!(
            state.descriptor(),
            Some(ResultDescriptor::AlreadyIncorrect {
                answer: Some("Valorant".to_string())
            })
        );

        // The question can never be shown and nothing is submitted
        let result = session.reveal().await;
        assert!(matches!(result, Err(SessionError::InvalidPhase { .. })));
        assert_eq!(session.submit().await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(backend.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_start_fails_open() {
        let backend = ScriptedBackend::check_fails();
        let session = session_with(&backend);

        assert_eq!(session.start().await.unwrap(), StartOutcome::Fresh);
        assert_eq!(session.snapshot().await.phase, Phase::QuestionHidden);
    }

    #[tokio::test]
    async fn test_start_only_once() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);

        session.start().await.unwrap();
        let result = session.start().await;
        assert!(matches!(result, Err(SessionError::InvalidPhase { .. })));
        assert_eq!(backend.check_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_start_issues_one_lookup() {
        let backend = ScriptedBackend::fresh().gated_check();
        let session = session_with(&backend);

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.start().await }
        });
        while backend.check_count() == 0 {
            tokio::task::yield_now().await;
        }

        let second = session.start().await;
        assert_eq!(second, Err(SessionError::AlreadyStarted));

        backend.release();
        assert_eq!(first.await.unwrap(), Ok(StartOutcome::Fresh));
        assert_eq!(backend.check_count(), 1);
    }

    #[tokio::test]
    async fn test_reveal_requires_start() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);

        let result = session.reveal().await;
        assert_eq!(
            result,
            Err(SessionError::InvalidPhase {
                op: "reveal",
                phase: Phase::Idle
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_sets_countdown() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        session.start().await.unwrap();
        session.reveal().await.unwrap();

        let state = session.snapshot().await;
        assert_eq!(state.phase, Phase::QuestionVisible);
        assert_eq!(state.time_remaining, DEFAULT_COUNTDOWN_SECONDS);

        let view = session.view().await;
        assert!(view.prompt.is_some());
        assert_eq!(view.options.len(), 4);

        // Revealing twice is rejected
        assert!(session.reveal().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_option_validation() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        session.start().await.unwrap();

        // Not visible yet
        assert!(matches!(
            session.select_option("Dota 2").await,
            Err(SessionError::InvalidPhase { .. })
        ));

        session.reveal().await.unwrap();
        assert_eq!(
            session.select_option("Minesweeper").await,
            Err(SessionError::UnknownOption("Minesweeper".to_string()))
        );

        session.select_option("Valorant").await.unwrap();
        session.select_option("Dota 2").await.unwrap();
        assert_eq!(
            session.snapshot().await.selected_answer.as_deref(),
            Some("Dota 2")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_clears_error() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        session.start().await.unwrap();
        session.reveal().await.unwrap();

        assert_eq!(session.submit().await.unwrap(), SubmitOutcome::NoSelection);
        let state = session.snapshot().await;
        assert_eq!(state.error, Some(UserNotice::NoOptionSelected));
        assert_eq!(state.phase, Phase::QuestionVisible);

        session.select_option("Dota 2").await.unwrap();
        assert!(session.snapshot().await.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_result_dialog_notifies_host() {
        let backend = ScriptedBackend::fresh().with_submits(vec![SubmitScript::Graded(true)]);
        let session = session_with(&backend);
        let mut events = session.subscribe();

        session.start().await.unwrap();
        session.reveal().await.unwrap();
        session.select_option("Dota 2").await.unwrap();
        session.submit().await.unwrap();

        let view = session.view().await;
        assert!(view.show_result_dialog);

        assert!(session.close_result_dialog().await.unwrap());
        assert!(!session.close_result_dialog().await.unwrap());
        assert!(!session.view().await.show_result_dialog);

        let mut host_messages = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Host(msg) = event {
                host_messages.push(msg);
            }
        }
        assert_eq!(host_messages, vec![HostMessage::close_quest_iframe()]);
    }

    #[tokio::test]
    async fn test_close_result_dialog_requires_resolved() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        session.start().await.unwrap();

        assert!(matches!(
            session.close_result_dialog().await,
            Err(SessionError::InvalidPhase { .. })
        ));
    }

    #[tokio::test]
    async fn test_operations_after_close() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        session.close();

        assert_eq!(session.start().await, Err(SessionError::Closed));
        assert_eq!(backend.check_count(), 0);
    }

    #[tokio::test]
    async fn test_events_published_on_transition() {
        let backend = ScriptedBackend::fresh();
        let session = session_with(&backend);
        let mut events = session.subscribe();

        session.start().await.unwrap();

        match events.try_recv() {
            Ok(SessionEvent::State(view)) => {
                assert_eq!(view.phase, Phase::QuestionHidden);
                assert!(view.prompt.is_none());
                assert!(!view.loading);
            }
            other => panic!("Expected state event, got {:?}", other),
        }
    }
}
