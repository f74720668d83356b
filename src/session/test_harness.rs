//! Scripted answer service for session tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::QuizSession;
use crate::backend::{BackendError, BackendResult, QuizBackend};
use crate::types::*;

#[derive(Debug, Clone)]
pub(crate) enum CheckScript {
    NotSubmitted,
    Submitted { answer: String, is_correct: bool },
    Fail,
}

#[derive(Debug, Clone)]
pub(crate) enum SubmitScript {
    Graded(bool),
    /// 2xx response flagged `alreadySubmitted`
    Duplicate(bool),
    Status(u16),
    Fail,
}

#[derive(Clone)]
pub(crate) struct ScriptedBackend {
    check: CheckScript,
    submit_script: Arc<Mutex<VecDeque<SubmitScript>>>,
    check_gate: Option<Arc<Notify>>,
    submit_gate: Option<Arc<Notify>>,
    check_calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<SubmitRequest>>>,
}

impl ScriptedBackend {
    fn with_check(check: CheckScript) -> Self {
        Self {
            check,
            submit_script: Arc::new(Mutex::new(VecDeque::new())),
            check_gate: None,
            submit_gate: None,
            check_calls: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fresh() -> Self {
        Self::with_check(CheckScript::NotSubmitted)
    }

    pub fn prior(answer: &str, is_correct: bool) -> Self {
        Self::with_check(CheckScript::Submitted {
            answer: answer.to_string(),
            is_correct,
        })
    }

    pub fn check_fails() -> Self {
        Self::with_check(CheckScript::Fail)
    }

    /// Responses for successive submit calls; graded incorrect once exhausted
    pub fn with_submits(self, scripts: Vec<SubmitScript>) -> Self {
        *self.submit_script.lock().unwrap() = scripts.into();
        self
    }

    /// Hold every submit call until `release()`
    pub fn gated(mut self) -> Self {
        self.submit_gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Hold the check call until `release()`
    pub fn gated_check(mut self) -> Self {
        self.check_gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn release(&self) {
        for gate in [&self.check_gate, &self.submit_gate].into_iter().flatten() {
            gate.notify_one();
        }
    }

    pub fn check_count(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> Vec<SubmitRequest> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }
}

#[async_trait]
impl QuizBackend for ScriptedBackend {
    async fn check(&self, _identity: &Identity) -> BackendResult<CheckResponse> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.check_gate {
            gate.notified().await;
        }

        match &self.check {
            CheckScript::NotSubmitted => Ok(CheckResponse::not_submitted()),
            CheckScript::Submitted { answer, is_correct } => Ok(CheckResponse {
                has_submitted: true,
                is_correct: *is_correct,
                answer: answer.clone(),
            }),
            CheckScript::Fail => Err(BackendError::Transport("connection refused".to_string())),
        }
    }

    async fn submit(&self, request: &SubmitRequest) -> BackendResult<SubmitResponse> {
        self.recorded.lock().unwrap().push(request.clone());
        let script = self
            .submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmitScript::Graded(false));

        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }

        match script {
            SubmitScript::Graded(is_correct) => Ok(SubmitResponse::graded(is_correct)),
            SubmitScript::Duplicate(is_correct) => Ok(SubmitResponse {
                is_correct,
                already_submitted: true,
                error: None,
            }),
            SubmitScript::Status(status) => Err(BackendError::Status(status)),
            SubmitScript::Fail => Err(BackendError::Transport("connection reset".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Session for identity "alice" with the built-in question
pub(crate) fn session_with(backend: &ScriptedBackend) -> QuizSession {
    QuizSession::new(
        Identity::new("alice"),
        QuestionSpec::builtin(),
        DEFAULT_COUNTDOWN_SECONDS,
        Arc::new(backend.clone()),
    )
}
