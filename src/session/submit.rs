use super::{QuizSession, SessionError, UserNotice};
use crate::backend::{BackendError, BackendResult};
use crate::types::{Phase, SubmissionResult, SubmitRequest, SubmitResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Resolved(SubmissionResult),
    /// Nothing selected; the notice is set and nothing else changed
    NoSelection,
    /// A submission is already in flight or the session is resolved
    Ignored,
    /// The request failed; the question is visible again
    RolledBack,
}

fn rejection_notice(response: &SubmitResponse) -> UserNotice {
    match &response.error {
        Some(msg) => UserNotice::Rejected(msg.clone()),
        None => UserNotice::Duplicate,
    }
}

fn failure_notice(error: &BackendError) -> UserNotice {
    match error {
        BackendError::Status(status) => {
            UserNotice::Rejected(format!("answer service returned status {}", status))
        }
        BackendError::Parse(_) => {
            UserNotice::Rejected("answer service sent an unreadable response".to_string())
        }
        BackendError::Transport(_) => UserNotice::NetworkFailure,
    }
}

impl QuizSession {
    /// Submit the selected answer.
    ///
    /// Only one submission can be in flight; calls made meanwhile return
    /// `Ignored`. A failed request restores the visible question with the
    /// selection intact and resumes the countdown.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        self.ensure_open()?;

        let request = {
            let mut state = self.inner.state.lock().await;
            match state.phase {
                Phase::Submitting | Phase::Resolved => {
                    tracing::debug!(
                        "Session {}: submit ignored while {:?}",
                        self.inner.id,
                        state.phase
                    );
                    return Ok(SubmitOutcome::Ignored);
                }
                Phase::QuestionVisible => {}
                phase => {
                    return Err(SessionError::InvalidPhase {
                        op: "submit",
                        phase,
                    })
                }
            }

            let Some(answer) = state.selected_answer.clone() else {
                state.error = Some(UserNotice::NoOptionSelected);
                self.publish(&state);
                return Ok(SubmitOutcome::NoSelection);
            };

            state.phase = Phase::Submitting;
            state.error = None;
            state.submitted_answer = Some(answer.clone());
            self.stop_ticker();
            self.publish(&state);

            SubmitRequest {
                username: self.inner.identity.as_str().to_string(),
                answer,
                timer_ended: false,
            }
        };

        tracing::info!(
            "Session {}: submitting answer for {}",
            self.inner.id,
            self.inner.identity
        );
        let response = self.inner.backend.submit(&request).await;

        let mut state = self.inner.state.lock().await;
        if self.is_closed() {
            tracing::debug!(
                "Session {}: discarding submit response after close",
                self.inner.id
            );
            return Err(SessionError::Closed);
        }

        match response {
            Ok(response) if response.is_rejection() => {
                tracing::warn!(
                    "Session {}: submission not accepted (already_submitted={}, error={:?})",
                    self.inner.id,
                    response.already_submitted,
                    response.error
                );
                let result = SubmissionResult::repeat(response.is_correct, false);
                state.error = Some(rejection_notice(&response));
                state.result = Some(result.clone());
                state.phase = Phase::Resolved;
                self.publish(&state);
                Ok(SubmitOutcome::Resolved(result))
            }
            Ok(response) => {
                tracing::info!(
                    "Session {}: answer graded (correct: {})",
                    self.inner.id,
                    response.is_correct
                );
                let result = SubmissionResult::answered(response.is_correct);
                state.result = Some(result.clone());
                state.phase = Phase::Resolved;
                self.publish(&state);
                Ok(SubmitOutcome::Resolved(result))
            }
            Err(e) => {
                tracing::warn!(
                    "Session {}: submission failed ({}), question reopened with {}s left",
                    self.inner.id,
                    e,
                    state.time_remaining
                );
                state.error = Some(failure_notice(&e));
                state.submitted_answer = None;
                state.phase = Phase::QuestionVisible;
                self.start_ticker();
                self.publish(&state);
                Ok(SubmitOutcome::RolledBack)
            }
        }
    }

    /// Send the forced submission after the countdown expired.
    ///
    /// Never rolls back: a failure resolves locally with an unconfirmed
    /// timeout result instead of retrying.
    pub(super) async fn submit_on_timeout(&self, request: SubmitRequest) -> Option<SubmissionResult> {
        let response: BackendResult<SubmitResponse> = self.inner.backend.submit(&request).await;

        let mut state = self.inner.state.lock().await;
        if self.is_closed() || state.phase != Phase::Submitting {
            tracing::debug!(
                "Session {}: discarding timeout submit response",
                self.inner.id
            );
            return None;
        }

        let result = match response {
            Ok(response) if response.is_rejection() => {
                state.error = Some(rejection_notice(&response));
                SubmissionResult::repeat(response.is_correct, true)
            }
            Ok(response) => SubmissionResult::timed_out(response.is_correct),
            Err(e) => {
                tracing::warn!(
                    "Session {}: timeout submission failed ({}), resolving as unconfirmed",
                    self.inner.id,
                    e
                );
                SubmissionResult::timed_out_unconfirmed()
            }
        };

        tracing::info!("Session {}: resolved after timeout", self.inner.id);
        state.result = Some(result.clone());
        state.phase = Phase::Resolved;
        self.publish(&state);
        Some(result)
    }
}
