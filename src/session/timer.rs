//! Countdown ticker
//!
//! A spawned task sleeps one second per tick and calls back into the
//! session. Only `QuestionVisible` sessions are decremented; the tick that
//! reaches zero moves the session to `Submitting` under the state lock, so
//! the timeout path can fire at most once.

use std::sync::MutexGuard;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::QuizSession;
use crate::types::{Phase, SubmitRequest, NO_ANSWER};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub(super) enum Tick {
    Continue,
    /// Countdown hit zero; the forced submission must be sent
    Expired(SubmitRequest),
    Stopped,
}

impl QuizSession {
    /// Spawn the ticker. Caller holds the state lock.
    pub(super) fn start_ticker(&self) {
        let session = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(TICK).await;
                match session.tick().await {
                    Tick::Continue => continue,
                    Tick::Expired(request) => {
                        session.submit_on_timeout(request).await;
                        break;
                    }
                    Tick::Stopped => break,
                }
            }
        });

        if let Some(previous) = self.ticker_slot().replace(handle) {
            previous.abort();
        }
    }

    /// Abort the ticker if it is still counting down
    pub(super) fn stop_ticker(&self) {
        if let Some(handle) = self.ticker_slot().take() {
            handle.abort();
        }
    }

    /// The slot only holds a handle, so a poisoned lock is still usable
    fn ticker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.ticker.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Session {}: ticker lock was poisoned", self.inner.id);
            poisoned.into_inner()
        })
    }

    pub(super) async fn tick(&self) -> Tick {
        if self.is_closed() {
            return Tick::Stopped;
        }

        let mut state = self.inner.state.lock().await;
        if state.phase != Phase::QuestionVisible {
            return Tick::Stopped;
        }

        state.time_remaining = state.time_remaining.saturating_sub(1);
        if state.time_remaining > 0 {
            tracing::debug!(
                "Session {}: {}s remaining",
                self.inner.id,
                state.time_remaining
            );
            self.publish(&state);
            return Tick::Continue;
        }

        state.phase = Phase::Submitting;
        state.error = None;
        state.submitted_answer = Some(NO_ANSWER.to_string());

        // The running task is this ticker; drop its handle without aborting
        self.ticker_slot().take();

        tracing::info!(
            "Session {}: time expired for {}, submitting without answer",
            self.inner.id,
            self.inner.identity
        );
        self.publish(&state);

        Tick::Expired(SubmitRequest {
            username: self.inner.identity.as_str().to_string(),
            answer: NO_ANSWER.to_string(),
            timer_ended: true,
        })
    }
}
