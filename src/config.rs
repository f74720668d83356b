//! Environment configuration

use std::net::SocketAddr;
use std::sync::Arc;

use crate::backend::{HttpBackend, InMemoryBackend, QuizBackend};
use crate::types::DEFAULT_COUNTDOWN_SECONDS;

const DEFAULT_DEV_ANSWER: &str = "Dota 2";

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Base URL of the answer service (None = in-process dev backend)
    pub backend_url: Option<String>,
    /// Countdown length once the question is revealed
    pub countdown_seconds: u32,
    pub listen_addr: SocketAddr,
    /// Correct answer used by the in-process dev backend
    pub dev_correct_answer: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8787)),
            dev_correct_answer: DEFAULT_DEV_ANSWER.to_string(),
        }
    }
}

/// Read a variable, treating whitespace-only values as unset
fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl WidgetConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let backend_url = env_trimmed("QUIZ_BACKEND_URL");

        let countdown_seconds = match env_trimmed("QUIZ_COUNTDOWN_SECONDS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(secs) if secs >= 1 => secs,
                _ => {
                    tracing::warn!(
                        "Invalid QUIZ_COUNTDOWN_SECONDS '{}', using {}",
                        raw,
                        DEFAULT_COUNTDOWN_SECONDS
                    );
                    DEFAULT_COUNTDOWN_SECONDS
                }
            },
            None => DEFAULT_COUNTDOWN_SECONDS,
        };

        let listen_addr = env_trimmed("QUIZ_LISTEN_ADDR")
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Invalid QUIZ_LISTEN_ADDR '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or_else(|| Self::default().listen_addr);

        let dev_correct_answer =
            env_trimmed("QUIZ_DEV_CORRECT_ANSWER").unwrap_or_else(|| DEFAULT_DEV_ANSWER.to_string());

        Self {
            backend_url,
            countdown_seconds,
            listen_addr,
            dev_correct_answer,
        }
    }

    /// Build the answer service client.
    ///
    /// Without a backend URL this returns an in-process backend, also handed
    /// back separately so it can be served over HTTP.
    pub fn build_backend(&self) -> (Arc<dyn QuizBackend>, Option<Arc<InMemoryBackend>>) {
        match &self.backend_url {
            Some(url) => {
                tracing::info!("Using answer service at {}", url);
                let backend: Arc<dyn QuizBackend> = Arc::new(HttpBackend::new(url.clone()));
                (backend, None)
            }
            None => {
                tracing::warn!(
                    "QUIZ_BACKEND_URL not set, answers are kept in memory (correct answer: {})",
                    self.dev_correct_answer
                );
                let memory = Arc::new(InMemoryBackend::new(self.dev_correct_answer.clone()));
                let backend: Arc<dyn QuizBackend> = memory.clone();
                (backend, Some(memory))
            }
        }
    }
}
