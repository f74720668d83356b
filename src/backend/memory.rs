//! In-process answer service
//!
//! Implements the same check/submit contract as the external service. Used
//! for local development when no backend URL is configured, and in tests.

use super::*;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::NO_ANSWER;

#[derive(Debug, Clone)]
struct Record {
    answer: String,
    is_correct: bool,
}

pub struct InMemoryBackend {
    correct_answer: String,
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryBackend {
    pub fn new(correct_answer: impl Into<String>) -> Self {
        Self {
            correct_answer: correct_answer.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a recorded answer, as if the identity had submitted earlier
    pub async fn record(&self, username: &str, answer: &str) {
        let is_correct = self.grade(answer);
        self.records.write().await.insert(
            username.to_string(),
            Record {
                answer: answer.to_string(),
                is_correct,
            },
        );
    }

    /// Number of identities with a recorded answer
    pub async fn submission_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn grade(&self, answer: &str) -> bool {
        answer != NO_ANSWER && answer == self.correct_answer
    }
}

#[async_trait]
impl QuizBackend for InMemoryBackend {
    async fn check(&self, identity: &Identity) -> BackendResult<CheckResponse> {
        let records = self.records.read().await;
        Ok(match records.get(identity.as_str()) {
            Some(record) => CheckResponse {
                has_submitted: true,
                is_correct: record.is_correct,
                answer: record.answer.clone(),
            },
            None => CheckResponse::not_submitted(),
        })
    }

    async fn submit(&self, request: &SubmitRequest) -> BackendResult<SubmitResponse> {
        if request.username.is_empty() {
            return Ok(SubmitResponse {
                is_correct: false,
                already_submitted: false,
                error: Some("Missing username".to_string()),
            });
        }

        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&request.username) {
            tracing::info!("Repeat submission from {}", request.username);
            return Ok(SubmitResponse {
                is_correct: existing.is_correct,
                already_submitted: true,
                error: None,
            });
        }

        let is_correct = self.grade(&request.answer);
        records.insert(
            request.username.clone(),
            Record {
                answer: request.answer.clone(),
                is_correct,
            },
        );

        tracing::info!(
            "Recorded answer: username={}, correct={}, timer_ended={}",
            request.username,
            is_correct,
            request.timer_ended
        );

        Ok(SubmitResponse::graded(is_correct))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, answer: &str) -> SubmitRequest {
        SubmitRequest {
            username: username.to_string(),
            answer: answer.to_string(),
            timer_ended: false,
        }
    }

    #[tokio::test]
    async fn test_submit_grades_and_records() {
        let backend = InMemoryBackend::new("Dota 2");

        let response = backend.submit(&request("alice", "Dota 2")).await.unwrap();
        assert_eq!(response, SubmitResponse::graded(true));

        let response = backend.submit(&request("bob", "Valorant")).await.unwrap();
        assert_eq!(response, SubmitResponse::graded(false));

        assert_eq!(backend.submission_count().await, 2);
    }

    #[tokio::test]
    async fn test_check_reports_prior_submission() {
        let backend = InMemoryBackend::new("Dota 2");

        let check = backend.check(&Identity::new("alice")).await.unwrap();
        assert!(!check.has_submitted);

        backend.submit(&request("alice", "Valorant")).await.unwrap();

        let check = backend.check(&Identity::new("alice")).await.unwrap();
        assert!(check.has_submitted);
        assert!(!check.is_correct);
        assert_eq!(check.answer, "Valorant");
    }

    #[tokio::test]
    async fn test_repeat_submission_is_flagged() {
        let backend = InMemoryBackend::new("Dota 2");
        backend.submit(&request("alice", "Dota 2")).await.unwrap();

        // A second, different answer does not overwrite the first
        let response = backend.submit(&request("alice", "Valorant")).await.unwrap();
        assert!(response.already_submitted);
        assert!(response.is_correct);

        let check = backend.check(&Identity::new("alice")).await.unwrap();
        assert_eq!(check.answer, "Dota 2");
    }

    #[tokio::test]
    async fn test_sentinel_is_never_correct() {
        let backend = InMemoryBackend::new(NO_ANSWER);
        let response = backend.submit(&request("carl", NO_ANSWER)).await.unwrap();
        assert!(!response.is_correct);
    }

    #[tokio::test]
    async fn test_missing_username_is_rejected() {
        let backend = InMemoryBackend::new("Dota 2");
        let response = backend.submit(&request("", "Dota 2")).await.unwrap();
        assert!(response.is_rejection());
        assert_eq!(backend.submission_count().await, 0);
    }
}
