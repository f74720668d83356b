use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type SessionId = String;

/// Answer sent when the countdown expires without a selection
pub const NO_ANSWER: &str = "No Answer";

/// Default countdown length in seconds
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 15;

/// Participant identity taken from the first URL path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single multiple-choice question compiled into the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSpec {
    pub prompt: String,
    pub options: Vec<String>,
}

impl QuestionSpec {
    pub fn builtin() -> Self {
        Self {
            prompt: "Which game hosts The International, the biggest esports prize pool?"
                .to_string(),
            options: ["Dota 2", "League of Legends", "Counter-Strike 2", "Valorant"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn has_option(&self, answer: &str) -> bool {
        self.options.iter().any(|o| o == answer)
    }
}

impl Default for QuestionSpec {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    QuestionHidden,
    QuestionVisible,
    Submitting,
    Resolved,
}

/// Answer already recorded for this identity before the session started
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorSubmission {
    pub answer: String,
    pub is_correct: bool,
}

impl PriorSubmission {
    /// The earlier attempt ran out of time
    pub fn was_timeout(&self) -> bool {
        self.answer == NO_ANSWER
    }
}

/// Outcome of this session's own submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub is_correct: bool,
    pub was_timeout: bool,
    pub was_repeat: bool,
    /// False when a timed-out submission never reached the backend
    pub confirmed: bool,
}

impl SubmissionResult {
    pub fn answered(is_correct: bool) -> Self {
        Self {
            is_correct,
            was_timeout: false,
            was_repeat: false,
            confirmed: true,
        }
    }

    pub fn timed_out(is_correct: bool) -> Self {
        Self {
            is_correct,
            was_timeout: true,
            was_repeat: false,
            confirmed: true,
        }
    }

    /// Timeout whose submission could not be delivered
    pub fn timed_out_unconfirmed() -> Self {
        Self {
            is_correct: false,
            was_timeout: true,
            was_repeat: false,
            confirmed: false,
        }
    }

    pub fn repeat(is_correct: bool, was_timeout: bool) -> Self {
        Self {
            is_correct,
            was_timeout,
            was_repeat: true,
            confirmed: true,
        }
    }
}

// Wire types for the external answer service

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCheckResponse")]
pub struct CheckResponse {
    pub has_submitted: bool,
    pub is_correct: bool,
    pub answer: String,
}

/// Check body as sent; grading fields are only required once submitted
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheckResponse {
    has_submitted: bool,
    is_correct: Option<bool>,
    answer: Option<String>,
}

impl TryFrom<RawCheckResponse> for CheckResponse {
    type Error = String;

    fn try_from(raw: RawCheckResponse) -> Result<Self, Self::Error> {
        if !raw.has_submitted {
            return Ok(Self::not_submitted());
        }
        match (raw.is_correct, raw.answer) {
            (Some(is_correct), Some(answer)) => Ok(Self {
                has_submitted: true,
                is_correct,
                answer,
            }),
            _ => Err("hasSubmitted is set without isCorrect and answer".to_string()),
        }
    }
}

impl CheckResponse {
    pub fn not_submitted() -> Self {
        Self {
            has_submitted: false,
            is_correct: false,
            answer: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub username: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timer_ended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSubmitResponse")]
pub struct SubmitResponse {
    pub is_correct: bool,
    /// Set by the service when this identity already has a recorded answer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubmitResponse {
    is_correct: Option<bool>,
    #[serde(default)]
    already_submitted: bool,
    error: Option<String>,
}

impl TryFrom<RawSubmitResponse> for SubmitResponse {
    type Error = String;

    /// `isCorrect` may only be omitted when the service reports an error
    fn try_from(raw: RawSubmitResponse) -> Result<Self, Self::Error> {
        let is_correct = match (raw.is_correct, &raw.error) {
            (Some(is_correct), _) => is_correct,
            (None, Some(_)) => false,
            (None, None) => return Err("missing isCorrect".to_string()),
        };
        Ok(Self {
            is_correct,
            already_submitted: raw.already_submitted,
            error: raw.error,
        })
    }
}

impl SubmitResponse {
    pub fn graded(is_correct: bool) -> Self {
        Self {
            is_correct,
            already_submitted: false,
            error: None,
        }
    }

    /// The service accepted the request but refused to record it
    pub fn is_rejection(&self) -> bool {
        self.already_submitted || self.error.is_some()
    }
}
