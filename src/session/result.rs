//! Result dialog content
//!
//! Derived purely from the final session state; no I/O.

use serde::Serialize;

use crate::types::{PriorSubmission, SubmissionResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultDescriptor {
    /// An earlier attempt ran out of time
    AlreadyTimedOut,
    /// An earlier attempt was correct. `answer` is unknown when the
    /// duplicate was only reported by the submit call.
    AlreadyCorrect { answer: Option<String> },
    AlreadyIncorrect { answer: Option<String> },
    /// This session's countdown expired. `recorded` is false when the
    /// forced submission never reached the service.
    TimesUp { recorded: bool },
    Correct { answer: String },
    Incorrect { answer: String },
}

impl ResultDescriptor {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::AlreadyTimedOut => "Already attempted",
            Self::AlreadyCorrect { .. } => "Already answered",
            Self::AlreadyIncorrect { .. } => "Already attempted",
            Self::TimesUp { .. } => "Time's up!",
            Self::Correct { .. } => "Correct!",
            Self::Incorrect { .. } => "Incorrect",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::AlreadyTimedOut => {
                "You already attempted this question and did not answer in time.".to_string()
            }
            Self::AlreadyCorrect { .. } => {
                "You already answered this question, and your answer was correct.".to_string()
            }
            Self::AlreadyIncorrect { .. } => {
                "You already attempted this question, and your answer was incorrect.".to_string()
            }
            Self::TimesUp { recorded: true } => {
                "You did not select an answer in time.".to_string()
            }
            Self::TimesUp { recorded: false } => {
                "You did not select an answer in time. We could not confirm that your attempt was recorded."
                    .to_string()
            }
            Self::Correct { answer } => format!("\"{}\" is the right answer.", answer),
            Self::Incorrect { answer } => format!("\"{}\" is not the right answer.", answer),
        }
    }
}

/// Pick the descriptor for a finished session.
///
/// Prior-submission facts win over this session's own result, then a
/// server-reported repeat, then a timeout, then correctness.
pub fn derive(
    prior: Option<&PriorSubmission>,
    result: Option<&SubmissionResult>,
    selected_answer: Option<&str>,
) -> Option<ResultDescriptor> {
    if let Some(prior) = prior {
        return Some(if prior.was_timeout() {
            ResultDescriptor::AlreadyTimedOut
        } else if prior.is_correct {
            ResultDescriptor::AlreadyCorrect {
                answer: Some(prior.answer.clone()),
            }
        } else {
            ResultDescriptor::AlreadyIncorrect {
                answer: Some(prior.answer.clone()),
            }
        });
    }

    let result = result?;

    if result.was_repeat {
        return Some(if result.is_correct {
            ResultDescriptor::AlreadyCorrect { answer: None }
        } else {
            ResultDescriptor::AlreadyIncorrect { answer: None }
        });
    }

    if result.was_timeout {
        return Some(ResultDescriptor::TimesUp {
            recorded: result.confirmed,
        });
    }

    let answer = selected_answer.unwrap_or_default().to_string();
    Some(if result.is_correct {
        ResultDescriptor::Correct { answer }
    } else {
        ResultDescriptor::Incorrect { answer }
    })
}
