//! Client message dispatch
//!
//! Each message maps to one session operation. State changes reach the
//! client through session events; the return value only carries errors.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{QuizSession, SessionError, SubmitOutcome};

fn error_message(e: SessionError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle a client message and return an optional response
pub async fn handle_message(msg: ClientMessage, session: &QuizSession) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Reveal => session.reveal().await.err().map(error_message),

        ClientMessage::SelectOption { answer } => {
            tracing::debug!("Session {}: selected {}", session.id(), answer);
            session.select_option(&answer).await.err().map(error_message)
        }

        ClientMessage::Submit => match session.submit().await {
            Ok(SubmitOutcome::Resolved(result)) => {
                tracing::info!(
                    "Session {}: resolved (correct: {}, repeat: {})",
                    session.id(),
                    result.is_correct,
                    result.was_repeat
                );
                None
            }
            Ok(_) => None,
            Err(e) => Some(error_message(e)),
        },

        ClientMessage::CloseResult => session.close_result_dialog().await.err().map(error_message),
    }
}
