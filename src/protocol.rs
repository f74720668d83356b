use crate::session::ResultDescriptor;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Version string sent in the welcome message
pub const PROTOCOL_VERSION: &str = "1.0";

/// Event the embedding page forwards to its parent frame on dismissal
pub const CLOSE_QUEST_IFRAME: &str = "closeQuestIframe";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Show the question and start the countdown
    Reveal,
    SelectOption {
        answer: String,
    },
    Submit,
    /// Dismiss the result dialog
    CloseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        session_id: SessionId,
        identity: Identity,
        server_now: String,
    },
    State {
        view: SessionView,
    },
    /// Instructs the page to `postMessage` to its parent frame
    PostToParent(HostMessage),
    /// The page URL carried no usable username
    InvalidIdentity {
        msg: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Message for the enclosing frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub event: String,
    pub payload: serde_json::Value,
    pub target_origin: String,
}

impl HostMessage {
    pub fn close_quest_iframe() -> Self {
        Self {
            event: CLOSE_QUEST_IFRAME.to_string(),
            payload: serde_json::json!({}),
            target_origin: "*".to_string(),
        }
    }
}

/// Everything the page needs to render, projected from session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: Phase,
    pub time_remaining: u32,
    /// Only present once the question has been revealed
    pub prompt: Option<String>,
    pub options: Vec<String>,
    pub selected_answer: Option<String>,
    pub error: Option<String>,
    pub result: Option<ResultView>,
    pub show_result_dialog: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub headline: String,
    pub message: String,
    pub descriptor: serde_json::Value,
}

impl From<&ResultDescriptor> for ResultView {
    fn from(descriptor: &ResultDescriptor) -> Self {
        Self {
            headline: descriptor.headline().to_string(),
            message: descriptor.message(),
            descriptor: serde_json::to_value(descriptor).unwrap_or(serde_json::Value::Null),
        }
    }
}
