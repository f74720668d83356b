pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::{Sink, SinkExt},
    stream::{Stream, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::identity;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::session::{QuizSession, SessionEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// `location.pathname` of the page hosting the widget
    pub path: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: path={:?}", params.path);

    ws.on_upgrade(move |socket| {
        let (sender, receiver) = socket.split();
        serve_connection(sender, receiver, params.path, state)
    })
}

/// Serialize and send; false once the socket is gone
async fn send_message<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Parse and dispatch one text frame; false once the socket is gone.
///
/// Submit runs off the socket loop so events keep flowing while the request
/// is in flight; its reply comes back through `reply_tx`.
async fn handle_text<S>(
    text: &str,
    session: &QuizSession,
    sender: &mut S,
    reply_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> bool
where
    S: Sink<Message> + Unpin,
{
    tracing::debug!("Received message: {}", text);

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Submit) => {
            let session = session.clone();
            let reply_tx = reply_tx.clone();
            tokio::spawn(async move {
                if let Some(reply) = handlers::handle_message(ClientMessage::Submit, &session).await
                {
                    let _ = reply_tx.send(reply);
                }
            });
            true
        }
        Ok(client_msg) => match handlers::handle_message(client_msg, session).await {
            Some(response) => send_message(sender, &response).await,
            None => true,
        },
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            let error = ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            };
            send_message(sender, &error).await
        }
    }
}

/// Drive one mounted widget over a message sink and stream.
///
/// The connection owns one session. A path without an identity gets
/// `InvalidIdentity` and a close frame; no session is created and the answer
/// service is never called.
pub async fn serve_connection<S, R, E>(
    mut sender: S,
    mut receiver: R,
    path: Option<String>,
    state: Arc<AppState>,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let identity = match path.as_deref().and_then(identity::resolve) {
        Some(identity) => identity,
        None => {
            tracing::info!("Rejecting connection without identity: {:?}", path);
            let msg = ServerMessage::InvalidIdentity {
                msg: "Please provide a valid username in the URL.".to_string(),
            };
            send_message(&mut sender, &msg).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let session = state.new_session(identity.clone());

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        session_id: session.id().to_string(),
        identity,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_message(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        session.close();
        return;
    }

    // Client messages are held back until the lookup has finished; a
    // disconnect meanwhile drops the pending check
    let mut held = Vec::new();
    {
        let start = session.start();
        tokio::pin!(start);
        loop {
            tokio::select! {
                result = &mut start => {
                    if let Err(e) = result {
                        tracing::error!("Session {} failed to start: {}", session.id(), e);
                    }
                    break;
                }
                ws_msg = receiver.next() => match ws_msg {
                    Some(Ok(Message::Text(text))) => held.push(text),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Session {}: client left during lookup", session.id());
                        session.close();
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        session.close();
                        return;
                    }
                },
            }
        }
    }

    let mut events = session.subscribe();
    let initial = ServerMessage::State {
        view: session.view().await,
    };
    if !send_message(&mut sender, &initial).await {
        session.close();
        return;
    }

    // Replies from submissions running off the socket loop
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    for text in held {
        if !handle_text(text.as_str(), &session, &mut sender, &reply_tx).await {
            session.close();
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let msg = match event {
                    Ok(SessionEvent::State(view)) => ServerMessage::State { view },
                    Ok(SessionEvent::Host(host)) => ServerMessage::PostToParent(host),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Session {} lagged by {} events", session.id(), skipped);
                        ServerMessage::State { view: session.view().await }
                    }
                    Err(RecvError::Closed) => break,
                };
                if !send_message(&mut sender, &msg).await {
                    break;
                }
            }

            Some(reply) = reply_rx.recv() => {
                if !send_message(&mut sender, &reply).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text(text.as_str(), &session, &mut sender, &reply_tx).await {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    session.close();
    tracing::info!("WebSocket connection closed for session {}", session.id());
}
