//! WebSocket transport
//!
//! `GET /ws` upgrades to a WebSocket; each connection becomes one session.
//! The session loop is written against plain text `Stream`/`Sink` halves so it
//! can be driven without a socket.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::dispatcher::ControlHandle;
use crate::error::ControlError;
use crate::hub::{EventHub, SessionId};
use crate::protocol::{self, ServerEvent};

/// Shared state handed to every connection
#[derive(Debug, Clone)]
pub struct AppState {
    pub control: ControlHandle,
    pub hub: EventHub,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let session = state.hub.next_session_id();
    crate::log_info!("Session {} opened from {}", session, peer);

    let (sink, stream) = socket.split();
    let outbound = Box::pin(
        sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text)))),
    );
    let inbound = Box::pin(
        stream
            .take_while(|frame| {
                future::ready(matches!(frame, Ok(msg) if !matches!(msg, Message::Close(_))))
            })
            .filter_map(|frame| {
                future::ready(match frame {
                    Ok(Message::Text(text)) => Some(text),
                    _ => None,
                })
            }),
    );

    run_session(session, state, outbound, inbound).await;
}

/// Drive one session until the client goes away
///
/// Inbound text frames are decoded and submitted to the dispatcher; events
/// addressed to this session (or to everyone) are written back. Always
/// reports the disconnect to the dispatcher before returning.
pub async fn run_session<Tx, Rx>(session: SessionId, state: AppState, mut outbound: Tx, mut inbound: Rx)
where
    Tx: Sink<String> + Unpin,
    Rx: Stream<Item = String> + Unpin,
{
    // Subscribe before announcing so the greeting cannot be missed
    let mut events = state.hub.subscribe();
    if state.control.open_session(session).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = inbound.next() => {
                let Some(text) = frame else { break };
                match handle_frame(session, &state, &text).await {
                    Ok(()) => {}
                    Err(ControlError::Unavailable) => break,
                    Err(e) => {
                        crate::log_warn!("Session {} sent a bad frame: {}", session, e);
                        state.hub.send_to(session, ServerEvent::error(e.to_string()));
                    }
                }
            }
            event = events.recv() => match event {
                Ok(envelope) => {
                    if envelope.target.includes(session)
                        && outbound.send(envelope.event.to_json()).await.is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    crate::log_warn!("Session {} is slow, skipped {} events", session, skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    crate::log_info!("Session {} closed", session);
    let _ = state.control.close_session(session).await;
}

async fn handle_frame(session: SessionId, state: &AppState, text: &str) -> Result<(), ControlError> {
    let command = protocol::decode(text)?;
    crate::log_debug!("Session {}: {:?}", session, command);
    state.control.submit(session, command).await
}
