use std::{ops::ControlFlow, sync::Arc};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    common::types::SessionId,
    protocol::ClientMessage,
    server::{AppState, Session, handle_client_message},
};

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let session_id = SessionId::generate();
    let span = info_span!("session", id = %session_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id).instrument(span))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: SessionId) {
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = flume::unbounded::<String>();

    let session = Arc::new(Session::new(session_id.clone(), tx));
    state.attach(session.clone());
    info!("WebSocket connected, {} sessions", state.hub.len());

    // Broadcasts keep flowing while the reader below awaits a long download.
    let writer = tokio::spawn(
        async move {
            while let Ok(frame) = rx.recv_async().await {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    debug!("Socket send error: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        }
        .in_current_span(),
    );

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        if handle_frame(&state, &session, msg).await.is_break() {
            break;
        }
    }

    state.hub.unregister(&session_id);
    drop(session);
    if let Err(e) = writer.await {
        error!("Writer task failed: {}", e);
    }
    info!("WebSocket closed, {} sessions", state.hub.len());
}

/// Decodes and dispatches one inbound frame. Malformed text and binary
/// frames are dropped; only a close frame ends the connection.
pub async fn handle_frame(state: &AppState, session: &Session, msg: Message) -> ControlFlow<()> {
    match msg {
        Message::Text(text) => match ClientMessage::decode(text.as_str()) {
            Ok(request) => handle_client_message(state, session, request).await,
            Err(e) => warn!("Dropping malformed message {:?}: {}", text.as_str(), e),
        },
        Message::Binary(_) => warn!("Dropping unexpected binary frame"),
        Message::Close(_) => return ControlFlow::Break(()),
        _ => {}
    }
    ControlFlow::Continue(())
}
