use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::ClientMirror;
use crate::{
    clock::{local_now_ms, schedule::PING_INTERVAL},
    common::types::AnyResult,
    protocol::{ClientMessage, ServerMessage},
};

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Connects to `url`, mirrors server state and keeps the clock in sync
/// until the server closes the socket or ctrl-c is pressed.
pub async fn run(url: &str, mut mirror: ClientMirror) -> AnyResult<()> {
    info!("Connecting to {}", url);
    let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text(ClientMessage::Sync.encode().into()))
        .await?;

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing connection");
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            _ = ping.tick() => {
                if let Some(msg) = mirror.ping_due(local_now_ms()) {
                    write.send(Message::Text(msg.encode().into())).await?;
                }
            }
            _ = status.tick() => {
                let now = local_now_ms();
                info!(
                    "item={:?} playing={} position={:.1}s offset={:.1}ms",
                    mirror.current().id.as_ref().map(|id| id.as_str()),
                    mirror.play_state().is_playing(),
                    mirror.position_at(now) / 1000.0,
                    mirror.clock.offset()
                );
            }
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WS read error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WS stream ended");
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => match ServerMessage::decode(text.as_str()) {
                        Ok(event) => mirror.apply(event, local_now_ms()),
                        Err(e) => warn!("Dropping malformed event: {}", e),
                    },
                    Message::Close(frame) => {
                        info!("Server closed connection: {:?}", frame);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
