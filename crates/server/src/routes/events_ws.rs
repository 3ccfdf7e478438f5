//! WebSocket stream of one match's events.
//!
//! Each frame is a text message `{"topic": ..., "payload": {...}}`. The stream
//! only carries events published after the socket subscribed.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::Path,
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::AppError;
use crate::events::{BroadcastBus, GameEvent};
use crate::model::MatchId;
use crate::service::GameService;

/// GET /api/matches/{match_id}/events
pub async fn match_events(
    ws: WebSocketUpgrade,
    Path(match_id): Path<MatchId>,
    Extension(service): Extension<Arc<GameService>>,
    Extension(bus): Extension<Arc<BroadcastBus>>,
) -> Result<impl IntoResponse, AppError> {
    // Subscribe before checking the match so nothing published in between is lost.
    let events = bus.subscribe();
    service.get_match(match_id).await?;
    Ok(ws.on_upgrade(move |socket| stream_events(socket, match_id, events)))
}

async fn stream_events(
    socket: WebSocket,
    match_id: MatchId,
    mut events: broadcast::Receiver<GameEvent>,
) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.match_id() == match_id => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to serialize event: {e}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(match_id = %match_id, skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.close().await;
}
