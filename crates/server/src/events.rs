//! Domain events and the buses they are published on.
//!
//! The service publishes while it still holds the match lock, so every bus
//! sees the events of one match in the order the transitions happened.
//! `publish` must therefore never block.

use std::sync::Arc;

use chess_core::{Color, Move};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{MatchId, MatchStatus, PlayerId};

pub const TOPIC_PLAYER_JOIN: &str = "chess::game.player_join";
pub const TOPIC_START: &str = "chess::game.start";
pub const TOPIC_MOVE: &str = "chess::game.move";
pub const TOPIC_END: &str = "chess::game.end";

/// Serialized as `{"topic": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all_fields = "camelCase")]
pub enum GameEvent {
    #[serde(rename = "chess::game.player_join")]
    PlayerJoin {
        match_id: MatchId,
        player_id: PlayerId,
    },
    #[serde(rename = "chess::game.start")]
    Start {
        match_id: MatchId,
        white_player_id: PlayerId,
        black_player_id: PlayerId,
    },
    #[serde(rename = "chess::game.move")]
    Move {
        match_id: MatchId,
        player_id: PlayerId,
        color: Color,
        #[serde(rename = "move")]
        mv: Move,
    },
    #[serde(rename = "chess::game.end")]
    End {
        match_id: MatchId,
        final_status: MatchStatus,
    },
}

impl GameEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            GameEvent::PlayerJoin { .. } => TOPIC_PLAYER_JOIN,
            GameEvent::Start { .. } => TOPIC_START,
            GameEvent::Move { .. } => TOPIC_MOVE,
            GameEvent::End { .. } => TOPIC_END,
        }
    }

    pub fn match_id(&self) -> MatchId {
        match self {
            GameEvent::PlayerJoin { match_id, .. }
            | GameEvent::Start { match_id, .. }
            | GameEvent::Move { match_id, .. }
            | GameEvent::End { match_id, .. } => *match_id,
        }
    }
}

/// Fire-and-forget sink for game events.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: GameEvent);
}

/// In-process bus backing the WebSocket event streams.
pub struct BroadcastBus {
    sender: broadcast::Sender<GameEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: GameEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }
}

/// Publishes every event to each inner bus in turn.
pub struct FanoutBus {
    buses: Vec<Arc<dyn EventBus>>,
}

impl FanoutBus {
    pub fn new(buses: Vec<Arc<dyn EventBus>>) -> Self {
        Self { buses }
    }
}

impl EventBus for FanoutBus {
    fn publish(&self, event: GameEvent) {
        if let Some((last, rest)) = self.buses.split_last() {
            for bus in rest {
                bus.publish(event.clone());
            }
            last.publish(event);
        }
    }
}
