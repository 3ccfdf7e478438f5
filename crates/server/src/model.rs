//! Identifiers, match status and the Match entity.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chess_core::{Board, Color, Move};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MatchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a match. `InProgress*` names the side to move; every
/// `Ended*` status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Waiting,
    InProgressWhite,
    InProgressBlack,
    EndedWhiteOutOfTime,
    EndedBlackOutOfTime,
    /// Carries the color that delivered mate.
    EndedCheckmate(Color),
    EndedDraw,
}

impl MatchStatus {
    pub const fn in_progress(to_move: Color) -> Self {
        match to_move {
            Color::White => MatchStatus::InProgressWhite,
            Color::Black => MatchStatus::InProgressBlack,
        }
    }

    pub const fn out_of_time(loser: Color) -> Self {
        match loser {
            Color::White => MatchStatus::EndedWhiteOutOfTime,
            Color::Black => MatchStatus::EndedBlackOutOfTime,
        }
    }

    /// The color whose turn it is, for matches in progress.
    pub const fn to_move(self) -> Option<Color> {
        match self {
            MatchStatus::InProgressWhite => Some(Color::White),
            MatchStatus::InProgressBlack => Some(Color::Black),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::EndedWhiteOutOfTime
                | MatchStatus::EndedBlackOutOfTime
                | MatchStatus::EndedCheckmate(_)
                | MatchStatus::EndedDraw
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::InProgressWhite => "in_progress_white",
            MatchStatus::InProgressBlack => "in_progress_black",
            MatchStatus::EndedWhiteOutOfTime => "ended_white_out_of_time",
            MatchStatus::EndedBlackOutOfTime => "ended_black_out_of_time",
            MatchStatus::EndedCheckmate(Color::White) => "ended_checkmate_white",
            MatchStatus::EndedCheckmate(Color::Black) => "ended_checkmate_black",
            MatchStatus::EndedDraw => "ended_draw",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "waiting" => MatchStatus::Waiting,
            "in_progress_white" => MatchStatus::InProgressWhite,
            "in_progress_black" => MatchStatus::InProgressBlack,
            "ended_white_out_of_time" => MatchStatus::EndedWhiteOutOfTime,
            "ended_black_out_of_time" => MatchStatus::EndedBlackOutOfTime,
            "ended_checkmate_white" => MatchStatus::EndedCheckmate(Color::White),
            "ended_checkmate_black" => MatchStatus::EndedCheckmate(Color::Black),
            "ended_draw" => MatchStatus::EndedDraw,
            other => return Err(format!("unknown match status: {other}")),
        })
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MatchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Remaining time per player. The running side's time is derived from
/// `turn_started_at`; nothing ticks in the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchClock {
    pub white_remaining_ms: i64,
    pub black_remaining_ms: i64,
    pub increment_ms: i64,
    pub turn_started_at: Option<DateTime<Utc>>,
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl MatchClock {
    pub fn new(budget: Duration, increment: Duration) -> Self {
        Self {
            white_remaining_ms: millis(budget),
            black_remaining_ms: millis(budget),
            increment_ms: millis(increment),
            turn_started_at: None,
        }
    }

    pub fn remaining_ms(&self, color: Color) -> i64 {
        match color {
            Color::White => self.white_remaining_ms,
            Color::Black => self.black_remaining_ms,
        }
    }

    fn remaining_mut(&mut self, color: Color) -> &mut i64 {
        match color {
            Color::White => &mut self.white_remaining_ms,
            Color::Black => &mut self.black_remaining_ms,
        }
    }

    fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        self.turn_started_at
            .map(|started| (now - started).num_milliseconds().max(0))
            .unwrap_or(0)
    }

    /// Time `color` would have left at `now`, assuming it is the side to move.
    pub fn remaining_at(&self, color: Color, now: DateTime<Utc>) -> i64 {
        self.remaining_ms(color) - self.elapsed_ms(now)
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.turn_started_at = Some(now);
    }

    /// Charge the mover for the turn just played and hand the clock over.
    pub fn charge(&mut self, mover: Color, now: DateTime<Utc>) {
        let left = self.remaining_at(mover, now).max(0) + self.increment_ms;
        *self.remaining_mut(mover) = left;
        self.turn_started_at = Some(now);
    }

    /// Stop the clock, charging whoever was on move.
    pub fn stop(&mut self, on_move: Option<Color>, now: DateTime<Utc>) {
        if let Some(color) = on_move {
            let left = self.remaining_at(color, now).max(0);
            *self.remaining_mut(color) = left;
        }
        self.turn_started_at = None;
    }

    /// Color whose time has run out, if the clock is running.
    pub fn overdue(&self, status: MatchStatus, now: DateTime<Utc>) -> Option<Color> {
        let color = status.to_move()?;
        self.turn_started_at?;
        (self.remaining_at(color, now) <= 0).then_some(color)
    }

    /// Instant the side to move runs out of time, while the clock runs.
    pub fn deadline(&self, status: MatchStatus) -> Option<DateTime<Utc>> {
        let color = status.to_move()?;
        let started = self.turn_started_at?;
        Some(started + TimeDelta::milliseconds(self.remaining_ms(color)))
    }
}

/// One game: seats, board, status and history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub initial_position: String,
    pub current_position: String,
    #[serde(skip)]
    pub board: Board,
    pub player_white: Option<PlayerId>,
    pub player_black: Option<PlayerId>,
    pub status: MatchStatus,
    pub move_history: Vec<Move>,
    pub clock: MatchClock,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// A waiting match with `creator` seated on `color`.
    pub fn new(
        board: Board,
        creator: PlayerId,
        color: Color,
        clock: MatchClock,
        now: DateTime<Utc>,
    ) -> Self {
        let position = board.to_fen();
        let mut created = Self {
            id: MatchId::new(),
            initial_position: position.clone(),
            current_position: position,
            board,
            player_white: None,
            player_black: None,
            status: MatchStatus::Waiting,
            move_history: Vec::new(),
            clock,
            created_at: now,
            updated_at: now,
        };
        created.seat(color, creator);
        created
    }

    pub fn player(&self, color: Color) -> Option<PlayerId> {
        match color {
            Color::White => self.player_white,
            Color::Black => self.player_black,
        }
    }

    pub fn seat(&mut self, color: Color, player: PlayerId) {
        match color {
            Color::White => self.player_white = Some(player),
            Color::Black => self.player_black = Some(player),
        }
    }

    pub fn color_of(&self, player: PlayerId) -> Option<Color> {
        if self.player_white == Some(player) {
            Some(Color::White)
        } else if self.player_black == Some(player) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.player_white.is_some() && self.player_black.is_some()
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.color_of(player).is_some()
    }
}
