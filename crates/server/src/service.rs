//! Game session service: the only code that mutates matches.
//!
//! Every mutating call runs as one unit under the match's lock: fetch,
//! validate, mutate, persist, publish. A rejected call changes nothing and
//! publishes nothing. Transient store faults (including lock timeouts) retry
//! the whole unit a bounded number of times before surfacing `Unavailable`.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use chess_core::{Board, Color, Coordinate, Move, Outcome, STARTING_FEN};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::GameSettings;
use crate::db::MatchRepository;
use crate::error::GameError;
use crate::events::{EventBus, GameEvent};
use crate::locks::{MatchGuard, MatchLocks};
use crate::model::{Match, MatchClock, MatchId, MatchStatus, PlayerId};

pub struct GameService {
    repo: Arc<dyn MatchRepository>,
    events: Arc<dyn EventBus>,
    locks: MatchLocks,
    settings: GameSettings,
}

/// Side for a player joining an empty match, drawn from the thread-local
/// CSPRNG on every call.
fn random_color() -> Color {
    if rand::rng().random_bool(0.5) {
        Color::White
    } else {
        Color::Black
    }
}

impl GameService {
    pub fn new(
        repo: Arc<dyn MatchRepository>,
        events: Arc<dyn EventBus>,
        settings: GameSettings,
    ) -> Self {
        Self {
            repo,
            events,
            locks: MatchLocks::new(settings.lock_timeout),
            settings,
        }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> Result<T, GameError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GameError>>,
    {
        let attempts = self.settings.retry_attempts.max(1);
        let mut tried = 1;
        loop {
            match attempt().await {
                Err(GameError::Unavailable) if tried < attempts => {
                    let delay = self.settings.retry_backoff * 2u32.saturating_pow(tried - 1);
                    warn!(op, attempt = tried, ?delay, "Store unavailable, retrying");
                    tokio::time::sleep(delay).await;
                    tried += 1;
                }
                other => return other,
            }
        }
    }

    async fn load(&self, id: MatchId) -> Result<Match, GameError> {
        self.repo.get_match(id).await?.ok_or(GameError::MatchNotFound)
    }

    /// Create a waiting match from `initial_position` (standard start when
    /// absent) with `creator` seated on `color`.
    pub async fn create_match(
        &self,
        initial_position: Option<&str>,
        creator: PlayerId,
        color: Color,
    ) -> Result<Match, GameError> {
        let fen = initial_position.unwrap_or(STARTING_FEN);
        let board = Board::from_fen(fen).map_err(|e| GameError::InvalidPosition(e.to_string()))?;
        if board.side_to_move() != Color::White {
            return Err(GameError::InvalidPosition("white must be on move".into()));
        }
        if board.outcome().is_some() {
            return Err(GameError::InvalidPosition("game is already decided".into()));
        }

        let clock = MatchClock::new(self.settings.clock_budget, self.settings.clock_increment);
        let created = Match::new(board, creator, color, clock, Utc::now());
        let created = self
            .with_retry("create_match", || async {
                self.repo.new_match(created.clone()).await.map_err(GameError::from)
            })
            .await?;

        info!(match_id = %created.id, player_id = %creator, %color, "Match created");
        Ok(created)
    }

    pub async fn get_match(&self, id: MatchId) -> Result<Match, GameError> {
        self.with_retry("get_match", || self.load(id)).await
    }

    /// Matches not yet ended, newest first.
    pub async fn active_matches(&self, limit: i64) -> Result<Vec<Match>, GameError> {
        self.with_retry("active_matches", move || async move {
            self.repo.get_matches(limit).await.map_err(GameError::from)
        })
        .await
    }

    /// Matches with a running clock, earliest deadline first.
    pub async fn matches_by_deadline(&self, limit: i64) -> Result<Vec<Match>, GameError> {
        self.with_retry("matches_by_deadline", move || async move {
            self.repo.get_matches_by_deadline(limit).await.map_err(GameError::from)
        })
        .await
    }

    pub async fn recent_matches_for_player(
        &self,
        player: PlayerId,
        limit: i64,
    ) -> Result<Vec<Match>, GameError> {
        self.with_retry("recent_matches_for_player", move || async move {
            self.repo
                .get_recent_matches_for_player(player, limit)
                .await
                .map_err(GameError::from)
        })
        .await
    }

    /// Legal destinations for the piece on `from` in the match's current
    /// position. Empty once the match has ended.
    pub async fn legal_destinations(
        &self,
        id: MatchId,
        from: Coordinate,
    ) -> Result<BTreeSet<Coordinate>, GameError> {
        let current = self.get_match(id).await?;
        if current.status.is_terminal() {
            return Ok(BTreeSet::new());
        }
        Ok(current.board.legal_destinations(from))
    }

    /// Seat `player` in a waiting match. Rejected when the match is missing,
    /// not waiting, full, or already has this player. Filling the second
    /// seat starts the match and the clock.
    pub async fn seat_player(&self, id: MatchId, player: PlayerId) -> Result<Match, GameError> {
        self.with_retry("seat_player", || self.seat_once(id, player))
            .await
    }

    async fn seat_once(&self, id: MatchId, player: PlayerId) -> Result<Match, GameError> {
        let _guard = self.locks.acquire(id).await?;
        let mut current = self.load(id).await?;

        if current.status != MatchStatus::Waiting || current.involves(player) {
            return Err(GameError::MatchNotJoinable);
        }
        let color = match (current.player_white, current.player_black) {
            (None, None) => random_color(),
            (None, Some(_)) => Color::White,
            (Some(_), None) => Color::Black,
            (Some(_), Some(_)) => return Err(GameError::MatchNotJoinable),
        };

        let now = Utc::now();
        current.seat(color, player);
        current.updated_at = now;
        let started = match (current.player_white, current.player_black) {
            (Some(white), Some(black)) => {
                current.status = MatchStatus::InProgressWhite;
                current.clock.start(now);
                Some((white, black))
            }
            _ => None,
        };

        self.repo.update_match(&current).await?;

        info!(match_id = %id, player_id = %player, %color, "Player seated");
        self.events.publish(GameEvent::PlayerJoin {
            match_id: id,
            player_id: player,
        });
        if let Some((white, black)) = started {
            info!(match_id = %id, "Match started");
            self.events.publish(GameEvent::Start {
                match_id: id,
                white_player_id: white,
                black_player_id: black,
            });
        }
        Ok(current)
    }

    /// Validate and apply `mv` for `player`. On success the turn passes to
    /// the opponent, or the match ends on checkmate, stalemate or
    /// insufficient material.
    pub async fn submit_move(
        &self,
        id: MatchId,
        player: PlayerId,
        mv: Move,
    ) -> Result<Match, GameError> {
        self.with_retry("submit_move", || self.move_once(id, player, mv))
            .await
    }

    async fn move_once(&self, id: MatchId, player: PlayerId, mv: Move) -> Result<Match, GameError> {
        let guard = self.locks.acquire(id).await?;
        let mut current = self.load(id).await?;

        let mover = current
            .status
            .to_move()
            .ok_or(GameError::MatchNotInProgress)?;
        if current.player(mover) != Some(player) {
            return Err(GameError::NotPlayersTurn);
        }
        let board = current.board.apply(&mv).map_err(|e| {
            debug!(match_id = %id, %mv, "Move rejected");
            GameError::from(e)
        })?;

        let now = Utc::now();
        current.clock.charge(mover, now);
        current.status = match board.outcome() {
            Some(Outcome::Checkmate { winner }) => MatchStatus::EndedCheckmate(winner),
            Some(Outcome::Stalemate | Outcome::InsufficientMaterial) => MatchStatus::EndedDraw,
            None => MatchStatus::in_progress(mover.opposite()),
        };
        if current.status.is_terminal() {
            current.clock.stop(None, now);
        }
        current.current_position = board.to_fen();
        current.board = board;
        current.move_history.push(mv);
        current.updated_at = now;

        self.repo.update_and_append_move(&current, &mv).await?;

        debug!(match_id = %id, %mv, %mover, "Move accepted");
        self.events.publish(GameEvent::Move {
            match_id: id,
            player_id: player,
            color: mover,
            mv,
        });
        if current.status.is_terminal() {
            info!(match_id = %id, status = %current.status, "Match ended");
            self.events.publish(GameEvent::End {
                match_id: id,
                final_status: current.status,
            });
            drop(guard);
            self.locks.forget(id);
        }
        Ok(current)
    }

    /// End the match on time for `expired`. Returns `false` without touching
    /// the match when it has already ended or `expired` is not the side to
    /// move, so duplicate or stale timer fires are harmless.
    pub async fn handle_clock_expiry(&self, id: MatchId, expired: Color) -> Result<bool, GameError> {
        self.with_retry("handle_clock_expiry", || self.expire_once(id, expired))
            .await
    }

    async fn expire_once(&self, id: MatchId, expired: Color) -> Result<bool, GameError> {
        let guard = self.locks.acquire(id).await?;
        let current = self.load(id).await?;
        if current.status.to_move() != Some(expired) {
            return Ok(false);
        }
        self.end_on_time(current, expired, guard).await
    }

    /// Used by the clock scanner: re-reads the match under its lock and ends
    /// it only if the side to move is still out of time at `now`.
    pub async fn expire_if_overdue(&self, id: MatchId, now: DateTime<Utc>) -> Result<bool, GameError> {
        self.with_retry("expire_if_overdue", || self.expire_overdue_once(id, now))
            .await
    }

    async fn expire_overdue_once(&self, id: MatchId, now: DateTime<Utc>) -> Result<bool, GameError> {
        let guard = self.locks.acquire(id).await?;
        let current = self.load(id).await?;
        match current.clock.overdue(current.status, now) {
            Some(expired) => self.end_on_time(current, expired, guard).await,
            None => Ok(false),
        }
    }

    async fn end_on_time(
        &self,
        mut current: Match,
        expired: Color,
        guard: MatchGuard,
    ) -> Result<bool, GameError> {
        let id = current.id;
        let now = Utc::now();
        current.clock.stop(Some(expired), now);
        match expired {
            Color::White => current.clock.white_remaining_ms = 0,
            Color::Black => current.clock.black_remaining_ms = 0,
        }
        current.status = MatchStatus::out_of_time(expired);
        current.updated_at = now;

        self.repo.update_match(&current).await?;

        info!(match_id = %id, %expired, "Match ended on time");
        self.events.publish(GameEvent::End {
            match_id: id,
            final_status: current.status,
        });
        drop(guard);
        self.locks.forget(id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryMatchRepository, RepositoryError};
    use crate::events::BroadcastBus;
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn settings() -> GameSettings {
        GameSettings {
            lock_timeout: Duration::from_millis(200),
            retry_backoff: Duration::from_millis(1),
            ..GameSettings::default()
        }
    }

    struct Harness {
        service: Arc<GameService>,
        repo: Arc<MemoryMatchRepository>,
        events: broadcast::Receiver<GameEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let repo = Arc::new(MemoryMatchRepository::new());
            let bus = Arc::new(BroadcastBus::new(1024));
            let events = bus.subscribe();
            let service = Arc::new(GameService::new(repo.clone(), bus, settings()));
            Self {
                service,
                repo,
                events,
            }
        }

        fn drain(&mut self) -> Vec<GameEvent> {
            let mut seen = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                seen.push(event);
            }
            seen
        }

        /// A started match with `white` and `black` seated; events drained.
        async fn started(&mut self) -> (MatchId, PlayerId, PlayerId) {
            let white = PlayerId::new();
            let black = PlayerId::new();
            let created = self
                .service
                .create_match(None, white, Color::White)
                .await
                .unwrap();
            self.service.seat_player(created.id, black).await.unwrap();
            self.drain();
            (created.id, white, black)
        }
    }

    fn mv(text: &str) -> Move {
        text.parse().unwrap()
    }

    #[tokio::test]
    async fn create_match_waits_with_creator_seated() {
        let h = Harness::new();
        let creator = PlayerId::new();
        let created = h
            .service
            .create_match(None, creator, Color::Black)
            .await
            .unwrap();

        assert_eq!(created.status, MatchStatus::Waiting);
        assert_eq!(created.player_black, Some(creator));
        assert_eq!(created.player_white, None);
        assert_eq!(created.initial_position, STARTING_FEN);
        assert_eq!(created.clock.turn_started_at, None);
        assert_eq!(h.service.get_match(created.id).await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn create_match_rejects_bad_or_decided_positions() {
        let h = Harness::new();
        let creator = PlayerId::new();
        assert!(matches!(
            h.service.create_match(Some("not a position"), creator, Color::White).await,
            Err(GameError::InvalidPosition(_))
        ));
        assert!(matches!(
            h.service
                .create_match(Some("K7/8/1q6/8/8/8/8/7k w - - 0 1"), creator, Color::White)
                .await,
            Err(GameError::InvalidPosition(_))
        ));
        assert_eq!(h.repo.len().await, 0);
    }

    #[tokio::test]
    async fn create_match_rejects_black_to_move_seed() {
        let h = Harness::new();
        let result = h
            .service
            .create_match(Some("4k3/8/8/8/8/8/4P3/4K3 b - - 0 1"), PlayerId::new(), Color::White)
            .await;
        assert!(matches!(result, Err(GameError::InvalidPosition(_))));
        assert_eq!(h.repo.len().await, 0);

        let white = PlayerId::new();
        let black = PlayerId::new();
        let created = h
            .service
            .create_match(Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"), white, Color::White)
            .await
            .unwrap();
        h.service.seat_player(created.id, black).await.unwrap();
        let moved = h.service.submit_move(created.id, white, mv("e2e3")).await.unwrap();
        assert_eq!(moved.status, MatchStatus::InProgressBlack);
        assert_eq!(moved.board.side_to_move(), Color::Black);
        h.service.submit_move(created.id, black, mv("e8d8")).await.unwrap();
    }

    #[tokio::test]
    async fn seated_player_cannot_join_again() {
        let mut h = Harness::new();
        let creator = PlayerId::new();
        let created = h
            .service
            .create_match(None, creator, Color::White)
            .await
            .unwrap();

        for _ in 0..2 {
            assert_eq!(
                h.service.seat_player(created.id, creator).await.err(),
                Some(GameError::MatchNotJoinable)
            );
        }
        let stored = h.service.get_match(created.id).await.unwrap();
        assert_eq!(stored.status, MatchStatus::Waiting);
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn second_seat_starts_match_with_join_before_start() {
        let mut h = Harness::new();
        let white = PlayerId::new();
        let black = PlayerId::new();
        let created = h
            .service
            .create_match(None, white, Color::White)
            .await
            .unwrap();

        let started = h.service.seat_player(created.id, black).await.unwrap();
        assert_eq!(started.status, MatchStatus::InProgressWhite);
        assert_eq!(started.player_black, Some(black));
        assert!(started.clock.turn_started_at.is_some());

        assert_eq!(
            h.drain(),
            vec![
                GameEvent::PlayerJoin {
                    match_id: created.id,
                    player_id: black,
                },
                GameEvent::Start {
                    match_id: created.id,
                    white_player_id: white,
                    black_player_id: black,
                },
            ]
        );

        assert_eq!(
            h.service.seat_player(created.id, PlayerId::new()).await.err(),
            Some(GameError::MatchNotJoinable)
        );
        assert_eq!(
            h.service.seat_player(MatchId::new(), black).await.err(),
            Some(GameError::MatchNotFound)
        );
    }

    #[tokio::test]
    async fn empty_match_seats_first_player_on_either_side() {
        let h = Harness::new();
        let mut sides = BTreeSet::new();
        for _ in 0..64 {
            let mut empty = Match::new(
                Board::starting(),
                PlayerId::new(),
                Color::White,
                MatchClock::new(Duration::from_secs(60), Duration::ZERO),
                Utc::now(),
            );
            empty.player_white = None;
            let empty = h.repo.new_match(empty).await.unwrap();

            let player = PlayerId::new();
            let seated = h.service.seat_player(empty.id, player).await.unwrap();
            assert_eq!(seated.status, MatchStatus::Waiting);
            sides.insert(seated.color_of(player).map(|c| c == Color::White));
        }
        assert_eq!(sides.len(), 2);
    }

    #[tokio::test]
    async fn accepted_move_advances_turn_and_publishes() {
        let mut h = Harness::new();
        let (id, white, _) = h.started().await;

        let after = h.service.submit_move(id, white, mv("e2e4")).await.unwrap();
        assert_eq!(after.status, MatchStatus::InProgressBlack);
        assert_eq!(after.move_history, vec![mv("e2e4")]);
        assert_eq!(
            after.current_position,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert_eq!(
            h.drain(),
            vec![GameEvent::Move {
                match_id: id,
                player_id: white,
                color: Color::White,
                mv: mv("e2e4"),
            }]
        );

        let stored = h.service.get_match(id).await.unwrap();
        assert_eq!(stored.current_position, after.current_position);
    }

    #[tokio::test]
    async fn rejected_moves_leave_no_trace() {
        let mut h = Harness::new();
        let (id, white, black) = h.started().await;
        let before = h.service.get_match(id).await.unwrap();

        assert_eq!(
            h.service.submit_move(id, black, mv("e7e5")).await.err(),
            Some(GameError::NotPlayersTurn)
        );
        assert_eq!(
            h.service.submit_move(id, PlayerId::new(), mv("e2e4")).await.err(),
            Some(GameError::NotPlayersTurn)
        );
        assert_eq!(
            h.service.submit_move(id, white, mv("e2e5")).await.err(),
            Some(GameError::IllegalMove)
        );
        assert_eq!(
            h.service.submit_move(id, white, mv("e2e4q")).await.err(),
            Some(GameError::IllegalMove)
        );

        let after = h.service.get_match(id).await.unwrap();
        assert_eq!(after.current_position, before.current_position);
        assert_eq!(after.status, before.status);
        assert!(after.move_history.is_empty());
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn moves_before_start_are_rejected() {
        let h = Harness::new();
        let creator = PlayerId::new();
        let created = h
            .service
            .create_match(None, creator, Color::White)
            .await
            .unwrap();
        assert_eq!(
            h.service.submit_move(created.id, creator, mv("e2e4")).await.err(),
            Some(GameError::MatchNotInProgress)
        );
    }

    #[tokio::test]
    async fn checkmate_ends_the_match_after_the_move_event() {
        let mut h = Harness::new();
        let (id, white, black) = h.started().await;

        h.service.submit_move(id, white, mv("f2f3")).await.unwrap();
        h.service.submit_move(id, black, mv("e7e5")).await.unwrap();
        h.service.submit_move(id, white, mv("g2g4")).await.unwrap();
        let mated = h.service.submit_move(id, black, mv("d8h4")).await.unwrap();
        assert_eq!(mated.status, MatchStatus::EndedCheckmate(Color::Black));
        assert_eq!(mated.clock.turn_started_at, None);

        let events = h.drain();
        assert_eq!(events.len(), 5);
        assert_eq!(events[3].topic(), crate::events::TOPIC_MOVE);
        assert_eq!(
            events[4],
            GameEvent::End {
                match_id: id,
                final_status: MatchStatus::EndedCheckmate(Color::Black),
            }
        );

        assert_eq!(
            h.service.submit_move(id, white, mv("a2a3")).await.err(),
            Some(GameError::MatchNotInProgress)
        );
        assert!(h
            .service
            .legal_destinations(id, "a2".parse().unwrap())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn insufficient_material_is_a_draw() {
        let mut h = Harness::new();
        let white = PlayerId::new();
        let black = PlayerId::new();
        let created = h
            .service
            .create_match(Some("4k3/8/8/8/8/8/3r4/4K3 w - - 0 1"), white, Color::White)
            .await
            .unwrap();
        h.service.seat_player(created.id, black).await.unwrap();

        let drawn = h
            .service
            .submit_move(created.id, white, mv("e1d2"))
            .await
            .unwrap();
        assert_eq!(drawn.status, MatchStatus::EndedDraw);
        assert_eq!(
            h.drain().last(),
            Some(&GameEvent::End {
                match_id: created.id,
                final_status: MatchStatus::EndedDraw,
            })
        );
    }

    #[tokio::test]
    async fn clock_expiry_is_idempotent() {
        let mut h = Harness::new();
        let (id, _, _) = h.started().await;

        assert_eq!(h.service.handle_clock_expiry(id, Color::White).await, Ok(true));
        assert_eq!(h.service.handle_clock_expiry(id, Color::White).await, Ok(false));

        let ended = h.service.get_match(id).await.unwrap();
        assert_eq!(ended.status, MatchStatus::EndedWhiteOutOfTime);
        assert_eq!(ended.clock.white_remaining_ms, 0);
        assert_eq!(
            h.drain(),
            vec![GameEvent::End {
                match_id: id,
                final_status: MatchStatus::EndedWhiteOutOfTime,
            }]
        );
    }

    #[tokio::test]
    async fn stale_expiry_for_side_not_to_move_is_ignored() {
        let mut h = Harness::new();
        let (id, white, _) = h.started().await;
        h.service.submit_move(id, white, mv("d2d4")).await.unwrap();
        h.drain();

        assert_eq!(h.service.handle_clock_expiry(id, Color::White).await, Ok(false));
        let current = h.service.get_match(id).await.unwrap();
        assert_eq!(current.status, MatchStatus::InProgressBlack);
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn overdue_check_uses_the_running_clock() {
        let mut h = Harness::new();
        let (id, _, _) = h.started().await;
        let now = Utc::now();

        assert_eq!(h.service.expire_if_overdue(id, now).await, Ok(false));
        let late = now + TimeDelta::seconds(601);
        assert_eq!(h.service.expire_if_overdue(id, late).await, Ok(true));
        assert_eq!(
            h.service.get_match(id).await.unwrap().status,
            MatchStatus::EndedWhiteOutOfTime
        );
        assert_eq!(h.service.expire_if_overdue(id, late).await, Ok(false));
        assert_eq!(h.drain().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn move_and_expiry_race_settles_on_exactly_one() {
        for _ in 0..50 {
            let mut h = Harness::new();
            let (id, white, _) = h.started().await;

            let mover = {
                let service = h.service.clone();
                tokio::spawn(async move { service.submit_move(id, white, mv("e2e4")).await })
            };
            let timer = {
                let service = h.service.clone();
                tokio::spawn(async move { service.handle_clock_expiry(id, Color::White).await })
            };
            let moved = mover.await.unwrap();
            let expired = timer.await.unwrap().unwrap();
            let settled = h.service.get_match(id).await.unwrap();

            match (moved, expired) {
                (Ok(_), false) => {
                    assert_eq!(settled.status, MatchStatus::InProgressBlack);
                    assert_eq!(settled.move_history.len(), 1);
                }
                (Err(GameError::MatchNotInProgress), true) => {
                    assert_eq!(settled.status, MatchStatus::EndedWhiteOutOfTime);
                    assert!(settled.move_history.is_empty());
                }
                other => panic!("inconsistent race outcome: {other:?}"),
            }
            let ends = h
                .drain()
                .into_iter()
                .filter(|e| matches!(e, GameEvent::End { .. }))
                .count();
            assert_eq!(ends, usize::from(expired));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_fill_each_seat_once() {
        let mut h = Harness::new();
        let creator = PlayerId::new();
        let created = h
            .service
            .create_match(None, creator, Color::White)
            .await
            .unwrap();

        let joins: Vec<_> = (0..8)
            .map(|_| {
                let service = h.service.clone();
                tokio::spawn(async move { service.seat_player(created.id, PlayerId::new()).await })
            })
            .collect();
        let mut seated = 0;
        for join in joins {
            if join.await.unwrap().is_ok() {
                seated += 1;
            }
        }
        assert_eq!(seated, 1);
        let events = h.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].topic(), crate::events::TOPIC_START);
    }

    /// Fails the first `failures` reads with a transient fault.
    struct FlakyRepository {
        inner: MemoryMatchRepository,
        failures: AtomicU32,
    }

    #[async_trait]
    impl MatchRepository for FlakyRepository {
        async fn new_match(&self, created: Match) -> Result<Match, RepositoryError> {
            self.inner.new_match(created).await
        }

        async fn get_match(&self, id: MatchId) -> Result<Option<Match>, RepositoryError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(RepositoryError::Unavailable("connection reset".into()));
            }
            self.inner.get_match(id).await
        }

        async fn get_matches(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
            self.inner.get_matches(limit).await
        }

        async fn get_matches_by_deadline(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
            self.inner.get_matches_by_deadline(limit).await
        }

        async fn get_recent_matches_for_player(
            &self,
            player: PlayerId,
            limit: i64,
        ) -> Result<Vec<Match>, RepositoryError> {
            self.inner.get_recent_matches_for_player(player, limit).await
        }

        async fn update_match(&self, updated: &Match) -> Result<(), RepositoryError> {
            self.inner.update_match(updated).await
        }

        async fn update_and_append_move(
            &self,
            updated: &Match,
            mv: &Move,
        ) -> Result<(), RepositoryError> {
            self.inner.update_and_append_move(updated, mv).await
        }
    }

    #[tokio::test]
    async fn transient_faults_retry_then_surface_unavailable() {
        let repo = Arc::new(FlakyRepository {
            inner: MemoryMatchRepository::new(),
            failures: AtomicU32::new(0),
        });
        let service = GameService::new(repo.clone(), Arc::new(BroadcastBus::new(16)), settings());
        let white = PlayerId::new();
        let created = service
            .create_match(None, white, Color::White)
            .await
            .unwrap();

        repo.failures.store(2, Ordering::SeqCst);
        let seated = service.seat_player(created.id, PlayerId::new()).await.unwrap();
        assert_eq!(seated.status, MatchStatus::InProgressWhite);

        repo.failures.store(10, Ordering::SeqCst);
        assert_eq!(
            service.submit_move(created.id, white, mv("e2e4")).await.err(),
            Some(GameError::Unavailable)
        );
        repo.failures.store(0, Ordering::SeqCst);
        let unchanged = service.get_match(created.id).await.unwrap();
        assert!(unchanged.move_history.is_empty());
        assert_eq!(unchanged.status, MatchStatus::InProgressWhite);
    }
}
