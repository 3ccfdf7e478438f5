use std::collections::HashMap;

use async_trait::async_trait;
use chess_core::{Board, Move};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{MatchRepository, RepositoryError};
use crate::model::{Match, MatchClock, MatchId, MatchStatus, PlayerId};

const MATCH_COLUMNS: &str = r#"
    id, initial_position, current_position, player_white, player_black, status,
    white_remaining_ms, black_remaining_ms, increment_ms, turn_started_at,
    created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    id: Uuid,
    initial_position: String,
    current_position: String,
    player_white: Option<Uuid>,
    player_black: Option<Uuid>,
    status: String,
    white_remaining_ms: i64,
    black_remaining_ms: i64,
    increment_ms: i64,
    turn_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MatchRow {
    fn into_match(self, notations: &[String]) -> Result<Match, RepositoryError> {
        let corrupt = |what: String| RepositoryError::Corrupt(format!("match {}: {what}", self.id));

        let board = Board::from_fen(&self.current_position).map_err(|e| corrupt(e.to_string()))?;
        let status = self.status.parse::<MatchStatus>().map_err(corrupt)?;
        let move_history = notations
            .iter()
            .map(|n| n.parse::<Move>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Match {
            id: MatchId::from_uuid(self.id),
            initial_position: self.initial_position,
            current_position: self.current_position,
            board,
            player_white: self.player_white.map(PlayerId::from_uuid),
            player_black: self.player_black.map(PlayerId::from_uuid),
            status,
            move_history,
            clock: MatchClock {
                white_remaining_ms: self.white_remaining_ms,
                black_remaining_ms: self.black_remaining_ms,
                increment_ms: self.increment_ms,
                turn_started_at: self.turn_started_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Postgres-backed match store.
#[derive(Clone)]
pub struct PgMatchRepository {
    pool: PgPool,
}

impl PgMatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach move histories to a page of match rows, preserving row order.
    async fn hydrate(&self, rows: Vec<MatchRow>) -> Result<Vec<Match>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let moves: Vec<(Uuid, String)> = sqlx::query_as(
            r#"SELECT match_id, notation FROM match_moves
            WHERE match_id = ANY($1)
            ORDER BY match_id, ply"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_match: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (match_id, notation) in moves {
            by_match.entry(match_id).or_default().push(notation);
        }

        rows.into_iter()
            .map(|row| {
                let notations = by_match.remove(&row.id).unwrap_or_default();
                row.into_match(&notations)
            })
            .collect()
    }

    async fn write_state(
        tx: &mut Transaction<'_, Postgres>,
        updated: &Match,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE matches SET
                current_position = $2,
                player_white = $3,
                player_black = $4,
                status = $5,
                white_remaining_ms = $6,
                black_remaining_ms = $7,
                increment_ms = $8,
                turn_started_at = $9,
                updated_at = $10
            WHERE id = $1"#,
        )
        .bind(updated.id.as_uuid())
        .bind(&updated.current_position)
        .bind(updated.player_white.map(|p| p.as_uuid()))
        .bind(updated.player_black.map(|p| p.as_uuid()))
        .bind(updated.status.as_str())
        .bind(updated.clock.white_remaining_ms)
        .bind(updated.clock.black_remaining_ms)
        .bind(updated.clock.increment_ms)
        .bind(updated.clock.turn_started_at)
        .bind(updated.updated_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Missing(updated.id));
        }
        Ok(())
    }
}

#[async_trait]
impl MatchRepository for PgMatchRepository {
    async fn new_match(&self, created: Match) -> Result<Match, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO matches (
                id, initial_position, current_position, player_white, player_black, status,
                white_remaining_ms, black_remaining_ms, increment_ms, turn_started_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(created.id.as_uuid())
        .bind(&created.initial_position)
        .bind(&created.current_position)
        .bind(created.player_white.map(|p| p.as_uuid()))
        .bind(created.player_black.map(|p| p.as_uuid()))
        .bind(created.status.as_str())
        .bind(created.clock.white_remaining_ms)
        .bind(created.clock.black_remaining_ms)
        .bind(created.clock.increment_ms)
        .bind(created.clock.turn_started_at)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, RepositoryError> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn get_matches(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            r#"SELECT {MATCH_COLUMNS} FROM matches
            WHERE status NOT LIKE 'ended%'
            ORDER BY created_at DESC
            LIMIT $1"#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn get_matches_by_deadline(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            r#"SELECT {MATCH_COLUMNS} FROM matches
            WHERE status IN ('in_progress_white', 'in_progress_black')
              AND turn_started_at IS NOT NULL
            ORDER BY turn_started_at + INTERVAL '1 millisecond' * CASE
                WHEN status = 'in_progress_white' THEN white_remaining_ms
                ELSE black_remaining_ms
            END
            LIMIT $1"#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn get_recent_matches_for_player(
        &self,
        player: PlayerId,
        limit: i64,
    ) -> Result<Vec<Match>, RepositoryError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            r#"SELECT {MATCH_COLUMNS} FROM matches
            WHERE player_white = $1 OR player_black = $1
            ORDER BY updated_at DESC
            LIMIT $2"#
        ))
        .bind(player.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn update_match(&self, updated: &Match) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        Self::write_state(&mut tx, updated).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_and_append_move(
        &self,
        updated: &Match,
        mv: &Move,
    ) -> Result<(), RepositoryError> {
        let ply = i32::try_from(updated.move_history.len())
            .map_err(|_| RepositoryError::Corrupt(format!("match {} history too long", updated.id)))?;

        let mut tx = self.pool.begin().await?;
        Self::write_state(&mut tx, updated).await?;
        sqlx::query(
            r#"INSERT INTO match_moves (match_id, ply, notation)
            VALUES ($1, $2, $3)"#,
        )
        .bind(updated.id.as_uuid())
        .bind(ply)
        .bind(mv.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
