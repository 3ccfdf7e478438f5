//! Match persistence. The service only sees [`MatchRepository`]; Postgres and
//! in-memory implementations live alongside it.

use async_trait::async_trait;
use chess_core::Move;

use crate::model::{Match, MatchId, PlayerId};

pub mod matches;
pub mod memory;
pub mod pool;

pub use matches::PgMatchRepository;
pub use memory::MemoryMatchRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("match {0} does not exist")]
    Missing(MatchId),

    #[error("corrupt match record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Faults worth retrying: the store may answer on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            RepositoryError::Unavailable(_) => true,
            RepositoryError::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
            ),
            RepositoryError::Missing(_) | RepositoryError::Corrupt(_) => false,
        }
    }
}

/// Storage for matches. Each call is atomic for a single match id.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn new_match(&self, created: Match) -> Result<Match, RepositoryError>;

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, RepositoryError>;

    /// Matches that have not ended, newest first.
    async fn get_matches(&self, limit: i64) -> Result<Vec<Match>, RepositoryError>;

    /// Matches with a running clock, earliest deadline for the side to
    /// move first. Waiting and ended matches are excluded.
    async fn get_matches_by_deadline(&self, limit: i64) -> Result<Vec<Match>, RepositoryError>;

    /// Matches `player` is seated in, most recently updated first.
    async fn get_recent_matches_for_player(
        &self,
        player: PlayerId,
        limit: i64,
    ) -> Result<Vec<Match>, RepositoryError>;

    async fn update_match(&self, updated: &Match) -> Result<(), RepositoryError>;

    /// Persist `updated` together with `mv`, the last entry of its history.
    async fn update_and_append_move(&self, updated: &Match, mv: &Move)
        -> Result<(), RepositoryError>;
}
