use std::collections::HashMap;

use async_trait::async_trait;
use chess_core::Move;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MatchRepository, RepositoryError};
use crate::model::{Match, MatchId, PlayerId};

/// Process-local match store, used when no database is configured.
#[derive(Default)]
pub struct MemoryMatchRepository {
    matches: RwLock<HashMap<MatchId, Match>>,
}

impl MemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.matches.read().await.len()
    }
}

fn take_limit(mut matches: Vec<Match>, limit: i64) -> Vec<Match> {
    matches.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
    matches
}

#[async_trait]
impl MatchRepository for MemoryMatchRepository {
    async fn new_match(&self, created: Match) -> Result<Match, RepositoryError> {
        self.matches.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, RepositoryError> {
        Ok(self.matches.read().await.get(&id).cloned())
    }

    async fn get_matches(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
        let mut active: Vec<Match> = self
            .matches
            .read()
            .await
            .values()
            .filter(|m| !m.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(take_limit(active, limit))
    }

    async fn get_matches_by_deadline(&self, limit: i64) -> Result<Vec<Match>, RepositoryError> {
        let mut running: Vec<(DateTime<Utc>, Match)> = self
            .matches
            .read()
            .await
            .values()
            .filter_map(|m| Some((m.clock.deadline(m.status)?, m.clone())))
            .collect();
        running.sort_by_key(|(deadline, _)| *deadline);
        Ok(take_limit(running.into_iter().map(|(_, m)| m).collect(), limit))
    }

    async fn get_recent_matches_for_player(
        &self,
        player: PlayerId,
        limit: i64,
    ) -> Result<Vec<Match>, RepositoryError> {
        let mut seated: Vec<Match> = self
            .matches
            .read()
            .await
            .values()
            .filter(|m| m.involves(player))
            .cloned()
            .collect();
        seated.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(take_limit(seated, limit))
    }

    async fn update_match(&self, updated: &Match) -> Result<(), RepositoryError> {
        let mut matches = self.matches.write().await;
        let stored = matches
            .get_mut(&updated.id)
            .ok_or(RepositoryError::Missing(updated.id))?;
        *stored = updated.clone();
        Ok(())
    }

    async fn update_and_append_move(
        &self,
        updated: &Match,
        mv: &Move,
    ) -> Result<(), RepositoryError> {
        let mut matches = self.matches.write().await;
        let stored = matches
            .get_mut(&updated.id)
            .ok_or(RepositoryError::Missing(updated.id))?;
        if updated.move_history.len() != stored.move_history.len() + 1
            || updated.move_history.last() != Some(mv)
        {
            return Err(RepositoryError::Corrupt(format!(
                "move {mv} does not extend the history of match {}",
                updated.id
            )));
        }
        *stored = updated.clone();
        Ok(())
    }
}
