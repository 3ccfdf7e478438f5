use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- One row per match; the board is stored as position notation
CREATE TABLE IF NOT EXISTS matches (
    id                 UUID PRIMARY KEY,
    initial_position   TEXT NOT NULL,
    current_position   TEXT NOT NULL,
    player_white       UUID,
    player_black       UUID,
    status             TEXT NOT NULL,
    white_remaining_ms BIGINT NOT NULL,
    black_remaining_ms BIGINT NOT NULL,
    increment_ms       BIGINT NOT NULL DEFAULT 0,
    turn_started_at    TIMESTAMPTZ,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_matches_status
    ON matches (status);
CREATE INDEX IF NOT EXISTS idx_matches_created_at
    ON matches (created_at DESC);
CREATE INDEX IF NOT EXISTS idx_matches_player_white
    ON matches (player_white);
CREATE INDEX IF NOT EXISTS idx_matches_player_black
    ON matches (player_black);

-- Move history, one row per ply in long algebraic form
CREATE TABLE IF NOT EXISTS match_moves (
    match_id   UUID NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
    ply        INTEGER NOT NULL,
    notation   TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (match_id, ply)
);
"#;
