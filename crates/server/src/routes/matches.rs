use std::sync::Arc;

use axum::{extract::Path, extract::Query, Extension, Json};
use chess_core::{Color, Coordinate, Move, PieceType};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::auth::middleware::AuthPlayer;
use crate::error::{AppError, GameError};
use crate::model::{Match, MatchId};
use crate::service::GameService;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn clamped(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub initial_position: Option<String>,
    pub color: Color,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub source: String,
    pub destination: String,
    pub promotion: Option<PieceType>,
}

impl MoveRequest {
    fn to_move(&self) -> Result<Move, GameError> {
        let source: Coordinate = self.source.parse()?;
        let destination: Coordinate = self.destination.parse()?;
        Ok(match self.promotion {
            Some(kind) => Move::with_promotion(source, destination, kind),
            None => Move::new(source, destination),
        })
    }
}

#[derive(Deserialize)]
pub struct LegalMovesQuery {
    pub from: String,
}

/// POST /api/matches
pub async fn create_match(
    Extension(service): Extension<Arc<GameService>>,
    AuthPlayer(player): AuthPlayer,
    Json(body): Json<CreateMatchRequest>,
) -> Result<Json<Match>, AppError> {
    let created = service
        .create_match(body.initial_position.as_deref(), player, body.color)
        .await?;
    Ok(Json(created))
}

/// GET /api/matches
pub async fn list_active_matches(
    Extension(service): Extension<Arc<GameService>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Match>>, AppError> {
    Ok(Json(service.active_matches(q.clamped()).await?))
}

/// GET /api/matches/{match_id}
pub async fn get_match(
    Extension(service): Extension<Arc<GameService>>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<Match>, AppError> {
    Ok(Json(service.get_match(match_id).await?))
}

/// POST /api/matches/{match_id}/join
pub async fn join_match(
    Extension(service): Extension<Arc<GameService>>,
    Path(match_id): Path<MatchId>,
    AuthPlayer(player): AuthPlayer,
) -> Result<Json<Match>, AppError> {
    Ok(Json(service.seat_player(match_id, player).await?))
}

/// POST /api/matches/{match_id}/moves
pub async fn submit_move(
    Extension(service): Extension<Arc<GameService>>,
    Path(match_id): Path<MatchId>,
    AuthPlayer(player): AuthPlayer,
    Json(body): Json<MoveRequest>,
) -> Result<Json<Match>, AppError> {
    let mv = body.to_move()?;
    Ok(Json(service.submit_move(match_id, player, mv).await?))
}

/// GET /api/matches/{match_id}/legal-moves?from=e2
pub async fn legal_moves(
    Extension(service): Extension<Arc<GameService>>,
    Path(match_id): Path<MatchId>,
    Query(q): Query<LegalMovesQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let from: Coordinate = q.from.parse().map_err(GameError::from)?;
    let destinations = service.legal_destinations(match_id, from).await?;
    Ok(Json(json!({
        "from": from,
        "destinations": destinations,
    })))
}

/// GET /api/players/me/matches
pub async fn my_matches(
    Extension(service): Extension<Arc<GameService>>,
    AuthPlayer(player): AuthPlayer,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Match>>, AppError> {
    Ok(Json(
        service
            .recent_matches_for_player(player, q.clamped())
            .await?,
    ))
}
