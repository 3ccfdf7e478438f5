use std::sync::Arc;

use axum::{routing::{get, post}, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::events::BroadcastBus;
use crate::routes;
use crate::service::GameService;

/// Build the HTTP router with every route and shared extension.
pub fn build_router(config: Config, service: Arc<GameService>, bus: Arc<BroadcastBus>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Players
        .route("/api/players/me/matches", get(routes::matches::my_matches))
        // Matches
        .route(
            "/api/matches",
            get(routes::matches::list_active_matches).post(routes::matches::create_match),
        )
        .route("/api/matches/{match_id}", get(routes::matches::get_match))
        .route("/api/matches/{match_id}/join", post(routes::matches::join_match))
        .route("/api/matches/{match_id}/moves", post(routes::matches::submit_move))
        .route("/api/matches/{match_id}/legal-moves", get(routes::matches::legal_moves))
        .route("/api/matches/{match_id}/events", get(routes::events_ws::match_events))
        .layer(Extension(service))
        .layer(Extension(bus))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
