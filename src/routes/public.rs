use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{
        common::GamePhaseSnapshot,
        public::{BoxScoreResponse, GameView, PlaysResponse},
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints exposing the loaded game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/game", get(get_game))
        .route("/public/box-score", get(get_box_score))
        .route("/public/plays", get(get_plays))
        .route("/public/phase", get(get_phase))
}

#[utoipa::path(
    get,
    path = "/public/game",
    tag = "public",
    responses(
        (status = 200, description = "Live game state", body = GameView),
        (status = 404, description = "No game is loaded")
    )
)]
/// Scoreboard, clock, fouls and pending prompt of the loaded game.
pub async fn get_game(State(state): State<SharedState>) -> Result<Json<GameView>, AppError> {
    Ok(Json(public_service::get_game(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/box-score",
    tag = "public",
    responses(
        (status = 200, description = "Box score", body = BoxScoreResponse),
        (status = 404, description = "No game is loaded")
    )
)]
pub async fn get_box_score(
    State(state): State<SharedState>,
) -> Result<Json<BoxScoreResponse>, AppError> {
    Ok(Json(public_service::get_box_score(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/plays",
    tag = "public",
    responses(
        (status = 200, description = "Play-by-play log", body = PlaysResponse),
        (status = 404, description = "No game is loaded")
    )
)]
pub async fn get_plays(State(state): State<SharedState>) -> Result<Json<PlaysResponse>, AppError> {
    Ok(Json(public_service::get_plays(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/phase",
    tag = "public",
    responses((status = 200, description = "Current game phase", body = GamePhaseSnapshot))
)]
/// Return the phase the backend is in, with or without a loaded game.
pub async fn get_phase(State(state): State<SharedState>) -> Json<GamePhaseSnapshot> {
    Json(public_service::get_phase(&state).await)
}
