//! Read-only projections of the loaded game for spectators.

use std::time::Instant;

use crate::{
    dto::{
        common::GamePhaseSnapshot,
        public::{BoxScoreResponse, GameView, PlaysResponse},
    },
    error::ServiceError,
    services::sse_events,
    state::{SharedState, game::GameSession},
};

async fn read_loaded<T>(
    state: &SharedState,
    project: impl FnOnce(&GameSession) -> T,
) -> Result<T, ServiceError> {
    state
        .read_current_game(|game| game.map(project))
        .await
        .ok_or_else(|| ServiceError::NotFound("no game is loaded".into()))
}

/// Live state of the loaded game, as carried by `game.updated`.
pub async fn get_game(state: &SharedState) -> Result<GameView, ServiceError> {
    let phase = state.state_machine_phase().await;
    read_loaded(state, |game| GameView::build(game, phase, Instant::now())).await
}

pub async fn get_box_score(state: &SharedState) -> Result<BoxScoreResponse, ServiceError> {
    read_loaded(state, |game| BoxScoreResponse::from(game)).await
}

/// Play-by-play log, oldest first.
pub async fn get_plays(state: &SharedState) -> Result<PlaysResponse, ServiceError> {
    read_loaded(state, |game| PlaysResponse::from(game)).await
}

/// Current phase and degraded flag; answers even when no game is loaded.
pub async fn get_phase(state: &SharedState) -> GamePhaseSnapshot {
    let phase = state.state_machine_phase().await;
    sse_events::phase_snapshot(state, phase).await
}
