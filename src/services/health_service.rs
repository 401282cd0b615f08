use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Report storage health together with the tracked game, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.game_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let status = if state.is_degraded().await {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };
    let (game_id, unsaved_changes) = state
        .read_current_game(|game| {
            game.map_or((None, false), |game| {
                (Some(game.id), game.has_pending_writes())
            })
        })
        .await;

    HealthResponse {
        status,
        game_id,
        unsaved_changes,
    }
}
