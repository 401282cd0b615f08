use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::GameStatus,
    dto::game::{CreateGameRequest, GameDetails, GameSummary, ListGamesQuery, TeamInput},
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        game::{GameSession, Player, TeamRoster},
        state_machine::{GameEvent, LoadedStatus},
        transitions::run_transition_with_broadcast,
    },
};

/// Create and store a scheduled game. The game is not loaded.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameDetails, ServiceError> {
    let store = state.require_game_store().await?;

    let CreateGameRequest {
        name,
        tournament_id,
        preset,
        rules,
        home,
        away,
    } = request;

    let rules = state.config().rules_for(preset, rules.as_ref());
    let home = build_roster(home)?;
    let away = build_roster(away)?;
    let session = GameSession::new(name, tournament_id, rules, home, away);

    let entity = session.to_entity(Instant::now());
    store.save_game(entity.clone()).await?;
    info!(game_id = %entity.id, name = %entity.name, "game created");
    Ok(entity.into())
}

fn build_roster(team: TeamInput) -> Result<TeamRoster, ServiceError> {
    let mut starters = Vec::new();
    let players = team
        .players
        .into_iter()
        .map(|input| {
            let player = Player {
                id: Uuid::new_v4(),
                name: input.name.trim().to_string(),
                number: input.number,
            };
            if input.starter {
                starters.push(player.id);
            }
            player
        })
        .collect();

    Ok(TeamRoster::new(
        team.name.trim().to_string(),
        players,
        starters,
    )?)
}

/// Load a stored game and enter the phase matching its status.
pub async fn load_game(state: &SharedState, id: Uuid) -> Result<GameDetails, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game(id).await? else {
        return Err(ServiceError::NotFound(format!("game `{id}` not found")));
    };
    let stats = store.list_stats(id).await?;
    let substitutions = store.list_substitutions(id).await?;

    let status = match game.status {
        GameStatus::Scheduled => LoadedStatus::Scheduled,
        GameStatus::InProgress => LoadedStatus::InProgress,
        GameStatus::Final => LoadedStatus::Final,
    };
    let details = GameDetails::from(game.clone());
    let session = GameSession::from_entities(game, stats, substitutions);
    let event_count = session.events.len();

    run_transition_with_broadcast(state, GameEvent::Load(status), move || async move {
        state
            .with_current_game_slot_mut(|slot| {
                slot.replace(session);
            })
            .await;
        Ok(())
    })
    .await?;

    info!(game_id = %id, events = event_count, ?status, "game loaded");
    sse_events::broadcast_game_updated(state).await;
    Ok(details)
}

/// Unload the current game. Pending changes are written first; the game stays
/// loaded when that fails.
pub async fn unload_game(state: &SharedState) -> Result<(), ServiceError> {
    let game_id = run_transition_with_broadcast(state, GameEvent::Unload, move || async move {
        let pending = state
            .read_current_game(|game| game.is_some_and(GameSession::has_pending_writes))
            .await;
        if pending {
            if let Err(err) = state.flush_outbox().await {
                warn!(error = %err, "refusing to unload a game with unsaved changes");
                return Err(err);
            }
        }

        Ok(state
            .with_current_game_slot_mut(|slot| slot.take().map(|game| game.id))
            .await)
    })
    .await?;

    if let Some(game_id) = game_id {
        info!(%game_id, "game unloaded");
    }
    Ok(())
}

pub async fn list_games(
    state: &SharedState,
    query: ListGamesQuery,
) -> Result<Vec<GameSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let games = store.list_games(query.tournament_id).await?;
    Ok(games.into_iter().map(Into::into).collect())
}

/// Stored game, read from memory when it is the loaded one.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameDetails, ServiceError> {
    let loaded = state
        .read_current_game(|game| {
            game.filter(|game| game.id == id)
                .map(|game| game.to_entity(Instant::now()))
        })
        .await;
    if let Some(entity) = loaded {
        return Ok(entity.into());
    }

    let store = state.require_game_store().await?;
    match store.find_game(id).await? {
        Some(game) => Ok(game.into()),
        None => Err(ServiceError::NotFound(format!("game `{id}` not found"))),
    }
}

/// Delete a stored game with its stats and substitutions. The loaded game cannot be deleted.
pub async fn delete_game(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let loaded_id = state.read_current_game(|game| game.map(|game| game.id)).await;
    if loaded_id == Some(id) {
        return Err(ServiceError::InvalidState(
            "cannot delete the loaded game; unload it first".into(),
        ));
    }

    let store = state.require_game_store().await?;
    if store.delete_game(id).await? {
        info!(game_id = %id, "game deleted");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("game `{id}` not found")))
    }
}
