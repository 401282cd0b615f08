use std::time::Instant;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        common::{ClockSnapshot, GamePhaseSnapshot},
        public::GameView,
        sse::{
            ClockTickEvent, GameUpdatedEvent, PhaseChangedEvent, PlayRecordedEvent, ServerEvent,
            ShotClockExpiredEvent, StatsUndoneEvent, SystemStatus,
        },
        stat::PlayOutcomeResponse,
    },
    engine::PlayOutcome,
    state::{SharedState, state_machine::GamePhase},
};

pub const EVENT_PHASE_CHANGED: &str = "phase.changed";
pub const EVENT_GAME_UPDATED: &str = "game.updated";
pub const EVENT_PLAY_RECORDED: &str = "play.recorded";
pub const EVENT_STATS_UNDONE: &str = "stats.undone";
pub const EVENT_CLOCK_TICK: &str = "clock.tick";
pub const EVENT_SHOT_CLOCK_EXPIRED: &str = "shot_clock.expired";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast a phase change notification.
pub async fn broadcast_phase_changed(state: &SharedState, phase: GamePhase) {
    let snapshot = phase_snapshot(state, phase).await;
    let payload = PhaseChangedEvent(snapshot);
    send_public_event(state, EVENT_PHASE_CHANGED, &payload);
    send_scorer_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Build the phase snapshot shared by REST and SSE.
pub async fn phase_snapshot(state: &SharedState, phase: GamePhase) -> GamePhaseSnapshot {
    let game_id = state.read_current_game(|game| game.map(|game| game.id)).await;
    GamePhaseSnapshot {
        phase: phase.into(),
        game_id,
        degraded: state.is_degraded().await,
    }
}

/// Broadcast the full live state of the loaded game. Does nothing when no game is loaded.
pub async fn broadcast_game_updated(state: &SharedState) {
    let phase = state.state_machine_phase().await;
    let view = state
        .read_current_game(|game| game.map(|game| GameView::build(game, phase, Instant::now())))
        .await;

    if let Some(view) = view {
        let payload = GameUpdatedEvent(view);
        send_public_event(state, EVENT_GAME_UPDATED, &payload);
        send_scorer_event(state, EVENT_GAME_UPDATED, &payload);
    }
}

/// Tell the scorer what a stat or prompt answer produced.
pub fn broadcast_play_recorded(state: &SharedState, outcome: &PlayOutcome) {
    let payload = PlayRecordedEvent(PlayOutcomeResponse::from(outcome));
    send_scorer_event(state, EVENT_PLAY_RECORDED, &payload);
}

/// Broadcast the ids of stat events removed by an undo.
pub fn broadcast_stats_undone(state: &SharedState, game_id: Uuid, removed_ids: Vec<Uuid>) {
    let payload = StatsUndoneEvent {
        game_id,
        removed_ids,
    };
    send_public_event(state, EVENT_STATS_UNDONE, &payload);
    send_scorer_event(state, EVENT_STATS_UNDONE, &payload);
}

/// Broadcast a clock reading.
pub fn broadcast_clock_tick(state: &SharedState, game_id: Uuid, clock: ClockSnapshot) {
    let payload = ClockTickEvent { game_id, clock };
    send_public_event(state, EVENT_CLOCK_TICK, &payload);
    send_scorer_event(state, EVENT_CLOCK_TICK, &payload);
}

/// Broadcast that the shot clock ran out.
pub fn broadcast_shot_clock_expired(state: &SharedState, payload: ShotClockExpiredEvent) {
    send_public_event(state, EVENT_SHOT_CLOCK_EXPIRED, &payload);
    send_scorer_event(state, EVENT_SHOT_CLOCK_EXPIRED, &payload);
}

/// Broadcast a degraded-mode change.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_scorer_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_scorer_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.scorer_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize scorer SSE payload"),
    }
}
