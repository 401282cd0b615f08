//! Scorer operations on the loaded game.
//!
//! Phase changes go through the state machine with
//! [`run_transition_with_broadcast`]; plain stat and roster changes only
//! require a live game. Every operation ends by persisting the outbox and
//! broadcasting the new game view.

use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::GameStatus,
    dto::{
        common::ClockSnapshot,
        stat::{CancelFreeThrowsResponse, PlayOutcomeResponse, ResolvePromptRequest, UndoResponse},
        tracking::{
            ClockResponse, PossessionResponse, SubstitutionResponse, TimeoutResponse,
        },
    },
    engine::PromptId,
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        clock::ClockError,
        game::{GameSession, StatInput},
        state_machine::{BreakKind, FinishReason, GameEvent, GamePhase, LivePhase, StopReason},
        transitions::run_transition_with_broadcast,
    },
};

async fn ensure_live(state: &SharedState) -> Result<LivePhase, ServiceError> {
    match state.state_machine_phase().await {
        GamePhase::Live(live) => Ok(live),
        other => Err(ServiceError::InvalidState(format!(
            "operation requires a live game, current phase {other:?}"
        ))),
    }
}

/// Persist pending changes and push the new game view.
async fn publish(state: &SharedState) {
    state.persist_current_game().await;
    sse_events::broadcast_game_updated(state).await;
}

async fn clock_response(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    let phase = state.state_machine_phase().await;
    let clock = state
        .with_current_game(|game| Ok(ClockSnapshot::read(&game.clock, Instant::now())))
        .await?;
    Ok(ClockResponse {
        phase: phase.into(),
        clock,
    })
}

fn stop_if_running(game: &mut GameSession, now: Instant) -> Result<(), ServiceError> {
    if game.clock.is_running() {
        game.clock.stop(now)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase changes
// ---------------------------------------------------------------------------

/// Start the game: the jump-ball winner gets the ball and the clock starts.
pub async fn tip_off(state: &SharedState, jump_ball_winner: Uuid) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(state, GameEvent::TipOff, move || async move {
        state
            .with_current_game_mut(|game| {
                let now = Instant::now();
                game.set_possession(Some(jump_ball_winner), now)?;
                game.clock.start(now)?;
                game.status = GameStatus::InProgress;
                game.touch();
                info!(game_id = %game.id, %jump_ball_winner, "tip-off");
                Ok(())
            })
            .await
    })
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

pub async fn start_clock(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(state, GameEvent::StartClock, move || async move {
        state
            .with_current_game_mut(|game| {
                game.clock.start(Instant::now())?;
                game.touch();
                Ok(())
            })
            .await
    })
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

/// Stop the clock on a whistle.
pub async fn stop_clock(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    stop_clock_with(state, StopReason::Whistle).await
}

/// Stop the clock with `reason`. Also used by the ticker when the period runs out.
pub async fn stop_clock_with(
    state: &SharedState,
    reason: StopReason,
) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(state, GameEvent::StopClock(reason), move || async move {
        state
            .with_current_game_mut(|game| {
                let remaining_ms = game.clock.stop(Instant::now())?;
                game.touch();
                debug!(game_id = %game.id, remaining_ms, ?reason, "clock stopped");
                Ok(())
            })
            .await
    })
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

/// Correct the game clock while it is stopped.
pub async fn set_clock(state: &SharedState, remaining_ms: u32) -> Result<ClockResponse, ServiceError> {
    ensure_live(state).await?;
    state
        .with_current_game_mut(|game| {
            game.clock.set(remaining_ms)?;
            game.touch();
            Ok(())
        })
        .await?;

    publish(state).await;
    clock_response(state).await
}

/// Reset the shot clock, to the short value after an offensive rebound.
pub async fn reset_shot_clock(state: &SharedState, short: bool) -> Result<ClockResponse, ServiceError> {
    ensure_live(state).await?;
    state
        .with_current_game_mut(|game| {
            let value = if short {
                game.rules.shot_clock_short_ms
            } else {
                game.rules.shot_clock_ms
            };
            let value = value.ok_or(ClockError::NoShotClock)?;
            game.clock.reset_shot_clock(value, Instant::now())?;
            game.touch();
            Ok(())
        })
        .await?;

    publish(state).await;
    clock_response(state).await
}

/// Charge a timeout to `team_id` and stop the clock.
pub async fn call_timeout(state: &SharedState, team_id: Uuid) -> Result<TimeoutResponse, ServiceError> {
    let timeouts_left = run_transition_with_broadcast(
        state,
        GameEvent::CallTimeout { team_id },
        move || async move {
            state
                .with_current_game_mut(|game| {
                    let left = game.charge_timeout(team_id)?;
                    stop_if_running(game, Instant::now())?;
                    info!(game_id = %game.id, %team_id, timeouts_left = left, "timeout called");
                    Ok(left)
                })
                .await
        },
    )
    .await?;

    sse_events::broadcast_game_updated(state).await;
    Ok(TimeoutResponse {
        team_id,
        timeouts_left,
    })
}

pub async fn end_timeout(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(state, GameEvent::EndTimeout, move || async move { Ok(()) })
        .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

/// What ending `period` leads to.
fn period_end_event(game: &GameSession) -> GameEvent {
    let period = game.clock.period();
    let rules = &game.rules;
    if period < rules.periods {
        if period == rules.halftime_after() {
            GameEvent::EndPeriod(BreakKind::Halftime)
        } else {
            GameEvent::EndPeriod(BreakKind::Quarter)
        }
    } else if game.points(game.home.id) != game.points(game.away.id) {
        GameEvent::EndGame(FinishReason::Regulation)
    } else {
        GameEvent::EndPeriod(BreakKind::BeforeOvertime)
    }
}

/// End the current period. After regulation or an overtime a decided game
/// goes final and a tied one heads to another overtime.
pub async fn end_period(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    ensure_live(state).await?;
    let event = state
        .with_current_game(|game| Ok(period_end_event(game)))
        .await?;

    run_transition_with_broadcast(state, event, move || async move {
        state
            .with_current_game_mut(|game| {
                stop_if_running(game, Instant::now())?;
                if matches!(event, GameEvent::EndGame(_)) {
                    game.status = GameStatus::Final;
                }
                game.touch();
                info!(game_id = %game.id, period = game.clock.period(), ?event, "period ended");
                Ok(())
            })
            .await
    })
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

/// Put a full clock on the next period.
pub async fn start_period(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(state, GameEvent::StartPeriod, move || async move {
        state
            .with_current_game_mut(|game| {
                let period = game.begin_next_period(Instant::now())?;
                info!(game_id = %game.id, period, "period started");
                Ok(())
            })
            .await
    })
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

/// End the game early on the scorer's decision.
pub async fn end_game(state: &SharedState) -> Result<ClockResponse, ServiceError> {
    run_transition_with_broadcast(
        state,
        GameEvent::EndGame(FinishReason::Manual),
        move || async move {
            state
                .with_current_game_mut(|game| {
                    stop_if_running(game, Instant::now())?;
                    game.status = GameStatus::Final;
                    game.touch();
                    info!(game_id = %game.id, "game ended by scorer");
                    Ok(())
                })
                .await
        },
    )
    .await?;

    sse_events::broadcast_game_updated(state).await;
    clock_response(state).await
}

// ---------------------------------------------------------------------------
// Stats and prompts
// ---------------------------------------------------------------------------

pub async fn record_stat(
    state: &SharedState,
    input: StatInput,
) -> Result<PlayOutcomeResponse, ServiceError> {
    ensure_live(state).await?;
    let outcome = state
        .with_current_game_mut(|game| Ok(game.record_stat(input, Instant::now())?))
        .await?;
    debug!(
        stat_type = ?input.stat_type,
        committed = outcome.committed.len(),
        prompt = outcome.prompt.is_some(),
        "stat recorded"
    );

    sse_events::broadcast_play_recorded(state, &outcome);
    publish(state).await;
    Ok(PlayOutcomeResponse::from(&outcome))
}

pub async fn resolve_prompt(
    state: &SharedState,
    prompt_id: PromptId,
    request: ResolvePromptRequest,
) -> Result<PlayOutcomeResponse, ServiceError> {
    ensure_live(state).await?;
    let outcome = state
        .with_current_game_mut(|game| {
            Ok(game.resolve_prompt(prompt_id, request.into(), Instant::now())?)
        })
        .await?;

    sse_events::broadcast_play_recorded(state, &outcome);
    publish(state).await;
    Ok(PlayOutcomeResponse::from(&outcome))
}

pub async fn skip_prompt(
    state: &SharedState,
    prompt_id: PromptId,
) -> Result<PlayOutcomeResponse, ServiceError> {
    ensure_live(state).await?;
    let outcome = state
        .with_current_game_mut(|game| Ok(game.skip_prompt(prompt_id, Instant::now())?))
        .await?;

    sse_events::broadcast_play_recorded(state, &outcome);
    publish(state).await;
    Ok(PlayOutcomeResponse::from(&outcome))
}

/// Abandon the free-throw set being shot.
pub async fn cancel_free_throws(
    state: &SharedState,
) -> Result<CancelFreeThrowsResponse, ServiceError> {
    ensure_live(state).await?;
    let cancelled = state
        .with_current_game_mut(|game| Ok(game.cancel_free_throws()))
        .await?;

    sse_events::broadcast_game_updated(state).await;
    Ok(CancelFreeThrowsResponse {
        cancelled: cancelled.as_ref().map(Into::into),
    })
}

/// Remove the last stat together with what is linked to it. Corrections stay
/// possible once the game is final.
pub async fn undo_last(state: &SharedState) -> Result<UndoResponse, ServiceError> {
    if !matches!(
        state.state_machine_phase().await,
        GamePhase::Live(_) | GamePhase::Final
    ) {
        return Err(ServiceError::InvalidState(
            "undo requires a live or final game".into(),
        ));
    }

    let (game_id, removed) = state
        .with_current_game_mut(|game| Ok((game.id, game.undo_last()?)))
        .await?;
    info!(%game_id, count = removed.len(), "stats undone");

    sse_events::broadcast_stats_undone(
        state,
        game_id,
        removed.iter().map(|event| event.id).collect(),
    );
    publish(state).await;
    Ok(UndoResponse {
        removed: removed.iter().map(Into::into).collect(),
    })
}

// ---------------------------------------------------------------------------
// Roster and possession
// ---------------------------------------------------------------------------

pub async fn substitute(
    state: &SharedState,
    team_id: Uuid,
    player_out: Uuid,
    player_in: Uuid,
) -> Result<SubstitutionResponse, ServiceError> {
    ensure_live(state).await?;
    let substitution = state
        .with_current_game_mut(|game| {
            Ok(game.substitute(team_id, player_out, player_in, Instant::now())?)
        })
        .await?;

    publish(state).await;
    Ok(SubstitutionResponse {
        id: substitution.id,
        team_id: substitution.team_id,
        player_out: substitution.player_out,
        player_in: substitution.player_in,
        period: substitution.position.period,
        clock_remaining_ms: substitution.position.remaining_ms,
    })
}

pub async fn set_possession(
    state: &SharedState,
    team_id: Option<Uuid>,
) -> Result<PossessionResponse, ServiceError> {
    ensure_live(state).await?;
    state
        .with_current_game_mut(|game| Ok(game.set_possession(team_id, Instant::now())?))
        .await?;

    publish(state).await;
    Ok(PossessionResponse { team_id })
}
