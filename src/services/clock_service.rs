use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    dto::{common::ClockSnapshot, sse::ShotClockExpiredEvent},
    services::{sse_events, tracking_service},
    state::{
        SharedState,
        state_machine::{GamePhase, LivePhase, StopReason},
    },
};

/// Period between two clock broadcasts.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Remembers whether the current shot clock expiry was already announced.
#[derive(Debug, Default)]
pub struct ShotClockWatch {
    announced: bool,
}

/// Broadcast the running clock every second, stopping it when the period runs out.
pub async fn run(state: SharedState) {
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut watch = ShotClockWatch::default();
    info!("clock ticker started");

    loop {
        ticker.tick().await;
        tick(&state, &mut watch).await;
    }
}

/// One ticker step.
pub async fn tick(state: &SharedState, watch: &mut ShotClockWatch) {
    if !matches!(
        state.state_machine_phase().await,
        GamePhase::Live(LivePhase::ClockRunning)
    ) {
        return;
    }

    let now = Instant::now();
    let reading = state
        .read_current_game(|game| {
            game.map(|game| {
                (
                    game.id,
                    ClockSnapshot::read(&game.clock, now),
                    game.possession,
                )
            })
        })
        .await;
    let Some((game_id, clock, possession)) = reading else {
        return;
    };

    match clock.shot_clock_ms {
        Some(0) if !watch.announced => {
            watch.announced = true;
            debug!(%game_id, period = clock.period, "shot clock expired");
            sse_events::broadcast_shot_clock_expired(
                state,
                ShotClockExpiredEvent {
                    game_id,
                    period: clock.period,
                    clock_remaining_ms: clock.remaining_ms,
                    possession,
                },
            );
        }
        Some(0) => {}
        _ => watch.announced = false,
    }

    if clock.remaining_ms == 0 {
        match tracking_service::stop_clock_with(state, StopReason::PeriodExpired).await {
            Ok(_) => info!(%game_id, period = clock.period, "period clock expired"),
            Err(err) => warn!(%game_id, error = %err, "failed to stop expired clock"),
        }
    } else {
        sse_events::broadcast_clock_tick(state, game_id, clock);
    }
}
