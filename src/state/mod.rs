pub mod clock;
pub mod game;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, storage::StorageResult},
    error::ServiceError,
    state::{
        game::{GameSession, PendingWrites},
        state_machine::GamePhase,
    },
};

pub use self::sse::{ScorerSeat, SeatCheck, SseHub};
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::{
    sse::SseState,
    state_machine::{GameEvent, GameStateMachine},
};

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: storage handle, SSE hubs, state machine and the tracked game.
pub struct AppState {
    config: AppConfig,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sse: SseState,
    game: RwLock<GameStateMachine>,
    current_game: RwLock<Option<GameSession>>,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    persist_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            game_store: RwLock::new(None),
            sse: SseState::new(64, 64),
            game: RwLock::new(GameStateMachine::new()),
            current_game: RwLock::new(None),
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
            persist_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Game store or a degraded-mode error.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse.public
    }

    /// Broadcast hub used for the scorer SSE stream.
    pub fn scorer_sse(&self) -> &SseHub {
        &self.sse.scorer
    }

    /// Seat of the single scorer allowed to drive the game.
    pub fn scorer_seat(&self) -> &ScorerSeat {
        &self.sse.seat
    }

    /// Snapshot the current phase of the shared game state machine.
    pub async fn state_machine_phase(&self) -> GamePhase {
        self.game.read().await.phase()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.game.read().await;
        sm.snapshot()
    }

    /// Currently tracked game session.
    pub fn current_game(&self) -> &RwLock<Option<GameSession>> {
        &self.current_game
    }

    /// Read the current game slot, loaded or not.
    pub async fn read_current_game<F, T>(&self, f: F) -> T
    where
        F: FnOnce(Option<&GameSession>) -> T,
    {
        let guard = self.current_game.read().await;
        f(guard.as_ref())
    }

    /// Borrow the loaded game or fail with an invalid-state error.
    pub async fn with_current_game<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&GameSession) -> Result<T, ServiceError>,
    {
        let guard = self.current_game.read().await;
        let game = guard
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidState("no game is loaded".into()))?;
        f(game)
    }

    /// Mutably borrow the loaded game or fail with an invalid-state error.
    pub async fn with_current_game_mut<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut GameSession) -> Result<T, ServiceError>,
    {
        let mut guard = self.current_game.write().await;
        let game = guard
            .as_mut()
            .ok_or_else(|| ServiceError::InvalidState("no game is loaded".into()))?;
        f(game)
    }

    /// Replace or clear the current game slot.
    pub async fn with_current_game_slot_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Option<GameSession>) -> T,
    {
        let mut guard = self.current_game.write().await;
        f(&mut guard)
    }

    /// Write pending changes of the current game, keeping them queued on failure.
    pub async fn persist_current_game(&self) {
        match self.flush_outbox().await {
            Ok(0) => {}
            Ok(count) => debug!(count, "persisted game changes"),
            Err(ServiceError::Degraded) => {
                debug!("storage unavailable; game changes kept in outbox")
            }
            Err(err) => warn!(error = %err, "failed to persist game; changes kept for retry"),
        }
    }

    /// Write every pending change of the current game. Returns the number of writes.
    pub async fn flush_outbox(&self) -> Result<usize, ServiceError> {
        let _gate = self.persist_gate.lock().await;
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        let store = self.require_game_store().await?;

        let (game_id, writes) = {
            let mut guard = self.current_game.write().await;
            match guard.as_mut() {
                Some(game) if game.has_pending_writes() => {
                    (game.id, game.take_pending_writes(Instant::now()))
                }
                _ => return Ok(0),
            }
        };

        let count = write_count(&writes);
        match write_pending(store.as_ref(), game_id, &writes).await {
            Ok(()) => Ok(count),
            Err(err) => {
                let mut guard = self.current_game.write().await;
                match guard.as_mut() {
                    Some(game) if game.id == game_id => game.restore_pending_writes(writes),
                    _ => warn!(%game_id, "dropping unsaved changes of an unloaded game"),
                }
                Err(err.into())
            }
        }
    }

    /// Plan a transition to the shared game state machine, returning the plan.
    async fn plan_transition(&self, event: GameEvent) -> Result<Plan, PlanError> {
        let mut sm = self.game.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition to the shared game state machine, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let mut sm = self.game.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the shared game state machine
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.game.write().await;
        sm.abort(plan_id)
    }

    /// Plan `event`, run `work`, then apply the plan, or abort it when the work fails or times out.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: GameEvent,
        work: F,
    ) -> Result<(T, GamePhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

fn write_count(writes: &PendingWrites) -> usize {
    usize::from(writes.game.is_some())
        + writes.stats.len()
        + writes.deleted_stats.len()
        + writes.substitutions.len()
}

async fn write_pending(
    store: &dyn GameStore,
    game_id: Uuid,
    writes: &PendingWrites,
) -> StorageResult<()> {
    if let Some(game) = &writes.game {
        store.save_game(game.clone()).await?;
    }
    if !writes.stats.is_empty() {
        store.append_stats(writes.stats.clone()).await?;
    }
    if !writes.deleted_stats.is_empty() {
        store
            .delete_stats(game_id, writes.deleted_stats.clone())
            .await?;
    }
    for substitution in &writes.substitutions {
        store.save_substitution(substitution.clone()).await?;
    }
    Ok(())
}
