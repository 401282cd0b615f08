use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// High-level phases of the game being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No game is loaded; games can be created and managed.
    Idle,
    /// A game is loaded but has not tipped off.
    Scheduled,
    /// The game is being played.
    Live(LivePhase),
    /// The game is over; the final box score is frozen.
    Final,
}

/// Fine-grained phase while the game is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    /// Game clock is running.
    ClockRunning,
    /// Game clock is stopped during a period.
    ClockStopped(StopReason),
    /// A team called a timeout.
    Timeout {
        /// Team that called the timeout.
        team_id: Uuid,
    },
    /// Between two periods.
    PeriodBreak(BreakKind),
}

/// Why the game clock is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A new period is about to begin.
    PeriodStart,
    /// Official stopped play (foul, violation, ball out of bounds).
    Whistle,
    /// The clock reached zero and the period must be closed.
    PeriodExpired,
    /// Play resumes after a timeout.
    AfterTimeout,
    /// A game already in progress was reloaded.
    Resumed,
}

/// Kind of break between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Between two regular quarters.
    Quarter,
    /// Half of the regulation periods are played.
    Halftime,
    /// Regulation or an overtime ended tied.
    BeforeOvertime,
}

/// Stored status of a game when it gets loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadedStatus {
    /// Game has not started yet.
    Scheduled,
    /// Game was interrupted while live.
    InProgress,
    /// Game is over.
    Final,
}

/// Indicates why the game went final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Last period ended with a winner.
    Regulation,
    /// Scorer ended the game early (forfeit, abandonment).
    Manual,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A stored game is loaded for tracking.
    Load(LoadedStatus),
    /// The loaded game is released.
    Unload,
    /// Jump ball; the clock starts.
    TipOff,
    /// Resume the game clock.
    StartClock,
    /// Stop the game clock.
    StopClock(StopReason),
    /// A team calls a timeout.
    CallTimeout {
        /// Team calling the timeout.
        team_id: Uuid,
    },
    /// The timeout is over.
    EndTimeout,
    /// Close the current period.
    EndPeriod(BreakKind),
    /// Begin the next period.
    StartPeriod,
    /// The game is over.
    EndGame(FinishReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: GamePhase,
        /// Current phase.
        actual: GamePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: GamePhase,
    /// Phase the state machine will transition to.
    pub to: GamePhase,
    /// Event that triggered this transition.
    pub event: GameEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: GamePhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<GamePhase>,
}

/// State machine driving the live tracking flow of one game.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Whether stats can be recorded in the current phase.
    pub fn accepts_stats(&self) -> bool {
        matches!(self.phase, GamePhase::Live(_))
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        use GameEvent as E;
        use LivePhase as L;

        let next = match (self.phase, event) {
            (GamePhase::Idle, E::Load(LoadedStatus::Scheduled)) => GamePhase::Scheduled,
            (GamePhase::Idle, E::Load(LoadedStatus::InProgress)) => {
                GamePhase::Live(L::ClockStopped(StopReason::Resumed))
            }
            (GamePhase::Idle, E::Load(LoadedStatus::Final)) => GamePhase::Final,
            (GamePhase::Scheduled | GamePhase::Final, E::Unload) => GamePhase::Idle,
            (GamePhase::Scheduled, E::TipOff) => GamePhase::Live(L::ClockRunning),
            (GamePhase::Live(L::ClockStopped(_)), E::StartClock) => {
                GamePhase::Live(L::ClockRunning)
            }
            (GamePhase::Live(L::ClockRunning), E::StopClock(reason)) => {
                GamePhase::Live(L::ClockStopped(reason))
            }
            (
                GamePhase::Live(L::ClockRunning | L::ClockStopped(_)),
                E::CallTimeout { team_id },
            ) => GamePhase::Live(L::Timeout { team_id }),
            (GamePhase::Live(L::Timeout { .. }), E::EndTimeout) => {
                GamePhase::Live(L::ClockStopped(StopReason::AfterTimeout))
            }
            (GamePhase::Live(L::ClockRunning | L::ClockStopped(_)), E::EndPeriod(kind)) => {
                GamePhase::Live(L::PeriodBreak(kind))
            }
            (GamePhase::Live(L::PeriodBreak(_)), E::StartPeriod) => {
                GamePhase::Live(L::ClockStopped(StopReason::PeriodStart))
            }
            (GamePhase::Live(_), E::EndGame(_)) => GamePhase::Final,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Idle);
        assert!(!sm.accepts_stats());
    }

    #[test]
    fn full_game_flow() {
        let mut sm = GameStateMachine::new();

        assert_eq!(
            apply(&mut sm, GameEvent::Load(LoadedStatus::Scheduled)),
            GamePhase::Scheduled
        );
        assert_eq!(
            apply(&mut sm, GameEvent::TipOff),
            GamePhase::Live(LivePhase::ClockRunning)
        );
        assert!(sm.accepts_stats());
        assert_eq!(
            apply(&mut sm, GameEvent::StopClock(StopReason::Whistle)),
            GamePhase::Live(LivePhase::ClockStopped(StopReason::Whistle))
        );
        assert_eq!(
            apply(&mut sm, GameEvent::StartClock),
            GamePhase::Live(LivePhase::ClockRunning)
        );
        assert_eq!(
            apply(&mut sm, GameEvent::EndPeriod(BreakKind::Halftime)),
            GamePhase::Live(LivePhase::PeriodBreak(BreakKind::Halftime))
        );
        assert_eq!(
            apply(&mut sm, GameEvent::StartPeriod),
            GamePhase::Live(LivePhase::ClockStopped(StopReason::PeriodStart))
        );
        assert_eq!(
            apply(&mut sm, GameEvent::EndGame(FinishReason::Regulation)),
            GamePhase::Final
        );
        assert_eq!(apply(&mut sm, GameEvent::Unload), GamePhase::Idle);
        assert_eq!(sm.snapshot().version, 8);
    }

    #[test]
    fn timeout_resumes_with_stopped_clock() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Load(LoadedStatus::Scheduled));
        apply(&mut sm, GameEvent::TipOff);

        let team_id = Uuid::new_v4();
        assert_eq!(
            apply(&mut sm, GameEvent::CallTimeout { team_id }),
            GamePhase::Live(LivePhase::Timeout { team_id })
        );
        assert!(sm.plan(GameEvent::StartClock).is_err());
        assert_eq!(
            apply(&mut sm, GameEvent::EndTimeout),
            GamePhase::Live(LivePhase::ClockStopped(StopReason::AfterTimeout))
        );
    }

    #[test]
    fn loading_in_progress_game_resumes_stopped() {
        let mut sm = GameStateMachine::new();
        assert_eq!(
            apply(&mut sm, GameEvent::Load(LoadedStatus::InProgress)),
            GamePhase::Live(LivePhase::ClockStopped(StopReason::Resumed))
        );

        let err = sm.plan(GameEvent::Unload).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn clock_cannot_stop_twice() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Load(LoadedStatus::InProgress));

        let err = sm
            .plan(GameEvent::StopClock(StopReason::Whistle))
            .unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(
                    invalid.from,
                    GamePhase::Live(LivePhase::ClockStopped(StopReason::Resumed))
                );
                assert_eq!(invalid.event, GameEvent::StopClock(StopReason::Whistle));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn only_one_plan_can_be_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::Load(LoadedStatus::Final)).unwrap();
        assert_eq!(
            sm.plan(GameEvent::Load(LoadedStatus::Final)).unwrap_err(),
            PlanError::AlreadyPending
        );
        assert_eq!(sm.snapshot().pending, Some(GamePhase::Final));

        let wrong = Uuid::new_v4();
        assert_eq!(
            sm.apply(wrong).unwrap_err(),
            ApplyError::IdMismatch {
                expected: plan.id,
                got: wrong
            }
        );
        assert_eq!(sm.apply(plan.id).unwrap(), GamePhase::Final);
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::Load(LoadedStatus::Scheduled)).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), GamePhase::Idle);
        assert_eq!(sm.abort(plan.id).unwrap_err(), AbortError::NoPending);
    }
}
