use uuid::Uuid;

use crate::engine::{EngineError, stat::StatEvent};

/// Who gets the ball once a free-throw set is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PossessionAfter {
    /// Ball is live after the last attempt: a make hands the ball to the
    /// opponent, a miss goes to the rebound.
    LiveBall,
    /// The given team inbounds after the last attempt, made or missed.
    Retain(Uuid),
}

/// A set of free throws owed to one team after a foul.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeThrowSequence {
    /// Shared by the foul and every attempt of the set.
    pub sequence_id: Uuid,
    pub foul_id: Uuid,
    pub shooting_team: Uuid,
    /// Bound by the first attempt.
    pub shooter: Option<Uuid>,
    pub owed: u8,
    pub attempted: u8,
    pub made: u8,
    pub after: PossessionAfter,
}

/// Result of feeding one attempt into a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// More attempts are owed.
    Continue,
    /// The set is over; `last_made` tells how the final attempt went.
    Complete { last_made: bool },
}

impl FreeThrowSequence {
    pub fn new(
        sequence_id: Uuid,
        foul_id: Uuid,
        shooting_team: Uuid,
        owed: u8,
        after: PossessionAfter,
    ) -> Self {
        Self {
            sequence_id,
            foul_id,
            shooting_team,
            shooter: None,
            owed,
            attempted: 0,
            made: 0,
            after,
        }
    }

    pub fn remaining(&self) -> u8 {
        self.owed.saturating_sub(self.attempted)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Check that `event` may be the next attempt of this set without recording it.
    pub fn check(&self, event: &StatEvent) -> Result<(), EngineError> {
        if event.team_id != self.shooting_team {
            return Err(EngineError::WrongShootingTeam {
                expected: self.shooting_team,
                got: event.team_id,
            });
        }

        if let (Some(expected), Some(got)) = (self.shooter, event.player_id) {
            if expected != got {
                return Err(EngineError::WrongShooter { expected, got });
            }
        }

        Ok(())
    }

    /// Record an attempt, tagging the event with the set's sequence and foul.
    pub fn record(&mut self, event: &mut StatEvent) -> Result<AttemptOutcome, EngineError> {
        self.check(event)?;

        if self.shooter.is_none() {
            self.shooter = event.player_id;
        }
        event.sequence_id = Some(self.sequence_id);
        event.linked_event_id = Some(self.foul_id);

        self.attempted += 1;
        let made = event.is_made();
        if made {
            self.made += 1;
        }

        if self.is_complete() {
            Ok(AttemptOutcome::Complete { last_made: made })
        } else {
            Ok(AttemptOutcome::Continue)
        }
    }
}
