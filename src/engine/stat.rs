use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::EngineError;

/// Kind of basketball occurrence captured by a stat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    /// Two point field goal attempt.
    TwoPoint,
    /// Three point field goal attempt.
    ThreePoint,
    /// Free throw attempt.
    FreeThrow,
    /// Ball recovered after a missed shot.
    Rebound,
    /// Pass leading directly to a made field goal.
    Assist,
    /// Ball taken from the opponent.
    Steal,
    /// Blocked field goal attempt.
    Block,
    /// Possession lost without a shot.
    Turnover,
    /// Any foul; the modifier tells which one.
    Foul,
}

/// Qualifier attached to a stat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatModifier {
    Made,
    Missed,
    Offensive,
    Defensive,
    Personal,
    Shooting,
    Technical,
    Flagrant,
}

const SHOT_MODIFIERS: &[StatModifier] = &[StatModifier::Made, StatModifier::Missed];
const REBOUND_MODIFIERS: &[StatModifier] = &[StatModifier::Offensive, StatModifier::Defensive];
const FOUL_MODIFIERS: &[StatModifier] = &[
    StatModifier::Personal,
    StatModifier::Shooting,
    StatModifier::Offensive,
    StatModifier::Technical,
    StatModifier::Flagrant,
];

impl StatType {
    /// Modifiers accepted for this stat type.
    pub fn allowed_modifiers(self) -> &'static [StatModifier] {
        match self {
            StatType::TwoPoint | StatType::ThreePoint | StatType::FreeThrow => SHOT_MODIFIERS,
            StatType::Rebound => REBOUND_MODIFIERS,
            StatType::Foul => FOUL_MODIFIERS,
            StatType::Assist | StatType::Steal | StatType::Block | StatType::Turnover => &[],
        }
    }

    /// Whether an event of this type is meaningless without a modifier.
    pub fn requires_modifier(self) -> bool {
        matches!(
            self,
            StatType::TwoPoint | StatType::ThreePoint | StatType::FreeThrow | StatType::Foul
        )
    }

    /// Points awarded when the shot is made, `None` for non-shooting stats.
    pub fn shot_value(self) -> Option<u8> {
        match self {
            StatType::TwoPoint => Some(2),
            StatType::ThreePoint => Some(3),
            StatType::FreeThrow => Some(1),
            _ => None,
        }
    }

    /// True for two and three point attempts.
    pub fn is_field_goal(self) -> bool {
        matches!(self, StatType::TwoPoint | StatType::ThreePoint)
    }
}

/// Period and game clock reading at which something happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClockPosition {
    /// 1-based period number; overtime periods follow the regulation ones.
    pub period: u8,
    /// Game clock remaining in the period, in milliseconds.
    pub remaining_ms: u32,
}

/// A single recorded basketball occurrence tied to a game clock position.
#[derive(Debug, Clone, PartialEq)]
pub struct StatEvent {
    pub id: Uuid,
    pub team_id: Uuid,
    /// Missing for team stats (team rebound, unattributed turnover).
    pub player_id: Option<Uuid>,
    pub stat_type: StatType,
    pub modifier: Option<StatModifier>,
    pub position: ClockPosition,
    pub recorded_at: SystemTime,
    /// Groups every event that belongs to the same play.
    pub sequence_id: Option<Uuid>,
    /// Event this one was generated from or attached to.
    pub linked_event_id: Option<Uuid>,
}

impl StatEvent {
    /// Build a fresh, unlinked event.
    pub fn new(
        team_id: Uuid,
        player_id: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
        position: ClockPosition,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            player_id,
            stat_type,
            modifier,
            position,
            recorded_at: SystemTime::now(),
            sequence_id: None,
            linked_event_id: None,
        }
    }

    /// Build an event derived from `source`, sharing its play sequence and clock position.
    pub fn derived(
        source: &StatEvent,
        team_id: Uuid,
        player_id: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
    ) -> Self {
        let mut event = Self::new(team_id, player_id, stat_type, modifier, source.position);
        event.sequence_id = source.sequence_id;
        event.linked_event_id = Some(source.id);
        event
    }

    /// Reject type/modifier combinations that make no sense.
    pub fn validate(&self) -> Result<(), EngineError> {
        let allowed = self.stat_type.allowed_modifiers();
        let valid = match self.modifier {
            Some(modifier) => allowed.contains(&modifier),
            None => !self.stat_type.requires_modifier(),
        };

        if valid {
            Ok(())
        } else {
            Err(EngineError::InvalidModifier {
                stat_type: self.stat_type,
                modifier: self.modifier,
            })
        }
    }

    pub fn is_made(&self) -> bool {
        self.modifier == Some(StatModifier::Made)
    }

    pub fn is_missed(&self) -> bool {
        self.modifier == Some(StatModifier::Missed)
    }

    pub fn is_made_field_goal(&self) -> bool {
        self.stat_type.is_field_goal() && self.is_made()
    }

    pub fn is_missed_field_goal(&self) -> bool {
        self.stat_type.is_field_goal() && self.is_missed()
    }

    /// The foul kind when this event is a foul.
    pub fn foul_kind(&self) -> Option<StatModifier> {
        match self.stat_type {
            StatType::Foul => self.modifier,
            _ => None,
        }
    }

    /// Points this event puts on the scoreboard.
    pub fn points(&self) -> u32 {
        match self.stat_type.shot_value() {
            Some(value) if self.is_made() => u32::from(value),
            _ => 0,
        }
    }
}
