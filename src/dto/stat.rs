use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    engine::{
        FreeThrowSequence, PlayOutcome, PossessionAfter, Prompt, PromptKind, PromptResolution,
        StatEvent, StatModifier, StatType,
    },
    state::game::StatInput,
};

/// Most free throws a single foul can award.
const MAX_FREE_THROWS: u8 = 3;

/// Stat recorded by the scorer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordStatRequest {
    pub team_id: Uuid,
    /// Omitted for team stats.
    #[serde(default)]
    pub player_id: Option<Uuid>,
    pub stat_type: StatType,
    #[serde(default)]
    pub modifier: Option<StatModifier>,
    /// Free throws to award for a foul instead of the computed count.
    #[serde(default)]
    #[validate(range(max = MAX_FREE_THROWS))]
    pub free_throws: Option<u8>,
}

impl From<RecordStatRequest> for StatInput {
    fn from(value: RecordStatRequest) -> Self {
        StatInput {
            team_id: value.team_id,
            player_id: value.player_id,
            stat_type: value.stat_type,
            modifier: value.modifier,
            free_throw_override: value.free_throws,
        }
    }
}

/// Answer to a pending prompt.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ResolvePromptRequest {
    #[serde(default)]
    pub player_id: Option<Uuid>,
    /// Required for rebound prompts.
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

impl From<ResolvePromptRequest> for PromptResolution {
    fn from(value: ResolvePromptRequest) -> Self {
        PromptResolution {
            player_id: value.player_id,
            team_id: value.team_id,
        }
    }
}

/// Stat event as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatEventDto {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_id: Option<Uuid>,
    pub stat_type: StatType,
    pub modifier: Option<StatModifier>,
    pub period: u8,
    pub clock_remaining_ms: u32,
    pub recorded_at: String,
    pub sequence_id: Option<Uuid>,
    pub linked_event_id: Option<Uuid>,
}

impl From<&StatEvent> for StatEventDto {
    fn from(event: &StatEvent) -> Self {
        Self {
            id: event.id,
            team_id: event.team_id,
            player_id: event.player_id,
            stat_type: event.stat_type,
            modifier: event.modifier,
            period: event.position.period,
            clock_remaining_ms: event.position.remaining_ms,
            recorded_at: format_system_time(event.recorded_at),
            sequence_id: event.sequence_id,
            linked_event_id: event.linked_event_id,
        }
    }
}

/// Follow-up question asked to the scorer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PromptDto {
    pub id: Uuid,
    pub kind: PromptKind,
    pub trigger_event_id: Uuid,
    pub trigger_team_id: Uuid,
    /// Team the answer must come from, when fixed.
    pub team_id: Option<Uuid>,
    /// Player that cannot be picked.
    pub excluded_player_id: Option<Uuid>,
}

impl From<&Prompt> for PromptDto {
    fn from(prompt: &Prompt) -> Self {
        Self {
            id: prompt.id,
            kind: prompt.kind,
            trigger_event_id: prompt.trigger_event_id,
            trigger_team_id: prompt.trigger_team_id,
            team_id: prompt.team_id,
            excluded_player_id: prompt.excluded_player_id,
        }
    }
}

/// Free-throw set being shot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FreeThrowDto {
    pub sequence_id: Uuid,
    pub foul_id: Uuid,
    pub shooting_team_id: Uuid,
    pub shooter_id: Option<Uuid>,
    pub owed: u8,
    pub attempted: u8,
    pub made: u8,
    pub remaining: u8,
    /// Team that keeps the ball after the last shot; absent on a live ball.
    pub retained_by: Option<Uuid>,
}

impl From<&FreeThrowSequence> for FreeThrowDto {
    fn from(set: &FreeThrowSequence) -> Self {
        Self {
            sequence_id: set.sequence_id,
            foul_id: set.foul_id,
            shooting_team_id: set.shooting_team,
            shooter_id: set.shooter,
            owed: set.owed,
            attempted: set.attempted,
            made: set.made,
            remaining: set.remaining(),
            retained_by: match set.after {
                PossessionAfter::LiveBall => None,
                PossessionAfter::Retain(team) => Some(team),
            },
        }
    }
}

/// Result of recording a stat or answering a prompt.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayOutcomeResponse {
    pub committed: Vec<StatEventDto>,
    pub skipped_prompts: Vec<Uuid>,
    pub prompt: Option<PromptDto>,
    /// Team that now holds the ball, when it changed.
    pub possession: Option<Uuid>,
    pub free_throws: Option<FreeThrowDto>,
}

impl From<&PlayOutcome> for PlayOutcomeResponse {
    fn from(outcome: &PlayOutcome) -> Self {
        Self {
            committed: outcome.committed.iter().map(Into::into).collect(),
            skipped_prompts: outcome.skipped.clone(),
            prompt: outcome.prompt.as_ref().map(Into::into),
            possession: outcome.possession,
            free_throws: outcome.free_throws.as_ref().map(Into::into),
        }
    }
}

/// Events removed by an undo.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UndoResponse {
    pub removed: Vec<StatEventDto>,
}

/// Free-throw set abandoned by the scorer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CancelFreeThrowsResponse {
    pub cancelled: Option<FreeThrowDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn more_than_three_free_throws_fail_validation() {
        let req: RecordStatRequest = serde_json::from_value(serde_json::json!({
            "team_id": Uuid::new_v4(),
            "stat_type": "foul",
            "modifier": "personal",
            "free_throws": 4
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn team_stat_needs_no_player() {
        let req: RecordStatRequest = serde_json::from_value(serde_json::json!({
            "team_id": Uuid::new_v4(),
            "stat_type": "turnover"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        let input = StatInput::from(req);
        assert_eq!(input.player_id, None);
        assert_eq!(input.stat_type, StatType::Turnover);
    }
}
