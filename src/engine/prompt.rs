use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::stat::StatEvent;

/// Unique identifier for a follow-up prompt.
pub type PromptId = Uuid;

/// What the scorer is asked for after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Who passed to the shooter of a made field goal.
    Assist,
    /// Who recovered a missed shot (either team).
    Rebound,
    /// Who lost the ball on a steal.
    TurnoverBy,
}

/// How a prompt is settled when the scorer skips it or moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Drop the provisional event.
    Discard,
    /// Keep the provisional event without a player.
    CommitUnattributed,
}

/// Follow-up question emitted by the play engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub id: PromptId,
    pub kind: PromptKind,
    /// Event that triggered the prompt.
    pub trigger_event_id: Uuid,
    /// Team of the triggering event.
    pub trigger_team_id: Uuid,
    /// Team the answer must come from, `None` when either team may answer.
    pub team_id: Option<Uuid>,
    /// Player who cannot be the answer (the shooter for assists).
    pub excluded_player_id: Option<Uuid>,
}

/// Answer to a pending prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptResolution {
    pub player_id: Option<Uuid>,
    /// Required for rebounds, ignored when the prompt is bound to a team.
    pub team_id: Option<Uuid>,
}

/// Prompt kept inside the engine together with its provisional linked event.
#[derive(Debug, Clone)]
pub(crate) struct PendingPrompt {
    pub prompt: Prompt,
    pub provisional: StatEvent,
    pub on_skip: SkipPolicy,
}

impl PendingPrompt {
    pub fn new(kind: PromptKind, trigger: &StatEvent, provisional: StatEvent) -> Self {
        let (team_id, excluded_player_id, on_skip) = match kind {
            PromptKind::Assist => (
                Some(trigger.team_id),
                trigger.player_id,
                SkipPolicy::Discard,
            ),
            PromptKind::Rebound => (None, None, SkipPolicy::Discard),
            PromptKind::TurnoverBy => (
                Some(provisional.team_id),
                None,
                SkipPolicy::CommitUnattributed,
            ),
        };

        Self {
            prompt: Prompt {
                id: Uuid::new_v4(),
                kind,
                trigger_event_id: trigger.id,
                trigger_team_id: trigger.team_id,
                team_id,
                excluded_player_id,
            },
            provisional,
            on_skip,
        }
    }
}
