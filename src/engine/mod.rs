//! Play sequencing: links related stat events into basketball plays.
//!
//! The engine is a pure, synchronous rules table. It never persists anything;
//! the game session feeds it one event at a time and applies the returned
//! [`PlayOutcome`].

pub mod box_score;
pub mod free_throws;
pub mod prompt;
pub mod sequencer;
pub mod stat;

use thiserror::Error;
use uuid::Uuid;

pub use self::box_score::{BoxScore, StatLine, TeamBox};
pub use self::free_throws::{FreeThrowSequence, PossessionAfter};
pub use self::prompt::{Prompt, PromptId, PromptKind, PromptResolution};
pub use self::sequencer::PlayEngine;
pub use self::stat::{ClockPosition, StatEvent, StatModifier, StatType};

/// Knobs of the sequencing rules that vary between rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencingRules {
    pub prompt_assists: bool,
    pub prompt_rebounds: bool,
    pub bonus_free_throws: u8,
    pub technical_free_throws: u8,
    pub flagrant_free_throws: u8,
}

impl Default for SequencingRules {
    fn default() -> Self {
        Self {
            prompt_assists: true,
            prompt_rebounds: true,
            bonus_free_throws: 2,
            technical_free_throws: 1,
            flagrant_free_throws: 2,
        }
    }
}

/// Game facts the engine needs but does not own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayContext {
    /// Team holding the ball before the event.
    pub possession: Option<Uuid>,
    /// Whether the team committing a foul has reached the bonus, this foul included.
    pub fouling_team_in_bonus: bool,
    /// Free throws to award instead of the computed count.
    pub free_throw_override: Option<u8>,
}

/// Everything that came out of feeding one input to the engine.
#[derive(Debug, Clone, Default)]
pub struct PlayOutcome {
    /// Events to append to the stat log, in order.
    pub committed: Vec<StatEvent>,
    /// Prompts settled by their skip policy while handling the input.
    pub skipped: Vec<PromptId>,
    /// Newly opened prompt, if any.
    pub prompt: Option<Prompt>,
    /// Team that now holds the ball, when it changed.
    pub possession: Option<Uuid>,
    /// Active free-throw set after the input.
    pub free_throws: Option<FreeThrowSequence>,
}

impl PlayOutcome {
    fn absorb(&mut self, other: PlayOutcome) {
        self.committed.extend(other.committed);
        self.skipped.extend(other.skipped);
        if other.prompt.is_some() {
            self.prompt = other.prompt;
        }
        if other.possession.is_some() {
            self.possession = other.possession;
        }
    }
}

/// Rejections raised by the play engine. They never alter engine state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("modifier {modifier:?} is not valid for {stat_type:?}")]
    InvalidModifier {
        stat_type: StatType,
        modifier: Option<StatModifier>,
    },
    #[error("team `{0}` does not play in this game")]
    UnknownTeam(Uuid),
    #[error("{remaining} free throw(s) still pending")]
    FreeThrowsPending { remaining: u8 },
    #[error("free throws belong to team `{expected}`, got `{got}`")]
    WrongShootingTeam { expected: Uuid, got: Uuid },
    #[error("free throws are being shot by `{expected}`, got `{got}`")]
    WrongShooter { expected: Uuid, got: Uuid },
    #[error("no prompt is pending")]
    NoPendingPrompt,
    #[error("pending prompt is `{expected}`, got `{got}`")]
    PromptMismatch { expected: PromptId, got: PromptId },
    #[error("a team is required to resolve this prompt")]
    MissingTeam,
    #[error("a shooter cannot assist their own basket")]
    AssistByShooter,
}
