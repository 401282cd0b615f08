use std::collections::VecDeque;

use tracing::debug;
use uuid::Uuid;

use crate::engine::{
    EngineError, PlayContext, PlayOutcome, SequencingRules,
    free_throws::{AttemptOutcome, FreeThrowSequence, PossessionAfter},
    prompt::{PendingPrompt, Prompt, PromptId, PromptKind, PromptResolution, SkipPolicy},
    stat::{StatEvent, StatModifier, StatType},
};

/// Rules engine that turns single stat events into linked basketball plays.
///
/// State is limited to the play being built: the pending prompt, the queue of
/// owed free-throw sets and the anchor event (trigger of the current play).
#[derive(Debug, Clone)]
pub struct PlayEngine {
    home: Uuid,
    away: Uuid,
    rules: SequencingRules,
    pending: Option<PendingPrompt>,
    free_throws: VecDeque<FreeThrowSequence>,
    anchor: Option<StatEvent>,
}

impl PlayEngine {
    /// Create an engine for a game between `home` and `away`.
    pub fn new(home: Uuid, away: Uuid, rules: SequencingRules) -> Self {
        Self {
            home,
            away,
            rules,
            pending: None,
            free_throws: VecDeque::new(),
            anchor: None,
        }
    }

    pub fn rules(&self) -> SequencingRules {
        self.rules
    }

    /// Prompt waiting for the scorer, if any.
    pub fn pending_prompt(&self) -> Option<&Prompt> {
        self.pending.as_ref().map(|pending| &pending.prompt)
    }

    /// Free-throw set currently being shot.
    pub fn free_throws(&self) -> Option<&FreeThrowSequence> {
        self.free_throws.front()
    }

    /// Number of free-throw sets owed, the active one included.
    pub fn queued_free_throw_sets(&self) -> usize {
        self.free_throws.len()
    }

    /// The other team of the game.
    pub fn opponent_of(&self, team_id: Uuid) -> Result<Uuid, EngineError> {
        if team_id == self.home {
            Ok(self.away)
        } else if team_id == self.away {
            Ok(self.home)
        } else {
            Err(EngineError::UnknownTeam(team_id))
        }
    }

    /// Feed one stat event to the engine.
    pub fn process(
        &mut self,
        mut event: StatEvent,
        context: PlayContext,
    ) -> Result<PlayOutcome, EngineError> {
        event.validate()?;
        let opponent = self.opponent_of(event.team_id)?;
        self.ensure_accepts(&event)?;

        if event.stat_type == StatType::Rebound {
            event.modifier = Some(self.rebound_modifier(&event)?);
        }
        if event.stat_type == StatType::Assist {
            if let Some(shot) = self.made_anchor() {
                if shot.team_id == event.team_id
                    && shot.player_id.is_some()
                    && shot.player_id == event.player_id
                {
                    return Err(EngineError::AssistByShooter);
                }
            }
        }

        debug!(
            event_id = %event.id,
            stat_type = ?event.stat_type,
            modifier = ?event.modifier,
            "sequencing stat event"
        );

        let mut outcome = PlayOutcome::default();
        if let Some(pending) = self.pending.take() {
            if self.preserves(&pending, &event) {
                self.pending = Some(pending);
            } else {
                outcome.absorb(settle_skipped(pending));
            }
        }

        let step = match event.stat_type {
            StatType::TwoPoint | StatType::ThreePoint => self.on_field_goal(event, opponent),
            StatType::FreeThrow => self.on_free_throw(event, opponent)?,
            StatType::Rebound => self.on_rebound(event),
            StatType::Assist => self.on_assist(event),
            StatType::Steal => self.on_steal(event, opponent),
            StatType::Block => self.on_block(event),
            StatType::Turnover => self.on_turnover(event, opponent),
            StatType::Foul => self.on_foul(event, opponent, context),
        };
        outcome.absorb(step);
        outcome.free_throws = self.free_throws.front().cloned();

        Ok(outcome)
    }

    /// Complete the pending prompt with the scorer's answer.
    pub fn resolve_prompt(
        &mut self,
        prompt_id: PromptId,
        resolution: PromptResolution,
    ) -> Result<PlayOutcome, EngineError> {
        let pending = self.pending_matching(prompt_id)?;
        let kind = pending.prompt.kind;
        let rebound_team = match kind {
            PromptKind::Assist => {
                if resolution.player_id.is_some()
                    && resolution.player_id == pending.prompt.excluded_player_id
                {
                    return Err(EngineError::AssistByShooter);
                }
                None
            }
            PromptKind::Rebound => {
                let team = resolution.team_id.ok_or(EngineError::MissingTeam)?;
                self.opponent_of(team)?;
                Some(team)
            }
            PromptKind::TurnoverBy => None,
        };

        let Some(pending) = self.pending.take() else {
            return Err(EngineError::NoPendingPrompt);
        };
        let trigger_team = pending.prompt.trigger_team_id;
        let mut event = pending.provisional;
        let mut outcome = PlayOutcome::default();

        match (kind, rebound_team) {
            (PromptKind::Rebound, Some(team)) => {
                event.team_id = team;
                event.player_id = resolution.player_id;
                event.modifier = Some(if team == trigger_team {
                    StatModifier::Offensive
                } else {
                    StatModifier::Defensive
                });
                outcome.possession = Some(team);
                self.anchor = None;
                outcome.committed.push(event);
            }
            (PromptKind::Assist, _) => match resolution.player_id {
                Some(player) => {
                    event.player_id = Some(player);
                    outcome.committed.push(event);
                }
                None => outcome.skipped.push(prompt_id),
            },
            _ => {
                event.player_id = resolution.player_id;
                outcome.committed.push(event);
            }
        }

        debug!(%prompt_id, ?kind, "prompt resolved");
        outcome.free_throws = self.free_throws.front().cloned();
        Ok(outcome)
    }

    /// Settle the pending prompt without an answer.
    pub fn skip_prompt(&mut self, prompt_id: PromptId) -> Result<PlayOutcome, EngineError> {
        self.pending_matching(prompt_id)?;
        let Some(pending) = self.pending.take() else {
            return Err(EngineError::NoPendingPrompt);
        };

        let mut outcome = settle_skipped(pending);
        outcome.free_throws = self.free_throws.front().cloned();
        Ok(outcome)
    }

    /// Abandon the free-throw set being shot; queued sets move up.
    pub fn cancel_free_throws(&mut self) -> Option<FreeThrowSequence> {
        self.free_throws.pop_front()
    }

    /// Close the play in progress on a dead ball the engine did not see, such as
    /// a new period or a possession set by hand. The pending prompt is settled by
    /// its skip policy; owed free throws stay queued.
    pub fn end_play(&mut self) -> PlayOutcome {
        self.anchor = None;
        let mut outcome = match self.pending.take() {
            Some(pending) => {
                debug!(prompt_id = %pending.prompt.id, "play ended with prompt pending");
                settle_skipped(pending)
            }
            None => PlayOutcome::default(),
        };
        outcome.free_throws = self.free_throws.front().cloned();
        outcome
    }

    /// Forget the play being built.
    pub fn reset(&mut self) {
        self.pending = None;
        self.free_throws.clear();
        self.anchor = None;
    }

    fn assist_pending_for(&self, sequence_id: Uuid) -> bool {
        self.pending.as_ref().is_some_and(|pending| {
            pending.prompt.kind == PromptKind::Assist
                && pending.provisional.sequence_id == Some(sequence_id)
        })
    }

    fn pending_matching(&self, prompt_id: PromptId) -> Result<&PendingPrompt, EngineError> {
        let pending = self.pending.as_ref().ok_or(EngineError::NoPendingPrompt)?;
        if pending.prompt.id != prompt_id {
            return Err(EngineError::PromptMismatch {
                expected: pending.prompt.id,
                got: prompt_id,
            });
        }
        Ok(pending)
    }

    /// While free throws are owed only attempts and fouls that queue more free throws get in.
    fn ensure_accepts(&self, event: &StatEvent) -> Result<(), EngineError> {
        let Some(active) = self.free_throws.front() else {
            return Ok(());
        };

        match (event.stat_type, event.modifier) {
            (StatType::FreeThrow, _) => active.check(event),
            (StatType::Foul, Some(StatModifier::Technical | StatModifier::Flagrant)) => Ok(()),
            _ => Err(EngineError::FreeThrowsPending {
                remaining: active.remaining(),
            }),
        }
    }

    fn rebound_modifier(&self, event: &StatEvent) -> Result<StatModifier, EngineError> {
        if let Some(modifier) = event.modifier {
            return Ok(modifier);
        }

        match self.missed_anchor() {
            Some(shot) if shot.team_id == event.team_id => Ok(StatModifier::Offensive),
            Some(_) => Ok(StatModifier::Defensive),
            None => Err(EngineError::InvalidModifier {
                stat_type: StatType::Rebound,
                modifier: None,
            }),
        }
    }

    fn made_anchor(&self) -> Option<&StatEvent> {
        self.anchor
            .as_ref()
            .filter(|anchor| anchor.is_made_field_goal())
    }

    /// Last missed shot (field goal or free throw) still waiting for a rebound.
    fn missed_anchor(&self) -> Option<&StatEvent> {
        self.anchor
            .as_ref()
            .filter(|anchor| anchor.is_missed() && anchor.stat_type.shot_value().is_some())
    }

    fn preserves(&self, pending: &PendingPrompt, event: &StatEvent) -> bool {
        let trigger_team = pending.prompt.trigger_team_id;
        match pending.prompt.kind {
            PromptKind::Rebound => {
                event.stat_type == StatType::Block && event.team_id != trigger_team
            }
            PromptKind::Assist => {
                let and_one_foul = event.foul_kind() == Some(StatModifier::Shooting)
                    && event.team_id != trigger_team;
                let and_one_attempt = event.stat_type == StatType::FreeThrow
                    && self.free_throws.front().is_some_and(|set| {
                        Some(set.sequence_id) == pending.provisional.sequence_id
                    });
                let and_one_rebound = event.stat_type == StatType::Rebound
                    && self.missed_anchor().is_some_and(|shot| {
                        shot.stat_type == StatType::FreeThrow
                            && shot.sequence_id == pending.provisional.sequence_id
                    });
                and_one_foul || and_one_attempt || and_one_rebound
            }
            PromptKind::TurnoverBy => false,
        }
    }

    /// Open a prompt, settling whichever prompt was still pending.
    fn open(
        &mut self,
        outcome: &mut PlayOutcome,
        kind: PromptKind,
        trigger: &StatEvent,
        provisional: StatEvent,
    ) {
        if let Some(previous) = self.pending.take() {
            outcome.absorb(settle_skipped(previous));
        }

        let pending = PendingPrompt::new(kind, trigger, provisional);
        debug!(prompt_id = %pending.prompt.id, ?kind, trigger = %trigger.id, "prompt opened");
        outcome.prompt = Some(pending.prompt.clone());
        self.pending = Some(pending);
    }

    fn prompt_rebound(&mut self, outcome: &mut PlayOutcome, shot: &StatEvent) {
        if !self.rules.prompt_rebounds {
            return;
        }
        let provisional = StatEvent::derived(shot, shot.team_id, None, StatType::Rebound, None);
        self.open(outcome, PromptKind::Rebound, shot, provisional);
    }

    fn on_field_goal(&mut self, mut event: StatEvent, opponent: Uuid) -> PlayOutcome {
        event.sequence_id.get_or_insert_with(Uuid::new_v4);
        let mut outcome = PlayOutcome::default();

        if event.is_made() {
            outcome.possession = Some(opponent);
            if self.rules.prompt_assists {
                let provisional =
                    StatEvent::derived(&event, event.team_id, None, StatType::Assist, None);
                self.open(&mut outcome, PromptKind::Assist, &event, provisional);
            }
        } else {
            self.prompt_rebound(&mut outcome, &event);
        }

        self.anchor = Some(event.clone());
        outcome.committed.insert(0, event);
        outcome
    }

    fn on_free_throw(
        &mut self,
        mut event: StatEvent,
        opponent: Uuid,
    ) -> Result<PlayOutcome, EngineError> {
        let mut outcome = PlayOutcome::default();

        let Some(active) = self.free_throws.front_mut() else {
            event.sequence_id.get_or_insert_with(Uuid::new_v4);
            self.anchor = Some(event.clone());
            outcome.committed.push(event.clone());
            if event.is_missed() {
                self.prompt_rebound(&mut outcome, &event);
            }
            return Ok(outcome);
        };

        let attempt = active.record(&mut event)?;
        let after = active.after;
        let sequence_id = active.sequence_id;
        self.anchor = Some(event.clone());
        outcome.committed.push(event.clone());

        if let AttemptOutcome::Complete { last_made } = attempt {
            if let Some(done) = self.free_throws.pop_front() {
                debug!(
                    sequence_id = %done.sequence_id,
                    made = done.made,
                    owed = done.owed,
                    "free-throw set complete"
                );
            }
            // Another set is owed: the ball stays dead until it is shot.
            if self.free_throws.is_empty() {
                match after {
                    PossessionAfter::Retain(team) => outcome.possession = Some(team),
                    PossessionAfter::LiveBall if last_made => outcome.possession = Some(opponent),
                    // The open assist question of an and-one outranks the rebound prompt.
                    PossessionAfter::LiveBall if self.assist_pending_for(sequence_id) => {
                        debug!(%sequence_id, "and-one missed; assist prompt kept open");
                    }
                    PossessionAfter::LiveBall => self.prompt_rebound(&mut outcome, &event),
                }
            }
        }

        Ok(outcome)
    }

    fn on_rebound(&mut self, mut event: StatEvent) -> PlayOutcome {
        if let Some(shot) = self.missed_anchor() {
            event.linked_event_id.get_or_insert(shot.id);
            if event.sequence_id.is_none() {
                event.sequence_id = shot.sequence_id;
            }
        }

        self.anchor = None;
        PlayOutcome {
            possession: Some(event.team_id),
            committed: vec![event],
            ..PlayOutcome::default()
        }
    }

    fn on_assist(&mut self, mut event: StatEvent) -> PlayOutcome {
        if let Some(shot) = self.made_anchor() {
            if shot.team_id == event.team_id {
                event.linked_event_id.get_or_insert(shot.id);
                if event.sequence_id.is_none() {
                    event.sequence_id = shot.sequence_id;
                }
            }
        }

        PlayOutcome {
            committed: vec![event],
            ..PlayOutcome::default()
        }
    }

    fn on_steal(&mut self, mut event: StatEvent, opponent: Uuid) -> PlayOutcome {
        event.sequence_id.get_or_insert_with(Uuid::new_v4);
        self.anchor = None;

        let mut outcome = PlayOutcome {
            possession: Some(event.team_id),
            committed: vec![event.clone()],
            ..PlayOutcome::default()
        };
        let provisional = StatEvent::derived(&event, opponent, None, StatType::Turnover, None);
        self.open(&mut outcome, PromptKind::TurnoverBy, &event, provisional);
        outcome
    }

    fn on_block(&mut self, mut event: StatEvent) -> PlayOutcome {
        if let Some(shot) = self.missed_anchor() {
            if shot.stat_type.is_field_goal() && shot.team_id != event.team_id {
                event.linked_event_id.get_or_insert(shot.id);
                if event.sequence_id.is_none() {
                    event.sequence_id = shot.sequence_id;
                }
            }
        }

        PlayOutcome {
            committed: vec![event],
            ..PlayOutcome::default()
        }
    }

    fn on_turnover(&mut self, mut event: StatEvent, opponent: Uuid) -> PlayOutcome {
        event.sequence_id.get_or_insert_with(Uuid::new_v4);
        self.anchor = None;
        PlayOutcome {
            possession: Some(opponent),
            committed: vec![event],
            ..PlayOutcome::default()
        }
    }

    fn on_foul(&mut self, mut event: StatEvent, fouled: Uuid, context: PlayContext) -> PlayOutcome {
        let Some(kind) = event.foul_kind() else {
            return PlayOutcome::default();
        };
        let mut outcome = PlayOutcome::default();

        let (computed, after) = match kind {
            StatModifier::Shooting => {
                let and_one = self
                    .made_anchor()
                    .filter(|shot| shot.team_id == fouled)
                    .cloned();
                let missed = self
                    .missed_anchor()
                    .filter(|shot| shot.stat_type.is_field_goal() && shot.team_id == fouled)
                    .cloned();

                let shots = match (and_one, missed) {
                    (Some(shot), _) => {
                        link_to(&mut event, &shot);
                        1
                    }
                    (None, Some(shot)) => {
                        link_to(&mut event, &shot);
                        shot.stat_type.shot_value().unwrap_or(2)
                    }
                    (None, None) => 2,
                };
                (shots, PossessionAfter::LiveBall)
            }
            StatModifier::Personal if context.fouling_team_in_bonus => {
                (self.rules.bonus_free_throws, PossessionAfter::LiveBall)
            }
            StatModifier::Technical => (
                self.rules.technical_free_throws,
                PossessionAfter::Retain(context.possession.unwrap_or(fouled)),
            ),
            StatModifier::Flagrant => (
                self.rules.flagrant_free_throws,
                PossessionAfter::Retain(fouled),
            ),
            _ => (0, PossessionAfter::LiveBall),
        };

        let owed = match kind {
            StatModifier::Offensive => 0,
            _ => context.free_throw_override.unwrap_or(computed),
        };

        let sequence_id = *event.sequence_id.get_or_insert_with(Uuid::new_v4);
        outcome.committed.push(event.clone());

        if kind == StatModifier::Offensive {
            let turnover =
                StatEvent::derived(&event, event.team_id, event.player_id, StatType::Turnover, None);
            outcome.committed.push(turnover);
            outcome.possession = Some(fouled);
            self.anchor = None;
        } else if owed > 0 {
            debug!(%sequence_id, owed, shooting_team = %fouled, "free throws awarded");
            self.free_throws.push_back(FreeThrowSequence::new(
                sequence_id,
                event.id,
                fouled,
                owed,
                after,
            ));
        } else if kind != StatModifier::Technical {
            outcome.possession = Some(fouled);
        }

        outcome
    }
}

fn link_to(event: &mut StatEvent, source: &StatEvent) {
    event.linked_event_id.get_or_insert(source.id);
    event.sequence_id = source.sequence_id;
}

fn settle_skipped(pending: PendingPrompt) -> PlayOutcome {
    let mut outcome = PlayOutcome {
        skipped: vec![pending.prompt.id],
        ..PlayOutcome::default()
    };
    if pending.on_skip == SkipPolicy::CommitUnattributed {
        outcome.committed.push(pending.provisional);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stat::ClockPosition;

    struct Court {
        home: Uuid,
        away: Uuid,
        engine: PlayEngine,
    }

    impl Court {
        fn new() -> Self {
            Self::with_rules(SequencingRules::default())
        }

        fn with_rules(rules: SequencingRules) -> Self {
            let home = Uuid::new_v4();
            let away = Uuid::new_v4();
            Self {
                home,
                away,
                engine: PlayEngine::new(home, away, rules),
            }
        }

        fn record(
            &mut self,
            team: Uuid,
            player: Option<Uuid>,
            stat_type: StatType,
            modifier: Option<StatModifier>,
        ) -> PlayOutcome {
            self.record_with(team, player, stat_type, modifier, PlayContext::default())
        }

        fn record_with(
            &mut self,
            team: Uuid,
            player: Option<Uuid>,
            stat_type: StatType,
            modifier: Option<StatModifier>,
            context: PlayContext,
        ) -> PlayOutcome {
            self.engine
                .process(event(team, player, stat_type, modifier), context)
                .unwrap()
        }
    }

    fn event(
        team: Uuid,
        player: Option<Uuid>,
        stat_type: StatType,
        modifier: Option<StatModifier>,
    ) -> StatEvent {
        StatEvent::new(
            team,
            player,
            stat_type,
            modifier,
            ClockPosition {
                period: 1,
                remaining_ms: 300_000,
            },
        )
    }

    #[test]
    fn made_shot_prompts_for_assist_and_flips_possession() {
        let mut court = Court::new();
        let shooter = Uuid::new_v4();

        let outcome = court.record(
            court.home,
            Some(shooter),
            StatType::TwoPoint,
            Some(StatModifier::Made),
        );

        assert_eq!(outcome.committed.len(), 1);
        assert_eq!(outcome.possession, Some(court.away));
        let prompt = outcome.prompt.expect("assist prompt");
        assert_eq!(prompt.kind, PromptKind::Assist);
        assert_eq!(prompt.team_id, Some(court.home));
        assert_eq!(prompt.excluded_player_id, Some(shooter));
        assert_eq!(prompt.trigger_event_id, outcome.committed[0].id);
    }

    #[test]
    fn resolving_assist_commits_linked_event() {
        let mut court = Court::new();
        let shooter = Uuid::new_v4();
        let passer = Uuid::new_v4();
        let outcome = court.record(
            court.home,
            Some(shooter),
            StatType::ThreePoint,
            Some(StatModifier::Made),
        );
        let shot = outcome.committed[0].clone();
        let prompt = outcome.prompt.unwrap();

        let resolved = court
            .engine
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: Some(passer),
                    team_id: None,
                },
            )
            .unwrap();

        let assist = &resolved.committed[0];
        assert_eq!(assist.stat_type, StatType::Assist);
        assert_eq!(assist.player_id, Some(passer));
        assert_eq!(assist.team_id, court.home);
        assert_eq!(assist.linked_event_id, Some(shot.id));
        assert_eq!(assist.sequence_id, shot.sequence_id);
        assert!(court.engine.pending_prompt().is_none());
    }

    #[test]
    fn shooter_cannot_assist_and_prompt_survives() {
        let mut court = Court::new();
        let shooter = Uuid::new_v4();
        let prompt = court
            .record(
                court.home,
                Some(shooter),
                StatType::TwoPoint,
                Some(StatModifier::Made),
            )
            .prompt
            .unwrap();

        let err = court
            .engine
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: Some(shooter),
                    team_id: None,
                },
            )
            .unwrap_err();

        assert_eq!(err, EngineError::AssistByShooter);
        assert_eq!(court.engine.pending_prompt().map(|p| p.id), Some(prompt.id));
    }

    #[test]
    fn skipping_assist_discards_it() {
        let mut court = Court::new();
        let prompt = court
            .record(court.home, None, StatType::TwoPoint, Some(StatModifier::Made))
            .prompt
            .unwrap();

        let outcome = court.engine.skip_prompt(prompt.id).unwrap();
        assert!(outcome.committed.is_empty());
        assert_eq!(outcome.skipped, vec![prompt.id]);
    }

    #[test]
    fn missed_shot_rebound_side_decides_modifier() {
        let mut court = Court::new();
        let outcome = court.record(
            court.home,
            None,
            StatType::ThreePoint,
            Some(StatModifier::Missed),
        );
        let prompt = outcome.prompt.unwrap();
        assert_eq!(prompt.kind, PromptKind::Rebound);
        assert_eq!(prompt.team_id, None);
        assert_eq!(outcome.possession, None);

        let resolved = court
            .engine
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: None,
                    team_id: Some(court.home),
                },
            )
            .unwrap();
        assert_eq!(resolved.committed[0].modifier, Some(StatModifier::Offensive));
        assert_eq!(resolved.possession, Some(court.home));

        let prompt = court
            .record(
                court.home,
                None,
                StatType::TwoPoint,
                Some(StatModifier::Missed),
            )
            .prompt
            .unwrap();
        let resolved = court
            .engine
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: Some(Uuid::new_v4()),
                    team_id: Some(court.away),
                },
            )
            .unwrap();
        let rebound = &resolved.committed[0];
        assert_eq!(rebound.modifier, Some(StatModifier::Defensive));
        assert_eq!(rebound.team_id, court.away);
        assert_eq!(resolved.possession, Some(court.away));
    }

    #[test]
    fn rebound_resolution_requires_a_team() {
        let mut court = Court::new();
        let prompt = court
            .record(
                court.home,
                None,
                StatType::TwoPoint,
                Some(StatModifier::Missed),
            )
            .prompt
            .unwrap();

        let err = court
            .engine
            .resolve_prompt(prompt.id, PromptResolution::default())
            .unwrap_err();
        assert_eq!(err, EngineError::MissingTeam);
        assert!(court.engine.pending_prompt().is_some());

        let stranger = Uuid::new_v4();
        let err = court
            .engine
            .resolve_prompt(
                prompt.id,
                PromptResolution {
                    player_id: None,
                    team_id: Some(stranger),
                },
            )
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownTeam(stranger));
    }

    #[test]
    fn steal_generates_turnover_even_when_skipped() {
        let mut court = Court::new();
        let outcome = court.record(court.away, Some(Uuid::new_v4()), StatType::Steal, None);
        let steal = outcome.committed[0].clone();
        assert_eq!(outcome.possession, Some(court.away));
        let prompt = outcome.prompt.unwrap();
        assert_eq!(prompt.kind, PromptKind::TurnoverBy);
        assert_eq!(prompt.team_id, Some(court.home));

        let skipped = court.engine.skip_prompt(prompt.id).unwrap();
        let turnover = &skipped.committed[0];
        assert_eq!(turnover.stat_type, StatType::Turnover);
        assert_eq!(turnover.team_id, court.home);
        assert_eq!(turnover.player_id, None);
        assert_eq!(turnover.linked_event_id, Some(steal.id));
        assert_eq!(turnover.sequence_id, steal.sequence_id);
    }

    #[test]
    fn next_event_settles_pending_prompt() {
        let mut court = Court::new();
        let prompt = court
            .record(court.away, None, StatType::Steal, None)
            .prompt
            .unwrap();

        let outcome = court.record(
            court.away,
            None,
            StatType::TwoPoint,
            Some(StatModifier::Made),
        );
        assert_eq!(outcome.skipped, vec![prompt.id]);
        assert_eq!(outcome.committed[0].stat_type, StatType::Turnover);
        assert_eq!(outcome.committed[1].stat_type, StatType::TwoPoint);
        assert_eq!(outcome.prompt.map(|p| p.kind), Some(PromptKind::Assist));
    }

    #[test]
    fn block_keeps_rebound_prompt_open() {
        let mut court = Court::new();
        let outcome = court.record(
            court.home,
            None,
            StatType::TwoPoint,
            Some(StatModifier::Missed),
        );
        let shot = outcome.committed[0].clone();
        let prompt = outcome.prompt.unwrap();

        let block = court.record(court.away, Some(Uuid::new_v4()), StatType::Block, None);
        assert!(block.skipped.is_empty());
        assert_eq!(block.committed[0].linked_event_id, Some(shot.id));
        assert_eq!(court.engine.pending_prompt().map(|p| p.id), Some(prompt.id));
    }

    #[test]
    fn direct_rebound_derives_modifier_from_missed_shot() {
        let mut court = Court::new();
        court.record(
            court.home,
            None,
            StatType::TwoPoint,
            Some(StatModifier::Missed),
        );
        let outcome = court.record(court.away, None, StatType::Rebound, None);
        let rebound = outcome
            .committed
            .iter()
            .find(|e| e.stat_type == StatType::Rebound)
            .unwrap();
        assert_eq!(rebound.modifier, Some(StatModifier::Defensive));
        assert_eq!(outcome.possession, Some(court.away));

        let err = court
            .engine
            .process(
                event(court.away, None, StatType::Rebound, None),
                PlayContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidModifier { .. }));
    }

    #[test]
    fn and_one_awards_single_free_throw_and_keeps_assist_prompt() {
        let mut court = Court::new();
        let shooter = Uuid::new_v4();
        let outcome = court.record(
            court.home,
            Some(shooter),
            StatType::TwoPoint,
            Some(StatModifier::Made),
        );
        let shot = outcome.committed[0].clone();
        let assist_prompt = outcome.prompt.unwrap();

        let foul = court.record(
            court.away,
            Some(Uuid::new_v4()),
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        assert!(foul.skipped.is_empty());
        assert_eq!(foul.committed[0].linked_event_id, Some(shot.id));
        let set = foul.free_throws.unwrap();
        assert_eq!(set.owed, 1);
        assert_eq!(set.shooting_team, court.home);
        assert_eq!(Some(set.sequence_id), shot.sequence_id);

        let attempt = court.record(
            court.home,
            Some(shooter),
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        assert!(attempt.skipped.is_empty());
        assert_eq!(attempt.possession, Some(court.away));
        assert!(attempt.free_throws.is_none());
        assert_eq!(
            court.engine.pending_prompt().map(|p| p.id),
            Some(assist_prompt.id)
        );
    }

    #[test]
    fn missed_and_one_keeps_assist_prompt_through_the_rebound() {
        let mut court = Court::new();
        let shooter = Uuid::new_v4();
        let passer = Uuid::new_v4();
        let outcome = court.record(
            court.home,
            Some(shooter),
            StatType::TwoPoint,
            Some(StatModifier::Made),
        );
        let shot = outcome.committed[0].clone();
        let assist_prompt = outcome.prompt.unwrap();
        court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );

        let attempt = court.record(
            court.home,
            Some(shooter),
            StatType::FreeThrow,
            Some(StatModifier::Missed),
        );
        assert!(attempt.skipped.is_empty());
        assert!(attempt.prompt.is_none());
        assert_eq!(
            court.engine.pending_prompt().map(|p| p.id),
            Some(assist_prompt.id)
        );

        let rebound = court.record(court.away, None, StatType::Rebound, None);
        assert!(rebound.skipped.is_empty());
        assert_eq!(rebound.committed[0].modifier, Some(StatModifier::Defensive));
        assert_eq!(
            court.engine.pending_prompt().map(|p| p.id),
            Some(assist_prompt.id)
        );

        let resolved = court
            .engine
            .resolve_prompt(
                assist_prompt.id,
                PromptResolution {
                    player_id: Some(passer),
                    team_id: None,
                },
            )
            .unwrap();
        assert_eq!(resolved.committed[0].stat_type, StatType::Assist);
        assert_eq!(resolved.committed[0].linked_event_id, Some(shot.id));
    }

    #[test]
    fn end_play_settles_prompt_and_drops_anchor_but_keeps_free_throws() {
        let mut court = Court::new();
        let prompt = court
            .record(
                court.home,
                Some(Uuid::new_v4()),
                StatType::TwoPoint,
                Some(StatModifier::Made),
            )
            .prompt
            .unwrap();

        let ended = court.engine.end_play();
        assert_eq!(ended.skipped, vec![prompt.id]);
        assert!(ended.committed.is_empty());
        assert!(court.engine.pending_prompt().is_none());

        // No anchor left: the next shooting foul is a fresh two-shot foul.
        let foul = court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        assert_eq!(foul.committed[0].linked_event_id, None);
        assert_eq!(foul.free_throws.as_ref().map(|set| set.owed), Some(2));

        let ended = court.engine.end_play();
        assert!(ended.skipped.is_empty());
        assert_eq!(ended.free_throws.map(|set| set.owed), Some(2));
    }

    #[test]
    fn shooting_foul_on_missed_three_awards_three() {
        let mut court = Court::new();
        court.record(
            court.away,
            None,
            StatType::ThreePoint,
            Some(StatModifier::Missed),
        );
        let foul = court.record(
            court.home,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        assert_eq!(foul.free_throws.unwrap().owed, 3);
        assert_eq!(foul.skipped.len(), 1);
    }

    #[test]
    fn missed_last_free_throw_prompts_rebound() {
        let mut court = Court::new();
        court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        let last = court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Missed),
        );

        let prompt = last.prompt.unwrap();
        assert_eq!(prompt.kind, PromptKind::Rebound);
        assert_eq!(prompt.trigger_event_id, last.committed[0].id);
        assert_eq!(last.possession, None);
    }

    #[test]
    fn pending_free_throws_block_other_stats() {
        let mut court = Court::new();
        court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );

        let err = court
            .engine
            .process(
                event(court.home, None, StatType::Steal, None),
                PlayContext::default(),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::FreeThrowsPending { remaining: 2 });

        let err = court
            .engine
            .process(
                event(
                    court.away,
                    None,
                    StatType::FreeThrow,
                    Some(StatModifier::Made),
                ),
                PlayContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::WrongShootingTeam { .. }));
        assert_eq!(court.engine.free_throws().unwrap().attempted, 0);
    }

    #[test]
    fn technical_returns_ball_to_previous_holder() {
        let mut court = Court::new();
        let context = PlayContext {
            possession: Some(court.home),
            ..PlayContext::default()
        };
        let foul = court.record_with(
            court.home,
            Some(Uuid::new_v4()),
            StatType::Foul,
            Some(StatModifier::Technical),
            context,
        );
        assert_eq!(foul.possession, None);
        let set = foul.free_throws.unwrap();
        assert_eq!(set.owed, 1);
        assert_eq!(set.shooting_team, court.away);

        let attempt = court.record(
            court.away,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Missed),
        );
        assert_eq!(attempt.possession, Some(court.home));
        assert!(attempt.prompt.is_none());
    }

    #[test]
    fn flagrant_keeps_ball_with_fouled_team() {
        let mut court = Court::new();
        let foul = court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Flagrant),
        );
        assert_eq!(foul.free_throws.unwrap().owed, 2);

        court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        let last = court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        assert_eq!(last.possession, Some(court.home));
    }

    #[test]
    fn personal_foul_depends_on_bonus() {
        let mut court = Court::new();
        let side_out = court.record(
            court.home,
            None,
            StatType::Foul,
            Some(StatModifier::Personal),
        );
        assert_eq!(side_out.possession, Some(court.away));
        assert!(side_out.free_throws.is_none());

        let bonus = court.record_with(
            court.home,
            None,
            StatType::Foul,
            Some(StatModifier::Personal),
            PlayContext {
                fouling_team_in_bonus: true,
                ..PlayContext::default()
            },
        );
        assert_eq!(bonus.possession, None);
        assert_eq!(bonus.free_throws.unwrap().owed, 2);
    }

    #[test]
    fn offensive_foul_is_also_a_turnover() {
        let mut court = Court::new();
        let fouler = Uuid::new_v4();
        let outcome = court.record_with(
            court.home,
            Some(fouler),
            StatType::Foul,
            Some(StatModifier::Offensive),
            PlayContext {
                fouling_team_in_bonus: true,
                free_throw_override: Some(2),
                ..PlayContext::default()
            },
        );

        assert_eq!(outcome.committed.len(), 2);
        let turnover = &outcome.committed[1];
        assert_eq!(turnover.stat_type, StatType::Turnover);
        assert_eq!(turnover.player_id, Some(fouler));
        assert_eq!(turnover.linked_event_id, Some(outcome.committed[0].id));
        assert_eq!(outcome.possession, Some(court.away));
        assert!(outcome.free_throws.is_none());
    }

    #[test]
    fn override_replaces_computed_count() {
        let mut court = Court::new();
        let outcome = court.record_with(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
            PlayContext {
                free_throw_override: Some(3),
                ..PlayContext::default()
            },
        );
        assert_eq!(outcome.free_throws.unwrap().owed, 3);

        let mut court = Court::new();
        let outcome = court.record_with(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
            PlayContext {
                free_throw_override: Some(0),
                ..PlayContext::default()
            },
        );
        assert!(outcome.free_throws.is_none());
        assert_eq!(outcome.possession, Some(court.home));
    }

    #[test]
    fn technical_during_free_throws_queues_next_set() {
        let mut court = Court::new();
        court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        let technical = court.record_with(
            court.home,
            None,
            StatType::Foul,
            Some(StatModifier::Technical),
            PlayContext {
                possession: Some(court.home),
                ..PlayContext::default()
            },
        );
        assert_eq!(court.engine.queued_free_throw_sets(), 2);
        assert_eq!(technical.free_throws.unwrap().shooting_team, court.home);

        court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        let end_of_first = court.record(
            court.home,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Missed),
        );
        assert!(end_of_first.prompt.is_none());
        assert_eq!(end_of_first.possession, None);
        assert_eq!(end_of_first.free_throws.unwrap().shooting_team, court.away);

        let last = court.record(
            court.away,
            None,
            StatType::FreeThrow,
            Some(StatModifier::Made),
        );
        assert_eq!(last.possession, Some(court.home));
    }

    #[test]
    fn prompts_can_be_disabled() {
        let mut court = Court::with_rules(SequencingRules {
            prompt_assists: false,
            prompt_rebounds: false,
            ..SequencingRules::default()
        });
        let made = court.record(court.home, None, StatType::TwoPoint, Some(StatModifier::Made));
        assert!(made.prompt.is_none());
        let missed = court.record(court.away, None, StatType::TwoPoint, Some(StatModifier::Missed));
        assert!(missed.prompt.is_none());
    }

    #[test]
    fn unknown_team_and_prompt_mismatch_are_rejected() {
        let mut court = Court::new();
        let stranger = Uuid::new_v4();
        let err = court
            .engine
            .process(
                event(stranger, None, StatType::Steal, None),
                PlayContext::default(),
            )
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownTeam(stranger));

        assert_eq!(
            court.engine.skip_prompt(Uuid::new_v4()).unwrap_err(),
            EngineError::NoPendingPrompt
        );

        let prompt = court
            .record(court.home, None, StatType::Steal, None)
            .prompt
            .unwrap();
        let other = Uuid::new_v4();
        assert_eq!(
            court.engine.skip_prompt(other).unwrap_err(),
            EngineError::PromptMismatch {
                expected: prompt.id,
                got: other
            }
        );
    }

    #[test]
    fn reset_and_cancel_clear_sequencing_state() {
        let mut court = Court::new();
        court.record(
            court.away,
            None,
            StatType::Foul,
            Some(StatModifier::Shooting),
        );
        let cancelled = court.engine.cancel_free_throws().unwrap();
        assert_eq!(cancelled.owed, 2);
        assert!(court.engine.free_throws().is_none());

        court.record(court.home, None, StatType::Steal, None);
        court.engine.reset();
        assert!(court.engine.pending_prompt().is_none());
        assert_eq!(court.engine.queued_free_throw_sets(), 0);
    }
}
