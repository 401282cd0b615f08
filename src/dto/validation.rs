//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

use crate::{config::RuleOverrides, dto::game::PlayerInput, state::game::LINEUP_SIZE};

/// Largest jersey number accepted on a roster.
pub const MAX_JERSEY_NUMBER: u8 = 99;

/// Validates that jersey numbers are unique within a roster and that at most
/// five players are flagged as starters.
pub fn validate_roster(players: &[PlayerInput]) -> Result<(), ValidationError> {
    let mut numbers = HashSet::new();
    for player in players {
        if !numbers.insert(player.number) {
            let mut err = ValidationError::new("duplicate_jersey_number");
            err.message = Some(format!("Jersey number {} is used twice", player.number).into());
            return Err(err);
        }
    }

    let starters = players.iter().filter(|player| player.starter).count();
    if starters > LINEUP_SIZE {
        let mut err = ValidationError::new("too_many_starters");
        err.message = Some(
            format!("At most {LINEUP_SIZE} starters allowed (got {starters})").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is not blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates rule overrides that would make a game unplayable.
pub fn validate_overrides(overrides: &RuleOverrides) -> Result<(), ValidationError> {
    let invalid = |field: &'static str| {
        let mut err = ValidationError::new("invalid_rule");
        err.message = Some(format!("`{field}` must be greater than zero").into());
        err
    };

    if overrides.periods == Some(0) {
        return Err(invalid("periods"));
    }
    if overrides.period_length_ms == Some(0) {
        return Err(invalid("period_length_ms"));
    }
    if overrides.overtime_length_ms == Some(0) {
        return Err(invalid("overtime_length_ms"));
    }
    if overrides.shot_clock_ms == Some(0) {
        return Err(invalid("shot_clock_ms"));
    }
    if overrides.personal_foul_limit == Some(0) {
        return Err(invalid("personal_foul_limit"));
    }
    if overrides.team_fouls_for_bonus == Some(0) {
        return Err(invalid("team_fouls_for_bonus"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(number: u8, starter: bool) -> PlayerInput {
        PlayerInput {
            name: format!("Player {number}"),
            number,
            starter,
        }
    }

    #[test]
    fn accepts_a_regular_roster() {
        let roster: Vec<_> = (0..12).map(|n| player(n, n < 5)).collect();
        assert!(validate_roster(&roster).is_ok());
        assert!(validate_roster(&[]).is_ok());
    }

    #[test]
    fn rejects_duplicate_numbers() {
        let err = validate_roster(&[player(7, true), player(7, false)]).unwrap_err();
        assert_eq!(err.code, "duplicate_jersey_number");
    }

    #[test]
    fn rejects_a_sixth_starter() {
        let roster: Vec<_> = (0..6).map(|n| player(n, true)).collect();
        let err = validate_roster(&roster).unwrap_err();
        assert_eq!(err.code, "too_many_starters");
    }

    #[test]
    fn zero_length_periods_are_rejected() {
        let overrides = RuleOverrides {
            period_length_ms: Some(0),
            ..RuleOverrides::default()
        };
        assert_eq!(
            validate_overrides(&overrides).unwrap_err().code,
            "invalid_rule"
        );
        assert!(validate_overrides(&RuleOverrides::default()).is_ok());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_not_blank("Eagles").is_ok());
        assert!(validate_not_blank("   ").is_err());
    }
}
