//! Pure admission predicates. No side effects: every rule is checked
//! before any mutation is attempted.

use snafu::ensure;

use crate::error::{ValidationSnafu, VoteResult};

pub const MIN_TITLE_CHARS: usize = 1;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 20;
pub const MIN_OPTION_CHARS: usize = 1;
pub const MAX_OPTION_CHARS: usize = 40;
/// 30 days.
pub const MAX_DURATION_MINUTES: i64 = 43_200;
/// Simultaneously active votes one fingerprint may hold.
pub const MAX_ACTIVE_VOTES_PER_USER: usize = 30;

pub fn validate_title(title: &str) -> VoteResult<()> {
    let len = title.trim().chars().count();
    ensure!(
        len >= MIN_TITLE_CHARS,
        ValidationSnafu {
            field: "title",
            reason: "must not be blank".to_string(),
        }
    );
    ensure!(
        title.chars().count() <= MAX_TITLE_CHARS,
        ValidationSnafu {
            field: "title",
            reason: format!("must be at most {} characters", MAX_TITLE_CHARS),
        }
    );
    Ok(())
}

pub fn validate_description(description: &str) -> VoteResult<()> {
    ensure!(
        description.chars().count() <= MAX_DESCRIPTION_CHARS,
        ValidationSnafu {
            field: "description",
            reason: format!("must be at most {} characters", MAX_DESCRIPTION_CHARS),
        }
    );
    Ok(())
}

/// Between 2 and 20 options, each 1-40 characters, no duplicates
/// (case-insensitive).
pub fn validate_options(options: &[String]) -> VoteResult<()> {
    ensure!(
        options.len() >= MIN_OPTIONS,
        ValidationSnafu {
            field: "options",
            reason: format!("need at least {} options", MIN_OPTIONS),
        }
    );
    ensure!(
        options.len() <= MAX_OPTIONS,
        ValidationSnafu {
            field: "options",
            reason: format!("at most {} options allowed", MAX_OPTIONS),
        }
    );
    for option in options.iter() {
        let len = option.chars().count();
        ensure!(
            len >= MIN_OPTION_CHARS,
            ValidationSnafu {
                field: "options",
                reason: "option text must not be empty".to_string(),
            }
        );
        ensure!(
            len <= MAX_OPTION_CHARS,
            ValidationSnafu {
                field: "options",
                reason: format!("option text must be at most {} characters", MAX_OPTION_CHARS),
            }
        );
    }
    for (idx, option) in options.iter().enumerate() {
        let lowered = option.to_lowercase();
        if options
            .iter()
            .skip(idx + 1)
            .any(|other| other.to_lowercase() == lowered)
        {
            return ValidationSnafu {
                field: "options",
                reason: format!("duplicate option: {}", option),
            }
            .fail();
        }
    }
    Ok(())
}

/// Hours and minutes must form a duration of at least one minute and at
/// most 30 days.
pub fn validate_duration(hours: i32, minutes: i32) -> VoteResult<()> {
    ensure!(
        hours >= 0,
        ValidationSnafu {
            field: "duration",
            reason: "hours must not be negative".to_string(),
        }
    );
    ensure!(
        (0..=59).contains(&minutes),
        ValidationSnafu {
            field: "duration",
            reason: "minutes must be between 0 and 59".to_string(),
        }
    );
    ensure!(
        hours > 0 || minutes > 0,
        ValidationSnafu {
            field: "duration",
            reason: "must be at least 1 minute".to_string(),
        }
    );
    let total_minutes = i64::from(hours) * 60 + i64::from(minutes);
    ensure!(
        total_minutes <= MAX_DURATION_MINUTES,
        ValidationSnafu {
            field: "duration",
            reason: format!("must be at most {} minutes (30 days)", MAX_DURATION_MINUTES),
        }
    );
    Ok(())
}

/// Cast-time check: one score per option, every score in 0-5.
pub fn validate_scores(scores: &[u8], option_count: usize) -> VoteResult<()> {
    ensure!(
        !scores.is_empty(),
        ValidationSnafu {
            field: "scores",
            reason: "ballot must not be empty".to_string(),
        }
    );
    ensure!(
        scores.len() == option_count,
        ValidationSnafu {
            field: "scores",
            reason: format!("expected {} scores, got {}", option_count, scores.len()),
        }
    );
    if let Some(bad) = scores.iter().find(|s| **s > star_voting::MAX_SCORE) {
        return ValidationSnafu {
            field: "scores",
            reason: format!("invalid score {} (must be 0-5)", bad),
        }
        .fail();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoteError;

    fn opts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn field_of(err: VoteError) -> &'static str {
        match err {
            VoteError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn title_bounds() {
        assert!(validate_title("Lunch spot").is_ok());
        assert_eq!(field_of(validate_title("   ").unwrap_err()), "title");
        assert_eq!(field_of(validate_title(&"x".repeat(101)).unwrap_err()), "title");
        assert!(validate_title(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn option_list_bounds() {
        assert!(validate_options(&opts(&["a", "b"])).is_ok());
        assert!(validate_options(&opts(&["a"])).is_err());
        assert!(validate_options(&opts(&["a"; 21])).is_err());
        assert!(validate_options(&opts(&["a", ""])).is_err());
        assert!(validate_options(&opts(&["a", &"y".repeat(41)])).is_err());
    }

    #[test]
    fn duplicate_options_rejected_case_insensitively() {
        assert!(validate_options(&opts(&["Tea", "tea"])).is_err());
        assert!(validate_options(&opts(&["Tea", "Coffee"])).is_ok());
    }

    #[test]
    fn duration_bounds() {
        assert!(validate_duration(0, 1).is_ok());
        assert!(validate_duration(719, 59).is_ok());
        assert!(validate_duration(720, 0).is_ok());
        assert!(validate_duration(0, 0).is_err());
        assert!(validate_duration(-1, 30).is_err());
        assert!(validate_duration(1, 60).is_err());
        assert!(validate_duration(720, 1).is_err());
    }

    #[test]
    fn score_shape() {
        assert!(validate_scores(&[0, 5, 3], 3).is_ok());
        assert!(validate_scores(&[], 0).is_err());
        assert!(validate_scores(&[1, 2], 3).is_err());
        assert!(validate_scores(&[1, 6, 2], 3).is_err());
    }
}
