//! Domain validators: mood vocabulary, glucose range, food description.
//!
//! Pure functions. Nothing here touches storage; callers only persist a
//! value after it has passed its validator.

use serde::{Deserialize, Serialize};

use crate::config::GlucosePolicy;
use crate::error::ValidationError;

/// Accepted mood labels and their 1-5 scores.
///
/// Grouped into tiers: 5/4 upbeat, 3 baseline, 2/1 low. Kept in one place
/// so the corrective prompt and the score table can never drift apart.
pub const MOOD_TABLE: &[(&str, i64)] = &[
    ("happy", 5),
    ("excited", 5),
    ("content", 4),
    ("calm", 4),
    ("neutral", 3),
    ("tired", 2),
    ("sad", 2),
    ("stressed", 1),
    ("anxious", 1),
    ("angry", 1),
];

/// A validated mood label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodAssessment {
    pub label: String,
    pub score: i64,
}

/// Look up a normalized label in the mood table.
pub fn mood_score(label: &str) -> Option<i64> {
    let normalized = label.trim().to_lowercase();
    MOOD_TABLE
        .iter()
        .find(|(l, _)| *l == normalized)
        .map(|(_, s)| *s)
}

/// Comma-joined accepted labels, for corrective prompts.
pub fn accepted_moods() -> String {
    MOOD_TABLE
        .iter()
        .map(|(l, _)| *l)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a free-text mood label.
pub fn validate_mood(label: &str) -> Result<MoodAssessment, ValidationError> {
    let normalized = label.trim().to_lowercase();
    match mood_score(&normalized) {
        Some(score) => Ok(MoodAssessment {
            label: normalized,
            score,
        }),
        None => Err(ValidationError::InvalidMood {
            label: label.trim().to_string(),
            accepted: accepted_moods(),
        }),
    }
}

/// Alert tiers for a glucose reading, independent of the acceptance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Critical,
    Warning,
    Normal,
    Elevated,
}

impl AlertLevel {
    /// Canonical thresholds: <70 or >250 critical; 70-79 or 181-250
    /// warning; 80-140 normal; 141-180 elevated.
    pub fn classify(reading: f64) -> Self {
        if reading < 70.0 || reading > 250.0 {
            Self::Critical
        } else if reading < 80.0 || reading > 180.0 {
            Self::Warning
        } else if reading <= 140.0 {
            Self::Normal
        } else {
            Self::Elevated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Normal => "normal",
            Self::Elevated => "elevated",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated glucose reading with its alert tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseAssessment {
    pub reading: f64,
    pub alert_level: AlertLevel,
}

/// Validate a raw glucose string against a policy.
pub fn validate_glucose(raw: &str, policy: &GlucosePolicy) -> Result<GlucoseAssessment, ValidationError> {
    let reading: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidFormat)?;
    validate_glucose_value(reading, policy)
}

/// Validate an already-numeric reading against a policy.
pub fn validate_glucose_value(
    reading: f64,
    policy: &GlucosePolicy,
) -> Result<GlucoseAssessment, ValidationError> {
    if !reading.is_finite() || !policy.accepts(reading) {
        return Err(ValidationError::OutOfRange {
            reading,
            min: policy.min_accepted,
            max: policy.max_accepted,
        });
    }
    Ok(GlucoseAssessment {
        reading,
        alert_level: AlertLevel::classify(reading),
    })
}

/// Validate a free-text meal description: non-empty after trimming.
pub fn validate_food(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_table_scores_match() {
        for (label, score) in MOOD_TABLE {
            let assessment = validate_mood(label).unwrap();
            assert_eq!(assessment.score, *score);
        }
    }

    #[test]
    fn mood_is_case_and_whitespace_insensitive() {
        let assessment = validate_mood("  HaPPy ").unwrap();
        assert_eq!(assessment.label, "happy");
        assert_eq!(assessment.score, 5);
    }

    #[test]
    fn unknown_mood_lists_accepted_labels() {
        let err = validate_mood("ecstatic").unwrap_err();
        match err {
            ValidationError::InvalidMood { label, accepted } => {
                assert_eq!(label, "ecstatic");
                assert!(accepted.contains("happy"));
                assert!(accepted.contains("angry"));
            }
            other => panic!("expected InvalidMood, got {other:?}"),
        }
    }

    #[test]
    fn normal_band_is_80_to_140() {
        for reading in [80.0, 100.0, 140.0] {
            assert_eq!(AlertLevel::classify(reading), AlertLevel::Normal);
        }
    }

    #[test]
    fn critical_outside_70_to_250() {
        for reading in [40.0, 69.9, 250.1, 400.0] {
            assert_eq!(AlertLevel::classify(reading), AlertLevel::Critical);
        }
    }

    #[test]
    fn warning_and_elevated_bands() {
        assert_eq!(AlertLevel::classify(75.0), AlertLevel::Warning);
        assert_eq!(AlertLevel::classify(200.0), AlertLevel::Warning);
        assert_eq!(AlertLevel::classify(150.0), AlertLevel::Elevated);
        assert_eq!(AlertLevel::classify(180.0), AlertLevel::Elevated);
    }

    #[test]
    fn glucose_rejects_non_numeric_input() {
        let err = validate_glucose("one twenty", &GlucosePolicy::wide()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidFormat);
    }

    #[test]
    fn glucose_rejects_outside_policy_bound() {
        let err = validate_glucose("420", &GlucosePolicy::wide()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));

        // 310 is accepted under the wide policy but critical-tier.
        let assessment = validate_glucose("310", &GlucosePolicy::wide()).unwrap();
        assert_eq!(assessment.alert_level, AlertLevel::Critical);

        // The strict policy rejects the same reading outright.
        let err = validate_glucose("310", &GlucosePolicy::strict()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn food_requires_non_empty_description() {
        assert_eq!(validate_food("  dal and rice ").unwrap(), "dal and rice");
        assert_eq!(
            validate_food("   ").unwrap_err(),
            ValidationError::EmptyDescription
        );
    }
}
