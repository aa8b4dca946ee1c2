//! Rule-based feedback composer.
//!
//! Total functions from a validated value to a user-facing message. No AI
//! involvement, no failure path.

use crate::validators::{GlucoseAssessment, MoodAssessment};

/// Encouragement message for a logged mood, keyed by score tier.
pub fn mood_feedback(assessment: &MoodAssessment) -> String {
    let label = &assessment.label;
    if assessment.score >= 4 {
        format!("Wonderful! You're feeling {label} - that's great energy for your health journey today!")
    } else if assessment.score == 3 {
        format!("You're feeling {label} - that's a solid baseline. Let's see how we can boost your wellness.")
    } else {
        format!(
            "I hear you - feeling {label} is tough. Taking care of your health can help lift your mood. You've got this!"
        )
    }
}

/// Guidance message for a logged glucose reading, keyed by band.
///
/// Six bands rather than the four alert tiers: the low side of the warning
/// tier reads differently from the high side.
pub fn glucose_feedback(assessment: &GlucoseAssessment) -> String {
    let reading = assessment.reading;
    if reading < 70.0 {
        format!(
            "LOW ALERT: your glucose is {reading} mg/dL (below normal). Consider a quick snack with carbs and monitor closely."
        )
    } else if reading < 80.0 {
        format!(
            "BORDERLINE LOW: your glucose is {reading} mg/dL (on the lower side). Keep an eye on how you feel."
        )
    } else if reading <= 140.0 {
        format!("EXCELLENT: your glucose is {reading} mg/dL, in the healthy range!")
    } else if reading <= 180.0 {
        format!(
            "ELEVATED: your glucose is {reading} mg/dL (slightly high). Consider light activity and watch your next meal choices."
        )
    } else if reading <= 250.0 {
        format!(
            "HIGH ALERT: your glucose is {reading} mg/dL (significantly elevated). Please consult your healthcare provider if this persists."
        )
    } else {
        format!(
            "CRITICAL: your glucose is {reading} mg/dL (dangerously high). Please seek immediate medical attention if you feel unwell."
        )
    }
}

/// Append a 7-day rolling mood average when history exists.
pub fn with_mood_average(message: String, rolling_average: Option<f64>) -> String {
    match rolling_average {
        Some(avg) => format!("{message}\nYour 7-day mood average: {avg:.1}/5.0"),
        None => message,
    }
}

/// Append a 7-day mean glucose when history exists.
pub fn with_glucose_average(message: String, average: Option<f64>) -> String {
    match average {
        Some(avg) => format!("{message}\nYour 7-day average: {avg:.1} mg/dL"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlucosePolicy;
    use crate::validators::{validate_glucose_value, validate_mood, AlertLevel};

    #[test]
    fn every_mood_tier_has_a_message() {
        for label in ["happy", "neutral", "sad"] {
            let msg = mood_feedback(&validate_mood(label).unwrap());
            assert!(msg.contains(label));
        }
    }

    #[test]
    fn critical_band_tells_user_to_seek_care() {
        let assessment = validate_glucose_value(310.0, &GlucosePolicy::wide()).unwrap();
        assert_eq!(assessment.alert_level, AlertLevel::Critical);
        let msg = glucose_feedback(&assessment);
        assert!(msg.contains("CRITICAL"));
        assert!(msg.contains("seek immediate medical attention"));
    }

    #[test]
    fn all_bands_are_covered() {
        let policy = GlucosePolicy::wide();
        for reading in [50.0, 75.0, 120.0, 160.0, 200.0, 300.0] {
            let assessment = validate_glucose_value(reading, &policy).unwrap();
            assert!(!glucose_feedback(&assessment).is_empty());
        }
    }

    #[test]
    fn averages_are_appended_only_when_present() {
        let base = "logged".to_string();
        assert_eq!(with_mood_average(base.clone(), None), "logged");
        assert!(with_mood_average(base, Some(3.25)).contains("3.2/5.0"));
    }
}
