//! Interrupt / query classifier.
//!
//! Fast, pure classification that runs BEFORE any generation call.
//! Precedence, first match wins:
//!
//! 1. Emergency keywords - hard-coded response, nothing else may run.
//! 2. Structured command prefixes (`mood:`, `cgm:`/`glucose:`, `food:`).
//! 3. Health-domain vocabulary - routed as flow continuation toward the
//!    best-guess handler.
//! 4. General - free-form question for the interrupt handler.
//!
//! The emergency check is a priority guarantee: input containing an
//! emergency keyword never reaches the generation backend or any other
//! handler.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validators::mood_score;

/// A structured command extracted from a prefix pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredCommand {
    /// `mood: <label>`
    Mood(String),
    /// `cgm: <reading>` or `glucose: <reading>`
    Glucose(String),
    /// `food: <description>`
    Food(String),
}

/// Best-guess target inferred from health vocabulary without a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTopic {
    Mood,
    Glucose,
    Food,
    MealPlan,
}

/// Classification of one free-text input.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedQuery {
    /// Contains an emergency keyword; short-circuits everything.
    Emergency,
    /// Recognized prefix pattern with its payload.
    Command(StructuredCommand),
    /// Health vocabulary without a prefix; continue the flow toward `topic`.
    Health(HealthTopic),
    /// None of the above; answer as a general question.
    General,
}

/// Keyword-driven classifier. Stateless; build once, reuse.
pub struct QueryClassifier {
    emergency_keywords: Vec<&'static str>,
    mood_keywords: HashSet<&'static str>,
    glucose_keywords: Vec<&'static str>,
    food_keywords: HashSet<&'static str>,
    health_question_keywords: Vec<&'static str>,
    number_re: Regex,
}

impl QueryClassifier {
    pub fn new() -> Self {
        Self {
            // Checked as substrings so multi-word phrases match.
            emergency_keywords: vec![
                "emergency",
                "urgent",
                "911",
                "ambulance",
                "chest pain",
                "heart attack",
                "stroke",
                "bleeding",
                "unconscious",
                "severe pain",
                "difficulty breathing",
                "choking",
            ],
            mood_keywords: ["mood", "feeling", "feel"].into_iter().collect(),
            glucose_keywords: vec!["glucose", "blood sugar", "cgm", "sugar level"],
            food_keywords: ["ate", "eat", "eating", "meal", "snack", "food", "breakfast", "lunch", "dinner"]
                .into_iter()
                .collect(),
            health_question_keywords: vec![
                "diabetes",
                "insulin",
                "medication",
                "doctor",
                "symptom",
                "side effect",
                "dosage",
                "prescription",
                "medical",
            ],
            number_re: Regex::new(r"\d+(?:\.\d+)?").expect("static regex"),
        }
    }

    /// Classify one input. Pure; no state, no network.
    pub fn classify(&self, text: &str) -> ClassifiedQuery {
        let lower = text.trim().to_lowercase();

        // 1. Emergency. Must run before everything else.
        if self.is_emergency(&lower) {
            return ClassifiedQuery::Emergency;
        }

        // 2. Structured command prefixes.
        if let Some(command) = parse_command(text) {
            return ClassifiedQuery::Command(command);
        }

        // 3. Health vocabulary. Plan keywords first: "meal plan" must not
        // be swallowed by the food vocabulary. Word-matched, so "explain"
        // does not trigger "plan".
        let words = word_set(&lower);
        if lower.contains("meal plan")
            || lower.contains("diet plan")
            || words.iter().any(|w| w == "plan")
        {
            return ClassifiedQuery::Health(HealthTopic::MealPlan);
        }
        if words.iter().any(|w| self.mood_keywords.contains(w.as_str())) {
            return ClassifiedQuery::Health(HealthTopic::Mood);
        }
        if self.glucose_keywords.iter().any(|k| lower.contains(k)) {
            return ClassifiedQuery::Health(HealthTopic::Glucose);
        }
        if words.iter().any(|w| self.food_keywords.contains(w.as_str())) {
            return ClassifiedQuery::Health(HealthTopic::Food);
        }

        // 4. Everything else is a general interrupt.
        ClassifiedQuery::General
    }

    /// True when the text contains an emergency keyword.
    pub fn is_emergency(&self, lower: &str) -> bool {
        self.emergency_keywords.iter().any(|k| lower.contains(k))
    }

    /// Tag used for interrupt telemetry and payloads.
    pub fn query_type(&self, text: &str) -> &'static str {
        let lower = text.trim().to_lowercase();
        let words = word_set(&lower);
        if self.is_emergency(&lower) {
            "emergency"
        } else if self
            .health_question_keywords
            .iter()
            .any(|k| lower.contains(k))
            || self.glucose_keywords.iter().any(|k| lower.contains(k))
        {
            "health_question"
        } else if words
            .iter()
            .any(|w| matches!(w.as_str(), "how" | "what" | "why" | "when" | "where"))
        {
            "information_request"
        } else if ["help", "support", "assist"]
            .iter()
            .any(|w| lower.contains(w))
        {
            "help_request"
        } else {
            "general_query"
        }
    }

    /// Extract the first numeric token, for "my glucose was 120"-style input.
    pub fn extract_reading(&self, text: &str) -> Option<f64> {
        self.number_re
            .find(text)
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Extract a recognized mood label from free text, if one is present.
    pub fn extract_mood_label(&self, text: &str) -> Option<String> {
        word_set(&text.to_lowercase())
            .into_iter()
            .find(|w| mood_score(w).is_some())
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `prefix: payload` structured command, case-insensitively.
fn parse_command(text: &str) -> Option<StructuredCommand> {
    let trimmed = text.trim();
    let (prefix, payload) = trimmed.split_once(':')?;
    let payload = payload.trim().to_string();
    match prefix.trim().to_lowercase().as_str() {
        "mood" => Some(StructuredCommand::Mood(payload)),
        "cgm" | "glucose" => Some(StructuredCommand::Glucose(payload)),
        "food" => Some(StructuredCommand::Food(payload)),
        _ => None,
    }
}

/// Split into lowercase alphanumeric words, stripping punctuation.
fn word_set(lower: &str) -> Vec<String> {
    lower
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> QueryClassifier {
        QueryClassifier::new()
    }

    #[test]
    fn emergency_wins_over_health_keywords() {
        let c = classifier();
        assert_eq!(c.classify("I have chest pain"), ClassifiedQuery::Emergency);
        // Co-occurring health vocabulary must not demote an emergency.
        assert_eq!(
            c.classify("chest pain and glucose is 120"),
            ClassifiedQuery::Emergency
        );
        assert_eq!(
            c.classify("URGENT: my father is unconscious"),
            ClassifiedQuery::Emergency
        );
    }

    #[test]
    fn structured_commands_are_extracted() {
        let c = classifier();
        assert_eq!(
            c.classify("mood: happy"),
            ClassifiedQuery::Command(StructuredCommand::Mood("happy".into()))
        );
        assert_eq!(
            c.classify("CGM: 120"),
            ClassifiedQuery::Command(StructuredCommand::Glucose("120".into()))
        );
        assert_eq!(
            c.classify("glucose: 95.5"),
            ClassifiedQuery::Command(StructuredCommand::Glucose("95.5".into()))
        );
        assert_eq!(
            c.classify("food: dal and rice"),
            ClassifiedQuery::Command(StructuredCommand::Food("dal and rice".into()))
        );
    }

    #[test]
    fn unknown_prefix_is_not_a_command() {
        let c = classifier();
        assert_eq!(c.classify("note: buy groceries"), ClassifiedQuery::General);
    }

    #[test]
    fn health_vocabulary_routes_to_best_guess_topic() {
        let c = classifier();
        assert_eq!(
            c.classify("I am feeling great today"),
            ClassifiedQuery::Health(HealthTopic::Mood)
        );
        assert_eq!(
            c.classify("my blood sugar was high this morning"),
            ClassifiedQuery::Health(HealthTopic::Glucose)
        );
        assert_eq!(
            c.classify("I ate dal and rice"),
            ClassifiedQuery::Health(HealthTopic::Food)
        );
        assert_eq!(
            c.classify("give me a meal plan"),
            ClassifiedQuery::Health(HealthTopic::MealPlan)
        );
    }

    #[test]
    fn meal_plan_is_not_swallowed_by_food_vocabulary() {
        let c = classifier();
        assert_eq!(
            c.classify("can you plan my meals"),
            ClassifiedQuery::Health(HealthTopic::MealPlan)
        );
    }

    #[test]
    fn general_text_falls_through() {
        let c = classifier();
        assert_eq!(
            c.classify("what's the weather in Pune?"),
            ClassifiedQuery::General
        );
    }

    #[test]
    fn query_types_match_original_taxonomy() {
        let c = classifier();
        assert_eq!(c.query_type("I have chest pain"), "emergency");
        assert_eq!(c.query_type("is my diabetes under control"), "health_question");
        assert_eq!(c.query_type("what time is it"), "information_request");
        assert_eq!(c.query_type("please assist me"), "help_request");
        assert_eq!(c.query_type("nice day today"), "general_query");
    }

    #[test]
    fn numeric_extraction_handles_decimals() {
        let c = classifier();
        assert_eq!(c.extract_reading("reading was 120.5 today"), Some(120.5));
        assert_eq!(c.extract_reading("no numbers here"), None);
    }

    #[test]
    fn mood_label_extraction_scans_words() {
        let c = classifier();
        assert_eq!(
            c.extract_mood_label("I guess I'm happy today"),
            Some("happy".to_string())
        );
        assert_eq!(c.extract_mood_label("kind of meh"), None);
    }
}
