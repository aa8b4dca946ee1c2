//! Shared domain types for NOVA.

use serde::{Deserialize, Serialize};

/// Dietary preference, assigned at user generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryPreference {
    Vegetarian,
    NonVegetarian,
    Vegan,
}

impl DietaryPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::NonVegetarian => "non-vegetarian",
            Self::Vegan => "vegan",
        }
    }

    /// Parse from the stored column value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "vegetarian" => Some(Self::Vegetarian),
            "non-vegetarian" | "non_vegetarian" => Some(Self::NonVegetarian),
            "vegan" => Some(Self::Vegan),
            _ => None,
        }
    }
}

impl std::fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user profile. Immutable after generation; read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub dietary_preference: DietaryPreference,
    /// Free-text condition tags, e.g. "Type 2 Diabetes".
    pub medical_conditions: Vec<String>,
    pub physical_limitations: Vec<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn conditions_summary(&self) -> String {
        if self.medical_conditions.is_empty() {
            "None".to_string()
        } else {
            self.medical_conditions.join(", ")
        }
    }
}

/// A mood log row, newest first in history queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodRecord {
    pub timestamp: String,
    pub mood: String,
    pub score: i64,
}

/// A glucose log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlucoseRecord {
    pub timestamp: String,
    pub reading: f64,
    pub alert_level: String,
}

/// A food log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodRecord {
    pub timestamp: String,
    pub description: String,
}

/// Outcome of a single domain action, success flag plus typed payload.
///
/// Replaces the duck-typed response dictionaries of earlier prototypes:
/// consumers match on `payload` instead of probing string keys.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>, payload: ActionPayload) -> Self {
        Self {
            ok: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            payload: None,
        }
    }
}

/// Typed payload carried by a successful action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActionPayload {
    Greeting {
        user_id: i64,
        name: String,
        city: String,
        dietary_preference: DietaryPreference,
        medical_conditions: Vec<String>,
    },
    Mood {
        label: String,
        score: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        rolling_average: Option<f64>,
    },
    Glucose {
        reading: f64,
        alert_level: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        average_reading: Option<f64>,
    },
    Food {
        description: String,
        nutrition: crate::mealplan::NutritionAnalysis,
    },
    MealPlan(crate::mealplan::MealPlan),
    Interrupt {
        query_type: String,
        routing_suggestion: String,
    },
    Emergency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dietary_preference_round_trips_column_value() {
        for diet in [
            DietaryPreference::Vegetarian,
            DietaryPreference::NonVegetarian,
            DietaryPreference::Vegan,
        ] {
            assert_eq!(DietaryPreference::from_str(diet.as_str()), Some(diet));
        }
        assert_eq!(DietaryPreference::from_str("pescatarian"), None);
    }

    #[test]
    fn conditions_summary_handles_empty() {
        let user = User {
            id: 1,
            first_name: "Asha".into(),
            last_name: "Iyer".into(),
            city: "Pune".into(),
            dietary_preference: DietaryPreference::Vegan,
            medical_conditions: vec![],
            physical_limitations: vec![],
        };
        assert_eq!(user.conditions_summary(), "None");
    }
}
