//! Meal-plan generation with a deterministic fallback composer.
//!
//! The generation call is best-effort: empty output, error-shaped text and
//! unparseable JSON all count as failures. A bounded pipeline retries with
//! a cleanup pass (strip markdown fences, truncate to the outermost JSON
//! span); when every attempt fails the plan is synthesized from fixed
//! diet templates plus condition modifiers. The operation never hard-fails
//! and both paths produce the same schema, so downstream consumers need no
//! branching - only the `fallback` flag differs.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::llm::{vet_output, TextGenerator};
use crate::types::DietaryPreference;

/// Retry bound for the generate -> clean -> parse pipeline.
const MAX_ATTEMPTS: usize = 3;

/// Macro breakdown for one meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub carb: i64,
    pub protein: i64,
    pub fat: i64,
    pub calories: i64,
}

/// One suggested meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSuggestion {
    pub meal_type: String,
    pub meal: String,
    pub macros: Macros,
    pub benefits: String,
    pub timing: String,
}

/// A complete three-meal plan. Shape is identical for AI-generated and
/// fallback plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlan {
    pub personalized_message: String,
    pub glucose_analysis: String,
    pub suggestions: Vec<MealSuggestion>,
    pub total_calories: i64,
    /// True when the deterministic composer produced this plan.
    pub fallback: bool,
    pub generated_at: String,
}

/// Everything the prompt (and the fallback) needs to know about the user.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub name: String,
    pub dietary_preference: DietaryPreference,
    pub medical_conditions: Vec<String>,
    pub latest_glucose: Option<f64>,
    pub recent_mood: Option<String>,
    pub recent_meals: Vec<String>,
}

/// Raw schema expected back from the generator.
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    personalized_message: String,
    #[serde(default)]
    glucose_analysis: String,
    suggestions: Vec<MealSuggestion>,
}

/// Build the context-rich prompt requesting strict JSON.
pub fn build_plan_prompt(ctx: &PlanContext) -> String {
    let conditions = if ctx.medical_conditions.is_empty() {
        "None".to_string()
    } else {
        ctx.medical_conditions.join(", ")
    };
    let glucose = ctx
        .latest_glucose
        .map(|g| format!("{g} mg/dL"))
        .unwrap_or_else(|| "Not available".to_string());
    let mood = ctx.recent_mood.clone().unwrap_or_else(|| "Not available".to_string());
    let recent = if ctx.recent_meals.is_empty() {
        "None logged".to_string()
    } else {
        ctx.recent_meals.join("; ")
    };

    format!(
        "Create a personalized meal plan for {name}.\n\n\
         User profile:\n\
         - Dietary preference: {diet}\n\
         - Medical conditions: {conditions}\n\
         - Latest glucose: {glucose}\n\
         - Recent mood: {mood}\n\
         - Recent meals: {recent}\n\n\
         Requirements:\n\
         1. Exactly 3 meals (breakfast, lunch, dinner)\n\
         2. Respect the {diet} diet\n\
         3. Account for the medical conditions\n\
         4. Include specific ingredients and macros\n\n\
         Return ONLY valid JSON with this shape:\n\
         {{\"personalized_message\": \"...\", \"glucose_analysis\": \"...\", \
         \"suggestions\": [{{\"meal_type\": \"Breakfast\", \"meal\": \"...\", \
         \"macros\": {{\"carb\": 30, \"protein\": 12, \"fat\": 10, \"calories\": 280}}, \
         \"benefits\": \"...\", \"timing\": \"7:00 AM\"}}, ...]}}",
        name = ctx.name,
        diet = ctx.dietary_preference,
    )
}

/// Cleanup pass for almost-JSON output: strip markdown code fences and
/// truncate to the outermost `{...}` span.
pub fn clean_response(response: &str) -> String {
    let mut text = response.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e >= s => text[s..=e].to_string(),
        _ => text.to_string(),
    }
}

fn parse_plan(text: &str) -> Option<RawPlan> {
    serde_json::from_str::<RawPlan>(text.trim())
        .ok()
        .filter(|p| !p.suggestions.is_empty())
}

/// Generate a plan, retrying with cleanup, falling back deterministically.
///
/// Contract: this always returns a usable plan. `GenerationUnavailable`
/// conditions are recovered internally, never surfaced.
pub fn generate_plan(generator: &dyn TextGenerator, ctx: &PlanContext) -> MealPlan {
    let prompt = build_plan_prompt(ctx);

    for attempt in 1..=MAX_ATTEMPTS {
        let raw = match generator.generate(&prompt).and_then(vet_output) {
            Ok(text) => text,
            Err(e) => {
                debug!(attempt, error = %e, "meal plan generation attempt failed");
                continue;
            }
        };

        if let Some(plan) = parse_plan(&raw) {
            info!(attempt, "meal plan generated");
            return finish_plan(plan, false);
        }

        let cleaned = clean_response(&raw);
        if let Some(plan) = parse_plan(&cleaned) {
            info!(attempt, "meal plan generated after cleanup");
            return finish_plan(plan, false);
        }

        debug!(attempt, "meal plan response did not parse as the expected schema");
    }

    warn!("all meal plan generation attempts failed, using deterministic fallback");
    fallback_plan(ctx)
}

fn finish_plan(raw: RawPlan, fallback: bool) -> MealPlan {
    let total_calories = raw.suggestions.iter().map(|s| s.macros.calories).sum();
    MealPlan {
        personalized_message: if raw.personalized_message.is_empty() {
            "Your personalized meal plan is ready!".to_string()
        } else {
            raw.personalized_message
        },
        glucose_analysis: raw.glucose_analysis,
        suggestions: raw.suggestions,
        total_calories,
        fallback,
        generated_at: Utc::now().to_rfc3339(),
    }
}

/// Case-insensitive condition tag match.
fn has_condition(conditions: &[String], needle: &str) -> bool {
    conditions
        .iter()
        .any(|c| c.to_lowercase().contains(needle))
}

/// Deterministic substitute plan: base template per diet, then condition
/// modifiers in a fixed order, applied independently and cumulatively.
pub fn fallback_plan(ctx: &PlanContext) -> MealPlan {
    let mut meals = base_meals(ctx.dietary_preference);

    // Fixed modifier order: diabetes, hypertension, arthritis, depression.
    if has_condition(&ctx.medical_conditions, "diabetes") {
        meals[0].meal = "Steel-cut oats with cinnamon and walnuts (low glycemic)".to_string();
        meals[0].macros.carb = 20;
        meals[1].meal = "Grilled protein with non-starchy vegetables".to_string();
        meals[1].macros.carb = 10;
        meals[2].meal = "Baked main with cauliflower rice and green beans".to_string();
        meals[2].macros.carb = 15;
    }
    if has_condition(&ctx.medical_conditions, "hypertension") {
        meals[0].meal.push_str(" (low sodium)");
        meals[1].meal.push_str(" (no added salt)");
        meals[2].meal.push_str(" (herbs instead of salt)");
    }
    if has_condition(&ctx.medical_conditions, "arthritis") {
        meals[0].meal.push_str(" with anti-inflammatory turmeric");
        meals[1].meal.push_str(" with omega-3 rich ingredients");
        meals[2].meal.push_str(" with ginger and garlic");
    }
    if has_condition(&ctx.medical_conditions, "depression") {
        meals[0].meal.push_str(" with mood-boosting berries");
        meals[1].meal.push_str(" with serotonin-supporting foods");
        meals[2].meal.push_str(" with complex carbohydrates");
    }

    let conditions = if ctx.medical_conditions.is_empty() {
        "general wellness".to_string()
    } else {
        ctx.medical_conditions.join(", ")
    };
    let diet = ctx.dietary_preference;

    let suggestions: Vec<MealSuggestion> = meals
        .into_iter()
        .map(|m| MealSuggestion {
            benefits: format!("Tailored for a {diet} diet and {conditions}"),
            ..m
        })
        .collect();
    let total_calories = suggestions.iter().map(|s| s.macros.calories).sum();

    MealPlan {
        personalized_message: format!(
            "Hello {}, here's your meal plan based on your {diet} diet and health profile!",
            ctx.name
        ),
        glucose_analysis: format!(
            "AI generation is unavailable right now, so these meals come from your \
             health profile ({conditions}). They are designed to support your specific needs."
        ),
        suggestions,
        total_calories,
        fallback: true,
        generated_at: Utc::now().to_rfc3339(),
    }
}

/// Base three-meal template per dietary preference.
fn base_meals(diet: DietaryPreference) -> [MealSuggestion; 3] {
    let (breakfast, lunch, dinner) = match diet {
        DietaryPreference::Vegetarian => (
            ("Greek yogurt with honey and mixed berries", Macros { carb: 25, protein: 15, fat: 8, calories: 220 }),
            ("Quinoa bowl with roasted vegetables and chickpeas", Macros { carb: 40, protein: 12, fat: 10, calories: 280 }),
            ("Lentil curry with brown rice and spinach", Macros { carb: 45, protein: 18, fat: 12, calories: 320 }),
        ),
        DietaryPreference::NonVegetarian => (
            ("Scrambled eggs with whole grain toast and avocado", Macros { carb: 30, protein: 20, fat: 15, calories: 320 }),
            ("Grilled chicken breast with mixed greens and olive oil dressing", Macros { carb: 15, protein: 35, fat: 12, calories: 280 }),
            ("Baked salmon with quinoa and steamed broccoli", Macros { carb: 35, protein: 30, fat: 18, calories: 380 }),
        ),
        DietaryPreference::Vegan => (
            ("Oatmeal with almond milk, chia seeds, and banana", Macros { carb: 35, protein: 8, fat: 6, calories: 220 }),
            ("Chickpea and vegetable stir-fry with brown rice", Macros { carb: 45, protein: 12, fat: 8, calories: 280 }),
            ("Tofu and vegetable curry with quinoa", Macros { carb: 40, protein: 15, fat: 10, calories: 300 }),
        ),
    };

    [
        MealSuggestion {
            meal_type: "Breakfast".to_string(),
            meal: breakfast.0.to_string(),
            macros: breakfast.1,
            benefits: String::new(),
            timing: "7:00 AM".to_string(),
        },
        MealSuggestion {
            meal_type: "Lunch".to_string(),
            meal: lunch.0.to_string(),
            macros: lunch.1,
            benefits: String::new(),
            timing: "12:30 PM".to_string(),
        },
        MealSuggestion {
            meal_type: "Dinner".to_string(),
            meal: dinner.0.to_string(),
            macros: dinner.1,
            benefits: String::new(),
            timing: "7:00 PM".to_string(),
        },
    ]
}

// ============================================================================
// Nutrition analysis for logged meals
// ============================================================================

/// Nutrition summary attached to a food log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionAnalysis {
    pub description: String,
    pub analysis: String,
    pub estimated_calories: String,
    pub primary_macros: String,
    pub analyzed_at: String,
}

/// Analyze a meal description, falling back to a deterministic summary.
pub fn analyze_nutrition(generator: &dyn TextGenerator, description: &str) -> NutritionAnalysis {
    let prompt = format!(
        "Analyze the nutritional content of this meal or snack: \"{description}\"\n\n\
         Cover briefly: primary macronutrients (carbs, protein, fat), an estimated \
         calorie range, health benefits or concerns, and meal timing advice. \
         Keep it concise and practical. Plain text, not JSON."
    );

    let analysis = match generator.generate(&prompt).and_then(vet_output) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(error = %e, "nutrition analysis fell back to deterministic summary");
            format!(
                "Nutritional summary for: {description}\n\
                 Estimated calories: 300-500\n\
                 Macros: balanced meal\n\
                 Benefits: provides energy and nutrients"
            )
        }
    };

    NutritionAnalysis {
        description: description.to_string(),
        estimated_calories: extract_calories(&analysis),
        primary_macros: extract_macro_focus(&analysis),
        analysis,
        analyzed_at: Utc::now().to_rfc3339(),
    }
}

/// Pull a "NNN-MMM calories" style estimate out of analysis text.
fn extract_calories(analysis: &str) -> String {
    let re = Regex::new(r"(\d+)\s*-\s*(\d+)\s*calories?").expect("static regex");
    let lower = analysis.to_lowercase();
    if let Some(caps) = re.captures(&lower) {
        return format!("{}-{}", &caps[1], &caps[2]);
    }
    let single = Regex::new(r"(\d+)\s*calories?").expect("static regex");
    if let Some(caps) = single.captures(&lower) {
        return caps[1].to_string();
    }
    "300-500".to_string()
}

/// Classify the dominant macro focus of analysis text.
fn extract_macro_focus(analysis: &str) -> String {
    let lower = analysis.to_lowercase();
    if ["protein", "meat", "fish", "chicken", "egg"]
        .iter()
        .any(|w| lower.contains(w))
    {
        "protein-rich".to_string()
    } else if ["carb", "rice", "bread", "pasta"].iter().any(|w| lower.contains(w)) {
        "carb-rich".to_string()
    } else if ["fat", "oil", "nuts", "avocado"].iter().any(|w| lower.contains(w)) {
        "fat-rich".to_string()
    } else {
        "balanced".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use std::sync::Mutex;

    /// Generator fed from a script of canned responses.
    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<String, GenerationError>>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(GenerationError::Empty)
            } else {
                responses.remove(0)
            }
        }
    }

    fn ctx(diet: DietaryPreference, conditions: &[&str]) -> PlanContext {
        PlanContext {
            name: "Asha Iyer".to_string(),
            dietary_preference: diet,
            medical_conditions: conditions.iter().map(|s| s.to_string()).collect(),
            latest_glucose: Some(120.0),
            recent_mood: Some("calm".to_string()),
            recent_meals: vec!["dal and rice".to_string()],
        }
    }

    fn valid_plan_json() -> String {
        serde_json::json!({
            "personalized_message": "Here you go",
            "glucose_analysis": "Looks stable",
            "suggestions": [
                {"meal_type": "Breakfast", "meal": "Oats", "macros": {"carb": 30, "protein": 12, "fat": 10, "calories": 280}, "benefits": "b", "timing": "7:00 AM"},
                {"meal_type": "Lunch", "meal": "Bowl", "macros": {"carb": 35, "protein": 25, "fat": 12, "calories": 320}, "benefits": "b", "timing": "12:30 PM"},
                {"meal_type": "Dinner", "meal": "Curry", "macros": {"carb": 40, "protein": 30, "fat": 15, "calories": 380}, "benefits": "b", "timing": "7:00 PM"}
            ]
        })
        .to_string()
    }

    #[test]
    fn clean_response_strips_fences_and_prose() {
        let fenced = format!("```json\n{}\n```", valid_plan_json());
        assert!(parse_plan(&clean_response(&fenced)).is_some());

        let chatty = format!("Sure! Here is your plan:\n{}\nEnjoy!", valid_plan_json());
        assert!(parse_plan(&clean_response(&chatty)).is_some());
    }

    #[test]
    fn well_formed_response_is_used_directly() {
        let generator = ScriptedGenerator::new(vec![Ok(valid_plan_json())]);
        let plan = generate_plan(&generator, &ctx(DietaryPreference::Vegetarian, &[]));
        assert!(!plan.fallback);
        assert_eq!(plan.suggestions.len(), 3);
        assert_eq!(plan.total_calories, 280 + 320 + 380);
    }

    #[test]
    fn fenced_response_recovered_on_retry_pipeline() {
        let generator = ScriptedGenerator::new(vec![Ok(format!(
            "```json\n{}\n```",
            valid_plan_json()
        ))]);
        let plan = generate_plan(&generator, &ctx(DietaryPreference::Vegan, &[]));
        assert!(!plan.fallback);
    }

    #[test]
    fn exhausted_retries_produce_fallback_with_notice() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerationError::Empty),
            Ok("not json at all".to_string()),
            Ok("Error: quota exceeded".to_string()),
        ]);
        let plan = generate_plan(&generator, &ctx(DietaryPreference::Vegetarian, &[]));
        assert!(plan.fallback);
        assert_eq!(plan.suggestions.len(), 3);
        assert!(plan.glucose_analysis.contains("AI generation is unavailable"));
    }

    #[test]
    fn fallback_is_idempotent_for_identical_context() {
        let ctx = ctx(DietaryPreference::NonVegetarian, &["Type 2 Diabetes", "Hypertension"]);
        let a = fallback_plan(&ctx);
        let b = fallback_plan(&ctx);
        assert_eq!(a.suggestions, b.suggestions);
        assert_eq!(a.total_calories, b.total_calories);
        assert_eq!(a.suggestions.len(), 3);
    }

    #[test]
    fn condition_modifiers_stack_in_fixed_order() {
        let plan = fallback_plan(&ctx(
            DietaryPreference::Vegetarian,
            &["Type 2 Diabetes", "Hypertension", "Arthritis", "Depression"],
        ));
        let breakfast = &plan.suggestions[0];
        // Diabetes swaps the base meal, the rest append in order.
        assert!(breakfast.meal.starts_with("Steel-cut oats"));
        assert!(breakfast.meal.contains("(low sodium)"));
        assert!(breakfast.meal.contains("turmeric"));
        assert!(breakfast.meal.contains("berries"));
        assert_eq!(breakfast.macros.carb, 20);
        let sodium = breakfast.meal.find("(low sodium)").unwrap();
        let turmeric = breakfast.meal.find("turmeric").unwrap();
        assert!(sodium < turmeric);
    }

    #[test]
    fn each_diet_has_a_distinct_base_template() {
        let veg = fallback_plan(&ctx(DietaryPreference::Vegetarian, &[]));
        let nonveg = fallback_plan(&ctx(DietaryPreference::NonVegetarian, &[]));
        let vegan = fallback_plan(&ctx(DietaryPreference::Vegan, &[]));
        assert_ne!(veg.suggestions[0].meal, nonveg.suggestions[0].meal);
        assert_ne!(veg.suggestions[0].meal, vegan.suggestions[0].meal);
    }

    #[test]
    fn nutrition_analysis_falls_back_deterministically() {
        let analysis = analyze_nutrition(&ScriptedGenerator::new(vec![]), "dal and rice");
        assert_eq!(analysis.estimated_calories, "300-500");
        assert!(analysis.analysis.contains("dal and rice"));
    }

    #[test]
    fn calorie_and_macro_extraction() {
        assert_eq!(extract_calories("roughly 350-450 calories"), "350-450");
        assert_eq!(extract_calories("about 400 calories total"), "400");
        assert_eq!(extract_calories("no estimate given"), "300-500");
        assert_eq!(extract_macro_focus("lots of chicken and fish"), "protein-rich");
        assert_eq!(extract_macro_focus("mostly rice and bread"), "carb-rich");
        assert_eq!(extract_macro_focus("nothing notable"), "balanced");
    }
}
