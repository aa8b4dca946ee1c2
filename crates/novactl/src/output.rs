//! Terminal rendering for action results and meal plans.

use owo_colors::OwoColorize;

use nova_core::mealplan::MealPlan;
use nova_core::types::{ActionPayload, ActionResult};
use nova_core::ProcessOutcome;

/// Render a direct-entry-point result.
pub fn render_result(result: &ActionResult) {
    if result.ok {
        println!("{}", result.message);
    } else {
        println!("{} {}", "!".red().bold(), result.message);
    }
    if let Some(ActionPayload::MealPlan(plan)) = &result.payload {
        render_meal_plan(plan);
    }
}

/// Render one chat turn.
pub fn render_outcome(outcome: &ProcessOutcome) {
    let tag = format!("[{}]", outcome.step);
    if outcome.result.ok {
        println!("{} {}", tag.dimmed(), outcome.message);
    } else {
        println!("{} {} {}", tag.dimmed(), "!".red().bold(), outcome.message);
    }
    if let Some(ActionPayload::MealPlan(plan)) = &outcome.result.payload {
        render_meal_plan(plan);
    }
}

fn render_meal_plan(plan: &MealPlan) {
    println!();
    if !plan.glucose_analysis.is_empty() {
        println!("{}", plan.glucose_analysis.italic());
        println!();
    }
    for suggestion in &plan.suggestions {
        println!(
            "{} ({})  {}",
            suggestion.meal_type.green().bold(),
            suggestion.timing,
            suggestion.meal
        );
        println!(
            "    carbs {}g | protein {}g | fat {}g | {} kcal",
            suggestion.macros.carb,
            suggestion.macros.protein,
            suggestion.macros.fat,
            suggestion.macros.calories
        );
        if !suggestion.benefits.is_empty() {
            println!("    {}", suggestion.benefits.dimmed());
        }
    }
    println!();
    println!("Total: {} kcal", plan.total_calories.to_string().bold());
    if plan.fallback {
        println!("{}", "(composed offline from your health profile)".dimmed());
    }
}
