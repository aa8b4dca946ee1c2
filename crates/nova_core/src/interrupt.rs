//! Interrupt handling: emergencies and general questions.
//!
//! Both are digressions - they answer without touching the flow pointer,
//! then nudge the user back toward the step they left.

use tracing::debug;

use crate::classifier::QueryClassifier;
use crate::flow::FlowStep;
use crate::llm::{vet_output, TextGenerator};
use crate::types::User;

/// Hard-coded emergency response. Never generated, never delayed by a
/// network call.
pub fn emergency_message() -> String {
    "EMERGENCY DETECTED\n\n\
     IMMEDIATE ACTION REQUIRED:\n\
     - Call your local emergency services (911) right now\n\
     - Do not delay seeking medical attention\n\
     - Stay calm and follow the dispatcher's instructions\n\n\
     This is a serious situation requiring immediate professional medical care."
        .to_string()
}

/// Answer to a general/interrupt query.
#[derive(Debug, Clone)]
pub struct InterruptReply {
    pub message: String,
    pub query_type: String,
    pub routing_suggestion: String,
}

/// Answer a free-form question with user context, falling back to a static
/// empathetic message when generation is unavailable. Always carries a
/// routing suggestion pointing back into the flow.
pub fn handle_general_query(
    generator: &dyn TextGenerator,
    classifier: &QueryClassifier,
    user: &User,
    current_step: FlowStep,
    query: &str,
) -> InterruptReply {
    let prompt = build_query_prompt(user, current_step, query);

    let message = match generator.generate(&prompt).and_then(vet_output) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(error = %e, "general query answered with static fallback");
            format!(
                "I understand you're asking about: {query}\n\n\
                 I'm here to help! Let's continue with your health tracking journey."
            )
        }
    };

    InterruptReply {
        message,
        query_type: classifier.query_type(query).to_string(),
        routing_suggestion: routing_suggestion(query, current_step),
    }
}

fn build_query_prompt(user: &User, current_step: FlowStep, query: &str) -> String {
    format!(
        "You are NOVA, a caring healthcare assistant. User {name} asked: \"{query}\"\n\n\
         CONTEXT:\n\
         - Current flow step: {step}\n\
         - Dietary preference: {diet}\n\
         - Medical conditions: {conditions}\n\n\
         INSTRUCTIONS:\n\
         1. Provide a helpful, accurate, empathetic response\n\
         2. Keep it to 2-3 sentences\n\
         3. After answering, gently guide them back to health tracking\n\
         4. For medical questions, remind them to consult professionals for serious concerns",
        name = user.full_name(),
        step = current_step,
        diet = user.dietary_preference,
        conditions = user.conditions_summary(),
    )
}

/// Where to send the user after the digression. Query vocabulary wins;
/// otherwise point at the step they are currently on.
pub fn routing_suggestion(query: &str, current_step: FlowStep) -> String {
    let lower = query.to_lowercase();
    if lower.contains("mood") || lower.contains("feeling") {
        "Let's log your mood first to track your emotional well-being.".to_string()
    } else if lower.contains("glucose") || lower.contains("blood sugar") || lower.contains("cgm") {
        "How about checking your glucose levels? Please share your latest CGM reading.".to_string()
    } else if lower.contains("food") || lower.contains("meal") || lower.contains("eat") {
        "Would you like to log your recent meal? Tell me what you ate.".to_string()
    } else if lower.contains("plan") || lower.contains("diet") {
        "Ready to generate your personalized meal plan?".to_string()
    } else {
        current_step.prompt().to_string()
    }
}
