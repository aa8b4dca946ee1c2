//! Dialogue orchestrator.
//!
//! Composes validator + feedback + persistence + flow tracking behind one
//! entry point: `process(user_id, text)`. Routing for a given (flow state,
//! text) pair is fully deterministic; only the *content* of meal-plan and
//! general answers may come from the generation backend.
//!
//! Side-effect contract: exactly one log insert per successful domain
//! action; none on validation failure or interrupt handling. Validation
//! runs strictly before any write, so a store failure leaves no partial
//! state.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{ClassifiedQuery, HealthTopic, QueryClassifier, StructuredCommand};
use crate::config::NovaConfig;
use crate::error::{NovaError, ValidationError};
use crate::feedback;
use crate::flow::{FlowStep, FlowTracker};
use crate::interrupt::{self, InterruptReply};
use crate::llm::TextGenerator;
use crate::mealplan::{self, PlanContext};
use crate::store::HealthStore;
use crate::types::{ActionPayload, ActionResult, FoodRecord, GlucoseRecord, MoodRecord, User};
use crate::validators;

/// Generic failure shown when storage misbehaves. The validator already
/// ran, so nothing partial was written.
const STORE_FAILURE_MESSAGE: &str =
    "Something went wrong while saving your entry. Please try again.";

/// Result of one `process` call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    /// Which handler ran: greeting, mood, glucose, food, meal_plan,
    /// emergency, general, or error.
    pub step: String,
    pub result: ActionResult,
    /// Convenience copy of `result.message`.
    pub message: String,
    /// Where the flow pointer stands after this call.
    pub next_step: FlowStep,
}

/// The conversational core. One instance per process; flow state lives
/// for its lifetime only.
pub struct Orchestrator {
    store: Box<dyn HealthStore>,
    generator: Box<dyn TextGenerator>,
    classifier: QueryClassifier,
    config: NovaConfig,
    flows: FlowTracker,
}

impl Orchestrator {
    pub fn new(
        store: Box<dyn HealthStore>,
        generator: Box<dyn TextGenerator>,
        config: NovaConfig,
    ) -> Self {
        Self {
            store,
            generator,
            classifier: QueryClassifier::new(),
            config,
            flows: FlowTracker::new(),
        }
    }

    /// Main entry point: route free-form text for a user.
    pub fn process(&mut self, user_id: i64, text: &str) -> ProcessOutcome {
        let user = match self.store.get_user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                return self.outcome(
                    user_id,
                    "error",
                    ActionResult::failure(format!(
                        "Invalid user ID: {user_id}. Please enter a valid user ID (1-100) to continue."
                    )),
                );
            }
            Err(e) => {
                warn!(user_id, error = %e, "user lookup failed");
                return self.outcome(user_id, "error", ActionResult::failure(STORE_FAILURE_MESSAGE));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            let result = self.greet_user(&user);
            return self.outcome(user_id, "greeting", result);
        }

        match self.classifier.classify(text) {
            // Priority guarantee: emergencies never reach the generator or
            // any other handler.
            ClassifiedQuery::Emergency => {
                info!(user_id, "emergency keywords detected");
                let result = ActionResult::success(
                    interrupt::emergency_message(),
                    ActionPayload::Emergency,
                );
                self.outcome(user_id, "emergency", result)
            }
            ClassifiedQuery::Command(command) => self.dispatch_command(user_id, &user, command),
            ClassifiedQuery::Health(topic) => self.dispatch_topic(user_id, &user, topic, text),
            ClassifiedQuery::General => self.continue_or_interrupt(user_id, &user, text),
        }
    }

    fn dispatch_command(
        &mut self,
        user_id: i64,
        user: &User,
        command: StructuredCommand,
    ) -> ProcessOutcome {
        match command {
            StructuredCommand::Mood(label) => {
                let result = self.record_mood(user, &label);
                self.outcome(user_id, "mood", result)
            }
            StructuredCommand::Glucose(raw) => {
                let result = self.record_glucose_raw(user, &raw);
                self.outcome(user_id, "glucose", result)
            }
            StructuredCommand::Food(description) => {
                let result = self.record_food(user, &description);
                self.outcome(user_id, "food", result)
            }
        }
    }

    fn dispatch_topic(
        &mut self,
        user_id: i64,
        user: &User,
        topic: HealthTopic,
        text: &str,
    ) -> ProcessOutcome {
        match topic {
            HealthTopic::Mood => {
                // Prefer a recognized label inside the sentence; otherwise
                // let the validator produce the corrective prompt.
                let label = self
                    .classifier
                    .extract_mood_label(text)
                    .unwrap_or_else(|| text.to_string());
                let result = self.record_mood(user, &label);
                self.outcome(user_id, "mood", result)
            }
            HealthTopic::Glucose => match self.classifier.extract_reading(text) {
                Some(reading) => {
                    let result = self.record_glucose(user, reading);
                    self.outcome(user_id, "glucose", result)
                }
                None => {
                    let result =
                        ActionResult::failure(ValidationError::InvalidFormat.to_string());
                    self.outcome(user_id, "glucose", result)
                }
            },
            HealthTopic::Food => {
                let result = self.record_food(user, text);
                self.outcome(user_id, "food", result)
            }
            HealthTopic::MealPlan => {
                let result = self.build_meal_plan(user);
                self.outcome(user_id, "meal_plan", result)
            }
        }
    }

    /// No keyword matched. Before treating the text as a general question,
    /// see whether it is a bare answer to the current step's prompt.
    fn continue_or_interrupt(&mut self, user_id: i64, user: &User, text: &str) -> ProcessOutcome {
        match self.flows.current(user_id) {
            FlowStep::Mood => {
                if let Some(label) = self.classifier.extract_mood_label(text) {
                    let result = self.record_mood(user, &label);
                    return self.outcome(user_id, "mood", result);
                }
            }
            FlowStep::Glucose => {
                if let Ok(reading) = text.trim().parse::<f64>() {
                    let result = self.record_glucose(user, reading);
                    return self.outcome(user_id, "glucose", result);
                }
            }
            _ => {}
        }

        let current = self.flows.current(user_id);
        let reply = interrupt::handle_general_query(
            self.generator.as_ref(),
            &self.classifier,
            user,
            current,
            text,
        );
        let result = interrupt_result(reply);
        self.outcome(user_id, "general", result)
    }

    fn outcome(&mut self, user_id: i64, step: &str, result: ActionResult) -> ProcessOutcome {
        ProcessOutcome {
            step: step.to_string(),
            message: result.message.clone(),
            next_step: self.flows.current(user_id),
            result,
        }
    }

    // ========================================================================
    // Direct entry points (usable without full orchestration)
    // ========================================================================

    /// Personalized greeting; starts the flow at the mood step.
    pub fn greet(&mut self, user_id: i64) -> ActionResult {
        match self.require_user(user_id) {
            Ok(user) => self.greet_user(&user),
            Err(result) => result,
        }
    }

    /// Validate and log a mood label.
    pub fn log_mood(&mut self, user_id: i64, label: &str) -> ActionResult {
        match self.require_user(user_id) {
            Ok(user) => self.record_mood(&user, label),
            Err(result) => result,
        }
    }

    /// Validate and log a glucose reading given as raw text.
    pub fn log_glucose(&mut self, user_id: i64, raw: &str) -> ActionResult {
        match self.require_user(user_id) {
            Ok(user) => self.record_glucose_raw(&user, raw),
            Err(result) => result,
        }
    }

    /// Validate and log a meal description.
    pub fn log_food(&mut self, user_id: i64, description: &str) -> ActionResult {
        match self.require_user(user_id) {
            Ok(user) => self.record_food(&user, description),
            Err(result) => result,
        }
    }

    /// Generate (or deterministically compose) a meal plan.
    pub fn generate_meal_plan(&mut self, user_id: i64) -> ActionResult {
        match self.require_user(user_id) {
            Ok(user) => self.build_meal_plan(&user),
            Err(result) => result,
        }
    }

    pub fn mood_history(&self, user_id: i64, limit: usize) -> Result<Vec<MoodRecord>, NovaError> {
        self.store.mood_history(user_id, limit)
    }

    pub fn glucose_history(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<GlucoseRecord>, NovaError> {
        self.store.glucose_history(user_id, limit)
    }

    pub fn food_history(&self, user_id: i64, limit: usize) -> Result<Vec<FoodRecord>, NovaError> {
        self.store.food_history(user_id, limit)
    }

    /// Current flow step for a user session.
    pub fn current_step(&mut self, user_id: i64) -> FlowStep {
        self.flows.current(user_id)
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    fn require_user(&mut self, user_id: i64) -> Result<User, ActionResult> {
        match self.store.get_user(user_id) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(ActionResult::failure(format!(
                "Invalid user ID: {user_id}. Please enter a valid user ID (1-100) to continue."
            ))),
            Err(e) => {
                warn!(user_id, error = %e, "user lookup failed");
                Err(ActionResult::failure(STORE_FAILURE_MESSAGE))
            }
        }
    }

    fn greet_user(&mut self, user: &User) -> ActionResult {
        let mut message = format!(
            "Hello {}! Welcome to NOVA!\n\nLocation: {}\nDiet: {}",
            user.full_name(),
            user.city,
            user.dietary_preference,
        );
        if !user.medical_conditions.is_empty() {
            message.push_str(&format!("\nHealth focus: {}", user.conditions_summary()));
        }
        let next = self.flows.record_success(user.id, FlowStep::Greeting);
        message.push_str(&format!(
            "\n\nReady to start your health journey today? {}",
            next.prompt()
        ));

        ActionResult::success(
            message,
            ActionPayload::Greeting {
                user_id: user.id,
                name: user.full_name(),
                city: user.city.clone(),
                dietary_preference: user.dietary_preference,
                medical_conditions: user.medical_conditions.clone(),
            },
        )
    }

    fn record_mood(&mut self, user: &User, label: &str) -> ActionResult {
        let assessment = match validators::validate_mood(label) {
            Ok(assessment) => assessment,
            Err(e) => return ActionResult::failure(e.to_string()),
        };

        let timestamp = Utc::now().to_rfc3339();
        if let Err(e) =
            self.store
                .insert_mood(user.id, &assessment.label, assessment.score, &timestamp)
        {
            warn!(user_id = user.id, error = %e, "mood insert failed");
            return ActionResult::failure(STORE_FAILURE_MESSAGE);
        }

        let rolling_average = self.store.mood_average(user.id, 7).unwrap_or_default();
        let next = self.flows.record_success(user.id, FlowStep::Mood);

        let message = feedback::with_mood_average(
            feedback::mood_feedback(&assessment),
            rolling_average,
        );
        info!(user_id = user.id, mood = %assessment.label, score = assessment.score, "mood logged");

        ActionResult::success(
            format!("{message}\n\nNext: {}", next.prompt()),
            ActionPayload::Mood {
                label: assessment.label,
                score: assessment.score,
                rolling_average,
            },
        )
    }

    fn record_glucose_raw(&mut self, user: &User, raw: &str) -> ActionResult {
        match raw.trim().parse::<f64>() {
            Ok(reading) => self.record_glucose(user, reading),
            Err(_) => ActionResult::failure(ValidationError::InvalidFormat.to_string()),
        }
    }

    fn record_glucose(&mut self, user: &User, reading: f64) -> ActionResult {
        let assessment = match validators::validate_glucose_value(reading, &self.config.glucose) {
            Ok(assessment) => assessment,
            Err(e) => return ActionResult::failure(e.to_string()),
        };

        let timestamp = Utc::now().to_rfc3339();
        if let Err(e) = self.store.insert_glucose(
            user.id,
            assessment.reading,
            assessment.alert_level.as_str(),
            &timestamp,
        ) {
            warn!(user_id = user.id, error = %e, "glucose insert failed");
            return ActionResult::failure(STORE_FAILURE_MESSAGE);
        }

        let average_reading = self.store.glucose_average(user.id, 7).unwrap_or_default();
        let next = self.flows.record_success(user.id, FlowStep::Glucose);

        let message = feedback::with_glucose_average(
            feedback::glucose_feedback(&assessment),
            average_reading,
        );
        info!(
            user_id = user.id,
            reading = assessment.reading,
            alert_level = %assessment.alert_level,
            "glucose logged"
        );

        ActionResult::success(
            format!("{message}\n\nNext: {}", next.prompt()),
            ActionPayload::Glucose {
                reading: assessment.reading,
                alert_level: assessment.alert_level.as_str().to_string(),
                average_reading,
            },
        )
    }

    fn record_food(&mut self, user: &User, description: &str) -> ActionResult {
        let description = match validators::validate_food(description) {
            Ok(description) => description,
            Err(e) => return ActionResult::failure(e.to_string()),
        };

        let nutrition = mealplan::analyze_nutrition(self.generator.as_ref(), &description);
        let nutrition_json = serde_json::to_string(&nutrition).unwrap_or_else(|_| "{}".to_string());

        let timestamp = Utc::now().to_rfc3339();
        if let Err(e) = self
            .store
            .insert_food(user.id, &description, &nutrition_json, &timestamp)
        {
            warn!(user_id = user.id, error = %e, "food insert failed");
            return ActionResult::failure(STORE_FAILURE_MESSAGE);
        }

        let next = self.flows.record_success(user.id, FlowStep::Food);
        info!(user_id = user.id, "food logged");

        ActionResult::success(
            format!(
                "Food logged: {description}\n\nNutritional analysis:\n{}\n\nNext: {}",
                nutrition.analysis,
                next.prompt()
            ),
            ActionPayload::Food {
                description,
                nutrition,
            },
        )
    }

    fn build_meal_plan(&mut self, user: &User) -> ActionResult {
        let ctx = PlanContext {
            name: user.full_name(),
            dietary_preference: user.dietary_preference,
            medical_conditions: user.medical_conditions.clone(),
            latest_glucose: self.store.latest_glucose(user.id, 1).unwrap_or_default(),
            recent_mood: self.store.latest_mood(user.id, 1).unwrap_or_default(),
            recent_meals: self
                .store
                .food_history(user.id, 3)
                .map(|rows| rows.into_iter().map(|r| r.description).collect())
                .unwrap_or_default(),
        };

        let plan = mealplan::generate_plan(self.generator.as_ref(), &ctx);
        let next = self.flows.record_success(user.id, FlowStep::MealPlan);

        let mut message = plan.personalized_message.clone();
        if plan.fallback {
            message.push_str(
                "\n\nNote: AI generation is currently unavailable, so this plan was \
                 composed from your health profile.",
            );
        }
        message.push_str(&format!("\n\n{}", next.prompt()));
        info!(user_id = user.id, fallback = plan.fallback, "meal plan produced");

        ActionResult::success(message, ActionPayload::MealPlan(plan))
    }
}

fn interrupt_result(reply: InterruptReply) -> ActionResult {
    ActionResult::success(
        format!("{}\n\n{}", reply.message, reply.routing_suggestion),
        ActionPayload::Interrupt {
            query_type: reply.query_type,
            routing_suggestion: reply.routing_suggestion,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledGenerator;
    use crate::store::MemoryStore;
    use crate::types::DietaryPreference;

    fn sample_user(id: i64) -> User {
        User {
            id,
            first_name: "Asha".to_string(),
            last_name: "Iyer".to_string(),
            city: "Pune".to_string(),
            dietary_preference: DietaryPreference::Vegetarian,
            medical_conditions: vec!["Type 2 Diabetes".to_string()],
            physical_limitations: vec![],
        }
    }

    fn orchestrator() -> Orchestrator {
        let store = MemoryStore::with_users(vec![sample_user(1)]);
        Orchestrator::new(
            Box::new(store),
            Box::new(DisabledGenerator),
            NovaConfig::default(),
        )
    }

    #[test]
    fn unknown_user_gets_invalid_user_result() {
        let mut orch = orchestrator();
        let outcome = orch.process(42, "mood: happy");
        assert_eq!(outcome.step, "error");
        assert!(!outcome.result.ok);
        assert!(outcome.message.contains("Invalid user ID"));
        assert_eq!(outcome.next_step, FlowStep::Greeting);
    }

    #[test]
    fn empty_text_greets_and_advances_to_mood() {
        let mut orch = orchestrator();
        let outcome = orch.process(1, "");
        assert_eq!(outcome.step, "greeting");
        assert!(outcome.result.ok);
        assert!(outcome.message.contains("Asha Iyer"));
        assert!(outcome.message.contains("Type 2 Diabetes"));
        assert_eq!(outcome.next_step, FlowStep::Mood);
    }

    #[test]
    fn bare_mood_label_continues_the_flow() {
        let mut orch = orchestrator();
        orch.process(1, "");
        let outcome = orch.process(1, "calm");
        assert_eq!(outcome.step, "mood");
        assert!(outcome.result.ok);
        assert_eq!(outcome.next_step, FlowStep::Glucose);
    }

    #[test]
    fn bare_number_at_glucose_step_logs_a_reading() {
        let mut orch = orchestrator();
        orch.process(1, "");
        orch.process(1, "mood: happy");
        let outcome = orch.process(1, "120");
        assert_eq!(outcome.step, "glucose");
        assert!(outcome.result.ok);
        assert_eq!(outcome.next_step, FlowStep::Food);
    }

    #[test]
    fn failed_validation_keeps_the_flow_state() {
        let mut orch = orchestrator();
        orch.process(1, "");
        let outcome = orch.process(1, "mood: ecstatic");
        assert!(!outcome.result.ok);
        assert!(outcome.message.contains("happy"));
        assert_eq!(outcome.next_step, FlowStep::Mood);
    }

    #[test]
    fn store_failure_does_not_advance_flow() {
        struct FailingStore(MemoryStore);
        impl HealthStore for FailingStore {
            fn get_user(&self, user_id: i64) -> Result<Option<User>, NovaError> {
                self.0.get_user(user_id)
            }
            fn insert_user(&self, user: &User) -> Result<(), NovaError> {
                self.0.insert_user(user)
            }
            fn user_count(&self) -> Result<i64, NovaError> {
                self.0.user_count()
            }
            fn insert_mood(&self, _: i64, _: &str, _: i64, _: &str) -> Result<(), NovaError> {
                Err(NovaError::Persistence("disk full".into()))
            }
            fn insert_glucose(&self, _: i64, _: f64, _: &str, _: &str) -> Result<(), NovaError> {
                Err(NovaError::Persistence("disk full".into()))
            }
            fn insert_food(&self, _: i64, _: &str, _: &str, _: &str) -> Result<(), NovaError> {
                Err(NovaError::Persistence("disk full".into()))
            }
            fn mood_history(&self, u: i64, l: usize) -> Result<Vec<MoodRecord>, NovaError> {
                self.0.mood_history(u, l)
            }
            fn glucose_history(&self, u: i64, l: usize) -> Result<Vec<GlucoseRecord>, NovaError> {
                self.0.glucose_history(u, l)
            }
            fn food_history(&self, u: i64, l: usize) -> Result<Vec<FoodRecord>, NovaError> {
                self.0.food_history(u, l)
            }
            fn latest_glucose(&self, u: i64, d: i64) -> Result<Option<f64>, NovaError> {
                self.0.latest_glucose(u, d)
            }
            fn latest_mood(&self, u: i64, d: i64) -> Result<Option<String>, NovaError> {
                self.0.latest_mood(u, d)
            }
            fn mood_average(&self, u: i64, d: i64) -> Result<Option<f64>, NovaError> {
                self.0.mood_average(u, d)
            }
            fn glucose_average(&self, u: i64, d: i64) -> Result<Option<f64>, NovaError> {
                self.0.glucose_average(u, d)
            }
        }

        let store = FailingStore(MemoryStore::with_users(vec![sample_user(1)]));
        let mut orch = Orchestrator::new(
            Box::new(store),
            Box::new(DisabledGenerator),
            NovaConfig::default(),
        );
        let outcome = orch.process(1, "mood: happy");
        assert!(!outcome.result.ok);
        assert_eq!(outcome.message, STORE_FAILURE_MESSAGE);
        assert_eq!(outcome.next_step, FlowStep::Greeting);
    }

    #[test]
    fn meal_plan_completes_the_flow_even_without_generation() {
        let mut orch = orchestrator();
        let outcome = orch.process(1, "give me a meal plan");
        assert_eq!(outcome.step, "meal_plan");
        assert!(outcome.result.ok);
        assert_eq!(outcome.next_step, FlowStep::Complete);
        match outcome.result.payload {
            Some(ActionPayload::MealPlan(plan)) => {
                assert!(plan.fallback);
                assert_eq!(plan.suggestions.len(), 3);
            }
            other => panic!("expected meal plan payload, got {other:?}"),
        }
    }
}
