//! Flow/step tracker.
//!
//! One small state machine owns every transition: greeting -> mood ->
//! glucose -> food -> meal_plan -> complete. Handlers never invent a next
//! step; they report which action succeeded and the tracker moves the
//! pointer. Interrupts leave the pointer untouched so the user always
//! returns to where they left off.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Position in the fixed health-tracking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Greeting,
    Mood,
    Glucose,
    Food,
    MealPlan,
    Complete,
}

impl FlowStep {
    /// Step reached after the action for this step succeeds.
    /// Meal plan generation is idempotent: complete stays complete.
    pub fn next(&self) -> Self {
        match self {
            Self::Greeting => Self::Mood,
            Self::Mood => Self::Glucose,
            Self::Glucose => Self::Food,
            Self::Food => Self::MealPlan,
            Self::MealPlan => Self::Complete,
            Self::Complete => Self::Complete,
        }
    }

    /// The prompt nudging the user into this step.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Greeting => "Send an empty message to get started.",
            Self::Mood => "Let's begin by checking your current mood. How are you feeling?",
            Self::Glucose => "Let's check your glucose levels! Please share your latest CGM reading.",
            Self::Food => "Let's log your recent meal! What did you eat?",
            Self::MealPlan => {
                "Ready for meal planning? Ask for a personalized meal plan based on your health profile!"
            }
            Self::Complete => {
                "You're all set for today! You can keep logging or ask for a fresh meal plan any time."
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Mood => "mood",
            Self::Glucose => "glucose",
            Self::Food => "food",
            Self::MealPlan => "meal_plan",
            Self::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "greeting" => Some(Self::Greeting),
            "mood" => Some(Self::Mood),
            "glucose" => Some(Self::Glucose),
            "food" => Some(Self::Food),
            "meal_plan" => Some(Self::MealPlan),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user session state: current step plus a free-form context map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    pub step: FlowStep,
    pub context: HashMap<String, String>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            step: FlowStep::Greeting,
            context: HashMap::new(),
        }
    }
}

/// In-process session store, keyed by user id.
///
/// Lives for the orchestrator's lifetime only; a new session starts fresh
/// at greeting. Concurrent requests for the same user are not serialized -
/// accepted for this conversational, low-throughput workload.
#[derive(Debug, Default)]
pub struct FlowTracker {
    states: HashMap<i64, FlowState>,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step for a user, starting a session at greeting if unseen.
    pub fn step(&mut self, user_id: i64) -> FlowStep {
        self.states.entry(user_id).or_default().step
    }

    /// Record a successful action: the pointer moves to the successor of
    /// the step the action belongs to, wherever the user was before.
    pub fn record_success(&mut self, user_id: i64, action: FlowStep) -> FlowStep {
        let state = self.states.entry(user_id).or_default();
        state.step = action.next();
        state.step
    }

    /// Failed validation or an interrupt: pointer stays put.
    pub fn current(&mut self, user_id: i64) -> FlowStep {
        self.step(user_id)
    }

    /// Stash a context value for the session.
    pub fn set_context(&mut self, user_id: i64, key: &str, value: String) {
        self.states
            .entry(user_id)
            .or_default()
            .context
            .insert(key.to_string(), value);
    }

    /// Drop a user's session entirely.
    pub fn reset(&mut self, user_id: i64) {
        self.states.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_fixed_order() {
        assert_eq!(FlowStep::Greeting.next(), FlowStep::Mood);
        assert_eq!(FlowStep::Mood.next(), FlowStep::Glucose);
        assert_eq!(FlowStep::Glucose.next(), FlowStep::Food);
        assert_eq!(FlowStep::Food.next(), FlowStep::MealPlan);
        assert_eq!(FlowStep::MealPlan.next(), FlowStep::Complete);
        assert_eq!(FlowStep::Complete.next(), FlowStep::Complete);
    }

    #[test]
    fn new_sessions_start_at_greeting() {
        let mut tracker = FlowTracker::new();
        assert_eq!(tracker.step(1), FlowStep::Greeting);
    }

    #[test]
    fn success_advances_and_failure_does_not() {
        let mut tracker = FlowTracker::new();
        tracker.record_success(1, FlowStep::Greeting);
        assert_eq!(tracker.step(1), FlowStep::Mood);

        tracker.record_success(1, FlowStep::Mood);
        assert_eq!(tracker.step(1), FlowStep::Glucose);

        // An interrupt or failed validation reads the current step only.
        assert_eq!(tracker.current(1), FlowStep::Glucose);
        assert_eq!(tracker.step(1), FlowStep::Glucose);
    }

    #[test]
    fn users_track_independently() {
        let mut tracker = FlowTracker::new();
        tracker.record_success(1, FlowStep::Mood);
        assert_eq!(tracker.step(1), FlowStep::Glucose);
        assert_eq!(tracker.step(2), FlowStep::Greeting);
    }

    #[test]
    fn step_names_round_trip() {
        for step in [
            FlowStep::Greeting,
            FlowStep::Mood,
            FlowStep::Glucose,
            FlowStep::Food,
            FlowStep::MealPlan,
            FlowStep::Complete,
        ] {
            assert_eq!(FlowStep::from_str(step.as_str()), Some(step));
        }
    }
}
