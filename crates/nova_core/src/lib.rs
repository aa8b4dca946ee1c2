//! NOVA core - conversational health-tracking assistant.
//!
//! The interesting part is the dialogue orchestration layer: classify
//! free-form text against the user's position in a fixed multi-step flow,
//! detect interrupts (emergencies first, always before any generation
//! call), and fall back deterministically when the upstream text
//! generation fails or returns malformed output.

pub mod classifier;
pub mod config;
pub mod error;
pub mod feedback;
pub mod flow;
pub mod interrupt;
pub mod llm;
pub mod mealplan;
pub mod orchestrator;
pub mod seed;
pub mod store;
pub mod types;
pub mod validators;

pub use classifier::{ClassifiedQuery, HealthTopic, QueryClassifier, StructuredCommand};
pub use config::{GenerationConfig, GlucosePolicy, NovaConfig};
pub use error::{GenerationError, NovaError, ValidationError};
pub use flow::{FlowStep, FlowState, FlowTracker};
pub use llm::{DisabledGenerator, HttpGenerator, TextGenerator};
pub use mealplan::{MealPlan, MealSuggestion, NutritionAnalysis};
pub use orchestrator::{Orchestrator, ProcessOutcome};
pub use store::{HealthStore, MemoryStore, SqliteStore};
pub use types::{ActionPayload, ActionResult, DietaryPreference, User};
pub use validators::AlertLevel;
