//! Error types for NOVA.

use thiserror::Error;

/// Top-level error for core operations.
///
/// Validation and user-existence failures are *not* errors: they travel
/// inside `ActionResult { ok: false, .. }` so the conversational surface
/// never sees a raw failure. This enum covers the genuinely exceptional
/// paths (storage, IO, config).
#[derive(Error, Debug)]
pub enum NovaError {
    #[error("Unknown user id {0}")]
    InvalidUser(i64),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Domain validation failures, recovered by returning a corrective prompt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid mood '{label}'. Please choose from: {accepted}")]
    InvalidMood { label: String, accepted: String },

    #[error("Invalid glucose reading: {reading} mg/dL. Please enter a value between {min}-{max} mg/dL.")]
    OutOfRange { reading: f64, min: f64, max: f64 },

    #[error("Invalid glucose reading. Please enter a number.")]
    InvalidFormat,

    #[error("Please provide a description of your food intake.")]
    EmptyDescription,
}

/// Upstream text-generation failures.
///
/// Never surfaced to the end user as a hard failure: every caller has a
/// deterministic fallback path.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Text generation backend is disabled")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Generation returned empty output")]
    Empty,

    #[error("Generation returned an error-shaped response: {0}")]
    ErrorShaped(String),
}
