//! Configuration for the NOVA core.
//!
//! Two knobs matter: the glucose acceptance policy (the wide clinical
//! bound vs the strict consumer-facing bound) and the text-generation
//! backend. Everything loads from TOML with sensible defaults so the
//! assistant runs out of the box with generation disabled.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::NovaError;

/// Glucose acceptance policy.
///
/// Alert thresholds (critical/warning/normal/elevated) are fixed; only the
/// accepted input range is a policy decision. Readings outside the range
/// are rejected before anything touches storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlucosePolicy {
    /// Lowest accepted reading in mg/dL.
    pub min_accepted: f64,
    /// Highest accepted reading in mg/dL.
    pub max_accepted: f64,
}

impl GlucosePolicy {
    /// Wide clinical bound, 40-400 mg/dL.
    pub fn wide() -> Self {
        Self {
            min_accepted: 40.0,
            max_accepted: 400.0,
        }
    }

    /// Strict consumer-facing bound, 80-300 mg/dL.
    pub fn strict() -> Self {
        Self {
            min_accepted: 80.0,
            max_accepted: 300.0,
        }
    }

    pub fn accepts(&self, reading: f64) -> bool {
        reading >= self.min_accepted && reading <= self.max_accepted
    }
}

impl Default for GlucosePolicy {
    fn default() -> Self {
        Self::wide()
    }
}

/// Text-generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Whether the backend is enabled at all. Disabled means every AI
    /// answer comes from the deterministic fallback composers.
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible chat endpoint.
    /// Example: "http://127.0.0.1:11434/v1" (Ollama).
    pub base_url: String,

    /// Model name, e.g. "llama3".
    pub model: String,

    /// Environment variable holding the API key, if the endpoint needs one.
    pub api_key_env: Option<String>,

    /// Maximum tokens per response.
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            model: "llama3".to_string(),
            api_key_env: None,
            max_tokens: 800,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NovaConfig {
    pub glucose: GlucosePolicy,
    pub generation: GenerationConfig,
    /// Path of the sqlite database used by the CLI.
    pub db_path: Option<String>,
}

impl NovaConfig {
    /// Load from a TOML file; missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, NovaError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| NovaError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_policy_accepts_clinical_extremes() {
        let policy = GlucosePolicy::wide();
        assert!(policy.accepts(40.0));
        assert!(policy.accepts(400.0));
        assert!(!policy.accepts(39.9));
        assert!(!policy.accepts(400.1));
    }

    #[test]
    fn strict_policy_rejects_what_wide_accepts() {
        let policy = GlucosePolicy::strict();
        assert!(!policy.accepts(70.0));
        assert!(!policy.accepts(310.0));
        assert!(policy.accepts(120.0));
    }

    #[test]
    fn config_parses_partial_toml() {
        let config: NovaConfig =
            toml::from_str("[glucose]\nmin_accepted = 80.0\nmax_accepted = 300.0\n").unwrap();
        assert_eq!(config.glucose, GlucosePolicy::strict());
        assert!(!config.generation.enabled);
    }
}
