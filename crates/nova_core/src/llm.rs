//! Text-generation abstraction.
//!
//! The upstream call is modeled as a single stateless trait injected into
//! the core, which isolates it from credential and configuration
//! lifecycle. Output is text only, never executed, and the core treats
//! anything malformed as a soft failure with a deterministic fallback.

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// One prompt in, best-effort text out.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Backend that is never available. Drives every fallback path; also the
/// default when no generation backend is configured.
pub struct DisabledGenerator;

impl TextGenerator for DisabledGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Request body for an OpenAI-compatible chat endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str =
    "You are NOVA, a caring healthcare assistant. Answer concisely and warmly. \
     Remind users to consult professionals for serious medical concerns.";

/// Blocking HTTP backend against an OpenAI-compatible chat endpoint
/// (Ollama, or a remote provider when an API key env var is configured).
pub struct HttpGenerator {
    client: reqwest::blocking::Client,
    config: GenerationConfig,
}

impl HttpGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            config,
        }
    }
}

impl TextGenerator for HttpGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if !self.config.enabled {
            return Err(GenerationError::Disabled);
        }

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(env_name) = &self.config.api_key_env {
            if let Ok(key) = std::env::var(env_name) {
                builder = builder.bearer_auth(key);
            }
        }

        let resp = builder
            .send()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(GenerationError::Http(format!("{status}: {body}")));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        vet_output(text)
    }
}

/// Screen raw backend output. Empty or error-shaped strings (some
/// backends report failures in-band rather than via status codes) count
/// as generation failures so callers fall back deterministically.
pub fn vet_output(text: String) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Empty);
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with("error:") || lower.starts_with("llm error") || lower.contains("quota exceeded")
    {
        return Err(GenerationError::ErrorShaped(trimmed.to_string()));
    }
    Ok(text)
}
