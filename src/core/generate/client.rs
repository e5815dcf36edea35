//! LLM client seam and its retry policy.
//!
//! The pipeline only sees [`ContentGenerator`]; the production
//! implementation is [`OpenAiGenerator`], a blocking chat-completions call.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::GeneratorConfig;
use super::prompt::Prompt;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("rate limited by the API")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API returned no content")]
    EmptyResponse,

    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
}

impl GenerateError {
    /// Worth another attempt under the retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Transport(_) | Self::EmptyResponse => true,
            Self::Api { status, .. } => *status >= 500,
            Self::MissingApiKey(_) => false,
        }
    }
}

/// Turns a prompt into markdown body text.
pub trait ContentGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerateError>;
}

/// Bounded retry: rate limits back off exponentially from `base_delay`,
/// other transient failures wait `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after zero-based `attempt` failed with `err`.
    pub fn delay_for(&self, err: &GenerateError, attempt: u32) -> Duration {
        match err {
            GenerateError::RateLimited => self.base_delay * 2u32.saturating_pow(attempt),
            _ => self.base_delay,
        }
    }

    /// Call `generator` until it succeeds, fails permanently, or attempts
    /// run out. The last error is returned.
    pub fn run(
        &self,
        generator: &dyn ContentGenerator,
        prompt: &Prompt,
    ) -> Result<String, GenerateError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match generator.generate(prompt) {
                Ok(text) => return Ok(text),
                Err(e) if !e.is_transient() => {
                    error!("Generation failed permanently: {e}");
                    return Err(e);
                }
                Err(e) if attempt + 1 >= attempts => {
                    error!("Generation failed after {attempts} attempts: {e}");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(&e, attempt);
                    warn!(attempt = attempt + 1, ?delay, "Generation failed, retrying: {e}");
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug)]
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    /// Build from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey(config.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

impl ContentGenerator for OpenAiGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, chars = prompt.user.len(), "Calling chat completions");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = resp.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)
    }
}
