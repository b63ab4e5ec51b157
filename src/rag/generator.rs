//! Generation backends.
//!
//! The orchestrator only ever hands over a finished prompt. Any failure on
//! this side, including timeouts and bad responses, surfaces as
//! `GenerationUnavailable` so callers can retry generation alone.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::config::{GenerationConfig, API_KEY_ENV};
use crate::core::error::{EngineError, Result};

/// Turns a prompt into answer text
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Short name for logs and CLI output
    fn name(&self) -> &str;
}

/// OpenAI-compatible chat completions endpoint
pub struct OpenAiGenerator {
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: Client,
}

impl OpenAiGenerator {
    /// Build from config, reading the key from `JOBMATCH_API_KEY`
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EngineError::GenerationUnavailable(format!("{API_KEY_ENV} is not set"))
            })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                EngineError::GenerationUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            api_key,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        let value = HeaderValue::from_str(&auth)
            .map_err(|_| {
                EngineError::GenerationUnavailable("API key is not a valid header value".into())
            })?;
        headers.insert(AUTHORIZATION, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl Generator for OpenAiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .map_err(|e| unavailable("request failed", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EngineError::GenerationUnavailable(format!(
                "{} returned {}: {}",
                self.model, status, text
            )));
        }

        let parsed: ChatResponse = resp.json().map_err(|e| unavailable("unreadable response", e))?;
        parsed
            .choices
            .into_iter()
            .map(|choice| choice.message.content)
            .find(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                EngineError::GenerationUnavailable("response contained no answer".into())
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn unavailable(what: &str, err: reqwest::Error) -> EngineError {
    let kind = if err.is_timeout() { "timed out" } else { what };
    // reqwest errors carry the URL, never headers
    EngineError::GenerationUnavailable(format!("{kind}: {err}"))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> GenerationConfig {
        GenerationConfig {
            // nothing listens on the discard port
            api_base: "http://127.0.0.1:9/v1/".to_string(),
            timeout_secs: 2,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn test_endpoint_joins_base() {
        let generator = OpenAiGenerator::with_api_key(&local_config(), "sk-test".into()).unwrap();
        assert_eq!(generator.endpoint, "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(generator.name(), GenerationConfig::default().model);
    }

    #[test]
    fn test_unreachable_backend_is_unavailable() {
        let generator =
            OpenAiGenerator::with_api_key(&local_config(), "sk-secret-value".into()).unwrap();
        let err = generator.generate("hello").unwrap_err();
        assert!(matches!(err, EngineError::GenerationUnavailable(_)));
        assert!(!err.to_string().contains("sk-secret-value"));
    }

    #[test]
    fn test_invalid_key_rejected_before_request() {
        let generator = OpenAiGenerator::with_api_key(&local_config(), "bad\nkey".into()).unwrap();
        let err = generator.generate("hello").unwrap_err();
        assert!(err.to_string().contains("not a valid header value"));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Two roles match."}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "Two roles match.");
    }
}
