//! Generative text service clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;

/// Generative service errors. None of these reach the end user; the
/// orchestrator falls back to the rule-based recommender.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generative service is disabled")]
    Disabled,

    #[error("No API key configured for the generative service")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Generative service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generative service returned an empty response")]
    EmptyResponse,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse service response: {0}")]
    ResponseParsing(String),
}

/// Prompt in, free-form text out. May fail.
#[async_trait]
pub trait GenerativeTextService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Header carrying the API key. The key never goes into a request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the `models/{model}:generateContent` HTTP API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::Http(e.without_url().to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    /// Build a client from settings, refusing when the service is switched
    /// off or has no key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if !config.enabled {
            return Err(GenerationError::Disabled);
        }
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        Self::new(&config.provider_url, &config.model, api_key, config.timeout_secs)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Request body for generateContent
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response body from generateContent
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Text of the first candidate, parts concatenated.
pub fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::ResponseParsing(e.to_string()))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl GenerativeTextService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling generative service");

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(Duration::from_secs(self.timeout_secs))
                } else {
                    GenerationError::Http(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseParsing(e.without_url().to_string()))?;

        parse_generate_response(&text)
    }
}

/// One service call bounded by `timeout`. The pending call is dropped when
/// the deadline passes. Blank replies count as failures.
pub async fn complete_with_timeout(
    service: &dyn GenerativeTextService,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GenerationError> {
    let text = tokio::time::timeout(timeout, service.complete(prompt))
        .await
        .map_err(|_| GenerationError::Timeout(timeout))??;

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Scripted behavior for [`MockGenerator`].
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this text
    Reply(String),
    /// Fail with an HTTP error carrying this message
    Fail(String),
    /// Return an empty reply
    Empty,
    /// Sleep, then return this text
    Delayed(Duration, String),
}

/// In-process service for tests and offline runs.
pub struct MockGenerator {
    behavior: MockBehavior,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(MockBehavior::Reply(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(MockBehavior::Fail(message.to_string()))
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl GenerativeTextService for MockGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail(message) => Err(GenerationError::Http(message.clone())),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }
}
