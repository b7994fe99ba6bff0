//! Single-turn clinical reference assistant.

use std::sync::Arc;
use std::time::Duration;

use smart_rx_core::models::Patient;
use tracing::warn;

use crate::client::{complete_with_timeout, GenerativeTextService};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::prompts::build_assistant_prompt;

/// Reply shown when the service cannot answer.
pub const UNAVAILABLE_REPLY: &str =
    "The assistant is unavailable right now. Please consult standard references or try again later.";

/// Reply shown for a blank question.
pub const EMPTY_QUESTION_REPLY: &str = "Please enter a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    /// True when `text` is a canned reply rather than a service answer
    pub fallback: bool,
}

impl AssistantReply {
    fn canned(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fallback: true,
        }
    }
}

pub struct ChatAssistant {
    service: Option<Arc<dyn GenerativeTextService>>,
    timeout: Duration,
}

impl ChatAssistant {
    pub fn new(service: Option<Arc<dyn GenerativeTextService>>) -> Self {
        Self {
            service,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer one question. Never fails.
    pub async fn ask(&self, question: &str, patient: Option<&Patient>) -> AssistantReply {
        if question.trim().is_empty() {
            return AssistantReply::canned(EMPTY_QUESTION_REPLY);
        }
        let Some(service) = self.service.as_ref() else {
            return AssistantReply::canned(UNAVAILABLE_REPLY);
        };

        let prompt = build_assistant_prompt(question, patient);
        match complete_with_timeout(service.as_ref(), &prompt, self.timeout).await {
            Ok(text) => AssistantReply {
                text: text.trim().to_string(),
                fallback: false,
            },
            Err(e) => {
                warn!(error = %e, "Assistant request failed");
                AssistantReply::canned(UNAVAILABLE_REPLY)
            }
        }
    }
}
