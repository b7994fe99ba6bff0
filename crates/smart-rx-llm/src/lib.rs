//! Generative prescription drafting.
//!
//! Builds prompts from a patient's history, calls a generative text service,
//! interprets its free-form reply and falls back to the rule-based recommender
//! in `smart-rx-core` whenever the service is unavailable.

pub mod assistant;
pub mod client;
pub mod config;
pub mod extraction;
pub mod orchestrator;
pub mod prompts;

pub use assistant::{AssistantReply, ChatAssistant};
pub use client::{
    complete_with_timeout, GeminiClient, GenerationError, GenerativeTextService, MockBehavior,
    MockGenerator,
};
pub use self::config::{ConfigError, LlmConfig, SmartRxConfig};
pub use extraction::*;
pub use orchestrator::{
    GeneratedPrescription, OrchestratorError, OrchestratorResult, PrescriptionOrchestrator,
    PrescriptionRequest,
};
pub use prompts::*;
