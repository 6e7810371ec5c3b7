//! Reasoning collaborator clients.
//!
//! The planner talks to whichever provider is configured through the
//! [`LlmClient`] trait; tests substitute scripted implementations.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient, KEYWORD_PROVIDER};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
