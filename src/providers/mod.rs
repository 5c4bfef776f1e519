/*!
 * Completion provider implementations.
 *
 * This module contains the client abstraction the translation engine uses to
 * talk to a remote chat-completion endpoint:
 * - OpenAI: OpenAI API and any compatible server (configurable endpoint)
 * - Mock: scripted provider behaviors for the test suite
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One message of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Build an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A completion request as the engine sees it, independent of provider wire
/// formats
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model name to use
    pub model: String,

    /// Conversation messages
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Create a new request for the given model
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens,
        }
    }

    /// Append a message to the conversation
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Append several messages to the conversation
    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token usage reported by a provider for one call
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,
}

/// A completed response, reduced to what the engine consumes
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's reply text
    pub content: String,

    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

/// Common trait for all completion providers.
///
/// The batch pipeline treats any error identically regardless of underlying
/// cause (auth, rate limit, network); retry and timeout policy live in the
/// pipeline, not in provider implementations.
#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Complete a chat request
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Probe the connection to the provider
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;

    /// Short provider identifier used in logs and reports
    fn name(&self) -> &'static str;
}

pub mod mock;
pub mod openai;
