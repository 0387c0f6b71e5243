//! Chat-completion wire types and the provider seam
//!
//! A [`Provider`] turns one resolved [`Endpoint`] plus a message list into a
//! [`Completion`] or a classified [`InvokeError`]. The runner only talks to
//! this trait, so tests substitute scripted providers for the HTTP one.

pub mod openai;

use crate::config::{Endpoint, DEFAULT_SYSTEM_PROMPT};
use crate::error::InvokeError;
use crate::metrics::TokenUsage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End-user prompt
    User,
    /// Model output
    Assistant,
}

/// Message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The prompt sent to every model in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// User message text
    pub text: String,
    /// Optional system message sent first
    pub system: Option<String>,
}

impl Prompt {
    /// Create a prompt with the default system message
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Replace or remove the system message
    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    /// Build the message list: optional system message, then the user message
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(self.text.clone()));
        messages
    }
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

/// Response body for `POST /chat/completions`
///
/// Only `choices[0].message.content` is required. Everything else is optional
/// so that minimal proxies still parse.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message inside a choice
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage as reported by the endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage {
            prompt: usage.prompt_tokens,
            completion: usage.completion_tokens,
            total: usage.total_tokens,
        }
    }
}

/// Successful invocation payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// First choice's content, trimmed
    pub text: String,
    /// Token counts, if the endpoint reported usage
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Extract the completion, rejecting responses without content
    pub fn into_completion(self) -> Result<Completion, InvokeError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InvokeError::Protocol("response contained no choices".to_string()))?;

        let text = choice.message.content.ok_or_else(|| {
            InvokeError::Protocol("first choice has no message content".to_string())
        })?;

        Ok(Completion {
            text: text.trim().to_string(),
            usage: self.usage.map(TokenUsage::from),
        })
    }
}

/// Provider trait that all chat-completion backends implement
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one chat completion for the endpoint's model
    async fn chat(&self, endpoint: &Endpoint, messages: &[Message])
        -> Result<Completion, InvokeError>;

    /// Get the provider name
    fn name(&self) -> &str;
}
