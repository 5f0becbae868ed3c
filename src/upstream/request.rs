//! Wire shapes sent to the provider.

use serde::{Deserialize, Serialize};

use crate::batch::Role;

/// Body of an echo call against the text-completion endpoint.
///
/// `max_tokens = 0` with `echo = true` makes the provider score the prompt
/// itself instead of generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoCompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub echo: bool,
    pub logprobs: u32,
    pub temperature: f32,
}

/// One chat message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of a regenerate call against the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRegenerateRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub logprobs: bool,
    pub top_logprobs: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}
