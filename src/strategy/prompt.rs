//! Prompt and message rendering for the two scoring modes.

use crate::batch::{PromptContext, Role};
use crate::constants::REGENERATE_INSTRUCTION;
use crate::upstream::ChatMessage;

/// Flattens the context into a completion prompt ending with `candidate_text`.
///
/// Each turn renders as `<|role|>\n{content}\n` and turns are joined by a blank
/// line. The final assistant turn holds the candidate verbatim with nothing
/// after it, so the candidate's tokens form the suffix of the echo.
pub fn render_echo_prompt(ctx: &PromptContext, candidate_text: &str) -> String {
    let mut parts = Vec::with_capacity(ctx.messages.len() + 2);

    if let Some(system) = ctx.system.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("<|system|>\n{}\n", system));
    }
    for message in &ctx.messages {
        parts.push(format!(
            "<|{}|>\n{}\n",
            message.role.as_str(),
            message.content.trim()
        ));
    }
    parts.push(format!("<|assistant|>\n{}", candidate_text));

    parts.join("\n")
}

/// Context messages plus a final user turn asking for a verbatim repeat.
pub fn render_regenerate_messages(ctx: &PromptContext, candidate_text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(ctx.messages.len() + 2);

    if let Some(system) = ctx.system.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage {
            role: Role::System,
            content: system.to_string(),
        });
    }
    messages.extend(ctx.messages.iter().map(|m| ChatMessage {
        role: m.role,
        content: m.content.clone(),
    }));
    messages.push(ChatMessage {
        role: Role::User,
        content: format!("{}{}", REGENERATE_INSTRUCTION, candidate_text),
    });

    messages
}
