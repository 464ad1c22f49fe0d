//! Context assembly for chat completions
//!
//! The message window sent to the completion backend is rebuilt per
//! request from the fixed system prompt, optional caller-supplied context,
//! the most recent ledger entries, and the new user message. It is never
//! persisted.

use crate::history::HistoryLedger;
use crate::providers::{ChatMessage, Role};

/// System prompt for the voice assistant
pub const SYSTEM_PROMPT: &str = "\
You are a helpful AI voice assistant. You should:

1. Provide clear, concise, and helpful responses
2. Be conversational and natural in your tone
3. Keep responses reasonably short for voice interaction
4. Be informative and accurate
5. Show empathy and understanding
6. Ask clarifying questions when needed
7. Provide actionable advice when appropriate

Remember that users are interacting with you through voice, so keep \
responses conversational and easy to understand when spoken aloud.";

/// Configuration for context building
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Number of recent ledger entries to include
    pub max_history: usize,
    /// System prompt prepended to every request
    pub system_prompt: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Builds the completion message window
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    #[must_use]
    pub const fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Assemble the ordered message sequence for one completion request
    ///
    /// Order: system prompt, caller-supplied context, recent history,
    /// current user message.
    #[must_use]
    pub fn build(
        &self,
        ledger: &HistoryLedger,
        extra_context: &[ChatMessage],
        user_message: &str,
    ) -> Vec<ChatMessage> {
        let recent = ledger.recent(self.config.max_history);

        let mut messages =
            Vec::with_capacity(2 + extra_context.len() + recent.len());
        messages.push(ChatMessage::new(
            Role::System,
            self.config.system_prompt.clone(),
        ));
        messages.extend_from_slice(extra_context);
        messages.extend(
            recent
                .into_iter()
                .map(|entry| ChatMessage::new(entry.role, entry.content)),
        );
        messages.push(ChatMessage::new(Role::User, user_message));

        messages
    }
}
