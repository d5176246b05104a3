//! Conversation composition.
//!
//! Produces the exact message list sent to the model:
//!
//! 1. system prompt
//! 2. grounding message (context, or an instruction to admit ignorance)
//! 3. user/assistant turns from the most recent history window, oldest first
//! 4. the current question

use askfolio_config::AppConfig;
use askfolio_core::{ConversationTurn, Message};

use crate::prompts;

#[derive(Debug, Clone)]
pub struct ConversationComposer {
    owner_name: String,
    system_prompt: String,
    history_window: usize,
}

impl ConversationComposer {
    pub fn new(owner_name: impl Into<String>, history_window: usize) -> Self {
        let owner_name = owner_name.into();
        Self {
            system_prompt: prompts::system_prompt(&owner_name),
            owner_name,
            history_window,
        }
    }

    /// Replace the templated system prompt entirely.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let composer = Self::new(
            config.profile.owner_name.clone(),
            config.conversation.history_window,
        );
        match &config.profile.system_prompt_override {
            Some(prompt) if !prompt.trim().is_empty() => composer.with_system_prompt(prompt.clone()),
            _ => composer,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn compose(
        &self,
        context: &str,
        history: &[ConversationTurn],
        query: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(3 + self.history_window.min(history.len()));
        messages.push(Message::system(self.system_prompt.clone()));

        let grounding = if context.trim().is_empty() {
            prompts::no_context_message(&self.owner_name)
        } else {
            prompts::context_message(&self.owner_name, context)
        };
        messages.push(Message::system(grounding));

        // Window the raw turns, then drop the ones that cannot be replayed.
        let recent = &history[history.len().saturating_sub(self.history_window)..];
        messages.extend(recent.iter().filter_map(ConversationTurn::to_message));

        messages.push(Message::user(query));
        messages
    }
}
