//! Prompt assembly.
//!
//! The output layout is what the served models were tuned against and must
//! stay byte-for-byte stable:
//!
//! ```text
//! System: <system prompt>
//! <history block>
//! <context block>
//!
//! User: <message>
//! ```
//!
//! where the history block is `\n\nConversation history:\n` followed by one
//! `Human: ...`/`Assistant: ...` line per turn, and the context block is
//! `\n\nRelevant information from knowledge base:\n` followed by one
//! `- <snippet>...` line per retrieved chunk. Either block is the empty
//! string when there is nothing to show.

use crate::config::{PromptConfig, RetrievalConfig};
use crate::models::{ConversationTurn, SearchResult};

const HISTORY_HEADER: &str = "\n\nConversation history:\n";
const CONTEXT_HEADER: &str = "\n\nRelevant information from knowledge base:\n";

#[derive(Debug, Clone)]
pub struct PromptComposer {
    default_system_prompt: String,
    history_turns: usize,
    snippet_chars: usize,
}

impl PromptComposer {
    pub fn new(prompt: &PromptConfig, retrieval: &RetrievalConfig) -> Self {
        Self {
            default_system_prompt: prompt.default_system_prompt.clone(),
            history_turns: retrieval.history_turns,
            snippet_chars: retrieval.snippet_chars,
        }
    }

    pub fn compose(
        &self,
        system_prompt: Option<&str>,
        history: &[ConversationTurn],
        retrieved: &[SearchResult],
        message: &str,
    ) -> String {
        let system_prompt = system_prompt
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_system_prompt.as_str());

        format!(
            "System: {}\n{}\n{}\n\nUser: {}",
            system_prompt,
            self.history_block(history),
            self.context_block(retrieved),
            message
        )
    }

    fn history_block(&self, history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            return String::new();
        }
        let window = &history[history.len().saturating_sub(self.history_turns)..];
        let mut block = String::from(HISTORY_HEADER);
        for turn in window {
            let speaker = if turn.is_user() { "Human" } else { "Assistant" };
            block.push_str(&format!("{}: {}\n", speaker, turn.content));
        }
        block
    }

    fn context_block(&self, retrieved: &[SearchResult]) -> String {
        if retrieved.is_empty() {
            return String::new();
        }
        let mut block = String::from(CONTEXT_HEADER);
        for result in retrieved {
            let snippet: String = result.content.chars().take(self.snippet_chars).collect();
            block.push_str(&format!("- {}...\n", snippet));
        }
        block
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(&PromptConfig::default(), &RetrievalConfig::default())
    }
}
