//! Chat orchestration: retrieval, prompt composition, completion.
//!
//! [`respond`] never fails. A completion failure becomes the response text
//! and a retrieval failure means the prompt carries no context.

use serde::{Deserialize, Serialize};

use crate::completion::CompletionService;
use crate::knowledge::KnowledgeBase;
use crate::models::ConversationTurn;
use crate::prompt::PromptComposer;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub use_rag: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<ConversationTurn>>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            use_rag: false,
            system_prompt: None,
            conversation_history: None,
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<String>,
}

/// Everything a chat turn needs, borrowed from the application context.
pub struct ChatDeps<'a> {
    pub knowledge: &'a KnowledgeBase,
    pub completion: &'a dyn CompletionService,
    pub composer: &'a PromptComposer,
    pub default_model: &'a str,
    pub top_k: usize,
}

pub async fn respond(deps: &ChatDeps<'_>, request: &ChatRequest) -> ChatResponse {
    let retrieved = if request.use_rag {
        deps.knowledge.search(&request.message, deps.top_k).await
    } else {
        Vec::new()
    };

    let mut sources: Vec<String> = Vec::new();
    for result in &retrieved {
        if !sources.contains(&result.source) {
            sources.push(result.source.clone());
        }
    }

    let history = request.conversation_history.as_deref().unwrap_or(&[]);
    let prompt = deps.composer.compose(
        request.system_prompt.as_deref(),
        history,
        &retrieved,
        &request.message,
    );

    let model = request
        .model
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(deps.default_model);

    tracing::info!(
        model,
        use_rag = request.use_rag,
        retrieved = retrieved.len(),
        history = history.len(),
        "chat request"
    );

    let response = match deps.completion.generate(&prompt, model).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(model, error = %e, "completion failed");
            e.to_string()
        }
    };

    ChatResponse { response, sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::store::memory::InMemoryChunkStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records the last prompt and model; answers or fails on demand.
    #[derive(Default)]
    struct FakeCompletion {
        fail: bool,
        seen: Mutex<Option<(String, String)>>,
    }

    #[async_trait]
    impl CompletionService for FakeCompletion {
        async fn generate(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
            *self.seen.lock().unwrap() = Some((prompt.to_string(), model.to_string()));
            if self.fail {
                Err(CompletionError::Unreachable)
            } else {
                Ok("sure thing".to_string())
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
            Ok(vec!["phi3:3.8b".to_string()])
        }
    }

    async fn knowledge() -> KnowledgeBase {
        let kb = KnowledgeBase::new(Arc::new(InMemoryChunkStore::new()));
        kb.add_document_chunks(
            "doc-a",
            "solar.txt",
            &["Solar panels convert sunlight.".into(), "Panels need cleaning.".into()],
        )
        .await
        .unwrap();
        kb.add_document_chunks("doc-b", "wind.txt", &["Wind turbines and panels.".into()])
            .await
            .unwrap();
        kb
    }

    fn deps<'a>(
        kb: &'a KnowledgeBase,
        completion: &'a FakeCompletion,
        composer: &'a PromptComposer,
    ) -> ChatDeps<'a> {
        ChatDeps {
            knowledge: kb,
            completion,
            composer,
            default_model: "phi3:3.8b",
            top_k: 3,
        }
    }

    #[tokio::test]
    async fn rag_collects_unique_sources_in_order() {
        let kb = knowledge().await;
        let completion = FakeCompletion::default();
        let composer = PromptComposer::default();
        let mut request = ChatRequest::new("panels");
        request.use_rag = true;

        let reply = respond(&deps(&kb, &completion, &composer), &request).await;
        assert_eq!(reply.response, "sure thing");
        assert_eq!(reply.sources.len(), 2);
        assert!(reply.sources.contains(&"solar.txt".to_string()));
        assert!(reply.sources.contains(&"wind.txt".to_string()));

        let (prompt, _) = completion.seen.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Relevant information from knowledge base:"));
    }

    #[tokio::test]
    async fn without_rag_no_context_is_retrieved() {
        let kb = knowledge().await;
        let completion = FakeCompletion::default();
        let composer = PromptComposer::default();

        let reply = respond(&deps(&kb, &completion, &composer), &ChatRequest::new("panels")).await;
        assert!(reply.sources.is_empty());
        let (prompt, model) = completion.seen.lock().unwrap().clone().unwrap();
        assert!(!prompt.contains("Relevant information"));
        assert_eq!(model, "phi3:3.8b");
    }

    #[tokio::test]
    async fn requested_model_overrides_default_unless_blank() {
        let kb = knowledge().await;
        let completion = FakeCompletion::default();
        let composer = PromptComposer::default();
        let d = deps(&kb, &completion, &composer);

        let mut request = ChatRequest::new("hi");
        request.model = Some("llama3:8b".to_string());
        respond(&d, &request).await;
        assert_eq!(completion.seen.lock().unwrap().clone().unwrap().1, "llama3:8b");

        request.model = Some("  ".to_string());
        respond(&d, &request).await;
        assert_eq!(completion.seen.lock().unwrap().clone().unwrap().1, "phi3:3.8b");
    }

    #[tokio::test]
    async fn completion_failure_becomes_response_text() {
        let kb = knowledge().await;
        let completion = FakeCompletion {
            fail: true,
            ..FakeCompletion::default()
        };
        let composer = PromptComposer::default();

        let reply = respond(&deps(&kb, &completion, &composer), &ChatRequest::new("hi")).await;
        assert_eq!(
            reply.response,
            "Error: Cannot connect to Ollama. Make sure Ollama is running."
        );
    }

    #[test]
    fn request_defaults_optional_fields() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert!(!request.use_rag);
        assert!(request.system_prompt.is_none());
        assert!(request.conversation_history.is_none());
        assert!(request.model.is_none());

        let request: ChatRequest = serde_json::from_str(
            r#"{"message":"x","use_rag":true,"conversation_history":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!(request.use_rag);
        assert_eq!(request.conversation_history.unwrap().len(), 1);
    }
}
