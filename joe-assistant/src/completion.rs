//! The completion-service boundary and the grounded [`Assistant`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AssistantError, Result};
use crate::knowledge::KnowledgeBase;
use crate::prompt::{ChatMessage, build_context_block, build_messages, last_user_message};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 500;

/// Returned when the service answers with no text.
pub const EMPTY_REPLY: &str = "I'm not sure how to respond to that.";

/// Turns role-tagged messages into a reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate the next assistant message.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// A [`CompletionService`] backed by the OpenAI chat completions API.
pub struct OpenAIChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIChatClient {
    /// Create a client for `gpt-4o`.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::MissingSetting`] if the key is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AssistantError::MissingSetting("openai_api_key"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Use another chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for OpenAIChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl CompletionService for OpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(model = %self.model, message_count = messages.len(), "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed");
                AssistantError::Completion(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, "completion API error");
            return Err(AssistantError::Completion(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Completion(format!("failed to parse response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

/// Answers chat turns, grounding them in the knowledge base when it has
/// anything relevant.
#[derive(Clone)]
pub struct Assistant {
    knowledge: KnowledgeBase,
    completion: Arc<dyn CompletionService>,
}

impl Assistant {
    /// Pair a knowledge base with a completion service.
    pub fn new(knowledge: KnowledgeBase, completion: Arc<dyn CompletionService>) -> Self {
        Self { knowledge, completion }
    }

    /// The knowledge base replies are grounded in.
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Reply to the conversation in `history`.
    ///
    /// Context is retrieved for the latest user message. Retrieval never
    /// blocks a reply; only completion failures are returned.
    pub async fn reply(&self, history: &[ChatMessage]) -> Result<String> {
        let chunks = match last_user_message(history) {
            Some(query) => self.knowledge.retrieve(query).await,
            None => Vec::new(),
        };
        debug!(context_chunks = chunks.len(), "built grounding context");

        let context = build_context_block(&chunks);
        let messages = build_messages(history, context.as_deref());
        self.completion.complete(&messages).await
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant").field("knowledge", &self.knowledge).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(
            OpenAIChatClient::new(""),
            Err(AssistantError::MissingSetting("openai_api_key"))
        ));
    }

    #[tokio::test]
    async fn sends_model_and_sampling_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "max_tokens": 500,
                "messages": [{ "role": "user", "content": "What is a heat number?" }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "It tracks a melt." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIChatClient::new("sk-test").unwrap().with_base_url(server.uri());
        let reply = client.complete(&[ChatMessage::user("What is a heat number?")]).await.unwrap();
        assert_eq!(reply, "It tracks a melt.");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_content_gets_a_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": null } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAIChatClient::new("sk-test").unwrap().with_base_url(server.uri());
        assert_eq!(client.complete(&[ChatMessage::user("hi")]).await.unwrap(), EMPTY_REPLY);
    }

    #[tokio::test]
    async fn api_errors_are_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "error": { "message": "Incorrect API key provided" } })),
            )
            .mount(&server)
            .await;

        let client = OpenAIChatClient::new("sk-bad").unwrap().with_base_url(server.uri());
        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"), "{err}");
    }
}
