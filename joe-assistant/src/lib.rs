//! The Joe steel-industry assistant.
//!
//! Wires the `joe-rag` knowledge base to persisted [`Settings`], a file
//! uploader, the Joe persona and a [`CompletionService`].
//!
//! ```rust,ignore
//! use joe_assistant::{Assistant, ChatMessage, KnowledgeBase, OpenAIChatClient, Settings};
//!
//! let settings = Settings::load("settings.json").await?.with_env_overrides();
//! let knowledge = KnowledgeBase::from_settings(&settings, &RagConfig::default())?;
//! knowledge.upload_text("lead-times.txt", &text).await?;
//!
//! let assistant = Assistant::new(knowledge, Arc::new(OpenAIChatClient::new(key)?));
//! let reply = assistant.reply(&[ChatMessage::user("How long does rebar take?")]).await?;
//! ```

pub mod completion;
pub mod error;
pub mod knowledge;
pub mod prompt;
pub mod settings;

pub use completion::{Assistant, CompletionService, OpenAIChatClient};
pub use error::{AssistantError, Result, UploadError};
pub use knowledge::{KnowledgeBase, UploadReport};
pub use prompt::{ChatMessage, JOE_PERSONA, Role, build_context_block, build_messages};
pub use settings::Settings;
