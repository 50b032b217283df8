//! Chat messages, the Joe persona, and the grounding-context block.

use joe_rag::DocumentChunk;
use serde::{Deserialize, Serialize};

/// The system prompt that sets Joe's character.
pub const JOE_PERSONA: &str = "You are Joe, a 40-year veteran of the steel industry with extensive \
knowledge in procurement, inventory management, vendor bill processing, quality checks, sales, \
dispatch, and production tracking. You have a friendly but straightforward demeanor, speak with \
authority on steel industry topics, and occasionally use industry-specific terminology. Your \
responses should reflect your decades of experience in steel mills and ERP systems. You're here to \
assist users with their steel industry and ERP-related questions.";

/// Introduces the context block inside its system message.
const CONTEXT_PREAMBLE: &str = "Use the following excerpts from the user's documents when they are \
relevant to the question:\n\n";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and grounding context.
    System,
    /// The person asking.
    User,
    /// Joe's earlier replies.
    Assistant,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: Role,
    /// Plain message text.
    pub content: String,
}

impl ChatMessage {
    /// A [`Role::System`] message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A [`Role::User`] message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// A [`Role::Assistant`] message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Format retrieved chunks for the completion service.
///
/// Each chunk becomes `Document: <source>, Section: <section>\n<text>\n\n`,
/// followed by one `Sources used: ...` line listing each source once in
/// first-seen order. Returns `None` when there is nothing to add.
pub fn build_context_block(chunks: &[DocumentChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }

    let mut block = String::new();
    let mut sources: Vec<&str> = Vec::new();
    for chunk in chunks {
        let source = chunk.metadata.source.as_str();
        let section = chunk.metadata.section.as_deref().unwrap_or("N/A");
        block.push_str(&format!("Document: {source}, Section: {section}\n{}\n\n", chunk.text));
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    block.push_str(&format!("Sources used: {}", sources.join(", ")));
    Some(block)
}

/// The full message list for one completion: persona, optional context,
/// then the conversation so far.
pub fn build_messages(history: &[ChatMessage], context: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(JOE_PERSONA));
    if let Some(context) = context {
        messages.push(ChatMessage::system(format!("{CONTEXT_PREAMBLE}{context}")));
    }
    messages.extend_from_slice(history);
    messages
}

/// The most recent user message, if any.
pub fn last_user_message(history: &[ChatMessage]) -> Option<&str> {
    history.iter().rev().find(|m| m.role == Role::User).map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
    use joe_rag::ChunkMetadata;

    use super::*;

    fn chunk(source: &str, section: Option<&str>, text: &str) -> DocumentChunk {
        let mut metadata = ChunkMetadata::from_source(source);
        if let Some(section) = section {
            metadata = metadata.with_section(section);
        }
        DocumentChunk { id: format!("{source}-chunk"), text: text.into(), metadata }
    }

    #[test]
    fn no_chunks_no_block() {
        assert_eq!(build_context_block(&[]), None);
    }

    #[test]
    fn block_lists_chunks_then_unique_sources() {
        let block = build_context_block(&[
            chunk("lead-times.txt", Some("Chunk 2"), "Rebar ships in six weeks."),
            chunk("grades.txt", None, "A36 is the common structural grade."),
            chunk("lead-times.txt", Some("Chunk 5"), "Plate ships in eight weeks."),
        ])
        .unwrap();

        assert_eq!(
            block,
            "Document: lead-times.txt, Section: Chunk 2\nRebar ships in six weeks.\n\n\
             Document: grades.txt, Section: N/A\nA36 is the common structural grade.\n\n\
             Document: lead-times.txt, Section: Chunk 5\nPlate ships in eight weeks.\n\n\
             Sources used: lead-times.txt, grades.txt"
        );
    }

    #[test]
    fn messages_start_with_persona_and_context() {
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello there!")];
        let messages = build_messages(&history, Some("Document: a.txt"));

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::system(JOE_PERSONA));
        assert_eq!(messages[1].role, Role::System);
        assert!(messages[1].content.ends_with("Document: a.txt"));
        assert_eq!(&messages[2..], history.as_slice());

        assert_eq!(build_messages(&history, None).len(), 3);
    }

    #[test]
    fn finds_last_user_message() {
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
            ChatMessage::assistant("reply"),
        ];
        assert_eq!(last_user_message(&history), Some("second"));
        assert_eq!(last_user_message(&[]), None);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
