use serde::{Deserialize, Serialize};

/// Maximum chat title length, in characters (backend truncates the same way).
pub const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

/// Progress of one thinking step. Statuses only move forward; `Completed`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Idle,
    Active,
    Completed,
}

impl StepStatus {
    /// Move to `next` if that is a forward transition. A completed step
    /// never changes again, and a step never moves backwards.
    pub fn advance(&mut self, next: StepStatus) {
        if next > *self {
            *self = next;
        }
    }

    pub fn is_idle(self) -> bool {
        self == StepStatus::Idle
    }

    pub fn is_active(self) -> bool {
        self == StepStatus::Active
    }

    pub fn is_completed(self) -> bool {
        self == StepStatus::Completed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStep {
    pub status: StepStatus,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingStep {
    pub status: StepStatus,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritingStep {
    pub status: StepStatus,
}

/// Thinking-process timeline attached to an assistant message:
/// web search, source reading, answer writing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Steps {
    pub searching: SearchStep,
    pub reading: ReadingStep,
    pub writing: WritingStep,
}

impl Steps {
    /// The timeline is shown once searching or writing has left idle
    /// (reading never activates without a search first).
    pub fn has_activity(&self) -> bool {
        !self.searching.status.is_idle() || !self.writing.status.is_idle()
    }
}

/// One chat message, serialized exactly as the backend stores it so saved
/// chats stay interchangeable with the web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Steps>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            steps: None,
        }
    }

    /// Empty assistant placeholder awaiting stream events, all steps idle.
    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            sources: Vec::new(),
            steps: Some(Steps::default()),
        }
    }
}

/// Sidebar entry for a saved chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ChatSummary {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => "New Chat",
        }
    }
}

/// A full saved chat as returned by `GET /chats/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Title for a saved chat: first 50 characters of the first user message.
pub fn derive_title(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.chars().take(TITLE_MAX_CHARS).collect())
        .unwrap_or_else(|| "New Chat".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_moves_forward() {
        let mut status = StepStatus::Idle;
        status.advance(StepStatus::Active);
        assert_eq!(status, StepStatus::Active);
        status.advance(StepStatus::Completed);
        assert_eq!(status, StepStatus::Completed);
    }

    #[test]
    fn test_completed_is_absorbing() {
        let mut status = StepStatus::Completed;
        status.advance(StepStatus::Active);
        assert_eq!(status, StepStatus::Completed);
        status.advance(StepStatus::Idle);
        assert_eq!(status, StepStatus::Completed);
    }

    #[test]
    fn test_no_regression_to_idle() {
        let mut status = StepStatus::Active;
        status.advance(StepStatus::Idle);
        assert_eq!(status, StepStatus::Active);
    }

    #[test]
    fn test_message_wire_tags() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["type"], "user");

        let json = serde_json::to_value(Message::assistant_placeholder()).unwrap();
        assert_eq!(json["type"], "ai");
        assert_eq!(json["steps"]["searching"]["status"], "idle");
    }

    #[test]
    fn test_message_round_trip_from_backend_shape() {
        let json = r#"{
            "type": "ai",
            "content": "Cats are great.",
            "sources": ["https://a.com"],
            "steps": {
                "searching": {"status": "completed", "query": "cats"},
                "reading": {"status": "completed", "urls": ["https://a.com"]},
                "writing": {"status": "completed"}
            }
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.sources, vec!["https://a.com"]);
        let steps = msg.steps.unwrap();
        assert!(steps.writing.status.is_completed());
    }

    #[test]
    fn test_derive_title_truncates_on_char_boundary() {
        let long: String = "é".repeat(80);
        let messages = vec![Message::user(long)];
        let title = derive_title(&messages);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_derive_title_skips_assistant_messages() {
        let messages = vec![Message::assistant_placeholder(), Message::user("hello")];
        assert_eq!(derive_title(&messages), "hello");
    }

    #[test]
    fn test_derive_title_fallback() {
        assert_eq!(derive_title(&[]), "New Chat");
    }
}
