use serde::{Deserialize, Serialize};

use crate::chat::{Message, Role, StepStatus, Steps};

/// One record from the backend's `/chat_stream` SSE feed. Each SSE data
/// line is a JSON object discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Thread identifier for resuming a logical conversation.
    Checkpoint { checkpoint_id: String },
    /// The model decided to search the web.
    SearchStart { query: String },
    /// Search finished; the model is reading these sources.
    SearchResults { urls: Vec<String> },
    /// A chunk of the answer text.
    Content { content: String },
    /// The stream is done.
    End,
}

/// The one piece of shared UI state: the message list plus the stream
/// bookkeeping around it. Mutated only through [`ChatSession::apply`] and
/// the explicit lifecycle methods below; rendering reads it.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub messages: Vec<Message>,
    pub checkpoint_id: Option<String>,
    pub loading: bool,
}

impl ChatSession {
    /// Start a new exchange: push the user message plus an empty assistant
    /// placeholder and mark the session loading. Rejected when the input is
    /// blank or a previous exchange has not finished (one open stream per
    /// session).
    pub fn begin_exchange(&mut self, input: &str) -> bool {
        if self.loading || input.trim().is_empty() {
            return false;
        }
        self.messages.push(Message::user(input));
        self.messages.push(Message::assistant_placeholder());
        self.loading = true;
        true
    }

    /// Fold one stream event into the session. Returns true when the
    /// display changed (callers scroll the chat to the bottom on true).
    ///
    /// Events that need an open assistant message are dropped whole when
    /// the last message is not one; no partial mutation happens.
    pub fn apply(&mut self, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Checkpoint { checkpoint_id } => {
                self.checkpoint_id = Some(checkpoint_id);
                true
            }
            StreamEvent::SearchStart { query } => self.update_open_message(|msg| {
                let steps = msg.steps.get_or_insert_with(Steps::default);
                steps.searching.status.advance(StepStatus::Active);
                steps.searching.query = query;
            }),
            StreamEvent::SearchResults { urls } => self.update_open_message(|msg| {
                let steps = msg.steps.get_or_insert_with(Steps::default);
                steps.searching.status.advance(StepStatus::Completed);
                steps.reading.status.advance(StepStatus::Active);
                steps.reading.urls = urls.clone();
                msg.sources = urls;
            }),
            StreamEvent::Content { content } => self.update_open_message(|msg| {
                let steps = msg.steps.get_or_insert_with(Steps::default);
                if steps.reading.status.is_active() {
                    steps.reading.status.advance(StepStatus::Completed);
                }
                if steps.searching.status.is_active() {
                    steps.searching.status.advance(StepStatus::Completed);
                }
                steps.writing.status.advance(StepStatus::Active);
                msg.content.push_str(&content);
            }),
            StreamEvent::End => {
                let changed = self.update_open_message(|msg| {
                    let steps = msg.steps.get_or_insert_with(Steps::default);
                    steps.writing.status.advance(StepStatus::Completed);
                });
                self.loading = false;
                changed
            }
        }
    }

    /// The producing connection died without an `end` event. The loading
    /// flag clears but steps stay wherever they last were.
    pub fn abort_exchange(&mut self) {
        self.loading = false;
    }

    /// Replace the session with a saved chat.
    pub fn load(&mut self, messages: Vec<Message>, checkpoint_id: Option<String>) {
        self.messages = messages;
        self.checkpoint_id = checkpoint_id;
        self.loading = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Copy-on-write update of the open assistant message: the last
    /// message is cloned, edited, then swapped back in, so prior messages
    /// are never reordered and each event yields a whole new value.
    fn update_open_message(&mut self, edit: impl FnOnce(&mut Message)) -> bool {
        let Some(last) = self.messages.last_mut() else {
            return false;
        };
        if last.role != Role::Assistant {
            return false;
        }
        let mut next = last.clone();
        edit(&mut next);
        *last = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_open_exchange() -> ChatSession {
        let mut session = ChatSession::default();
        assert!(session.begin_exchange("tell me about cats"));
        session
    }

    fn steps(session: &ChatSession) -> &Steps {
        session
            .messages
            .last()
            .and_then(|m| m.steps.as_ref())
            .expect("open assistant message with steps")
    }

    #[test]
    fn test_begin_exchange_rejects_blank_input() {
        let mut session = ChatSession::default();
        assert!(!session.begin_exchange(""));
        assert!(!session.begin_exchange("   \n\t "));
        assert!(session.messages.is_empty());
        assert!(!session.loading);
    }

    #[test]
    fn test_begin_exchange_rejects_while_loading() {
        let mut session = session_with_open_exchange();
        assert!(!session.begin_exchange("second question"));
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_checkpoint_stored_for_session() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::Checkpoint {
            checkpoint_id: "42".into(),
        });
        assert_eq!(session.checkpoint_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_content_strictly_appends() {
        let mut session = session_with_open_exchange();
        let chunks = ["Cats ", "are ", "great."];
        for chunk in chunks {
            session.apply(StreamEvent::Content {
                content: chunk.into(),
            });
        }
        let last = session.messages.last().unwrap();
        assert_eq!(last.content, chunks.concat());
    }

    #[test]
    fn test_search_results_flips_both_steps_in_one_update() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::SearchStart {
            query: "cats".into(),
        });
        assert!(steps(&session).searching.status.is_active());

        session.apply(StreamEvent::SearchResults {
            urls: vec!["https://a.com".into()],
        });
        let s = steps(&session);
        assert!(s.searching.status.is_completed());
        assert!(s.reading.status.is_active());
        assert_eq!(
            session.messages.last().unwrap().sources,
            vec!["https://a.com"]
        );
    }

    #[test]
    fn test_end_completes_writing_and_clears_loading() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::Content {
            content: "hi".into(),
        });
        session.apply(StreamEvent::End);
        assert!(steps(&session).writing.status.is_completed());
        assert!(!session.loading);
    }

    #[test]
    fn test_full_exchange_scenario() {
        let mut session = session_with_open_exchange();
        let events = [
            StreamEvent::Checkpoint {
                checkpoint_id: "42".into(),
            },
            StreamEvent::SearchStart {
                query: "cats".into(),
            },
            StreamEvent::SearchResults {
                urls: vec!["https://a.com".into()],
            },
            StreamEvent::Content {
                content: "Cats ".into(),
            },
            StreamEvent::Content {
                content: "are great.".into(),
            },
            StreamEvent::End,
        ];
        for event in events {
            session.apply(event);
        }

        assert_eq!(session.checkpoint_id.as_deref(), Some("42"));
        let last = session.messages.last().unwrap();
        assert_eq!(last.content, "Cats are great.");
        assert_eq!(last.sources, vec!["https://a.com"]);
        let s = last.steps.as_ref().unwrap();
        assert!(s.searching.status.is_completed());
        assert!(s.reading.status.is_completed());
        assert!(s.writing.status.is_completed());
        assert!(!session.loading);
    }

    #[test]
    fn test_content_without_search_skips_straight_to_writing() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::Content {
            content: "hi".into(),
        });
        let s = steps(&session);
        assert!(s.searching.status.is_idle());
        assert!(s.reading.status.is_idle());
        assert!(s.writing.status.is_active());
    }

    #[test]
    fn test_events_ignored_when_last_message_is_user() {
        let mut session = ChatSession::default();
        session.messages.push(Message::user("hello"));
        let before = session.messages.clone();
        assert!(!session.apply(StreamEvent::Content {
            content: "stray".into(),
        }));
        assert_eq!(session.messages, before);
    }

    #[test]
    fn test_events_ignored_on_empty_session() {
        let mut session = ChatSession::default();
        assert!(!session.apply(StreamEvent::SearchStart {
            query: "cats".into(),
        }));
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_prior_messages_never_reordered() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::Content {
            content: "answer".into(),
        });
        session.apply(StreamEvent::End);
        assert!(session.begin_exchange("follow-up"));
        session.apply(StreamEvent::Content {
            content: "more".into(),
        });

        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "tell me about cats");
        assert_eq!(session.messages[1].content, "answer");
        assert_eq!(session.messages[2].content, "follow-up");
    }

    #[test]
    fn test_abort_leaves_steps_dangling() {
        let mut session = session_with_open_exchange();
        session.apply(StreamEvent::SearchStart {
            query: "cats".into(),
        });
        session.abort_exchange();
        assert!(!session.loading);
        // Steps stay as the stream last left them; nothing is forced to
        // completed on a transport error.
        assert!(steps(&session).searching.status.is_active());
        assert!(steps(&session).writing.status.is_idle());
    }

    #[test]
    fn test_event_parses_from_wire_format() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "checkpoint", "checkpoint_id": "abc"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Checkpoint {
                checkpoint_id: "abc".into()
            }
        );

        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "search_results", "urls": ["https://a.com"]}"#)
                .unwrap();
        assert_eq!(
            event,
            StreamEvent::SearchResults {
                urls: vec!["https://a.com".into()]
            }
        );

        let event: StreamEvent = serde_json::from_str(r#"{"type": "end"}"#).unwrap();
        assert_eq!(event, StreamEvent::End);
    }

    #[test]
    fn test_unknown_event_type_fails_to_parse() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type": "surprise"}"#);
        assert!(result.is_err());
    }
}
