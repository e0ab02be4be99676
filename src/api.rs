use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::chat::{Chat, ChatSummary, Message};
use crate::stream::StreamEvent;
use crate::tui::AppEvent;

#[derive(Deserialize)]
struct ChatListResponse {
    #[serde(default)]
    chats: Vec<ChatSummary>,
}

#[derive(Deserialize)]
struct CreateChatResponse {
    id: String,
}

/// Body for `POST /chats` and `PUT /chats/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveChat {
    pub user_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub checkpoint_id: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open the answer stream for one submitted message and forward every
    /// parsed record to the app channel. The task ends on `end` or on the
    /// first transport error; malformed records are logged and skipped
    /// without aborting the stream.
    pub fn spawn_chat_stream(
        &self,
        message: String,
        checkpoint_id: Option<String>,
        tx: UnboundedSender<AppEvent>,
    ) {
        let mut url = format!(
            "{}/chat_stream/{}",
            self.base_url,
            urlencoding::encode(&message)
        );
        if let Some(checkpoint_id) = checkpoint_id {
            url.push_str("?checkpoint_id=");
            url.push_str(&urlencoding::encode(&checkpoint_id));
        }

        let request = self.client.get(&url);
        tokio::spawn(async move {
            let mut es = match EventSource::new(request) {
                Ok(es) => es,
                Err(e) => {
                    warn!("failed to open answer stream: {e}");
                    let _ = tx.send(AppEvent::StreamError);
                    return;
                }
            };

            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => {
                        match serde_json::from_str::<StreamEvent>(&msg.data) {
                            Ok(stream_event) => {
                                let is_end = matches!(stream_event, StreamEvent::End);
                                if tx.send(AppEvent::Stream(stream_event)).is_err() {
                                    break;
                                }
                                if is_end {
                                    // Close before the source tries to reconnect.
                                    es.close();
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("ignoring malformed stream record: {e}: {}", msg.data);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("answer stream closed: {e}");
                        es.close();
                        let _ = tx.send(AppEvent::StreamError);
                        break;
                    }
                }
            }
        });
    }

    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatSummary>> {
        let url = format!("{}/chats", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list chats: {}", response.status()));
        }

        let list: ChatListResponse = response.json().await?;
        Ok(list.chats)
    }

    pub async fn get_chat(&self, chat_id: &str, user_id: Option<&str>) -> Result<Chat> {
        let url = format!("{}/chats/{}", self.base_url, chat_id);
        let mut request = self.client.get(&url);
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to load chat: {}", response.status()));
        }

        let chat: Chat = response.json().await?;
        Ok(chat)
    }

    /// Create a new saved chat; the backend assigns and returns the id.
    pub async fn create_chat(&self, chat: &SaveChat) -> Result<String> {
        let url = format!("{}/chats", self.base_url);
        let response = self.client.post(&url).json(chat).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to create chat: {}", response.status()));
        }

        let created: CreateChatResponse = response.json().await?;
        Ok(created.id)
    }

    pub async fn update_chat(&self, chat_id: &str, chat: &SaveChat) -> Result<()> {
        let url = format!("{}/chats/{}", self.base_url, chat_id);
        let response = self
            .client
            .put(&url)
            .query(&[("user_id", chat.user_id.as_str())])
            .json(chat)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to update chat: {}", response.status()));
        }

        Ok(())
    }

    /// The backend rejects deletes scoped to a different user with a
    /// non-success status, which surfaces here as an error; callers leave
    /// their chat list untouched in that case.
    pub async fn delete_chat(&self, chat_id: &str, user_id: &str) -> Result<()> {
        let url = format!("{}/chats/{}", self.base_url, chat_id);
        let response = self
            .client
            .delete(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to delete chat: {}", response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::derive_title;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ApiClient::new("http://127.0.0.1:8000/");
        assert_eq!(api.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_save_chat_body_shape() {
        let messages = vec![Message::user("what is rust?")];
        let body = SaveChat {
            user_id: "user_1".into(),
            title: derive_title(&messages),
            messages,
            checkpoint_id: Some("cp_9".into()),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["user_id"], "user_1");
        assert_eq!(json["title"], "what is rust?");
        assert_eq!(json["checkpoint_id"], "cp_9");
        assert_eq!(json["messages"][0]["type"], "user");
    }
}
