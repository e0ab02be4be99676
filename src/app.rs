use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::api::{ApiClient, SaveChat};
use crate::chat::{derive_title, ChatSummary};
use crate::identity::Identity;
use crate::stream::ChatSession;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // The stream-driven conversation state (see stream.rs); everything the
    // chat view renders lives in here.
    pub session: ChatSession,
    pub current_chat_id: Option<String>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Chat viewport state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub total_chat_lines: u16,

    // Sidebar state
    pub show_sidebar: bool,
    pub chats: Vec<ChatSummary>,
    pub chats_loading: bool,
    pub chat_list_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Collaborators
    pub identity: Option<Identity>,
    pub api: ApiClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        server_url: &str,
        identity: Option<Identity>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            session: ChatSession::default(),
            current_chat_id: None,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,

            show_sidebar: false,
            chats: Vec::new(),
            chats_loading: false,
            chat_list_state: ListState::default(),

            animation_frame: 0,

            identity,
            api: ApiClient::new(server_url),
            events,
        }
    }

    pub fn signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Submit the current input. No-op when the input is blank or a prior
    /// exchange is still streaming; otherwise the session gains a user
    /// message and an assistant placeholder and the stream is opened.
    pub fn submit(&mut self) {
        let input = self.input.clone();
        if !self.session.begin_exchange(&input) {
            return;
        }
        self.input.clear();
        self.input_cursor = 0;

        self.api.spawn_chat_stream(
            input.trim().to_string(),
            self.session.checkpoint_id.clone(),
            self.events.clone(),
        );
        self.scroll_chat_to_bottom();
    }

    /// The exchange reached `end` or died; persist the chat if a user
    /// identity is present. Fire-and-forget: failures are logged and the
    /// UI state is not rolled back.
    pub fn finish_exchange(&mut self) {
        let Some(identity) = &self.identity else {
            return;
        };
        if self.session.messages.is_empty() {
            return;
        }

        let body = SaveChat {
            user_id: identity.user_id.clone(),
            title: derive_title(&self.session.messages),
            messages: self.session.messages.clone(),
            checkpoint_id: self.session.checkpoint_id.clone(),
        };

        let api = self.api.clone();
        let tx = self.events.clone();
        match self.current_chat_id.clone() {
            Some(chat_id) => {
                tokio::spawn(async move {
                    if let Err(e) = api.update_chat(&chat_id, &body).await {
                        warn!("failed to update chat {chat_id}: {e}");
                    }
                });
            }
            None => {
                tokio::spawn(async move {
                    match api.create_chat(&body).await {
                        Ok(id) => {
                            let _ = tx.send(AppEvent::ChatCreated { id });
                        }
                        Err(e) => warn!("failed to create chat: {e}"),
                    }
                });
            }
        }
    }

    /// Fetch the sidebar chat list; skipped entirely when signed out.
    pub fn refresh_chats(&mut self) {
        let Some(identity) = &self.identity else {
            return;
        };
        self.chats_loading = true;

        let api = self.api.clone();
        let user_id = identity.user_id.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let chats = match api.list_chats(&user_id).await {
                Ok(chats) => chats,
                Err(e) => {
                    warn!("failed to list chats: {e}");
                    Vec::new()
                }
            };
            let _ = tx.send(AppEvent::ChatsLoaded(chats));
        });
    }

    /// Load a saved chat's messages and checkpoint into the session.
    pub fn select_chat(&mut self, chat_id: String) {
        let api = self.api.clone();
        let user_id = self.identity.as_ref().map(|i| i.user_id.clone());
        let tx = self.events.clone();
        tokio::spawn(async move {
            match api.get_chat(&chat_id, user_id.as_deref()).await {
                Ok(chat) => {
                    let _ = tx.send(AppEvent::ChatLoaded(Box::new(chat)));
                }
                Err(e) => warn!("failed to load chat {chat_id}: {e}"),
            }
        });
    }

    /// Delete a saved chat. The entry leaves the local list only after the
    /// backend confirms; a rejected delete (e.g. another user's chat)
    /// changes nothing here.
    pub fn delete_chat(&mut self, chat_id: String) {
        let Some(identity) = &self.identity else {
            return;
        };

        let api = self.api.clone();
        let user_id = identity.user_id.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            match api.delete_chat(&chat_id, &user_id).await {
                Ok(()) => {
                    let _ = tx.send(AppEvent::ChatDeleted { id: chat_id });
                }
                Err(e) => warn!("failed to delete chat {chat_id}: {e}"),
            }
        });
    }

    pub fn remove_chat_from_list(&mut self, chat_id: &str) {
        self.chats.retain(|c| c.id != chat_id);
        if self.chats.is_empty() {
            self.chat_list_state.select(None);
        } else if let Some(i) = self.chat_list_state.selected() {
            if i >= self.chats.len() {
                self.chat_list_state.select(Some(self.chats.len() - 1));
            }
        }
    }

    pub fn new_chat(&mut self) {
        self.session.reset();
        self.current_chat_id = None;
        self.input.clear();
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.show_sidebar = false;
        self.input_mode = InputMode::Editing;
    }

    pub fn toggle_sidebar(&mut self) {
        self.show_sidebar = !self.show_sidebar;
        if self.show_sidebar {
            self.refresh_chats();
            if self.chat_list_state.selected().is_none() && !self.chats.is_empty() {
                self.chat_list_state.select(Some(0));
            }
        }
    }

    pub fn selected_chat(&self) -> Option<&ChatSummary> {
        self.chat_list_state.selected().and_then(|i| self.chats.get(i))
    }

    // Sidebar list navigation
    pub fn sidebar_nav_down(&mut self) {
        let len = self.chats.len();
        if len > 0 {
            let i = self.chat_list_state.selected().unwrap_or(0);
            self.chat_list_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn sidebar_nav_up(&mut self) {
        let i = self.chat_list_state.selected().unwrap_or(0);
        self.chat_list_state.select(Some(i.saturating_sub(1)));
    }

    // Chat viewport scrolling
    pub fn scroll_down(&mut self) {
        if self.chat_scroll < self.total_chat_lines.saturating_sub(self.chat_height) {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.chat_height / 2;
        let max_scroll = self.total_chat_lines.saturating_sub(self.chat_height);
        self.chat_scroll = (self.chat_scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.chat_height / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    /// Scroll so the newest content is visible. Line count mirrors how the
    /// chat view lays messages out: role line, timeline, wrapped content,
    /// blank separator.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.session.messages {
            total_lines += 1; // Role line ("You" or "Qiro")

            if let Some(steps) = msg.steps.as_ref().filter(|s| s.has_activity()) {
                if !steps.searching.status.is_idle() {
                    total_lines += 2; // step title + query bubble
                }
                if !steps.reading.status.is_idle() {
                    total_lines += 1 + steps.reading.urls.len() as u16;
                }
                if !steps.writing.status.is_idle() {
                    total_lines += 1;
                }
            }

            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        // Allowance for the "Thinking..." indicator
        total_lines += 2;

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
