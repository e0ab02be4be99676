use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};
use crate::stream::StreamEvent;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }

        AppEvent::Stream(stream_event) => {
            let is_end = matches!(stream_event, StreamEvent::End);
            if app.session.apply(stream_event) {
                app.scroll_chat_to_bottom();
            }
            if is_end {
                app.finish_exchange();
            }
        }
        AppEvent::StreamError => {
            // Silent degradation: clear the loading flag, keep whatever
            // arrived, and still try to persist it.
            app.session.abort_exchange();
            app.finish_exchange();
        }

        AppEvent::ChatsLoaded(chats) => {
            app.chats = chats;
            app.chats_loading = false;
            if app.chat_list_state.selected().is_none() && !app.chats.is_empty() {
                app.chat_list_state.select(Some(0));
            }
        }
        AppEvent::ChatLoaded(chat) => {
            app.session.load(chat.messages, chat.checkpoint_id);
            app.current_chat_id = Some(chat.id);
            app.show_sidebar = false;
            app.scroll_chat_to_bottom();
        }
        AppEvent::ChatCreated { id } => {
            app.current_chat_id = Some(id);
        }
        AppEvent::ChatDeleted { id } => {
            app.remove_chat_from_list(&id);
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_sidebar {
        handle_sidebar_key(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.sidebar_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.sidebar_nav_up(),
        KeyCode::Enter => {
            if let Some(chat) = app.selected_chat() {
                let id = chat.id.clone();
                app.select_chat(id);
            }
        }
        KeyCode::Char('d') => {
            if let Some(chat) = app.selected_chat() {
                let id = chat.id.clone();
                app.delete_chat(id);
            }
        }
        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('r') => app.refresh_chats(),
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Tab => app.show_sidebar = false,
        KeyCode::Char('q') => app.should_quit = true,
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Back to composing
        KeyCode::Char('i') | KeyCode::Char('/') => app.input_mode = InputMode::Editing,

        KeyCode::Char('n') => app.new_chat(),
        KeyCode::Char('s') | KeyCode::Tab => app.toggle_sidebar(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit(),
        KeyCode::Esc => app.input_mode = InputMode::Normal,

        KeyCode::Char(c) => {
            let byte_idx = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_idx, c);
            app.input_cursor += 1;
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                let byte_idx = char_to_byte_index(&app.input, app.input_cursor - 1);
                app.input.remove(byte_idx);
                app.input_cursor -= 1;
            }
        }
        KeyCode::Left => app.input_cursor = app.input_cursor.saturating_sub(1),
        KeyCode::Right => {
            app.input_cursor = (app.input_cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(),
        MouseEventKind::ScrollUp => app.scroll_up(),
        _ => {}
    }
}
