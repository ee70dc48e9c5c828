use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
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
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Any key dismisses a notice
    if app.session.surface().notice.is_some() {
        app.session.surface_mut().notice = None;
        return;
    }

    if app.show_clear_confirm {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char('y') | KeyCode::Enter => app.confirm_clear(),
            KeyCode::Char('n') | KeyCode::Esc => app.show_clear_confirm = false,
            _ => {}
        }
        return;
    }

    if key.code == KeyCode::Char('v') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.session.toggle_voice();
        app.input_cursor = app.session.input().chars().count();
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.session.input().chars().count();
        }

        // Transcript scrolling
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::Char('g') => app.scroll_up(u16::MAX),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        KeyCode::Char('s') => app.session.finish_animation(),
        KeyCode::Char('c') => app.show_clear_confirm = true,
        KeyCode::Char('v') => {
            app.session.toggle_voice();
            app.input_cursor = app.session.input().chars().count();
        }
        KeyCode::Char('x') => app.session.remove_image(),

        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            app.send_quick_question(index);
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let line = app.session.input().to_string();
            if line.trim_start().starts_with('/') && app.run_command(&line) {
                return;
            }
            if !app.is_waiting() {
                app.submit();
            }
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let input = app.session.input_mut();
                let byte_pos = char_to_byte_index(input, app.input_cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let cursor = app.input_cursor;
            let input = app.session.input_mut();
            if cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.input().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.input().chars().count();
        }
        KeyCode::Char(c) => {
            let cursor = app.input_cursor;
            let input = app.session.input_mut();
            let byte_pos = char_to_byte_index(input, cursor);
            input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TerminalSurface;
    use kairos_core::relay::{HttpRelayClient, RelayClient};
    use kairos_core::session::VOICE_UNSUPPORTED;
    use kairos_core::{ChatSession, MemoryStore, SystemClock};
    use std::sync::Arc;

    fn test_app() -> App {
        let session = ChatSession::open(
            Box::new(MemoryStore::new()),
            TerminalSurface::default(),
            Arc::new(SystemClock::new()),
        );
        let relay: Arc<dyn RelayClient> = Arc::new(HttpRelayClient::new("http://127.0.0.1:9/chat-api").unwrap());
        App::new(session, relay, "http://127.0.0.1:9/chat-api")
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("añob", 0), 0);
        assert_eq!(char_to_byte_index("añob", 2), 3);
        assert_eq!(char_to_byte_index("añob", 10), 5);
    }

    #[tokio::test]
    async fn test_editing_multibyte_input() {
        let mut app = test_app();
        type_text(&mut app, "calibración");
        assert_eq!(app.session.input(), "calibración");

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.session.input(), "calibracin");
        assert_eq!(app.input_cursor, 9);

        press(&mut app, KeyCode::Char('ó'));
        press(&mut app, KeyCode::Home);
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.session.input(), "alibración");
    }

    #[tokio::test]
    async fn test_empty_enter_sends_nothing() {
        let mut app = test_app();
        press(&mut app, KeyCode::Enter);
        assert!(!app.is_waiting());
        assert_eq!(app.session.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_enter_runs_slash_command() {
        let mut app = test_app();
        type_text(&mut app, "/limpiar");
        press(&mut app, KeyCode::Enter);
        assert!(app.show_clear_confirm);
        assert_eq!(app.session.input(), "");

        press(&mut app, KeyCode::Char('n'));
        assert!(!app.show_clear_confirm);
    }

    #[tokio::test]
    async fn test_voice_without_backend_shows_notice() {
        let mut app = test_app();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('v'), KeyModifiers::CONTROL));
        assert_eq!(app.session.surface().notice.as_deref(), Some(VOICE_UNSUPPORTED));

        // The next key only dismisses it
        press(&mut app, KeyCode::Char('a'));
        assert!(app.session.surface().notice.is_none());
        assert_eq!(app.session.input(), "");
    }

    #[tokio::test]
    async fn test_normal_mode_keys() {
        let mut app = test_app();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);

        press(&mut app, KeyCode::Char('c'));
        assert!(app.show_clear_confirm);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
