use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEventKind};

use crate::app_state::{AppState, Focus};
use crate::preferences::PreferenceChange;

/// Handle one key press. Returns `true` when the app should exit.
pub fn handle_key_event(app: &mut AppState, key_code: KeyCode, modifiers: KeyModifiers) -> bool {
    // Help overlay swallows everything except its own toggles
    if app.show_help {
        match key_code {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') => app.show_help = false,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            _ => {}
        }
        return false;
    }

    match (key_code, modifiers) {
        // Exit
        (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => return true,
        (KeyCode::Esc, _) => return true,

        (KeyCode::F(1), _) => {
            app.show_help = true;
            return false;
        }

        // Navigation
        (KeyCode::Tab, KeyModifiers::NONE) => {
            app.focus = app.focus.next();
            return false;
        }
        (KeyCode::BackTab, _) => {
            app.focus = app.focus.previous();
            return false;
        }

        // Scrolling
        (KeyCode::PageUp, _) => {
            app.transcript.scroll_up(5);
            return false;
        }
        (KeyCode::PageDown, _) => {
            app.transcript.scroll_down(5);
            return false;
        }
        (KeyCode::Up, KeyModifiers::CONTROL) => {
            app.transcript.scroll_up(1);
            return false;
        }
        (KeyCode::Down, KeyModifiers::CONTROL) => {
            app.transcript.scroll_down(1);
            return false;
        }
        (KeyCode::Home, KeyModifiers::CONTROL) => {
            app.transcript.scroll_to_top();
            return false;
        }
        (KeyCode::End, KeyModifiers::CONTROL) => {
            app.transcript.scroll_to_bottom();
            return false;
        }
        _ => {}
    }

    match app.focus {
        Focus::Preference(field) => match key_code {
            KeyCode::Left | KeyCode::Up => app.step_preference(field, false),
            KeyCode::Right | KeyCode::Down => app.step_preference(field, true),
            KeyCode::Delete | KeyCode::Backspace => app.update_preference(PreferenceChange::clear(field)),
            KeyCode::Enter => app.focus = Focus::Input,
            KeyCode::Char('?') => app.show_help = true,
            _ => {}
        },
        Focus::Input => handle_input_key(app, key_code, modifiers),
    }
    false
}

fn handle_input_key(app: &mut AppState, key_code: KeyCode, modifiers: KeyModifiers) {
    // The input is disabled while an exchange is in flight
    if app.session.is_sending() {
        return;
    }

    match key_code {
        KeyCode::Enter if modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) => {
            app.textarea.insert_newline();
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        _ => {
            app.textarea.input(KeyEvent::new(key_code, modifiers));
        }
    }
}

pub fn handle_mouse_event(app: &mut AppState, kind: MouseEventKind) {
    match kind {
        MouseEventKind::ScrollUp => app.transcript.scroll_up(3),
        MouseEventKind::ScrollDown => app.transcript.scroll_down(3),
        _ => {}
    }
}
