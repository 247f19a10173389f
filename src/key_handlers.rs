use crate::app::{App, Focus, PendingRequest};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Applies one key press. Returns a request when a prompt was accepted.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<PendingRequest> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('n') => app.new_chat(),
            KeyCode::Char('u') => app.scroll_up(),
            KeyCode::Char('d') => app.scroll_down(),
            _ => {}
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => {
            if !app.cancel_pending() {
                app.should_quit = true;
            }
            None
        }
        KeyCode::Tab => {
            app.toggle_focus();
            None
        }
        KeyCode::PageUp => {
            app.scroll_up();
            None
        }
        KeyCode::PageDown => {
            app.scroll_down();
            None
        }
        _ => match app.focus {
            Focus::Input => handle_input_key(app, key),
            Focus::History => {
                handle_history_key(app, key);
                None
            }
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) -> Option<PendingRequest> {
    match key.code {
        KeyCode::Enter => return app.submit_input(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => app.input.push(c),
        _ => {}
    }
    None
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Enter => app.open_selected(),
        KeyCode::Delete | KeyCode::Char('d') => app.delete_selected(),
        _ => {}
    }
}
