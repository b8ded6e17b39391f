use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::{AppMode, StudioApp};

pub fn handle_event(app: &mut StudioApp, event: Event) {
    if let Event::Key(key) = event {
        if key.kind == KeyEventKind::Press {
            handle_key(app, key);
        }
    }
}

fn handle_key(app: &mut StudioApp, key: KeyEvent) {
    match app.mode {
        AppMode::Compose => handle_compose_key(app, key),
        AppMode::KeyEntry | AppMode::AttachPath => handle_popup_key(app, key),
    }
}

fn handle_compose_key(app: &mut StudioApp, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            app.should_quit = true;
        }
        (KeyCode::Tab, _) => {
            app.switch_tab();
        }
        (KeyCode::F(2), _) => {
            app.open_key_entry();
        }
        (KeyCode::F(4), _) => {
            app.reset_tab();
        }
        (KeyCode::F(5), _) => {
            app.open_attach();
        }
        (KeyCode::F(6), _) => {
            app.cycle_resolution();
        }
        (KeyCode::F(7), _) => {
            app.cycle_aspect_ratio();
        }
        (KeyCode::F(8), _) => {
            app.cycle_duration();
        }
        (KeyCode::Enter, KeyModifiers::NONE) => {
            app.submit();
        }
        (KeyCode::Up, KeyModifiers::CONTROL) => {
            app.scroll_up();
        }
        (KeyCode::Down, KeyModifiers::CONTROL) => {
            app.scroll_down();
        }
        (KeyCode::Backspace, _) => {
            app.input_backspace();
        }
        (KeyCode::Delete, _) => {
            app.input_delete();
        }
        (KeyCode::Left, _) => {
            app.input_left();
        }
        (KeyCode::Right, _) => {
            app.input_right();
        }
        (KeyCode::Home, _) => {
            app.input_home();
        }
        (KeyCode::End, _) => {
            app.input_end();
        }
        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
            app.input_char(c);
        }
        _ => {}
    }
}

fn handle_popup_key(app: &mut StudioApp, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_popup(),
        KeyCode::Enter => app.confirm_popup(),
        KeyCode::Backspace => app.popup_backspace(),
        KeyCode::Char(c) => app.popup_char(c),
        _ => {}
    }
}
