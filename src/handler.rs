use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }

    // Every event doubles as a chance to pick up a finished model call.
    app.poll_pending().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('n') => {
                app.new_session();
                return;
            }
            _ => {}
        }
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::EditingPath => handle_path_editing(app, key),
        InputMode::EditingQuestion => handle_question_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Upload
        KeyCode::Char('u') | KeyCode::Char('/') => {
            app.input_mode = InputMode::EditingPath;
            app.path_input.end();
        }

        // Actions
        KeyCode::Char('t') => app.request_description(),
        KeyCode::Char('s') => app.summarize(),
        KeyCode::Char('r') => app.show_raw(),
        KeyCode::Char('a') | KeyCode::Char('i') => app.start_question(),
        KeyCode::Char('M') => app.open_model_picker(),

        // Focus and scrolling
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Response => FocusPane::Chat,
                FocusPane::Chat => FocusPane::Response,
            };
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_top(),
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Chat {
                app.scroll_chat_to_bottom();
            }
        }

        _ => {}
    }
}

fn handle_path_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.upload_from_input();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => app.path_input.backspace(),
        KeyCode::Delete => app.path_input.delete(),
        KeyCode::Left => app.path_input.left(),
        KeyCode::Right => app.path_input.right(),
        KeyCode::Home => app.path_input.home(),
        KeyCode::End => app.path_input.end(),
        KeyCode::Char(c) => app.path_input.insert(c),
        _ => {}
    }
}

fn handle_question_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_question(),
        KeyCode::Backspace => app.question_input.backspace(),
        KeyCode::Delete => app.question_input.delete(),
        KeyCode::Left => app.question_input.left(),
        KeyCode::Right => app.question_input.right(),
        KeyCode::Home => app.question_input.home(),
        KeyCode::End => app.question_input.end(),
        KeyCode::Char(c) => app.question_input.insert(c),
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let pane = if contains(app.chat_area, mouse.column, mouse.row) {
        Some(FocusPane::Chat)
    } else if contains(app.response_area, mouse.column, mouse.row) {
        Some(FocusPane::Response)
    } else {
        None
    };

    let Some(pane) = pane else { return };

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.focus = pane;
            app.scroll_down();
        }
        MouseEventKind::ScrollUp => {
            app.focus = pane;
            app.scroll_up();
        }
        MouseEventKind::Down(_) => app.focus = pane,
        _ => {}
    }
}

fn contains(area: Option<Rect>, x: u16, y: u16) -> bool {
    area.map(|a| x >= a.x && x < a.x + a.width && y >= a.y && y < a.y + a.height)
        .unwrap_or(false)
}
