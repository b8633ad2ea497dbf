use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.pin_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(completion) => app.on_completion(completion),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
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
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down()
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up()
        }
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        KeyCode::Char('c') => app.toggle_chart(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            // The spawned task reports back through AppEvent::Reply
            let _ = app.submit();
        }
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{GeminiClient, GeminiConfig};
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            model: "m".into(),
            endpoint: "http://127.0.0.1:9".into(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(client, tx), rx)
    }

    #[tokio::test]
    async fn test_typing_and_enter_submits() {
        let (mut app, _rx) = test_app();
        for c in "hi there".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].text, "hi there");
        assert!(app.messages[0].is_from_user);
        assert_eq!(app.in_flight, 1);
    }

    #[tokio::test]
    async fn test_escape_then_q_quits() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit, "q is text while editing");
        assert_eq!(app.input, "q");

        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let (mut app, _rx) = test_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_reply_event_is_rendered() {
        let (mut app, _rx) = test_app();
        app.in_flight = 1;
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello!"}]}}]}"#;
        handle_event(&mut app, AppEvent::Reply(Ok(body.to_string())));
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].text, "Hello!");
        assert!(!app.is_loading());
    }
}
