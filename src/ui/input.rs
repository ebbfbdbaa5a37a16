//! Input handling for the TUI.
//!
//! Keys go to exactly one handler: the help overlay, the composer, the search
//! prompt, or the post list, in that order of precedence.

use crate::app::{App, AppEvent, ComposeField};
use crate::compose::expand_home;
use crate::util::{resolve_image_url, MAX_SEARCH_LENGTH};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{spawn_publish, spawn_upload};
use super::Action;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    if app.show_help {
        if matches!(code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Ok(Action::Continue);
    }

    if app.compose.is_some() {
        handle_compose_input(app, code, modifiers, event_tx);
        return Ok(Action::Continue);
    }

    if app.search_mode {
        handle_search_input(app, code);
        return Ok(Action::Continue);
    }

    Ok(handle_list_input(app, code))
}

fn handle_list_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Char('/') => app.search_mode = true,
        KeyCode::Char('n') => app.open_compose(),
        KeyCode::Char('r') => {
            app.feed.refresh();
            app.set_status("Refreshing...");
        }
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('o') | KeyCode::Enter => open_selected_image(app),
        _ => {}
    }
    Action::Continue
}

fn open_selected_image(app: &mut App) {
    let Some(post) = app.selected_post() else {
        return;
    };
    match resolve_image_url(app.api.base_url(), &post.image_url) {
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {}", e));
            }
        }
        Err(e) => app.set_status(e.to_string()),
    }
}

/// Edit the search term. Every change goes to the debouncer; the feed resets
/// once typing pauses.
fn handle_search_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Enter => app.search_mode = false,
        KeyCode::Esc => {
            app.search_mode = false;
            if !app.search_input.is_empty() {
                app.search_input.clear();
                app.feed.search_input("");
            }
        }
        KeyCode::Backspace => {
            if app.search_input.pop().is_some() {
                app.feed.search_input(&app.search_input);
            }
        }
        KeyCode::Char(c) => {
            if app.search_input.len() >= MAX_SEARCH_LENGTH {
                app.set_status(format!(
                    "Search term at max length ({} chars)",
                    MAX_SEARCH_LENGTH
                ));
                return;
            }
            app.search_input.push(c);
            app.feed.search_input(&app.search_input);
        }
        _ => {}
    }
}

fn handle_compose_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if code == KeyCode::Esc {
        app.close_compose();
        return;
    }

    let Some(state) = app.compose.as_mut() else {
        return;
    };
    if state.is_busy() {
        return;
    }

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('s') if ctrl => {
            spawn_publish(app, event_tx);
            return;
        }
        KeyCode::Char('x') if ctrl => {
            state.draft.clear_image();
            state.tag_input.clear();
            state.field = ComposeField::Image;
            state.error = None;
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            state.field = state.field.next();
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.field = state.field.prev();
            return;
        }
        _ => {}
    }

    match state.field {
        ComposeField::Image => match code {
            KeyCode::Enter => {
                if state.path_input.trim().is_empty() {
                    return;
                }
                let path = expand_home(&state.path_input);
                spawn_upload(app, path, event_tx);
            }
            KeyCode::Backspace => {
                state.path_input.pop();
            }
            KeyCode::Char(c) => state.path_input.push(c),
            _ => {}
        },
        ComposeField::Title => match code {
            KeyCode::Enter => state.field = ComposeField::Tags,
            KeyCode::Backspace => {
                state.draft.title.pop();
            }
            KeyCode::Char(c) => state.draft.title.push(c),
            _ => {}
        },
        ComposeField::Tags => match code {
            KeyCode::Enter => match state.draft.add_tag(&state.tag_input) {
                Ok(true) => {
                    state.tag_input.clear();
                    state.error = None;
                }
                Ok(false) => {}
                Err(e) => state.error = Some(e.to_string()),
            },
            KeyCode::Backspace => {
                if state.tag_input.pop().is_none() {
                    state.draft.pop_tag();
                }
            }
            KeyCode::Char(c) => state.tag_input.push(c),
            _ => {}
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{pump_one, test_app};
    use crate::feed::FeedEvent;
    use std::time::Duration;

    fn key(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).unwrap()
    }

    fn type_str(app: &mut App, text: &str, tx: &mpsc::Sender<AppEvent>) {
        for c in text.chars() {
            key(app, KeyCode::Char(c), tx);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_search_settles_once() {
        let (mut app, mut rx) = test_app(1);
        let (tx, _events) = mpsc::channel(8);
        pump_one(&mut app, &mut rx).await;

        key(&mut app, KeyCode::Char('/'), &tx);
        assert!(app.search_mode);
        type_str(&mut app, "sunset", &tx);
        key(&mut app, KeyCode::Enter, &tx);
        assert!(!app.search_mode);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(&event, FeedEvent::SearchSettled(term) if term == "sunset"));
        app.handle_feed_event(event);
        assert_eq!(app.feed.term(), Some("sunset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_keys() {
        let (mut app, _rx) = test_app(1);
        let (tx, _events) = mpsc::channel(8);
        assert!(matches!(key(&mut app, KeyCode::Char('q'), &tx), Action::Quit));
        assert!(matches!(
            handle_input(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL, &tx).unwrap(),
            Action::Quit
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_q_types_into_composer() {
        let (mut app, _rx) = test_app(1);
        let (tx, _events) = mpsc::channel(8);
        key(&mut app, KeyCode::Char('n'), &tx);
        key(&mut app, KeyCode::Tab, &tx);
        assert!(matches!(key(&mut app, KeyCode::Char('q'), &tx), Action::Continue));
        assert_eq!(app.compose.as_ref().unwrap().draft.title, "q");

        key(&mut app, KeyCode::Esc, &tx);
        assert!(app.compose.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_entry_shows_length_error() {
        let (mut app, _rx) = test_app(1);
        let (tx, _events) = mpsc::channel(8);
        key(&mut app, KeyCode::Char('n'), &tx);
        key(&mut app, KeyCode::Tab, &tx);
        key(&mut app, KeyCode::Tab, &tx);

        type_str(&mut app, "abcdefghijklmnopq", &tx);
        key(&mut app, KeyCode::Enter, &tx);
        let state = app.compose.as_ref().unwrap();
        assert_eq!(
            state.error.as_deref(),
            Some("Tag must be 16 characters or less")
        );
        assert!(state.draft.tags().is_empty());

        key(&mut app, KeyCode::Backspace, &tx);
        key(&mut app, KeyCode::Enter, &tx);
        let state = app.compose.as_ref().unwrap();
        assert_eq!(state.draft.tags(), &["abcdefghijklmnop".to_string()]);
        assert!(state.tag_input.is_empty());
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_without_image_reports_locally() {
        let (mut app, _rx) = test_app(1);
        let (tx, mut events) = mpsc::channel(8);
        key(&mut app, KeyCode::Char('n'), &tx);
        handle_input(&mut app, KeyCode::Char('s'), KeyModifiers::CONTROL, &tx).unwrap();

        let state = app.compose.as_ref().unwrap();
        assert_eq!(state.error.as_deref(), Some("Select an image first"));
        assert!(!state.is_busy());
        assert!(events.try_recv().is_err());
    }
}
