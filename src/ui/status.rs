use crate::app::App;
use crate::feed::ConnectionState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const SPINNER: [&str; super::loop_runner::SPINNER_FRAMES] =
    ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Label and colour for the live-updates indicator.
fn connection_label(live: bool, state: ConnectionState) -> (&'static str, Color) {
    if !live {
        return ("○ live off", Color::DarkGray);
    }
    match state {
        ConnectionState::Connected => ("● live", Color::Green),
        ConnectionState::Connecting => ("◌ connecting", Color::Yellow),
        ConnectionState::Disconnected => ("○ reconnecting", Color::Yellow),
        ConnectionState::Closed => ("○ offline", Color::DarkGray),
    }
}

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    // Feed notices outrank transient status messages
    let (text, style): (Cow<'_, str>, Style) = if let Some(notice) = app.feed.notice() {
        (
            Cow::Borrowed(notice),
            Style::default().bg(Color::Red).fg(Color::White),
        )
    } else if let Some((msg, _)) = &app.status_message {
        (
            Cow::Borrowed(msg.as_ref()),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    } else {
        let hints = if app.compose.is_some() {
            "[Tab]next field [Enter]confirm [Ctrl+s]publish [Ctrl+x]clear image [Esc]cancel"
        } else if app.search_mode {
            "Type a tag to search | ESC clear | ENTER done"
        } else {
            "[j/k]move [/]search [n]ew post [o]pen image [r]efresh [?]help [q]uit"
        };
        (
            Cow::Borrowed(hints),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    };

    let busy = app.feed.is_loading() || app.compose.as_ref().is_some_and(|c| c.is_busy());
    let spinner = if busy {
        SPINNER[app.spinner_frame % SPINNER.len()]
    } else {
        " "
    };
    let (label, color) = connection_label(app.feed.is_live(), app.feed.connection_state());
    let indicator = Line::from(vec![
        Span::raw(spinner),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(color)),
        Span::raw(" "),
    ]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(indicator.width() as u16),
        ])
        .split(area);

    f.render_widget(Paragraph::new(text).style(style), chunks[0]);
    f.render_widget(
        Paragraph::new(indicator).style(Style::default().bg(Color::DarkGray)),
        chunks[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_label() {
        assert_eq!(connection_label(true, ConnectionState::Connected).0, "● live");
        assert_eq!(
            connection_label(true, ConnectionState::Disconnected).0,
            "○ reconnecting"
        );
        // Without a channel the view never leaves Disconnected
        assert_eq!(
            connection_label(false, ConnectionState::Disconnected).0,
            "○ live off"
        );
    }
}
