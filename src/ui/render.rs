//! Render functions for the TUI.

use crate::app::App;
use crate::util::MAX_SEARCH_LENGTH;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{composer, help, posts, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // EDGE-001: Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        // Nothing fits, so nothing is visible
        app.list_rows = 0;
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_search_bar(f, app, chunks[0]);
    posts::render(f, app, chunks[1]);
    status::render(f, app, chunks[2]);

    if let Some(state) = &app.compose {
        composer::render(f, state);
    }

    if app.show_help {
        help::render(f);
    }
}

fn render_search_bar(f: &mut Frame, app: &App, area: Rect) {
    let line = if app.search_mode {
        Line::from(vec![
            Span::styled(" Search #", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_", app.search_input)),
            Span::styled(
                format!(
                    "  {}/{}",
                    app.search_input.chars().count(),
                    MAX_SEARCH_LENGTH
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if app.search_input.trim().is_empty() {
        Line::from(Span::styled(
            " pixfeed  (/ to search by tag)",
            Style::default().fg(Color::Gray),
        ))
    } else {
        Line::from(vec![
            Span::styled(" pixfeed  ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("#{}", app.search_input.trim()),
                Style::default().fg(Color::Cyan),
            ),
        ])
    };
    f.render_widget(Paragraph::new(line), area);
}
