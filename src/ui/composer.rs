//! "New post" overlay.

use crate::app::{ComposeField, ComposePhase, ComposeState};
use crate::compose::{MAX_TAGS, MAX_TITLE_CHARS};
use crate::util::sanitize_line;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::help::centered_rect;

fn label(name: &'static str, active: bool) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Span::styled(format!("{:<7}", name), style)
}

/// Text input with a cursor when focused.
fn input(text: &str, active: bool) -> Span<'static> {
    if active {
        Span::raw(format!("> {}_", text))
    } else {
        Span::raw(format!("  {}", text))
    }
}

fn body(state: &ComposeState) -> Vec<Line<'static>> {
    let editing = state.phase == ComposePhase::Editing;
    let on = |field| editing && state.field == field;
    let mut lines = Vec::new();

    let image = match (state.phase, state.draft.image_url()) {
        (ComposePhase::Uploading, _) => input("Uploading...", false),
        (_, Some(url)) if state.path_input.is_empty() => {
            Span::styled(format!("  {}", sanitize_line(url)), Style::default().fg(Color::Green))
        }
        _ => input(&state.path_input, on(ComposeField::Image)),
    };
    lines.push(Line::from(vec![label("Image", on(ComposeField::Image)), image]));

    lines.push(Line::from(vec![
        label("Title", on(ComposeField::Title)),
        input(&state.draft.title, on(ComposeField::Title)),
    ]));
    lines.push(Line::from(Span::styled(
        format!(
            "       {}/{}",
            state.draft.title.chars().count(),
            MAX_TITLE_CHARS
        ),
        Style::default().fg(Color::DarkGray),
    )));

    let tags = state
        .draft
        .tags()
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(Line::from(vec![
        label("Tags", on(ComposeField::Tags)),
        Span::styled(format!("  {}", tags), Style::default().fg(Color::Cyan)),
    ]));
    let tag_line = if state.draft.tags_full() {
        Span::styled(
            format!("       {} tags max", MAX_TAGS),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        input(&state.tag_input, on(ComposeField::Tags))
    };
    lines.push(Line::from(vec![Span::raw("       "), tag_line]));

    lines.push(Line::from(""));
    if state.phase == ComposePhase::Posting {
        lines.push(Line::from("Publishing..."));
    } else if let Some(err) = &state.error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    } else if state.field == ComposeField::Image && state.draft.image_url().is_none() {
        lines.push(Line::from(Span::styled(
            "Path to a PNG or JPEG, then Enter to upload",
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

/// Render the composer overlay centered on screen.
pub fn render(f: &mut Frame, state: &ComposeState) {
    let overlay = centered_rect(70, 60, f.area());
    if overlay.width < 30 || overlay.height < 9 {
        return;
    }
    let overlay = Rect {
        height: overlay.height.min(12),
        ..overlay
    };

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(body(state))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" New Post (Ctrl+s publish, Esc cancel) "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, overlay);
}
