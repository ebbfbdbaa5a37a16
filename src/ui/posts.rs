use crate::api::Post;
use crate::app::App;
use crate::feed::PageState;
use crate::util::{display_width, sanitize_line, truncate_to_width};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Lines each post occupies in the list.
pub(super) const ROWS_PER_POST: u16 = 2;

/// Format timestamp as relative time
pub fn format_relative_time(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = timestamp else {
        return String::new();
    };

    let diff = (now - ts).num_seconds();

    // Clock skew between client and server
    if diff < 60 {
        return "now".to_string();
    }

    if diff < 3600 {
        return format!("{}m", diff / 60);
    }

    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }

    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }

    ts.format("%b %d").to_string()
}

fn post_item(post: &Post, width: usize, now: DateTime<Utc>) -> ListItem<'static> {
    let time_str = format_relative_time(post.created_at_utc(), now);
    let title = sanitize_line(&post.title);
    let title = if title.trim().is_empty() {
        "(untitled)".to_string()
    } else {
        title.into_owned()
    };

    // Title on the left, age on the right
    let time_width = display_width(&time_str);
    let title_width = width.saturating_sub(time_width + 1);
    let title = truncate_to_width(&title, title_width).into_owned();
    let pad = width.saturating_sub(display_width(&title) + time_width);

    let headline = Line::from(vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad)),
        Span::styled(time_str, Style::default().fg(Color::DarkGray)),
    ]);

    let tags = post
        .tags
        .iter()
        .map(|tag| format!("#{}", sanitize_line(tag)))
        .collect::<Vec<_>>()
        .join(" ");
    let details = Line::from(Span::styled(
        truncate_to_width(&format!("  {}", tags), width).into_owned(),
        Style::default().fg(Color::Cyan),
    ));

    ListItem::new(vec![headline, details])
}

/// Text shown where the list would be when it has no rows.
fn empty_message(app: &App) -> &'static str {
    if app.feed.is_loading() {
        "Loading posts..."
    } else if app.feed.term().is_some() {
        "No posts match this search"
    } else {
        "No posts yet"
    }
}

/// Render the post list, recording how many posts fit for paging and scroll
/// reporting.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.feed.term() {
        Some(term) => format!(" Posts #{} ({}) ", sanitize_line(term), app.feed.len()),
        None => format!(" Posts ({}) ", app.feed.len()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(title);

    let inner = block.inner(area);
    app.list_rows = (inner.height / ROWS_PER_POST) as usize;

    if app.feed.is_empty() {
        let msg = Paragraph::new(empty_message(app))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(msg, area);
        return;
    }

    let now = Utc::now();
    let width = inner.width.saturating_sub(2) as usize;
    let mut items: Vec<ListItem> = app
        .feed
        .posts()
        .iter()
        .map(|post| post_item(post, width, now))
        .collect();

    // Footer row under the last post
    let footer = match app.feed.page_state() {
        PageState::Loading => Some("  Loading more..."),
        PageState::Exhausted => Some("  End of feed"),
        PageState::Idle => None,
    };
    if let Some(text) = footer {
        items.push(ListItem::new(Line::from(Span::styled(
            text,
            Style::default().fg(Color::DarkGray),
        ))));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PostId;
    use chrono::{Duration, TimeZone};
    use ratatui::{backend::TestBackend, Terminal};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn rendered_rows(item: ListItem<'static>, width: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, 2)).unwrap();
        terminal
            .draw(|f| f.render_widget(List::new(vec![item]), f.area()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..2)
            .map(|y| (0..width).map(|x| buffer[(x, y)].symbol()).collect())
            .collect()
    }

    #[test]
    fn test_post_item_blank_title_and_long_tags_fit_width() {
        let post = Post {
            id: PostId::from("p1"),
            image_url: "https://cdn/1.jpg".to_string(),
            title: " \t ".to_string(),
            tags: (0..10).map(|i| format!("tag{i}")).collect(),
            created_at: (now() - Duration::hours(2)).to_rfc3339(),
        };

        let item = post_item(&post, 30, now());
        assert_eq!(item.height(), 2);

        let rows = rendered_rows(item, 30);
        assert!(rows[0].starts_with("(untitled)"));
        assert!(rows[0].trim_end().ends_with("2h"));
        assert!(rows[1].starts_with("  #tag0 #tag1"));
        assert!(rows[1].trim_end().ends_with('…'));
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = now();
        assert_eq!(format_relative_time(None, now), "");
        assert_eq!(format_relative_time(Some(now), now), "now");
        assert_eq!(
            format_relative_time(Some(now + Duration::minutes(5)), now),
            "now"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::minutes(5)), now),
            "5m"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::hours(3)), now),
            "3h"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::days(2)), now),
            "2d"
        );
        assert_eq!(
            format_relative_time(Some(now - Duration::days(30)), now),
            "May 16"
        );
    }
}
