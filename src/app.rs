//! Application state for the TUI.
//!
//! [`App`] owns the mounted [`FeedView`], the list selection and the open
//! composer. It is mutated only from the event loop in `ui::loop_runner`;
//! background work reports back through [`AppEvent`] (uploads, publishes)
//! or the feed's own [`FeedEvent`] channel.

use crate::api::{ApiClient, Post};
use crate::compose::{ComposeError, Draft};
use crate::feed::{FeedEvent, FeedView};
use ratatui::widgets::ListState;
use std::borrow::Cow;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long a status-bar message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Composer State
// ============================================================================

/// Which composer field receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeField {
    Image,
    Title,
    Tags,
}

impl ComposeField {
    pub fn next(self) -> Self {
        match self {
            ComposeField::Image => ComposeField::Title,
            ComposeField::Title => ComposeField::Tags,
            ComposeField::Tags => ComposeField::Image,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ComposeField::Image => ComposeField::Tags,
            ComposeField::Title => ComposeField::Image,
            ComposeField::Tags => ComposeField::Title,
        }
    }
}

/// What the composer is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposePhase {
    Editing,
    Uploading,
    Posting,
}

/// The open "new post" overlay.
#[derive(Debug)]
pub struct ComposeState {
    pub draft: Draft,
    pub field: ComposeField,
    pub phase: ComposePhase,
    /// Local file path being typed, before upload.
    pub path_input: String,
    /// Tag being typed, before it is added to the draft.
    pub tag_input: String,
    pub error: Option<String>,
    /// Ties background results to this composer session.
    pub generation: u64,
}

impl ComposeState {
    pub fn new(generation: u64) -> Self {
        Self {
            draft: Draft::new(),
            field: ComposeField::Image,
            phase: ComposePhase::Editing,
            path_input: String::new(),
            tag_input: String::new(),
            error: None,
            generation,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase != ComposePhase::Editing
    }
}

// ============================================================================
// Events
// ============================================================================

/// Results of app-level background tasks.
///
/// Feed traffic (pages, live posts, connection state) travels on the feed
/// view's own channel; see [`FeedEvent`].
#[derive(Debug)]
pub enum AppEvent {
    /// Image upload finished for composer session `generation`.
    ImageUploaded {
        generation: u64,
        result: Result<String, ComposeError>,
    },
    /// Create-post request finished for composer session `generation`.
    PostPublished {
        generation: u64,
        result: Result<Post, ComposeError>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "upload", "publish")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub api: ApiClient,
    pub feed: FeedView,

    /// Selection and scroll offset of the post list.
    pub list_state: ListState,
    /// Post rows that fit in the list area at the last render.
    pub list_rows: usize,
    /// Last (last visible index, list length) reported to the feed.
    viewport_seen: Option<(usize, usize)>,

    pub search_mode: bool,
    pub search_input: String,

    pub compose: Option<ComposeState>,
    pub compose_generation: u64,
    pub compose_handle: Option<JoinHandle<()>>,

    pub show_help: bool,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub spinner_frame: usize,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(api: ApiClient, feed: FeedView, search_input: String) -> Self {
        Self {
            api,
            feed,
            list_state: ListState::default().with_selected(Some(0)),
            list_rows: 0,
            viewport_seen: None,
            search_mode: false,
            search_input,
            compose: None,
            compose_generation: 0,
            compose_handle: None,
            show_help: false,
            status_message: None,
            spinner_frame: 0,
            needs_redraw: true,
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn selected(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.feed.posts().get(self.selected())
    }

    fn select(&mut self, index: usize) {
        let last = self.feed.len().saturating_sub(1);
        let index = index.min(last);
        self.list_state.select(Some(index));
        // Landing on the last row is what asks for more
        if self.feed.item_visible(index) {
            tracing::debug!(index, "Selection reached end of list");
        }
    }

    pub fn select_next(&mut self) {
        self.select(self.selected().saturating_add(1));
    }

    pub fn select_prev(&mut self) {
        self.select(self.selected().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.select(0);
    }

    pub fn select_last(&mut self) {
        self.select(self.feed.len().saturating_sub(1));
    }

    pub fn page_down(&mut self) {
        let step = self.list_rows.max(1);
        self.select(self.selected().saturating_add(step));
    }

    pub fn page_up(&mut self) {
        let step = self.list_rows.max(1);
        self.select(self.selected().saturating_sub(step));
    }

    /// Keep the selection inside the list after it changed length.
    pub fn clamp_selection(&mut self) {
        let len = self.feed.len();
        if len == 0 {
            self.list_state.select(Some(0));
            *self.list_state.offset_mut() = 0;
        } else if self.selected() >= len {
            self.list_state.select(Some(len - 1));
        }
    }

    /// Apply a feed event, keeping the selected post stable across live inserts.
    pub fn handle_feed_event(&mut self, event: FeedEvent) -> bool {
        let head_insert = matches!(event, FeedEvent::LivePost(_));
        let before = self.feed.len();
        let changed = self.feed.handle(event);

        if head_insert && self.feed.len() > before && self.selected() > 0 {
            self.list_state.select(Some(self.selected() + 1));
        }
        if changed {
            self.clamp_selection();
        }
        changed
    }

    /// Report the last row in the viewport to the feed, once per viewport change.
    ///
    /// Returns true if that triggered a page request.
    pub fn report_viewport(&mut self) -> bool {
        let len = self.feed.len();
        if len == 0 || self.list_rows == 0 {
            return false;
        }
        let last_visible = (self.list_state.offset() + self.list_rows).min(len) - 1;
        if self.viewport_seen == Some((last_visible, len)) {
            return false;
        }
        self.viewport_seen = Some((last_visible, len));
        self.feed.item_visible(last_visible)
    }

    // ------------------------------------------------------------------------
    // Composer
    // ------------------------------------------------------------------------

    pub fn open_compose(&mut self) {
        self.compose_generation = self.compose_generation.wrapping_add(1);
        self.compose = Some(ComposeState::new(self.compose_generation));
    }

    /// Close the composer, abandoning any upload or publish in progress.
    pub fn close_compose(&mut self) {
        if let Some(handle) = self.compose_handle.take() {
            handle.abort();
        }
        self.compose = None;
    }

    /// Composer session that a background result belongs to, if still open.
    pub fn compose_for(&mut self, generation: u64) -> Option<&mut ComposeState> {
        self.compose
            .as_mut()
            .filter(|state| state.generation == generation)
    }

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired.
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{ApiError, Cursor, FeedApi, FeedPage, PageQuery, PostId};
    use crate::feed::FeedSettings;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time;

    /// Serves numbered pages of `page_size` posts, `pages` of them.
    pub(crate) struct NumberedPages {
        pub pages: usize,
    }

    #[async_trait]
    impl FeedApi for NumberedPages {
        async fn list_posts(&self, query: &PageQuery) -> Result<FeedPage, ApiError> {
            let page: usize = query
                .cursor
                .as_ref()
                .and_then(|c| c.as_str().parse().ok())
                .unwrap_or(0);
            let size = query.limit as usize;
            let items = (0..size)
                .map(|i| test_post(&format!("p{}", page * size + i)))
                .collect();
            let has_more = page + 1 < self.pages;
            Ok(FeedPage {
                items,
                next_cursor: has_more.then(|| Cursor::new((page + 1).to_string())),
                has_more,
            })
        }
    }

    pub(crate) fn test_post(id: &str) -> Post {
        Post {
            id: PostId::from(id),
            image_url: format!("https://cdn/{id}.jpg"),
            title: format!("Post {id}"),
            tags: vec!["sunset".to_string()],
            created_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    pub(crate) fn test_app(pages: usize) -> (App, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let feed = FeedView::mount(
            Arc::new(NumberedPages { pages }),
            None,
            &FeedSettings::default(),
            "",
            tx,
        );
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        (App::new(api, feed, String::new()), rx)
    }

    pub(crate) async fn pump_one(app: &mut App, rx: &mut mpsc::Receiver<FeedEvent>) {
        let event = time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.handle_feed_event(event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_expires_after_3_seconds() {
        let (mut app, _rx) = test_app(1);
        app.set_status("Test message");

        time::advance(Duration::from_secs(2)).await;
        assert!(!app.clear_expired_status());
        assert!(app.status_message.is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_reaching_last_row_loads_more() {
        let (mut app, mut rx) = test_app(2);
        pump_one(&mut app, &mut rx).await;
        assert_eq!(app.feed.len(), 10);

        app.select_last();
        assert_eq!(app.selected(), 9);
        assert!(app.feed.is_loading());

        pump_one(&mut app, &mut rx).await;
        assert_eq!(app.feed.len(), 20);
        assert!(app.feed.is_exhausted());

        app.select_last();
        assert!(!app.feed.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_stays_in_bounds() {
        let (mut app, mut rx) = test_app(1);
        app.select_next();
        assert_eq!(app.selected(), 0);

        pump_one(&mut app, &mut rx).await;
        app.select_prev();
        assert_eq!(app.selected(), 0);
        app.page_down();
        assert_eq!(app.selected(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_insert_keeps_selected_post() {
        let (mut app, mut rx) = test_app(1);
        pump_one(&mut app, &mut rx).await;
        app.select(3);
        let before = app.selected_post().unwrap().id.clone();

        app.handle_feed_event(FeedEvent::LivePost(test_post("live")));
        assert_eq!(app.selected_post().unwrap().id, before);
        assert_eq!(app.feed.posts()[0].id.as_str(), "live");
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_reports_once_per_change() {
        let (mut app, mut rx) = test_app(3);
        pump_one(&mut app, &mut rx).await;

        // Tall terminal: the whole first page is on screen
        app.list_rows = 20;
        assert!(app.report_viewport());
        assert!(!app.report_viewport());

        pump_one(&mut app, &mut rx).await;
        assert_eq!(app.feed.len(), 20);
        assert!(app.report_viewport());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_compose_results_are_ignored() {
        let (mut app, _rx) = test_app(1);
        app.open_compose();
        let first = app.compose_generation;
        app.close_compose();
        app.open_compose();

        assert!(app.compose_for(first).is_none());
        assert!(app.compose_for(app.compose_generation).is_some());
    }
}
