//! The feed view: one mounted instance of store, paginator, observer,
//! debouncer and channel.
//!
//! All state here is owned by the UI task. Background work (page fetches, the
//! debounce timer, the channel supervisor) reports back as [`FeedEvent`]s on
//! the view's mpsc channel, and the event loop feeds them to
//! [`FeedView::handle`]. Nothing is mutated concurrently.

use super::channel::{ChannelEvent, ChannelManager, ConnectionState};
use super::debounce::Debouncer;
use super::pagination::{PageOutcome, PageRequest, PageState, Paginator};
use super::scroll::ScrollObserver;
use super::store::FeedStore;
use crate::api::{normalize_term, ApiError, FeedApi, FeedPage, Post};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Notice raised when a page request fails.
pub const FETCH_FAILED_NOTICE: &str = "Failed to load posts";

/// Messages from the view's background work.
#[derive(Debug)]
pub enum FeedEvent {
    /// The search input has been quiet for the debounce period.
    SearchSettled(String),
    /// A page request finished.
    PageLoaded {
        generation: u64,
        result: Result<FeedPage, ApiError>,
    },
    /// A post created elsewhere arrived over the real-time channel.
    LivePost(Post),
    /// The real-time channel changed state.
    Connection(ConnectionState),
}

impl From<ChannelEvent> for FeedEvent {
    fn from(event: ChannelEvent) -> Self {
        match event {
            ChannelEvent::PostCreated(post) => FeedEvent::LivePost(post),
            ChannelEvent::State(state) => FeedEvent::Connection(state),
        }
    }
}

/// Tunables for a feed view.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub page_size: u32,
    pub debounce: Duration,
    pub reconnect_delay: Duration,
    pub notice_ttl: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            debounce: Duration::from_millis(300),
            reconnect_delay: Duration::from_secs(3),
            notice_ttl: Duration::from_secs(3),
        }
    }
}

pub struct FeedView {
    api: Arc<dyn FeedApi>,
    tx: mpsc::Sender<FeedEvent>,
    store: FeedStore,
    pager: Paginator,
    observer: ScrollObserver,
    debouncer: Debouncer,
    channel: Option<ChannelManager<FeedEvent>>,
    connection: ConnectionState,
    fetch: Option<JoinHandle<()>>,
    notice: Option<(Cow<'static, str>, Instant)>,
    notice_ttl: Duration,
    mounted: bool,
}

impl FeedView {
    /// Mount the view: connect the channel and request the first page for `initial_term`.
    ///
    /// Must be called from within a tokio runtime. The debouncer task, the
    /// channel supervisor and the first fetch are all spawned here.
    ///
    /// # Arguments
    ///
    /// * `api` - Page source; the real [`ApiClient`](crate::api::ApiClient) or a scripted one in tests
    /// * `channel_url` - WebSocket endpoint for live posts; `None` runs without live updates
    /// * `settings` - Page size, debounce quiet period, reconnect delay and notice lifetime
    /// * `initial_term` - Search term for the first page; blank means unfiltered
    /// * `tx` - Where every background result arrives as a [`FeedEvent`]
    ///
    /// # Returns
    ///
    /// A mounted view. Events read from the receiver paired with `tx` must be
    /// passed back through [`handle`](Self::handle) on the same task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (tx, mut rx) = mpsc::channel(64);
    /// let mut view = FeedView::mount(api, Some(ws_url), &FeedSettings::default(), "", tx);
    /// while let Some(event) = rx.recv().await {
    ///     view.handle(event);
    /// }
    /// ```
    pub fn mount(
        api: Arc<dyn FeedApi>,
        channel_url: Option<Url>,
        settings: &FeedSettings,
        initial_term: &str,
        tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let debouncer = Debouncer::spawn(settings.debounce, tx.clone(), FeedEvent::SearchSettled);
        let channel = channel_url.map(|url| {
            ChannelManager::new(
                url,
                settings.reconnect_delay,
                tx.clone(),
                |event| FeedEvent::from(event),
            )
        });

        let mut view = Self {
            api,
            tx,
            store: FeedStore::new(),
            pager: Paginator::new(settings.page_size),
            observer: ScrollObserver::new(),
            debouncer,
            channel,
            connection: ConnectionState::Disconnected,
            fetch: None,
            notice: None,
            notice_ttl: settings.notice_ttl,
            mounted: true,
        };

        if let Some(channel) = view.channel.as_mut() {
            channel.connect();
            view.connection = channel.state();
        }
        view.reset(initial_term);
        tracing::info!(
            page_size = settings.page_size,
            live = view.channel.is_some(),
            "Feed view mounted"
        );
        view
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Record a keystroke-level change of the search input.
    pub fn search_input(&self, raw: &str) {
        if self.mounted {
            self.debouncer.push(raw);
        }
    }

    /// Apply a background event. Returns true when the view changed.
    pub fn handle(&mut self, event: FeedEvent) -> bool {
        if !self.mounted {
            tracing::trace!(?event, "Feed event after unmount ignored");
            return false;
        }

        match event {
            FeedEvent::SearchSettled(raw) => {
                if normalize_term(&raw).as_deref() == self.pager.term() {
                    tracing::debug!(term = %raw, "Search term unchanged, skipping reset");
                    return false;
                }
                self.reset(&raw);
                true
            }

            FeedEvent::PageLoaded { generation, result } => {
                match self.pager.complete(generation, result, &mut self.store) {
                    PageOutcome::Stale => return false,
                    PageOutcome::Applied { .. } => {}
                    PageOutcome::Failed(_) => self.raise_notice(FETCH_FAILED_NOTICE),
                }
                self.fetch = None;
                self.reattach();
                true
            }

            FeedEvent::LivePost(post) => {
                self.store.prepend(post);
                self.reattach();
                true
            }

            FeedEvent::Connection(state) => {
                let changed = self.connection != state;
                self.connection = state;
                changed
            }
        }
    }

    /// The row at `index` became visible. Returns true if a page request was issued.
    pub fn item_visible(&mut self, index: usize) -> bool {
        if !self.mounted || !self.observer.on_visible(index, self.pager.is_exhausted()) {
            return false;
        }
        match self.pager.fetch_next() {
            Some(request) => {
                self.spawn_fetch(request);
                self.reattach();
                true
            }
            None => false,
        }
    }

    /// Insert a post the user just created.
    pub fn post_published(&mut self, post: Post) {
        if !self.mounted {
            return;
        }
        self.store.prepend(post);
        self.reattach();
    }

    /// Reload the first page for the active term.
    pub fn refresh(&mut self) {
        if !self.mounted {
            return;
        }
        let term = self.pager.term().unwrap_or_default().to_string();
        self.reset(&term);
    }

    /// Expire the notice. Returns true if it was cleared.
    pub fn tick(&mut self) -> bool {
        match &self.notice {
            Some((_, raised)) if raised.elapsed() >= self.notice_ttl => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }

    /// Tear everything down. Runs once; later calls do nothing.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        self.debouncer.cancel();
        self.observer.disconnect();
        if let Some(channel) = self.channel.as_mut() {
            channel.teardown();
            self.connection = channel.state();
        }
        if let Some(handle) = self.fetch.take() {
            handle.abort();
        }
        self.pager.retire();
        tracing::info!("Feed view unmounted");
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn posts(&self) -> &[Post] {
        self.store.posts()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn term(&self) -> Option<&str> {
        self.pager.term()
    }

    pub fn page_state(&self) -> PageState {
        self.pager.state()
    }

    pub fn is_loading(&self) -> bool {
        self.pager.is_loading()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pager.is_exhausted()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_live(&self) -> bool {
        self.channel.is_some()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(|(text, _)| text.as_ref())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn reset(&mut self, raw_term: &str) {
        let request = self.pager.reset_and_fetch_first(raw_term);
        tracing::debug!(term = ?request.query.tag, "Resetting feed");
        self.spawn_fetch(request);
        self.reattach();
    }

    fn reattach(&mut self) {
        self.observer
            .attach(self.store.posts(), self.pager.is_loading());
    }

    fn raise_notice(&mut self, text: impl Into<Cow<'static, str>>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    fn spawn_fetch(&mut self, request: PageRequest) {
        // A reset can supersede a fetch that is still running
        if let Some(previous) = self.fetch.take() {
            previous.abort();
        }

        let PageRequest {
            generation, query, ..
        } = request;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.fetch = Some(tokio::spawn(async move {
            let result = api.list_posts(&query).await;
            if tx
                .send(FeedEvent::PageLoaded { generation, result })
                .await
                .is_err()
            {
                tracing::debug!(generation, "Feed receiver gone, page dropped");
            }
        }));
    }
}

impl Drop for FeedView {
    fn drop(&mut self) {
        self.unmount();
    }
}
