//! Cursor pagination with a single-flight guard.
//!
//! The controller never performs I/O itself. `fetch_next` and
//! `reset_and_fetch_first` hand back a [`PageRequest`] for the caller to run,
//! and `complete` applies the response. A request generation ties each
//! response to the request that produced it, so a response for a request
//! that was superseded by a reset (or retired on teardown) is dropped.

use super::store::FeedStore;
use crate::api::{normalize_term, ApiError, Cursor, FeedPage, PageQuery};

/// Pagination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Ready to fetch the next page.
    Idle,
    /// A request is outstanding. Further `fetch_next` calls are rejected.
    Loading,
    /// The server reported no further pages. Terminal until reset.
    Exhausted,
}

/// How a page response is merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    Append,
    Replace,
}

/// A fetch the caller must perform and report back through [`Paginator::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub mode: PageMode,
    pub query: PageQuery,
}

/// Result of applying a response.
#[derive(Debug)]
pub enum PageOutcome {
    /// Page merged. `added` counts posts that were new to the list.
    Applied {
        mode: PageMode,
        added: usize,
        exhausted: bool,
    },
    /// Request failed. Cursor and exhaustion are unchanged so the next trigger retries.
    Failed(ApiError),
    /// Response for a request that is no longer current.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: u64,
    mode: PageMode,
}

/// Pagination state for one feed view.
#[derive(Debug)]
pub struct Paginator {
    state: PageState,
    cursor: Option<Cursor>,
    term: Option<String>,
    page_size: u32,
    generation: u64,
    in_flight: Option<InFlight>,
    /// Set when a first-page fetch failed: the list still shows the previous
    /// search, so the retry must replace rather than append.
    replace_pending: bool,
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            state: PageState::Idle,
            cursor: None,
            term: None,
            page_size: page_size.max(1),
            generation: 0,
            in_flight: None,
            replace_pending: false,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == PageState::Loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Active search term, already trimmed. `None` means unfiltered.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// Request the next page, or `None` if a fetch is outstanding or the feed is exhausted.
    pub fn fetch_next(&mut self) -> Option<PageRequest> {
        match self.state {
            PageState::Loading => {
                tracing::trace!("fetch_next ignored: already loading");
                None
            }
            PageState::Exhausted => {
                tracing::trace!("fetch_next ignored: feed exhausted");
                None
            }
            PageState::Idle => {
                let mode = if self.replace_pending {
                    PageMode::Replace
                } else {
                    PageMode::Append
                };
                Some(self.begin(mode))
            }
        }
    }

    /// Drop the cursor and exhaustion, switch to `raw_term`, and request the first page.
    ///
    /// Unconditional. A request still in flight is superseded: its generation
    /// is retired, so its response is ignored when it arrives.
    pub fn reset_and_fetch_first(&mut self, raw_term: &str) -> PageRequest {
        if let Some(prev) = self.in_flight {
            tracing::debug!(
                generation = prev.generation,
                "Reset supersedes in-flight page request"
            );
        }
        self.cursor = None;
        self.term = normalize_term(raw_term);
        self.state = PageState::Idle;
        self.replace_pending = true;
        self.begin(PageMode::Replace)
    }

    fn begin(&mut self, mode: PageMode) -> PageRequest {
        self.generation = self.generation.wrapping_add(1);
        self.state = PageState::Loading;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            mode,
        });
        PageRequest {
            generation: self.generation,
            mode,
            query: PageQuery {
                tag: self.term.clone(),
                cursor: match mode {
                    PageMode::Append => self.cursor.clone(),
                    PageMode::Replace => None,
                },
                limit: self.page_size,
            },
        }
    }

    /// Apply the response for request `generation`.
    ///
    /// # Arguments
    ///
    /// * `generation` - The generation carried by the [`PageRequest`] that produced `result`
    /// * `result` - The server's page, or the error the fetch ended with
    /// * `store` - Post list to merge into: appended for `fetch_next`, replaced for a reset
    ///
    /// # Returns
    ///
    /// - [`PageOutcome::Stale`] if `generation` is not the request in flight.
    ///   Nothing changes; a reset or retire already superseded it.
    /// - [`PageOutcome::Applied`] after merging. The cursor advances and the
    ///   state becomes Exhausted when the server reports no further pages.
    /// - [`PageOutcome::Failed`] on error. The state returns to Idle with the
    ///   cursor untouched, so the next trigger retries the same page.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<FeedPage, ApiError>,
        store: &mut FeedStore,
    ) -> PageOutcome {
        let Some(in_flight) = self.in_flight.filter(|f| f.generation == generation) else {
            tracing::debug!(generation, current = self.generation, "Dropping stale page response");
            return PageOutcome::Stale;
        };
        self.in_flight = None;

        match result {
            Ok(page) => {
                // has_more without a cursor leaves nowhere to resume from
                let exhausted = !page.has_more || page.next_cursor.is_none();
                self.cursor = page.next_cursor;
                self.state = if exhausted {
                    PageState::Exhausted
                } else {
                    PageState::Idle
                };

                let added = match in_flight.mode {
                    PageMode::Append => store.append_unique(page.items),
                    PageMode::Replace => {
                        self.replace_pending = false;
                        store.replace_all(page.items);
                        store.len()
                    }
                };
                tracing::debug!(
                    generation,
                    mode = ?in_flight.mode,
                    added,
                    exhausted,
                    "Page applied"
                );
                PageOutcome::Applied {
                    mode: in_flight.mode,
                    added,
                    exhausted,
                }
            }
            Err(e) => {
                // Loading is only ever entered from Idle, so failure returns there
                self.state = PageState::Idle;
                tracing::warn!(
                    generation,
                    error = %e,
                    transient = e.is_transient(),
                    "Page fetch failed"
                );
                PageOutcome::Failed(e)
            }
        }
    }

    /// Forget the in-flight request so a late response is ignored.
    pub fn retire(&mut self) {
        if self.in_flight.take().is_some() {
            self.state = PageState::Idle;
        }
    }
}
