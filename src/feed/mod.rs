//! Live feed sync and pagination engine.
//!
//! The feed view composes five parts that each own one concern:
//!
//! - [`store`] - the ordered, id-unique post list
//! - [`pagination`] - cursor paging with a single-flight guard
//! - [`scroll`] - fires a fetch when the last row becomes visible
//! - [`debounce`] - trailing-edge debounce of the search input
//! - [`channel`] - the WebSocket connection delivering live posts
//!
//! [`view::FeedView`] mounts them together and tears them down together.
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = mpsc::channel(64);
//! let mut view = FeedView::mount(api, Some(ws_url), &FeedSettings::default(), "", tx);
//!
//! while let Some(event) = rx.recv().await {
//!     view.handle(event);
//! }
//! ```

pub mod channel;
pub mod debounce;
pub mod pagination;
pub mod scroll;
pub mod store;
pub mod view;

pub use channel::{decode_frame, ChannelError, ChannelEvent, ChannelManager, ConnectionState};
pub use debounce::Debouncer;
pub use pagination::{PageMode, PageOutcome, PageRequest, PageState, Paginator};
pub use scroll::ScrollObserver;
pub use store::FeedStore;
pub use view::{FeedEvent, FeedSettings, FeedView, FETCH_FAILED_NOTICE};
