//! Client for the feed server's REST surface.
//!
//! - [`types`] - wire types: posts, feed pages, cursors
//! - [`client`] - `reqwest` client for listing, creating and uploading
//!
//! The feed engine only needs the read side, expressed as the [`FeedApi`]
//! trait so tests can script page responses without a server.

mod client;
mod types;

use async_trait::async_trait;

pub use client::{ApiClient, ApiError};
pub use types::{normalize_term, Cursor, FeedPage, NewPost, PageQuery, Post, PostId};

/// Read side of the feed server, as seen by the pagination engine.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self, query: &PageQuery) -> Result<FeedPage, ApiError>;
}

#[async_trait]
impl FeedApi for ApiClient {
    async fn list_posts(&self, query: &PageQuery) -> Result<FeedPage, ApiError> {
        ApiClient::list_posts(self, query).await
    }
}
