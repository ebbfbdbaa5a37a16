//! Ordered post list shared by pagination and live inserts.

use crate::api::{Post, PostId};
use std::collections::HashSet;

/// The single source of truth for the visible feed, newest first.
///
/// Pagination writes to the tail (`append_unique`) or swaps the whole list
/// (`replace_all`). Live inserts write to the head (`prepend`). The two never
/// touch the same end, so interleaving them needs no coordination.
#[derive(Debug, Default)]
pub struct FeedStore {
    posts: Vec<Post>,
    ids: HashSet<PostId>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Insert a live-created post at the head.
    ///
    /// Unconditional: an id already in the list is inserted again. Only posts
    /// created during this session reach this path, so at most one duplicate row
    /// can appear, and the next reset clears it.
    pub fn prepend(&mut self, post: Post) {
        if self.ids.contains(&post.id) {
            tracing::debug!(post_id = %post.id, "Live insert duplicates a listed post");
        }
        self.ids.insert(post.id.clone());
        self.posts.insert(0, post);
    }

    /// Replace the whole list with a fresh first page.
    pub fn replace_all(&mut self, posts: Vec<Post>) {
        self.posts.clear();
        self.ids.clear();
        self.append_unique(posts);
    }

    /// Append a page, skipping ids already present (or repeated within the page).
    ///
    /// Returns the number of posts actually appended.
    pub fn append_unique(&mut self, posts: Vec<Post>) -> usize {
        let before = self.posts.len();
        self.posts.reserve(posts.len());
        for post in posts {
            if self.ids.insert(post.id.clone()) {
                self.posts.push(post);
            } else {
                tracing::trace!(post_id = %post.id, "Skipping already-listed post");
            }
        }
        self.posts.len() - before
    }
}
