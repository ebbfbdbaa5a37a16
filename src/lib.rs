//! pixfeed: terminal client for a live photo-sharing feed.
//!
//! - [`api`] - REST client and wire types
//! - [`feed`] - pagination, search debounce and live updates for the post list
//! - [`compose`] - draft validation and publishing
//! - [`config`] - TOML configuration
//! - [`ui`] - ratatui front end

pub mod api;
pub mod app;
pub mod compose;
pub mod config;
pub mod feed;
pub mod ui;
pub mod util;
