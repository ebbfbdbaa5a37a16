//! Helpers for putting server-supplied data on screen.
//!
//! - **Text**: control-character stripping and Unicode-aware truncation
//! - **URLs**: resolving image URLs before handing them to the system opener

mod links;
mod text;

pub use links::{resolve_image_url, OpenUrlError};
pub use text::{display_width, sanitize_line, truncate_to_width};

/// Maximum search term length accepted from the keyboard.
pub const MAX_SEARCH_LENGTH: usize = 256;
