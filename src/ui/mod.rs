//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `render` - View rendering dispatch
//! - `helpers` - Upload and publish task spawning
//! - `posts` - Post list widget
//! - `composer` - New post overlay
//! - `help` - Keybinding overlay
//! - `status` - Status bar widget

mod composer;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod posts;
mod render;
mod status;

// Re-export the public API
pub use loop_runner::{run, Action};
pub use posts::format_relative_time;
