//! Main event loop for the TUI.
//!
//! This module contains the core event loop that multiplexes terminal input,
//! feed events, background task events, and periodic ticks.

use crate::app::{App, AppEvent};
use crate::feed::FeedEvent;
use anyhow::Result;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::handle_app_event;
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
pub(super) const SPINNER_FRAMES: usize = 10;

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` to multiplex:
/// - **Terminal input**: Key presses from crossterm's async event stream
/// - **Feed events**: Pages, settled searches, live posts, connection changes
/// - **Background tasks**: Upload and publish results via `AppEvent`
/// - **Periodic tick**: 250ms timer for status and notice expiry
///
/// The feed view is unmounted before the terminal is restored, whichever way
/// the loop exits.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding,
/// ensuring the terminal is not left in raw mode on panic.
pub async fn run(
    app: &mut App,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        leave_screen();
        original_hook(panic_info);
    }));

    let mut screen = Screen::enter()?;
    let result = event_loop(&mut screen.terminal, app, &mut feed_rx, &event_tx, &mut event_rx).await;

    app.feed.unmount();
    app.close_compose();
    drop(screen);
    result
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Raw mode plus alternate screen, restored when dropped.
struct Screen {
    terminal: Term,
}

impl Screen {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        match Terminal::new(CrosstermBackend::new(io::stdout())) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                leave_screen();
                Err(e.into())
            }
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        leave_screen();
        if let Err(e) = self.terminal.show_cursor() {
            tracing::warn!(error = %e, "Failed to restore cursor");
        }
    }
}

/// Best effort: also runs from the panic hook.
fn leave_screen() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

async fn event_loop(
    terminal: &mut Term,
    app: &mut App,
    feed_rx: &mut mpsc::Receiver<FeedEvent>,
    event_tx: &mpsc::Sender<AppEvent>,
    event_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // Signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        // Only render when state has changed
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;

            // The viewport is only known after layout
            if app.report_viewport() {
                app.needs_redraw = true;
            }
        }

        // Drain queued feed events before waiting on input so pages and live
        // posts show up promptly during rapid typing
        while let Ok(event) = feed_rx.try_recv() {
            if app.handle_feed_event(event) {
                app.needs_redraw = true;
            }
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    app.needs_redraw = true;
                    match handle_input(app, key.code, key.modifiers, event_tx) {
                        Ok(Action::Quit) => break,
                        Ok(Action::Continue) => {}
                        Err(e) => app.set_status(format!("Error: {}", e)),
                    }
                }
                Some(Ok(Event::Resize(_, _))) => app.needs_redraw = true,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Terminal input error");
                }
                None => {
                    tracing::info!("Terminal input closed");
                    break;
                }
            },

            Some(event) = feed_rx.recv() => {
                if app.handle_feed_event(event) {
                    app.needs_redraw = true;
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event);
            }

            _ = tick_interval.tick() => {
                let status_cleared = app.clear_expired_status();
                let notice_cleared = app.feed.tick();
                if status_cleared || notice_cleared {
                    app.needs_redraw = true;
                }
                if app.feed.is_loading() || app.compose.as_ref().is_some_and(|c| c.is_busy()) {
                    app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
                    app.needs_redraw = true;
                }
            }
        }
    }
    Ok(())
}
