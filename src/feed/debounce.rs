//! Trailing-edge debounce for the search input.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Publishes the latest raw value once no new value arrived for `quiet`.
///
/// Each `push` restarts the quiet period. Intermediate values are never
/// published. Cancelling (explicitly or by dropping) stops the timer task,
/// so nothing is published after the consumer is gone.
#[derive(Debug)]
pub struct Debouncer {
    input: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Start the timer task. Settled values are sent as `wrap(value)` on `out`.
    pub fn spawn<E, F>(quiet: Duration, out: mpsc::Sender<E>, wrap: F) -> Self
    where
        E: Send + 'static,
        F: Fn(String) -> E + Send + 'static,
    {
        let (input, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(quiet, rx, out, wrap, cancel.clone()));
        Self {
            input,
            cancel,
            handle,
        }
    }

    /// Record a new raw value and restart the quiet period.
    pub fn push(&self, raw: impl Into<String>) {
        if self.input.send(raw.into()).is_err() {
            tracing::debug!("Debouncer already stopped, input dropped");
        }
    }

    /// Stop the timer. A pending value is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

async fn run<E, F>(
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<String>,
    out: mpsc::Sender<E>,
    wrap: F,
    cancel: CancellationToken,
) where
    F: Fn(String) -> E,
{
    let mut pending: Option<String> = None;
    let timer = tokio::time::sleep(quiet);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            next = rx.recv() => match next {
                Some(value) => {
                    pending = Some(value);
                    timer.as_mut().reset(Instant::now() + quiet);
                }
                None => break,
            },

            _ = &mut timer, if pending.is_some() => {
                let Some(value) = pending.take() else { continue };
                if cancel.is_cancelled() {
                    break;
                }
                tracing::debug!(value = %value, "Search input settled");
                if out.send(wrap(value)).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::trace!("Debouncer stopped");
}
