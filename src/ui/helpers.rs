//! Background task spawning for the composer.

use crate::app::{App, AppEvent, ComposePhase};
use crate::compose;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Catch panics from a spawned future so they reach the status bar instead
/// of silently killing the task.
///
/// # Example
///
/// ```ignore
/// tokio::spawn(async move {
///     match catch_task_panic(async { do_work().await }).await {
///         Ok(result) => { /* normal handling */ }
///         Err(panic_msg) => {
///             let _ = tx.send(AppEvent::TaskPanicked { task: "work", error: panic_msg }).await;
///         }
///     }
/// });
/// ```
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Validate and upload the image at `path` for the open composer.
pub(super) fn spawn_upload(app: &mut App, path: PathBuf, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(state) = app.compose.as_mut() else {
        return;
    };
    state.phase = ComposePhase::Uploading;
    state.error = None;
    let generation = state.generation;

    if let Some(handle) = app.compose_handle.take() {
        handle.abort();
    }

    let api = app.api.clone();
    let tx = event_tx.clone();
    tracing::debug!(path = %path.display(), generation, "Spawning image upload");

    app.compose_handle = Some(tokio::spawn(async move {
        let event = match catch_task_panic(compose::upload(&api, &path)).await {
            Ok(result) => AppEvent::ImageUploaded { generation, result },
            Err(error) => AppEvent::TaskPanicked {
                task: "upload",
                error,
            },
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, "Failed to send upload result (receiver dropped)");
        }
    }));
}

/// Create the post from the open composer's draft.
pub(super) fn spawn_publish(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(state) = app.compose.as_mut() else {
        return;
    };
    // Validation is local, so report it without a round trip
    if let Err(e) = state.draft.validate() {
        state.error = Some(e.to_string());
        return;
    }
    state.phase = ComposePhase::Posting;
    state.error = None;
    let generation = state.generation;
    let draft = state.draft.clone();

    if let Some(handle) = app.compose_handle.take() {
        handle.abort();
    }

    let api = app.api.clone();
    let tx = event_tx.clone();
    tracing::debug!(generation, "Spawning post publish");

    app.compose_handle = Some(tokio::spawn(async move {
        let event = match catch_task_panic(compose::publish(&api, &draft)).await {
            Ok(result) => AppEvent::PostPublished { generation, result },
            Err(error) => AppEvent::TaskPanicked {
                task: "publish",
                error,
            },
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, "Failed to send publish result (receiver dropped)");
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_passes_through_value() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_captures_message() {
        let result = catch_task_panic(async {
            panic!("boom");
        })
        .await;
        assert_eq!(result, Err::<(), _>("boom".to_string()));
    }
}
