use crate::app::{App, AppEvent, ComposeField, ComposePhase};

/// Apply the result of an app-level background task.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::ImageUploaded { generation, result } => {
            let Some(state) = app.compose_for(generation) else {
                tracing::debug!(generation, "Upload result for closed composer ignored");
                return;
            };
            state.phase = ComposePhase::Editing;
            match result {
                Ok(url) => {
                    state.draft.set_image(url);
                    state.path_input.clear();
                    state.field = ComposeField::Title;
                    state.error = None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Image upload failed");
                    state.error = Some(e.to_string());
                }
            }
            app.compose_handle = None;
        }

        AppEvent::PostPublished { generation, result } => {
            let Some(state) = app.compose_for(generation) else {
                tracing::debug!(generation, "Publish result for closed composer ignored");
                return;
            };
            match result {
                Ok(post) => {
                    app.compose_handle = None;
                    app.compose = None;
                    app.feed.post_published(post);
                    app.select_first();
                    app.set_status("Post published");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Publishing post failed");
                    state.phase = ComposePhase::Editing;
                    state.error = Some(e.to_string());
                    app.compose_handle = None;
                }
            }
        }

        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            if let Some(state) = app.compose.as_mut() {
                state.phase = ComposePhase::Editing;
            }
            app.compose_handle = None;
            app.set_status(format!("Internal error in {task}: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{pump_one, test_app, test_post};
    use crate::compose::{ComposeError, ValidationError};

    #[tokio::test(start_paused = true)]
    async fn test_upload_success_moves_to_title() {
        let (mut app, _rx) = test_app(1);
        app.open_compose();
        let generation = app.compose_generation;
        if let Some(state) = app.compose.as_mut() {
            state.phase = ComposePhase::Uploading;
            state.path_input = "/tmp/a.png".into();
        }

        handle_app_event(
            &mut app,
            AppEvent::ImageUploaded {
                generation,
                result: Ok("https://cdn/a.jpg".into()),
            },
        );

        let state = app.compose.as_ref().unwrap();
        assert_eq!(state.phase, ComposePhase::Editing);
        assert_eq!(state.field, ComposeField::Title);
        assert_eq!(state.draft.image_url(), Some("https://cdn/a.jpg"));
        assert!(state.path_input.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_shows_error() {
        let (mut app, _rx) = test_app(1);
        app.open_compose();
        let generation = app.compose_generation;

        handle_app_event(
            &mut app,
            AppEvent::ImageUploaded {
                generation,
                result: Err(ComposeError::Invalid(ValidationError::UnsupportedImage)),
            },
        );

        let state = app.compose.as_ref().unwrap();
        assert_eq!(
            state.error.as_deref(),
            Some("Only PNG and JPEG images are supported")
        );
        assert!(state.draft.image_url().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_post_is_prepended_and_composer_closes() {
        let (mut app, mut rx) = test_app(1);
        pump_one(&mut app, &mut rx).await;
        app.open_compose();
        let generation = app.compose_generation;

        handle_app_event(
            &mut app,
            AppEvent::PostPublished {
                generation,
                result: Ok(test_post("mine")),
            },
        );

        assert!(app.compose.is_none());
        assert_eq!(app.feed.posts()[0].id.as_str(), "mine");
        assert_eq!(app.selected(), 0);
        assert!(app.status_message.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_for_closed_composer_is_dropped() {
        let (mut app, mut rx) = test_app(1);
        pump_one(&mut app, &mut rx).await;
        app.open_compose();
        let generation = app.compose_generation;
        app.close_compose();

        handle_app_event(
            &mut app,
            AppEvent::PostPublished {
                generation,
                result: Ok(test_post("late")),
            },
        );
        assert_eq!(app.feed.len(), 10);
    }
}
