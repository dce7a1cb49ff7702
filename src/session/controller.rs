//! Orchestrates generation requests against a session's state.

use crate::error::{RestyleError, Result, MISSING_INPUT_MESSAGE};
use crate::image::{encode_file, AspectRatio, GeneratedImage, GenerationRequest, ImageProvider};
use crate::session::state::{GeneratedResult, SessionEvent, SessionState};
use chrono::{DateTime, Utc};
use std::path::Path;

/// A generation that has been admitted but not yet completed.
///
/// Obtained from [`SessionController::begin_generation`] and handed back to
/// [`SessionController::finish_generation`] exactly once.
#[derive(Debug)]
#[must_use = "a pending generation must be finished"]
pub struct PendingGeneration {
    request: GenerationRequest,
}

impl PendingGeneration {
    /// The request to send to the provider.
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

/// Hands out time-derived ids that never repeat within a session.
#[derive(Debug, Default)]
struct ResultIds {
    last: Option<i64>,
}

impl ResultIds {
    fn next(&mut self, now: DateTime<Utc>) -> String {
        let millis = match self.last {
            Some(last) => now.timestamp_millis().max(last + 1),
            None => now.timestamp_millis(),
        };
        self.last = Some(millis);
        millis.to_string()
    }
}

/// Owns a session's state and drives generations through a provider.
#[derive(Debug)]
pub struct SessionController<P> {
    provider: P,
    state: SessionState,
    aspect_ratio: AspectRatio,
    ids: ResultIds,
}

impl<P: ImageProvider> SessionController<P> {
    /// Creates an idle, empty session.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: SessionState::new(),
            aspect_ratio: AspectRatio::default(),
            ids: ResultIds::default(),
        }
    }

    /// Sets the aspect ratio requested for every generation.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Results, newest first.
    pub fn results(&self) -> &[GeneratedResult] {
        &self.state.results
    }

    /// Looks up a result by id.
    pub fn result(&self, id: &str) -> Option<&GeneratedResult> {
        self.state.results.iter().find(|r| r.id == id)
    }

    /// Returns the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(event);
    }

    /// Reads `path` and makes it the source image.
    ///
    /// Returns `Ok(false)` when the file is not an image; the session is left
    /// as it was. Read failures are recorded as the session error and
    /// returned.
    pub async fn select_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        match encode_file(path).await {
            Ok(Some(image)) => {
                self.dispatch(SessionEvent::SourceImageSelected(image));
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                self.dispatch(SessionEvent::ReadFailed(e.user_message()));
                Err(e)
            }
        }
    }

    /// Replaces the source image.
    pub fn set_source_image(&mut self, image: crate::image::SourceImage) {
        self.dispatch(SessionEvent::SourceImageSelected(image));
    }

    /// Replaces the prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.dispatch(SessionEvent::PromptEdited(prompt.into()));
    }

    /// Admits a generation, moving the session into the generating state.
    ///
    /// Fails with [`RestyleError::AlreadyGenerating`] while another
    /// generation is in flight (the state is not touched), and with
    /// [`RestyleError::Validation`] when the image or prompt is missing (the
    /// validation message becomes the session error).
    pub fn begin_generation(&mut self) -> Result<PendingGeneration> {
        let was_generating = self.state.is_generating;
        self.dispatch(SessionEvent::GenerateRequested);

        if was_generating {
            tracing::debug!("rejecting generate request, one is already in flight");
            return Err(RestyleError::AlreadyGenerating);
        }
        if !self.state.is_generating {
            let message = self
                .state
                .error
                .clone()
                .unwrap_or_else(|| MISSING_INPUT_MESSAGE.to_string());
            return Err(RestyleError::Validation(message));
        }

        let image = self
            .state
            .source_image
            .clone()
            .ok_or_else(|| RestyleError::Validation(MISSING_INPUT_MESSAGE.to_string()))?;
        let request = GenerationRequest::new(image, self.state.prompt.clone())
            .with_aspect_ratio(self.aspect_ratio);

        tracing::info!(
            provider = self.provider.name(),
            aspect_ratio = %self.aspect_ratio,
            "generation started"
        );
        Ok(PendingGeneration { request })
    }

    /// Records the outcome of a pending generation and returns to idle.
    ///
    /// On success the new result is placed at the front of the gallery and
    /// returned. On failure the error message becomes the session error and
    /// the error itself is returned unchanged.
    pub fn finish_generation(
        &mut self,
        pending: PendingGeneration,
        outcome: Result<GeneratedImage>,
    ) -> Result<GeneratedResult> {
        match outcome {
            Ok(image) => {
                let timestamp = Utc::now();
                let result = GeneratedResult {
                    id: self.ids.next(timestamp),
                    url: image.to_data_url(),
                    prompt: pending.request.prompt,
                    timestamp,
                };
                tracing::info!(
                    id = %result.id,
                    mime_type = image.image.mime_type(),
                    duration_ms = ?image.metadata.duration_ms,
                    "generation finished"
                );
                self.dispatch(SessionEvent::GenerationSucceeded(result.clone()));
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                self.dispatch(SessionEvent::GenerationFailed(e.message()));
                Err(e)
            }
        }
    }

    /// Runs one full generation: admit, call the provider, record the outcome.
    pub async fn generate(&mut self) -> Result<GeneratedResult> {
        let pending = self.begin_generation()?;
        let outcome = self.provider.generate(pending.request()).await;
        self.finish_generation(pending, outcome)
    }
}
