//! Session state and its transition function.

use crate::error::{Result, FALLBACK_ERROR_MESSAGE, MISSING_INPUT_MESSAGE};
use crate::image::{EmbeddedImage, SourceImage};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Prefix used for downloaded result files.
pub const DOWNLOAD_PREFIX: &str = "nano-banana";

/// One image produced during the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResult {
    /// Unique within the session; derived from the creation time.
    pub id: String,
    /// Data URL of the generated image.
    pub url: String,
    /// Prompt that produced the image.
    pub prompt: String,
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
}

impl GeneratedResult {
    /// Decodes the data URL back into an image.
    pub fn image(&self) -> Result<EmbeddedImage> {
        EmbeddedImage::from_data_url(&self.url)
    }

    /// File name used when downloading this result.
    pub fn file_name(&self) -> Result<String> {
        Ok(self.file_name_for(&self.image()?))
    }

    fn file_name_for(&self, image: &EmbeddedImage) -> String {
        format!("{DOWNLOAD_PREFIX}-{}.{}", self.id, image.extension())
    }

    /// Writes the image into `dir` and returns the path written.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let image = self.image()?;
        let path = dir.as_ref().join(self.file_name_for(&image));
        image.save(&path)?;
        tracing::debug!(id = %self.id, path = %path.display(), "saved result");
        Ok(path)
    }
}

/// Something that happened to the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The user picked a new source image.
    SourceImageSelected(SourceImage),
    /// The user changed the prompt text.
    PromptEdited(String),
    /// The user asked for a generation.
    GenerateRequested,
    /// The in-flight generation produced a result.
    GenerationSucceeded(GeneratedResult),
    /// The in-flight generation failed, with its message if it had one.
    GenerationFailed(Option<String>),
    /// Selecting a file failed.
    ReadFailed(String),
}

/// All mutable state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Currently selected source image.
    pub source_image: Option<SourceImage>,
    /// Current prompt text.
    pub prompt: String,
    /// True while a generation is in flight.
    pub is_generating: bool,
    /// Error shown to the user, if any.
    pub error: Option<String>,
    /// Generated images, newest first.
    pub results: Vec<GeneratedResult>,
}

impl SessionState {
    /// Creates an empty, idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a generate request would be accepted.
    pub fn can_generate(&self) -> bool {
        !self.is_generating && self.source_image.is_some() && !self.prompt.trim().is_empty()
    }

    /// Applies `event` and returns the next state.
    ///
    /// Requests to generate and read failures while a generation is in
    /// flight, and completions that arrive while idle, leave the state
    /// untouched.
    pub fn reduce(mut self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::SourceImageSelected(image) => {
                self.source_image = Some(image);
                self.error = None;
            }
            SessionEvent::PromptEdited(prompt) => {
                self.prompt = prompt;
                self.error = None;
            }
            SessionEvent::GenerateRequested => {
                if self.is_generating {
                    return self;
                }
                if self.source_image.is_none() || self.prompt.trim().is_empty() {
                    self.error = Some(MISSING_INPUT_MESSAGE.to_string());
                    return self;
                }
                self.is_generating = true;
                self.error = None;
            }
            SessionEvent::GenerationSucceeded(result) => {
                if !self.is_generating {
                    return self;
                }
                self.is_generating = false;
                self.results.insert(0, result);
            }
            SessionEvent::GenerationFailed(message) => {
                if !self.is_generating {
                    return self;
                }
                self.is_generating = false;
                self.error = Some(
                    message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
                );
            }
            SessionEvent::ReadFailed(message) => {
                if self.is_generating {
                    return self;
                }
                self.error = Some(message);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> SourceImage {
        SourceImage::new("image/png", vec![0x89, 0x50, 0x4E, 0x47])
    }

    fn result(id: &str) -> GeneratedResult {
        GeneratedResult {
            id: id.to_string(),
            url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            prompt: "make it blue".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn ready() -> SessionState {
        SessionState::new()
            .reduce(SessionEvent::SourceImageSelected(image()))
            .reduce(SessionEvent::PromptEdited("make it blue".into()))
    }

    #[test]
    fn test_generate_requires_image_and_prompt() {
        let no_image = SessionState::new()
            .reduce(SessionEvent::PromptEdited("make it blue".into()))
            .reduce(SessionEvent::GenerateRequested);
        assert!(!no_image.is_generating);
        assert_eq!(no_image.error.as_deref(), Some(MISSING_INPUT_MESSAGE));

        let blank_prompt = SessionState::new()
            .reduce(SessionEvent::SourceImageSelected(image()))
            .reduce(SessionEvent::PromptEdited("   \n".into()))
            .reduce(SessionEvent::GenerateRequested);
        assert!(!blank_prompt.is_generating);
        assert_eq!(blank_prompt.error.as_deref(), Some(MISSING_INPUT_MESSAGE));
    }

    #[test]
    fn test_generate_enters_generating_and_clears_error() {
        let mut state = ready();
        state.error = Some("old failure".into());
        let state = state.reduce(SessionEvent::GenerateRequested);
        assert!(state.is_generating);
        assert!(state.error.is_none());
        assert!(!state.can_generate());
    }

    #[test]
    fn test_second_request_while_generating_is_ignored() {
        let generating = ready().reduce(SessionEvent::GenerateRequested);
        let again = generating.clone().reduce(SessionEvent::GenerateRequested);
        assert!(again.is_generating);
        assert!(again.error.is_none());
        assert_eq!(again.results.len(), generating.results.len());
    }

    #[test]
    fn test_success_prepends_result() {
        let state = ready()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationSucceeded(result("1")))
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationSucceeded(result("2")));

        assert!(!state.is_generating);
        let ids: Vec<_> = state.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_failure_sets_error_and_keeps_results() {
        let before = ready()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationSucceeded(result("1")));
        let after = before
            .clone()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationFailed(Some("quota exceeded".into())));

        assert!(!after.is_generating);
        assert_eq!(after.error.as_deref(), Some("quota exceeded"));
        assert_eq!(after.results, before.results);
    }

    #[test]
    fn test_failure_without_message_uses_fallback() {
        let state = ready()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationFailed(None));
        assert_eq!(state.error.as_deref(), Some(FALLBACK_ERROR_MESSAGE));

        let state = ready()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::GenerationFailed(Some(String::new())));
        assert_eq!(state.error.as_deref(), Some(FALLBACK_ERROR_MESSAGE));
    }

    #[test]
    fn test_completion_while_idle_is_ignored() {
        let state = ready().reduce(SessionEvent::GenerationSucceeded(result("1")));
        assert!(state.results.is_empty());

        let state = ready().reduce(SessionEvent::GenerationFailed(Some("late".into())));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_read_failure_while_generating_is_ignored() {
        let state = ready()
            .reduce(SessionEvent::GenerateRequested)
            .reduce(SessionEvent::ReadFailed("failed to read x.png".into()));
        assert!(state.error.is_none());

        let state = state.reduce(SessionEvent::GenerationSucceeded(result("1")));
        assert!(state.error.is_none());
        assert_eq!(state.results.len(), 1);

        let idle = state.reduce(SessionEvent::ReadFailed("failed to read x.png".into()));
        assert_eq!(idle.error.as_deref(), Some("failed to read x.png"));
    }

    #[test]
    fn test_edits_clear_error() {
        let failed = SessionState::new().reduce(SessionEvent::GenerateRequested);
        assert!(failed.error.is_some());

        let edited = failed.clone().reduce(SessionEvent::PromptEdited("x".into()));
        assert!(edited.error.is_none());

        let reselected = failed.reduce(SessionEvent::SourceImageSelected(image()));
        assert!(reselected.error.is_none());
    }

    #[test]
    fn test_result_file_name_and_save() {
        let result = result("1700000000000");
        assert_eq!(
            result.file_name().unwrap(),
            "nano-banana-1700000000000.png"
        );

        let dir = tempfile::tempdir().unwrap();
        let path = result.save_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("nano-banana-1700000000000.png"));
        assert_eq!(
            std::fs::read(&path).unwrap(),
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }
}
