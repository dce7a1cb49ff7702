//! Error types for image restyling.

use std::path::PathBuf;
use std::time::Duration;

/// Message shown when generation is requested without an image or prompt.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide both an image and a prompt.";

/// Message shown when a failure carries no message of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred during generation.";

/// Message carried by [`RestyleError::NoImageReturned`].
pub const NO_IMAGE_MESSAGE: &str = "No image data returned from the model.";

/// Longest provider error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while encoding, generating or saving images.
#[derive(Debug, thiserror::Error)]
pub enum RestyleError {
    /// Missing image or prompt at generate time.
    #[error("{0}")]
    Validation(String),

    /// A generation was requested while another one is in flight.
    #[error("A generation is already in progress.")]
    AlreadyGenerating,

    /// The model answered without any inline image data.
    #[error("{}", NO_IMAGE_MESSAGE)]
    NoImageReturned,

    /// Reading a selected file failed.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-provided hint, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`RestyleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network interaction.
    Validation,
    /// The remote service answered without an image.
    NoImageReturned,
    /// Anything underneath the network call.
    Transport,
    /// Selecting a source file failed.
    Read,
    /// Local file output failed.
    Io,
}

impl RestyleError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::AlreadyGenerating => ErrorKind::Validation,
            Self::NoImageReturned => ErrorKind::NoImageReturned,
            Self::Read { .. } => ErrorKind::Read,
            Self::Io(_) => ErrorKind::Io,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::ContentBlocked(_)
            | Self::InvalidRequest(_)
            | Self::Network(_)
            | Self::Decode(_)
            | Self::Json(_) => ErrorKind::Transport,
        }
    }

    /// Returns the message to show the user, if this error carries one.
    pub fn message(&self) -> Option<String> {
        let message = self.to_string();
        if message.trim().is_empty() {
            None
        } else {
            Some(message)
        }
    }

    /// Returns the message to show the user, falling back to a fixed text.
    pub fn user_message(&self) -> String {
        self.message()
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
    }
}

/// Result type alias for restyle operations.
pub type Result<T> = std::result::Result<T, RestyleError>;

/// Reduces a provider error body to something safe and short enough to show.
///
/// JSON bodies of the form `{"error": {"message": ...}}` are reduced to the
/// message itself.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if extracted.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = extracted.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        extracted
    }
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
