#![warn(missing_docs)]
//! Restyle - image-to-image generation with an in-memory gallery.
//!
//! A source image and a prompt go to a remote image model; each image that
//! comes back is recorded, newest first, in a session.
//!
//! # Quick Start
//!
//! ```no_run
//! use restyle::{GeminiProvider, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> restyle::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let mut session = SessionController::new(provider);
//!
//!     session.select_file("sketch.png").await?;
//!     session.set_prompt("a watercolor painting");
//!
//!     let result = session.generate().await?;
//!     result.save_to(".")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini-image`: Gemini (Google) image models
//! - `cli`: Command-line interface

mod error;
pub mod image;
pub mod session;

// Re-export error types at crate root
pub use error::{
    ErrorKind, RestyleError, Result, FALLBACK_ERROR_MESSAGE, MISSING_INPUT_MESSAGE,
    NO_IMAGE_MESSAGE,
};

pub use image::{
    encode_file, AspectRatio, EmbeddedImage, GeneratedImage, GenerationMetadata,
    GenerationRequest, ImageFormat, ImageProvider, ImageSize, SourceImage,
};

pub use session::{GeneratedResult, PendingGeneration, SessionController, SessionEvent, SessionState};

#[cfg(feature = "gemini-image")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{RestyleError, Result};
    pub use crate::image::{
        encode_file, AspectRatio, GeneratedImage, GenerationRequest, ImageProvider, SourceImage,
    };
    pub use crate::session::{GeneratedResult, SessionController, SessionState};

    #[cfg(feature = "gemini-image")]
    pub use crate::image::providers::GeminiProvider;
}
