//! Image encoding, provider trait and providers.

mod encoder;
mod provider;
pub mod providers;
mod types;

pub use encoder::{encode_bytes, encode_file};
pub use provider::ImageProvider;
pub use types::{
    AspectRatio, EmbeddedImage, GeneratedImage, GenerationMetadata, GenerationRequest,
    ImageFormat, ImageSize, SourceImage, DEFAULT_MIME_TYPE,
};
