//! Image generation providers.

#[cfg(feature = "gemini-image")]
mod gemini;

#[cfg(feature = "gemini-image")]
pub use gemini::{
    compose_instruction, GeminiModel, GeminiProvider, GeminiProviderBuilder, API_KEY_ENV_VARS,
    DEFAULT_BASE_URL,
};
