//! Image provider trait.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for image-to-image generation providers.
///
/// A call issues exactly one request. Failures are returned as-is: providers
/// do not retry and do not tell transient faults from permanent ones.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Transforms the request's source image according to its prompt.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}

#[async_trait]
impl<P: ImageProvider + ?Sized> ImageProvider for Arc<P> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<P: ImageProvider + ?Sized> ImageProvider for Box<P> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
