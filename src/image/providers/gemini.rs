//! Gemini (Google) image-to-image provider.

use crate::error::{parse_retry_after, sanitize_error_message, RestyleError, Result};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    decode_base64_lenient, AspectRatio, EmbeddedImage, GeneratedImage, GenerationMetadata,
    GenerationRequest, ImageSize, DEFAULT_MIME_TYPE,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "API_KEY"];

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    #[default]
    NanoBananaPro,
}

impl GeminiModel {
    /// Every known model.
    pub const ALL: [GeminiModel; 2] = [Self::NanoBanana, Self::NanoBananaPro];

    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }

    /// Returns a human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NanoBanana => "Nano Banana (Gemini 2.5 Flash Image)",
            Self::NanoBananaPro => "Nano Banana Pro (Gemini 3 Pro Image)",
        }
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = RestyleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "nano-banana" | "gemini-2.5-flash-image" => Ok(Self::NanoBanana),
            "nano-banana-pro" | "gemini-3-pro-image-preview" => Ok(Self::NanoBananaPro),
            other => Err(RestyleError::InvalidRequest(format!(
                "unknown model '{other}'"
            ))),
        }
    }
}

/// Builds the instruction text sent alongside the source image.
pub fn compose_instruction(prompt: &str) -> String {
    format!(
        "Image-to-image transformation: {prompt}. Maintain the composition but enhance it with this style."
    )
}

/// Builder for GeminiProvider.
#[derive(Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    image_size: ImageSize,
    base_url: Option<String>,
}

impl std::fmt::Debug for GeminiProviderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProviderBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("image_size", &self.image_size)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, then `API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the output resolution tier.
    pub fn image_size(mut self, size: ImageSize) -> Self {
        self.image_size = size;
        self
    }

    /// Overrides the REST endpoint (useful for proxies and tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
            })
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RestyleError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            image_size: self.image_size,
            base_url,
        })
    }
}

/// Gemini image-to-image provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    image_size: ImageSize,
    base_url: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("image_size", &self.image_size)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Returns the configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_generation_request(request, self.image_size);

        tracing::debug!(
            model = self.model.as_str(),
            aspect_ratio = %request.aspect_ratio,
            image_size = %self.image_size,
            mime_type = request.image.mime_type(),
            image_bytes = request.image.size(),
            "sending Gemini image-to-image request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let image = extract_image(gemini_response)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            mime_type = image.mime_type(),
            size = image.size(),
            duration_ms,
            "Gemini image-to-image complete"
        );

        Ok(GeneratedImage::new(
            image,
            GenerationMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: Some(duration_ms),
            },
        ))
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> RestyleError {
        let text = sanitize_error_message(text);
        if status == 404 {
            return RestyleError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            );
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return RestyleError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return RestyleError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("prohibited")
        {
            return RestyleError::ContentBlocked(text);
        }
        RestyleError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn name(&self) -> &str {
        self.model.display_name()
    }
}

/// Picks the first inline image out of a response.
///
/// The returned mime type is kept as reported; only a missing one falls
/// back to PNG.
fn extract_image(response: GeminiResponse) -> Result<EmbeddedImage> {
    // Blocks on the prompt come back as HTTP 200
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
            return Err(RestyleError::ContentBlocked(msg));
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(RestyleError::NoImageReturned)?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(RestyleError::ContentBlocked(format!(
                    "Content blocked by Gemini safety filter: {}",
                    finish_reason
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                tracing::debug!(finish_reason = %finish_reason, "Gemini produced no image");
                return Err(RestyleError::NoImageReturned);
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let inline_data = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
        .ok_or(RestyleError::NoImageReturned)?;

    let data = decode_base64_lenient(&inline_data.data)?;

    let mime_type = inline_data
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    Ok(EmbeddedImage::new(mime_type, data))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: AspectRatio,
    image_size: ImageSize,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest, image_size: ImageSize) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.image.mime_type().to_string(),
                    data: req.image.to_base64(),
                },
            },
            GeminiRequestPart::Text {
                text: compose_instruction(&req.prompt),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: GeminiImageConfig {
                    aspect_ratio: req.aspect_ratio,
                    image_size,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}
