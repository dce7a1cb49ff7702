#![cfg(feature = "gemini-image")]

use base64::Engine;
use restyle::image::providers::compose_instruction;
use restyle::prelude::*;
use restyle::{ErrorKind, GeminiModel, ImageSize, NO_IMAGE_MESSAGE};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A 10x10 solid red PNG.
const RED_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAoAAAAKCAIAAAACUFjqAAAAEklEQVR42mP4z8CABzGMSmNDALfKY53W1e90AAAAAElFTkSuQmCC";

const PRO_PATH: &str = "/models/gemini-3-pro-image-preview:generateContent";

fn red_png() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(RED_PNG_B64)
        .unwrap()
}

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::builder()
        .api_key("test-api-key")
        .base_url(server.uri())
        .build()
        .unwrap()
}

async fn session_with_red_png(
    server: &MockServer,
    prompt: &str,
) -> (SessionController<GeminiProvider>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("red.png");
    std::fs::write(&path, red_png()).unwrap();

    let mut session = SessionController::new(provider(server));
    assert!(session.select_file(&path).await.unwrap());
    session.set_prompt(prompt);
    (session, dir)
}

fn image_response(mime_type: &str, data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {
                "parts": [{ "inlineData": { "mimeType": mime_type, "data": data } }]
            },
            "finishReason": "STOP"
        }]
    }))
}

#[tokio::test]
async fn red_png_make_it_blue_lands_at_front_of_gallery() {
    let server = MockServer::start().await;
    let payload = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nblue");

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_json(json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": RED_PNG_B64 } },
                    { "text": compose_instruction("make it blue") }
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": "1:1", "imageSize": "1K" }
            }
        })))
        .respond_with(image_response("image/png", &payload))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "make it blue").await;
    let result = session.generate().await.unwrap();

    assert_eq!(result.url, format!("data:image/png;base64,{payload}"));
    assert_eq!(result.prompt, "make it blue");
    assert_eq!(session.results()[0], result);
    assert!(!session.state().is_generating);
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn request_carries_aspect_ratio_model_and_size() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(image_response("image/png", "iVBORw0KGgo="))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::builder()
        .api_key("test-api-key")
        .base_url(server.uri())
        .model(GeminiModel::NanoBanana)
        .image_size(ImageSize::TwoK)
        .build()
        .unwrap();

    let request = GenerationRequest::new(SourceImage::new("image/png", red_png()), "neon")
        .with_aspect_ratio(AspectRatio::Portrait);
    let image = provider.generate(&request).await.unwrap();
    assert_eq!(image.metadata.model.as_deref(), Some("gemini-2.5-flash-image"));

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        body["generationConfig"]["imageConfig"],
        json!({ "aspectRatio": "9:16", "imageSize": "2K" })
    );
}

#[tokio::test]
async fn zero_content_parts_is_no_image_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }]
        })))
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "make it blue").await;
    let err = session.generate().await.unwrap_err();

    assert!(matches!(err, RestyleError::NoImageReturned));
    assert_eq!(err.kind(), ErrorKind::NoImageReturned);
    assert_eq!(session.state().error.as_deref(), Some(NO_IMAGE_MESSAGE));
    assert!(session.results().is_empty());
    assert!(!session.state().is_generating);
}

#[tokio::test]
async fn text_only_response_is_no_image_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can only describe it." }] }
            }]
        })))
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "make it blue").await;
    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, RestyleError::NoImageReturned));
}

#[tokio::test]
async fn empty_prompt_never_reaches_the_network() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "").await;
    let err = session.generate().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        session.state().error.as_deref(),
        Some("Please provide both an image and a prompt.")
    );
    assert!(!session.state().is_generating);
}

#[tokio::test]
async fn returned_jpeg_keeps_its_mime_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(image_response("image/jpeg", "/9j/4A=="))
        .mount(&server)
        .await;

    let (mut session, dir) = session_with_red_png(&server, "film grain").await;
    let result = session.generate().await.unwrap();

    assert_eq!(result.url, "data:image/jpeg;base64,/9j/4A==");
    let saved = result.save_to(dir.path()).unwrap();
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("jpg"));
}

#[tokio::test]
async fn http_errors_are_transport_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "Internal error encountered.", "status": "INTERNAL" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "make it blue").await;
    let err = session.generate().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.to_string(), "API error: 500 - Internal error encountered.");
    assert_eq!(
        session.state().error.as_deref(),
        Some("API error: 500 - Internal error encountered.")
    );
    assert!(session.results().is_empty());
}

#[tokio::test]
async fn auth_and_rate_limit_statuses_are_mapped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let request = GenerationRequest::new(SourceImage::new("image/png", red_png()), "x");

    match provider.generate(&request).await {
        Err(RestyleError::Auth(msg)) => assert_eq!(msg, "API key not valid"),
        other => panic!("expected Auth, got {other:?}"),
    }
    match provider.generate(&request).await {
        Err(RestyleError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(12)))
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn session_recovers_after_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRO_PATH))
        .respond_with(image_response("image/png", "iVBORw0KGgo="))
        .mount(&server)
        .await;

    let (mut session, _dir) = session_with_red_png(&server, "make it blue").await;
    assert!(session.generate().await.is_err());
    assert!(session.state().error.is_some());

    session.set_prompt("make it green");
    assert!(session.state().error.is_none());

    let result = session.generate().await.unwrap();
    assert_eq!(result.prompt, "make it green");
    assert_eq!(session.results().len(), 1);
}
