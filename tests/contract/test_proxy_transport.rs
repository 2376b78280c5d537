use genbooth::services::image_gen::{
    ConcurrencyLimiter, GenerationError, GenerationRequest, GeneratorConfig, HttpTransport,
    ImageGenerator, ResponseError, RetryConfig, Transport, TransportError,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const PNG_PAYLOAD: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn image_body() -> String {
    json!({
        "candidates": [{
            "content": {
                "parts": [{ "inlineData": { "data": PNG_PAYLOAD, "mimeType": "image/png" } }]
            },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

fn generator_for(server: &mockito::ServerGuard, attempts: u32) -> ImageGenerator {
    let config = GeneratorConfig::new(format!("{}/api/proxy", server.url()))
        .with_timeout(Duration::from_secs(10))
        .with_retry(RetryConfig::immediate(attempts));
    ImageGenerator::new(config).unwrap()
}

#[tokio::test]
async fn test_success_body_becomes_png_data_uri() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(image_body())
        .expect(1)
        .create_async()
        .await;

    let generator = generator_for(&server, 5);
    let image = generator
        .generate_prompt("make it a watercolor", None)
        .await
        .unwrap()
        .expect("not cancelled");

    assert_eq!(
        image.data_uri(),
        format!("data:image/png;base64,{PNG_PAYLOAD}")
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_request_body_shape() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .match_body(Matcher::PartialJson(json!({
            "model": "test-model",
            "config": { "responseModalities": ["TEXT", "IMAGE"] },
            "contents": {
                "parts": [
                    { "inlineData": { "data": "AAEC", "mimeType": "image/jpeg" } },
                    { "text": "paint me as a knight" }
                ]
            }
        })))
        .with_status(200)
        .with_body(image_body())
        .expect(1)
        .create_async()
        .await;

    let config = GeneratorConfig::new(format!("{}/api/proxy", server.url()))
        .with_model("test-model")
        .with_retry(RetryConfig::immediate(1));
    let generator = ImageGenerator::new(config).unwrap();

    let request = GenerationRequest::new("test-model", "paint me as a knight")
        .with_image(genbooth::InputImage::from_base64("data:image/jpeg;base64,AAEC"));
    let result = generator.generate(request).await.unwrap();

    assert!(result.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_safety_settings_sent_for_every_category() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .match_body(Matcher::PartialJson(json!({
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
            ]
        })))
        .with_status(200)
        .with_body(image_body())
        .create_async()
        .await;

    let generator = generator_for(&server, 1);
    generator.generate_prompt("x", None).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_status_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/proxy")
        .with_status(429)
        .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let transport = HttpTransport::new(format!("{}/api/proxy", server.url())).unwrap();
    let request = GenerationRequest::new("m", "p").to_proxy_request();
    let err = transport.send(&request).await.unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .with_status(500)
        .with_body("internal")
        .expect(2)
        .create_async()
        .await;

    let generator = generator_for(&server, 2);
    let err = generator.generate_prompt("x", None).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(generator.limiter().in_flight(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_budget_exhausted_on_persistent_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .with_status(503)
        .with_body("unavailable")
        .expect(5)
        .create_async()
        .await;

    let generator = generator_for(&server, 5);
    let err = generator.generate_prompt("x", None).await.unwrap_err();

    assert!(matches!(
        err,
        GenerationError::Retryable(TransportError::Http { status: 503, .. })
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_text_only_response_is_terminal() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Sorry, I can't generate that" }] },
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let generator = generator_for(&server, 5);
    let err = generator.generate_prompt("x", None).await.unwrap_err();

    assert!(err.to_string().contains("Sorry, I can't generate that"));
    assert!(matches!(
        err,
        GenerationError::Terminal(ResponseError::TextOnly { .. })
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generators_can_share_a_limiter() {
    let server = mockito::Server::new_async().await;
    let limiter = ConcurrencyLimiter::new(2);
    let config = GeneratorConfig::new(format!("{}/api/proxy", server.url()));
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(config.endpoint.clone()).unwrap());

    let a = ImageGenerator::with_transport(config.clone(), transport.clone(), limiter.clone())
        .unwrap();
    let b = ImageGenerator::with_transport(config, transport, limiter).unwrap();

    assert_eq!(a.limiter().capacity(), 2);
    assert_eq!(a.limiter().available(), b.limiter().available());
}

#[tokio::test]
async fn test_truncated_success_body_names_parse_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/proxy")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates": [{"content": {"parts": [{"inlineData": {"data": "iVBOR"#)
        .expect(1)
        .create_async()
        .await;

    let generator = generator_for(&server, 5);
    let err = generator.generate_prompt("x", None).await.unwrap_err();

    match err {
        GenerationError::Terminal(ResponseError::Malformed { message }) => {
            assert!(message.starts_with("invalid JSON body:"), "{message}");
            assert!(message.contains("EOF"), "{message}");
        }
        other => panic!("expected malformed body, got {other:?}"),
    }
    mock.assert_async().await;
}
