use giftwrap::completion::{
    AnthropicClient, ChatMessage, CompletionError, CompletionRequest, CompletionService, EMPTY_REPLY,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "claude-3-5-haiku-20241022".to_string(),
        max_tokens: 1024,
        messages: vec![ChatMessage::user("hello")],
    }
}

#[tokio::test]
async fn test_complete_joins_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-haiku-20241022",
            "max_tokens": 1024,
            "messages": [{ "role": "user", "content": "hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "text", "text": "Ho ho " },
                { "type": "tool_use", "id": "toolu_01", "name": "noop", "input": {} },
                { "type": "text", "text": "ho!" }
            ],
            "usage": { "input_tokens": 12, "output_tokens": 5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(server.uri(), "test-key");
    let reply = client.complete(&request()).await.unwrap();

    assert_eq!(reply.text, "Ho ho ho!");
    assert_eq!(reply.usage.input_tokens, 12);
    assert_eq!(reply.usage.output_tokens, 5);
}

#[tokio::test]
async fn test_empty_content_gets_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [],
            "usage": { "input_tokens": 3, "output_tokens": 0 }
        })))
        .mount(&server)
        .await;

    let client = AnthropicClient::new(format!("{}/", server.uri()), "test-key");
    let reply = client.complete(&request()).await.unwrap();

    assert_eq!(reply.text, EMPTY_REPLY);
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "message": "max_tokens: must be greater than 0"
            }
        })))
        .mount(&server)
        .await;

    let client = AnthropicClient::new(server.uri(), "test-key");
    let err = client.complete(&request()).await.unwrap_err();

    match err {
        CompletionError::Api { status, message } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "max_tokens: must be greater than 0");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unstructured_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = AnthropicClient::new(server.uri(), "test-key");
    let err = client.complete(&request()).await.unwrap_err();

    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn test_missing_key_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(server.uri(), "");
    let err = client.complete(&request()).await.unwrap_err();

    assert!(matches!(err, CompletionError::MissingApiKey));
}
