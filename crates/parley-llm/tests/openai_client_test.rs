use std::time::Duration;

use futures::StreamExt;
use parley_llm::{
    ChatClient, ChatMessage, ChatOptions, ChatRequest, LlmError, OpenAIClient, OpenAIConfig,
    SseDecoder, SseEvent,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAIClient {
    let config = OpenAIConfig::new(format!("{}/v1", server.uri()));
    OpenAIClient::new(config).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        "local-model",
        vec![ChatMessage::system("be brief"), ChatMessage::user("Hello")],
    )
    .with_options(ChatOptions::new().temperature(0.7).max_tokens(-1))
}

#[tokio::test]
async fn test_chat_stream_delivers_raw_sse_bytes() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "local-model", "stream": true, "max_tokens": -1})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream = client
        .chat_stream(request(), CancellationToken::new())
        .await
        .unwrap();

    let mut decoder = SseDecoder::new();
    let mut content = String::new();
    while let Some(chunk) = stream.next().await {
        for event in decoder.feed(&chunk.unwrap()) {
            if let SseEvent::Delta(text) = event {
                content.push_str(&text);
            }
        }
    }

    assert_eq!(content, "Hi there");
}

#[tokio::test]
async fn test_chat_stream_surfaces_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = match client.chat_stream(request(), CancellationToken::new()).await {
        Ok(_) => panic!("expected an HTTP error"),
        Err(e) => e,
    };

    match &err {
        LlmError::Http { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "model not loaded");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "HTTP error! status: 500 - model not loaded");
}

#[tokio::test]
async fn test_chat_stream_cancelled_while_waiting_for_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: [DONE]\n\n")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.chat_stream(request(), cancel),
    )
    .await
    .expect("cancellation should unblock the request");

    assert!(matches!(result, Err(LlmError::Cancelled)));
}

#[tokio::test]
async fn test_chat_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "A summary.\n### END SUMMARY"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.chat(request()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("A summary.\n### END SUMMARY"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.unwrap().total_tokens, 17);
}

#[tokio::test]
async fn test_chat_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.chat(request()).await;

    assert!(matches!(result, Err(LlmError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_api_key_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = OpenAIConfig::new(format!("{}/v1", server.uri())).with_api_key("sk-test");
    let client = OpenAIClient::new(config).unwrap();
    let response = client.chat(request()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("ok"));
}
