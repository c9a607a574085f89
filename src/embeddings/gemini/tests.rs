use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, batch_size: u32) -> GeminiClient {
    let config = GeminiConfig {
        base_url: server.uri(),
        ..GeminiConfig::default()
    };
    GeminiClient::new(&config, "g-key", batch_size, Duration::from_secs(5))
        .expect("client should build")
}

#[test]
fn model_names_are_normalized() {
    assert_eq!(model_resource("embedding-001"), "models/embedding-001");
    assert_eq!(model_resource("models/embedding-001"), "models/embedding-001");
    assert_eq!(model_resource(" gemini-2.5-flash "), "models/gemini-2.5-flash");
}

#[test]
fn messages_flatten_with_role_labels() {
    let prompt = flatten_messages(&[
        ChatMessage::system("rules"),
        ChatMessage::user("question"),
    ]);
    assert_eq!(prompt, "SYSTEM:\nrules\n\nUSER:\nquestion");
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_single_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:embedContent"))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_partial_json(json!({
            "model": "models/embedding-001",
            "content": {"parts": [{"text": "hello"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": {"values": [0.5, 0.25]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let vector = client.embed("hello").expect("embedding should succeed");
    assert_eq!(vector, vec![0.5, 0.25]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_many_uses_batch_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:batchEmbedContents"))
        .and(body_partial_json(json!({
            "requests": [
                {"model": "models/embedding-001", "content": {"parts": [{"text": "a"}]}},
                {"model": "models/embedding-001", "content": {"parts": [{"text": "b"}]}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{"values": [1.0]}, {"values": [2.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let vectors = client
        .embed_many(&["a".to_string(), "b".to_string()])
        .expect("batch should succeed");
    assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn short_batch_response_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{"values": [1.0]}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let err = client
        .embed_many(&["a".to_string(), "b".to_string()])
        .expect_err("count mismatch should fail");
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_joins_candidate_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "SYSTEM:\nrules\n\nUSER:\nq"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let reply = client
        .chat(&[ChatMessage::system("rules"), ChatMessage::user("q")])
        .expect("chat should succeed");
    assert_eq!(reply, "Hello world");
}

#[tokio::test(flavor = "multi_thread")]
async fn no_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    assert!(matches!(
        client.chat(&[ChatMessage::user("q")]),
        Err(ProviderError::MalformedResponse { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    assert!(matches!(
        client.embed("hello"),
        Err(ProviderError::Authentication { status: 403, .. })
    ));
}
