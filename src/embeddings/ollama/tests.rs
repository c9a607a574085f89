use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, batch_size: u32) -> OllamaClient {
    let address = server.address();
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: address.ip().to_string(),
        port: address.port(),
        ..OllamaConfig::default()
    };
    OllamaClient::new(&config, batch_size, Duration::from_secs(5)).expect("client should build")
}

fn tags_body() -> serde_json::Value {
    json!({
        "models": [
            {"name": "nomic-embed-text:latest", "size": 274302450},
            {"name": "llama3.2:latest"}
        ]
    })
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "embed-model".to_string(),
        chat_model: "chat-model".to_string(),
    };
    let client =
        OllamaClient::new(&config, 128, Duration::from_secs(5)).expect("Failed to create client");

    assert_eq!(EmbeddingProvider::model(&client), "embed-model");
    assert_eq!(ChatProvider::model(&client), "chat-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url().host_str(), Some("test-host"));
    assert_eq!(client.base_url().port(), Some(1234));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_models_and_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let models = client.list_models().expect("tags should parse");
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].size, Some(274_302_450));

    client.ping().expect("ping should succeed");
    client.health_check().expect("both models are available");
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_reports_missing_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"models": [{"name": "nomic-embed-text:latest"}]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let err = client.health_check().expect_err("chat model is missing");
    assert!(err.to_string().contains("llama3.2:latest"));
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_many_in_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text:latest",
            "input": ["one", "two"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["three"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 1.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
    let vectors = client.embed_many(&texts).expect("embedding should succeed");
    assert_eq!(
        vectors,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_count_mismatch_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": []})))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    assert!(matches!(
        client.embed("hello"),
        Err(ProviderError::MalformedResponse { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_disables_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2:latest",
            "stream": false,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2:latest",
            "message": {"role": "assistant", "content": "hello there"},
            "done": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let reply = client
        .chat(&[ChatMessage::user("hi")])
        .expect("chat should succeed");
    assert_eq!(reply, "hello there");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "model failed to load"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let err = client
        .chat(&[ChatMessage::user("hi")])
        .expect_err("500 should fail");
    assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    assert!(err.to_string().contains("model failed to load"));
    assert!(err.is_transient());
}

#[tokio::test(flavor = "multi_thread")]
async fn reply_must_come_from_the_assistant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "user", "content": "echoed prompt"},
            "done": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 16);
    let err = client
        .chat(&[ChatMessage::user("hi")])
        .expect_err("user role is not a reply");
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    assert!(err.to_string().contains("user"));
}
