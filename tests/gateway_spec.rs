use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use cream_room::config::GatewayConfig;
use cream_room::llm::{ChatGateway, ChatRequest, ContentPart, HttpChatGateway};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type Recorded = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

#[derive(Clone)]
struct ProviderState {
    recorded: Recorded,
    status: StatusCode,
    reply: Value,
}

async fn chat_completions(
    State(state): State<ProviderState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .recorded
        .lock()
        .expect("recorder lock")
        .push((headers, body));
    (state.status, Json(state.reply.clone()))
}

/// Local stand-in for an OpenAI-compatible provider; returns its base URL.
async fn spawn_provider(status: StatusCode, reply: Value) -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(ProviderState {
            recorded: recorded.clone(),
            status,
            reply,
        });
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock provider");
    let addr = listener.local_addr().expect("mock provider address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock provider");
    });
    (format!("http://{}/v1", addr), recorded)
}

fn config(base_url: String, headers: Vec<(&str, &str)>) -> GatewayConfig {
    GatewayConfig {
        api_key: "test-key".to_string(),
        base_url,
        default_headers: headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn request() -> ChatRequest {
    ChatRequest::user(
        "google/gemini-2.5-flash-image",
        vec![
            ContentPart::text("describe"),
            ContentPart::image_url("https://cdn.test/room.png"),
        ],
    )
}

#[tokio::test]
async fn sends_bearer_token_headers_and_body() {
    let (base_url, recorded) = spawn_provider(
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": "[]"}}]}),
    )
    .await;
    let gateway = HttpChatGateway::new(config(
        base_url,
        vec![("HTTP-Referer", "http://localhost:3000"), ("X-Title", "Soft Furnish AI")],
    ))
    .expect("client");

    let reply = gateway.complete(&request()).await.expect("reply");
    assert_eq!(reply.text(), "[]");

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    let (headers, body) = &recorded[0];
    assert_eq!(headers["authorization"], "Bearer test-key");
    assert_eq!(headers["http-referer"], "http://localhost:3000");
    assert_eq!(headers["x-title"], "Soft Furnish AI");
    assert_eq!(body["model"], "google/gemini-2.5-flash-image");
    assert_eq!(body["messages"][0]["content"][1]["type"], "image_url");
}

#[tokio::test]
async fn omits_attribution_headers_when_not_configured() {
    let (base_url, recorded) = spawn_provider(
        StatusCode::OK,
        json!({"choices": [{"message": {"content": "ok"}}]}),
    )
    .await;
    let gateway = HttpChatGateway::new(config(base_url, Vec::new())).expect("client");
    gateway.complete(&request()).await.expect("reply");

    let recorded = recorded.lock().unwrap();
    let (headers, _) = &recorded[0];
    assert!(headers.get("http-referer").is_none());
    assert!(headers.get("x-title").is_none());
}

#[tokio::test]
async fn error_status_surfaces_provider_message() {
    let (base_url, _) = spawn_provider(
        StatusCode::BAD_REQUEST,
        json!({"error": {"message": "This model does not accept images", "code": 400}}),
    )
    .await;
    let gateway = HttpChatGateway::new(config(base_url, Vec::new())).expect("client");

    let err = gateway.complete(&request()).await.unwrap_err();
    assert_eq!(err.status, Some(400));
    assert_eq!(err.message, "This model does not accept images");
}

#[tokio::test]
async fn error_inside_success_response_is_upstream_error() {
    let (base_url, _) = spawn_provider(
        StatusCode::OK,
        json!({"error": {"message": "Provider returned error", "code": 502}}),
    )
    .await;
    let gateway = HttpChatGateway::new(config(base_url, Vec::new())).expect("client");

    let err = gateway.complete(&request()).await.unwrap_err();
    assert_eq!(err.status, Some(502));
    assert_eq!(err.message, "Provider returned error");
}

#[tokio::test]
async fn unreachable_provider_is_upstream_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway =
        HttpChatGateway::new(config(format!("http://{}/v1", addr), Vec::new())).expect("client");
    let err = gateway.complete(&request()).await.unwrap_err();
    assert_eq!(err.status, None);
    assert!(err.message.contains("Request to model provider failed"));
}
