use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use parley::config::{Config, FallbackPolicy, OllamaConfig};
use parley::daemon::{build_router, AppState};
use parley::services::chat::ChatService;

fn make_app(base_url: &str, fallback: FallbackPolicy, archive_dir: &Path) -> Router {
    let config = Config {
        ollama: OllamaConfig {
            base_url: base_url.to_string(),
            model: "gemma3:27b".to_string(),
            timeout_secs: 5,
        },
        fallback,
        archive_dir: archive_dir.to_string_lossy().to_string(),
        ..Config::convention_defaults()
    };
    let chat = ChatService::from_config(&config).unwrap();
    build_router(AppState {
        chat: Arc::new(chat),
    })
}

fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gemma3:27b",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn serves_page_script_and_health() {
    let temp = tempdir().unwrap();
    let app = make_app("http://127.0.0.1:9", FallbackPolicy::Echo, temp.path());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("/static/js/app.js"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/static/js/app.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, value) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "ok");
}

#[tokio::test]
async fn post_message_appends_exchange_and_returns_reply() {
    let server = MockServer::start_async().await;
    let chat_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("hello from the model"));
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    let (status, reply) = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"message": "  hi there  "})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["role"], "assistant");
    assert_eq!(reply["text"], "hello from the model");
    assert_eq!(reply["privacy"], false);
    assert!(reply["ts"].as_f64().unwrap() > 0.0);
    chat_mock.assert_calls(1);

    let (status, messages) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages.as_array().cloned().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["text"], "hi there");
    assert_eq!(messages[1], reply);
}

#[tokio::test]
async fn blank_or_missing_messages_are_rejected() {
    let temp = tempdir().unwrap();
    let app = make_app("http://127.0.0.1:9", FallbackPolicy::Echo, temp.path());

    for body in [
        Some(json!({"message": "   "})),
        Some(json!({"message": ""})),
        Some(json!({"other": "field"})),
        Some(json!({"message": 42})),
        None,
    ] {
        let (status, value) = send(&app, "POST", "/api/messages", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({"error": "Message is required"}));
    }

    let (_, messages) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(messages, json!([]));
}

#[tokio::test]
async fn sensitive_input_flags_both_messages() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("noted"));
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    let (_, reply) = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"message": "contact me at a@b.com"})),
    )
    .await;
    assert_eq!(reply["privacy"], true);

    let (_, reply) = send(
        &app,
        "POST",
        "/api/messages",
        Some(json!({"message": "hello world"})),
    )
    .await;
    assert_eq!(reply["privacy"], false);

    let (_, messages) = send(&app, "GET", "/api/messages", None).await;
    let flags: Vec<_> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["privacy"].as_bool().unwrap())
        .collect();
    assert_eq!(flags, [true, true, false, false]);
}

#[tokio::test]
async fn model_failures_fall_back_to_echo() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("model crashed");
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    let (status, reply) = send(&app, "POST", "/api/messages", Some(json!({"message": "ping"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["text"], "Echo: ping");
    failing.assert_calls(1);

    let unreachable = make_app("http://127.0.0.1:9", FallbackPolicy::Echo, temp.path());
    let (status, reply) = send(
        &unreachable,
        "POST",
        "/api/messages",
        Some(json!({"message": "anyone?"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["text"], "Echo: anyone?");
}

#[tokio::test]
async fn model_failures_fall_back_to_error_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body("not json at all");
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Error, temp.path());

    let (status, reply) = send(&app, "POST", "/api/messages", Some(json!({"message": "ping"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let text = reply["text"].as_str().unwrap();
    assert!(text.starts_with("Error: "));
    assert!(text.contains("decode failed"));
}

#[tokio::test]
async fn unexpected_completion_shape_yields_empty_reply() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    let (status, reply) = send(&app, "POST", "/api/messages", Some(json!({"message": "ping"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["text"], "");
}

#[tokio::test]
async fn save_conversation_archives_and_resets() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("Schön, dich zu sehen"));
        })
        .await;
    let temp = tempdir().unwrap();
    let archive_dir = temp.path().join("archives");
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, &archive_dir);

    let (status, value) = send(&app, "POST", "/api/save_conversation", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value, json!({"error": "No messages to save"}));
    assert!(!archive_dir.exists());

    send(&app, "POST", "/api/messages", Some(json!({"message": "hallo"}))).await;
    send(&app, "POST", "/api/messages", Some(json!({"message": "wie geht's?"}))).await;
    let (_, before) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(before.as_array().map(Vec::len), Some(4));

    let (status, value) = send(
        &app,
        "POST",
        "/api/save_conversation",
        Some(json!({"conversation_id": "study-7"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved = Path::new(value["saved"].as_str().unwrap()).to_path_buf();
    assert!(saved.is_absolute());
    let name = saved.file_name().and_then(|n| n.to_str()).unwrap();
    assert!(name.starts_with("ID-study-7-"));
    assert!(name.ends_with(".json"));

    let raw = std::fs::read_to_string(&saved).unwrap();
    assert!(raw.contains("Schön"));
    let archived: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(archived, before);

    let (_, after) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(after, json!([]));

    let (status, _) = send(&app, "POST", "/api/save_conversation", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_saves_with_same_id_never_overwrite() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("ok"));
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    let mut saved = Vec::new();
    for round in 0..2 {
        send(
            &app,
            "POST",
            "/api/messages",
            Some(json!({"message": format!("round {round}")})),
        )
        .await;
        let (status, value) = send(
            &app,
            "POST",
            "/api/save_conversation",
            Some(json!({"conversation_id": "dup"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        saved.push(value["saved"].as_str().unwrap().to_string());
    }

    assert_ne!(saved[0], saved[1]);
    let first: Value = serde_json::from_str(&std::fs::read_to_string(&saved[0]).unwrap()).unwrap();
    assert_eq!(first[0]["text"], "round 0");
}

#[tokio::test]
async fn unwritable_archive_dir_is_a_server_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("ok"));
        })
        .await;
    let temp = tempdir().unwrap();
    let blocker = temp.path().join("occupied");
    std::fs::write(&blocker, "not a directory").unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, &blocker.join("archives"));

    send(&app, "POST", "/api/messages", Some(json!({"message": "keep me"}))).await;
    let (status, value) = send(&app, "POST", "/api/save_conversation", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["error"].as_str().unwrap().contains("archive directory"));

    let (_, messages) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(messages.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn rejected_archive_name_is_a_server_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("ok"));
        })
        .await;
    let temp = tempdir().unwrap();
    let app = make_app(&server.base_url(), FallbackPolicy::Echo, temp.path());

    send(&app, "POST", "/api/messages", Some(json!({"message": "keep me too"}))).await;
    let (status, value) = send(
        &app,
        "POST",
        "/api/save_conversation",
        Some(json!({"conversation_id": "x".repeat(300)})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["error"]
        .as_str()
        .unwrap()
        .starts_with("could not write archive"));

    let (_, messages) = send(&app, "GET", "/api/messages", None).await;
    assert_eq!(messages.as_array().map(Vec::len), Some(2));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}
