use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ParleyError, Result};
use crate::services::chat::ChatService;

const INDEX_HTML: &str = include_str!("../static/index.html");
const APP_JS: &str = include_str!("../static/js/app.js");

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Default, Deserialize)]
struct PostMessageRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Default, Deserialize)]
struct SaveConversationRequest {
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct SaveConversationResponse {
    saved: String,
}

impl IntoResponse for ParleyError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/js/app.js", get(app_js))
        .route("/health", get(health))
        .route("/api/messages", get(list_messages).post(post_message))
        .route("/api/save_conversation", post(save_conversation))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        APP_JS,
    )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: format!("{}+{}", env!("CARGO_PKG_VERSION"), crate::GIT_SHA),
    })
}

async fn list_messages(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.chat.messages().await))
}

// Bodies are parsed by hand so that a missing or malformed body gets the same
// JSON error as a blank message instead of axum's plain-text rejection.
async fn post_message(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: PostMessageRequest = parse_optional_body(&body);
    let message = payload.message.unwrap_or_default();

    match state.chat.post_message(&message).await {
        Ok(reply) => (StatusCode::CREATED, Json(reply)).into_response(),
        Err(err) => {
            tracing::debug!("post_message rejected: {err}");
            err.into_response()
        }
    }
}

async fn save_conversation(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: SaveConversationRequest = parse_optional_body(&body);

    match state.chat.archive(payload.conversation_id.as_deref()).await {
        Ok(path) => (
            StatusCode::OK,
            Json(SaveConversationResponse {
                saved: path.to_string_lossy().to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!("save_conversation failed: {err}");
            }
            err.into_response()
        }
    }
}

fn parse_optional_body<T: Default + DeserializeOwned>(body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_default()
}

pub async fn run(host: &str, port: u16, config: Config) -> Result<()> {
    run_with_shutdown(host, port, config, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(host: &str, port: u16, config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let chat = Arc::new(ChatService::from_config(&config)?);
    tracing::info!(
        archive_dir = %chat.archive_dir().display(),
        fallback = ?config.fallback,
        "Chat session initialised"
    );
    let app = build_router(AppState { chat });

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Runtime(e.to_string()))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParleyError::Runtime(e.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}
