//! HTTP surface: the two pipeline endpoints plus a health probe.

mod error;

pub use error::ApiError;

use crate::config::{ConfigurationError, ModelSelection, Settings};
use crate::furnish::FurnishingItem;
use crate::llm::{ChatGateway, HttpChatGateway};
use crate::pipeline::{extract_items, regenerate_room, ImageUpload};
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::BytesRejection,
        DefaultBodyLimit, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub const HEALTHZ_PATH: &str = "/api/healthz";
pub const REGENERATE_PATH: &str = "/api/regenerate-image";
/// Older route name kept for existing front ends
pub const REGENERATE_ALIAS_PATH: &str = "/api/generate";
pub const EXTRACT_PATH: &str = "/api/extract-items";

/// Multipart field carrying the room photo
const IMAGE_FIELD: &str = "image";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared, read-only request state
pub struct AppState {
    gateway: Result<Arc<dyn ChatGateway>, ConfigurationError>,
    models: ModelSelection,
}

impl AppState {
    pub fn new(
        gateway: Result<Arc<dyn ChatGateway>, ConfigurationError>,
        models: ModelSelection,
    ) -> Self {
        Self { gateway, models }
    }

    /// Build the HTTP gateway when configuration resolved; otherwise keep the error for each request.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let gateway = match settings.gateway {
            Ok(config) => {
                let gateway: Arc<dyn ChatGateway> = Arc::new(HttpChatGateway::new(config)?);
                Ok(gateway)
            }
            Err(err) => {
                tracing::warn!("model gateway is not configured: {}", err);
                Err(err)
            }
        };
        Ok(Self::new(gateway, settings.models))
    }

    fn gateway(&self) -> Result<&dyn ChatGateway, ApiError> {
        match &self.gateway {
            Ok(gateway) => Ok(gateway.as_ref()),
            Err(err) => Err(ApiError::Configuration(err.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub max_upload_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthzResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegenerateResponse {
    image_url: String,
}

#[derive(Debug, Serialize)]
struct ItemsResponse {
    items: Vec<FurnishingItem>,
}

pub fn build_router(state: AppState, options: &ServerOptions) -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(healthz))
        .route(REGENERATE_PATH, post(regenerate_image))
        .route(REGENERATE_ALIAS_PATH, post(regenerate_image))
        .route(EXTRACT_PATH, post(extract_furnishing_items))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

async fn regenerate_image(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let gateway = state.gateway()?;
    let multipart = multipart
        .map_err(|e| ApiError::input(format!("expected a multipart form upload: {}", e)))?;
    let upload = read_image_upload(multipart).await?;
    let image_url = regenerate_room(gateway, &state.models.generate, &upload).await?;
    Ok(Json(RegenerateResponse { image_url }))
}

async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if field.file_name().is_none() {
            return Err(ApiError::input(format!(
                "form field `{}` must be a file upload",
                IMAGE_FIELD
            )));
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::input("uploaded image is empty"));
        }
        return Ok(ImageUpload::new(bytes.to_vec(), content_type.as_deref()));
    }
    Err(ApiError::input(format!(
        "please upload an image (form field `{}`)",
        IMAGE_FIELD
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("upload too large: {}", err.body_text()))
    } else {
        ApiError::input(format!("invalid multipart upload: {}", err.body_text()))
    }
}

async fn extract_furnishing_items(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let gateway = state.gateway()?;
    let body = body.map_err(body_error)?;
    let image_url = image_url_from_body(&body)?;
    let extracted = extract_items(gateway, &state.models.extract, &image_url).await?;
    Ok(Json(ItemsResponse {
        items: extracted.items,
    }))
}

fn body_error(err: BytesRejection) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("request body too large: {}", err.body_text()))
    } else {
        ApiError::input(format!("could not read request body: {}", err.body_text()))
    }
}

fn image_url_from_body(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    value
        .get("imageUrl")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::input("missing imageUrl"))
}
