//! HTTP request handlers.

use std::sync::atomic::Ordering;

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, Multipart, State};
use axum::http::{header, Request};
use axum::Json;
use chrono::Utc;
use image::DynamicImage;
use serde::Serialize;

use textlens_engine::imaging;
use textlens_models::{BlockSummary, OcrResult};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const NO_VALID_IMAGE: &str = "No valid image provided";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    /// Milliseconds since the listener started.
    pub uptime: u64,
    pub request_count: u64,
    pub port: u16,
    pub ocr_engine: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
    pub confidence: f32,
    pub language: String,
    pub processing_time_ms: u64,
    pub blocks: Vec<BlockSummary>,
}

impl From<&OcrResult> for OcrResponse {
    fn from(result: &OcrResult) -> Self {
        Self {
            success: true,
            text: result.text.clone(),
            confidence: result.confidence,
            language: result.language.clone(),
            processing_time_ms: result.processing_time_ms,
            blocks: result.block_summaries(),
        }
    }
}

/// `GET /health` — liveness, no auth.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp_millis(),
    })
}

/// `GET /status` — listener state, auth required.
pub async fn status(
    State(state): State<AppState>,
    request: Request<Body>,
) -> ApiResult<Json<StatusResponse>> {
    if !state.auth.is_authenticated(request.headers()).await {
        return Err(ApiError::unauthorized(
            state.auth.unauthorized_response().message,
        ));
    }

    Ok(Json(StatusResponse {
        status: "running".to_string(),
        uptime: state.started_at.elapsed().as_millis() as u64,
        request_count: state.request_count.load(Ordering::Relaxed),
        port: state.config.http_port,
        ocr_engine: state.engine.engine_name().to_string(),
    }))
}

/// `POST /ocr` — extract, normalize, recognize; auth required.
///
/// The recognition call is awaited in this handler, so the request's task
/// is occupied for the full recognition duration; the gate bounds that
/// with its admission limit and per-call timeout.
pub async fn ocr(
    State(state): State<AppState>,
    request: Request<Body>,
) -> ApiResult<Json<OcrResponse>> {
    if !state.auth.is_authenticated(request.headers()).await {
        return Err(ApiError::unauthorized(
            state.auth.unauthorized_response().message,
        ));
    }

    let image = extract_image(&state, request).await?;
    let image = imaging::resize_if_needed(image);

    match state.engine.recognize(&image, state.config.language).await {
        Ok(result) => {
            metrics::record_recognition("ok");
            Ok(Json(OcrResponse::from(&result)))
        }
        Err(e) => {
            metrics::record_recognition("error");
            Err(e.into())
        }
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

/// Extraction order: multipart `image` field with raw bytes, then a JSON
/// body with a base64 or data-URI `image` string.
async fn extract_image(state: &AppState, request: Request<Body>) -> ApiResult<DynamicImage> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| ApiError::bad_request("Failed to parse request body"))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::bad_request("Failed to parse request body"))?
        {
            if field.name() == Some("image") {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read image field"))?;
                return imaging::decode_bytes(&bytes)
                    .map_err(|_| ApiError::bad_request(NO_VALID_IMAGE));
            }
        }
        return Err(ApiError::bad_request(NO_VALID_IMAGE));
    }

    if content_type.contains("application/json") {
        let bytes = to_bytes(request.into_body(), state.config.max_body_size)
            .await
            .map_err(|_| ApiError::bad_request("Failed to read request body"))?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|_| ApiError::bad_request("Failed to parse request body"))?;

        if let Some(payload) = body.get("image").and_then(|v| v.as_str()) {
            return imaging::decode_base64(payload)
                .map_err(|_| ApiError::bad_request(NO_VALID_IMAGE));
        }
    }

    Err(ApiError::bad_request(NO_VALID_IMAGE))
}
