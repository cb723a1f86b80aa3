//! Router construction for both listeners.

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, not_found, ocr, status};
use crate::middleware::record_request;
use crate::state::AppState;
use crate::ws::ws_handler;

/// HTTP listener router: exact path + verb matching, else 404.
///
/// The recording middleware is outermost so every exchange, including
/// bodies rejected by the size limit, lands in the request log with its
/// true final status.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ocr", post(ocr));

    if let Some(handle) = metrics_handle {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            record_request,
        ))
        .with_state(state)
}

/// Realtime hub router; upgrades at `/` and `/ws`.
pub fn create_ws_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthGate;
    use crate::config::ServerConfig;
    use crate::events::EventBus;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::io::Cursor;
    use std::sync::Arc;
    use textlens_engine::{FixtureRecognizer, RecognizerGate};
    use tower::ServiceExt;

    fn test_state(auth_enabled: bool, token: Option<&str>) -> AppState {
        let config = ServerConfig::default();
        let gate = RecognizerGate::new(
            Arc::new(FixtureRecognizer::new("probe text")),
            config.gate_config(),
        );
        AppState::new(
            config,
            Arc::new(AuthGate::new(auth_enabled, token.map(String::from))),
            Arc::new(gate),
            EventBus::new(),
        )
    }

    fn png_base64() -> String {
        let image = image::DynamicImage::new_rgb8(8, 8);
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        STANDARD.encode(buf.into_inner())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let router = create_router(test_state(true, Some("T")), None);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_status_without_credentials_is_401() {
        let router = create_router(test_state(true, Some("T")), None);
        let response = router
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        // The body carries the gate's fixed unauthorized message.
        assert_eq!(body["error"], crate::auth::UNAUTHORIZED_MESSAGE);
    }

    #[tokio::test]
    async fn test_status_with_bearer_token() {
        let router = create_router(test_state(true, Some("T")), None);
        let response = router
            .oneshot(
                Request::get("/status")
                    .header(header::AUTHORIZATION, "Bearer T")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["ocrEngine"], "fixture");
        assert_eq!(body["port"], 8080);
    }

    #[tokio::test]
    async fn test_ocr_empty_body_is_400() {
        let router = create_router(test_state(false, None), None);
        let response = router
            .oneshot(Request::post("/ocr").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_ocr_json_base64_round_trip() {
        let router = create_router(test_state(false, None), None);
        let payload = serde_json::json!({ "image": png_base64() });
        let response = router
            .oneshot(
                Request::post("/ocr")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "probe text");
        assert!(body["blocks"].is_array());
        assert!(body["processingTimeMs"].is_u64());
    }

    #[tokio::test]
    async fn test_ocr_json_without_image_field_is_400() {
        let router = create_router(test_state(false, None), None);
        let response = router
            .oneshot(
                Request::post("/ocr")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"picture":"nope"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let router = create_router(test_state(false, None), None);
        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_every_exchange_lands_in_the_request_log() {
        let state = test_state(true, Some("T"));
        let router = create_router(state.clone(), None);

        for uri in ["/health", "/status", "/nope"] {
            let _ = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        let snapshot = state.request_log.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].status_code, 200);
        assert_eq!(snapshot[1].status_code, 401);
        assert_eq!(snapshot[2].status_code, 404);
        assert_eq!(snapshot[1].path, "/status");
    }
}
