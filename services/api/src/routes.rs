use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use hunt_property::calculators::calculator_router;
use serde_json::json;
use std::sync::atomic::Ordering;

/// Adds the welcome, probe and metrics endpoints plus the calculators to the
/// marketplace router.
pub(crate) fn with_operational_routes(marketplace: Router) -> Router {
    marketplace
        .merge(calculator_router())
        .route("/", get(welcome))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn welcome() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to Hunt Property API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use hunt_property::marketplace::{marketplace_router, InMemoryStore, MarketplaceService};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let service = Arc::new(MarketplaceService::new(Arc::new(InMemoryStore::new())));
        with_operational_routes(marketplace_router(service)).layer(Extension(state))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body collects");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn welcome_reports_crate_version() {
        let (status, body) = get_json(app(true), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to Hunt Property API");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn readiness_tracks_listener_flag() {
        let (status, body) = get_json(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        let (status, body) = get_json(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn health_and_marketplace_routes_are_mounted() {
        let (status, body) = get_json(app(true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(app(true), "/api/properties").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(true)
            .oneshot(
                Request::get("/metrics")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
