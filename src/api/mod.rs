mod health;
mod metrics;
mod not_found;
mod request_log;

pub use health::{check_database, health_check, HealthStatus};
pub use metrics::metrics_handler;
pub use not_found::{not_found, NOT_FOUND_MESSAGE};
pub use request_log::RequestLogLayer;

use crate::metrics::Metrics;
use crate::pool::ConnectionPool;
use axum::{
    http::{header, HeaderValue},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub const HEALTH_PATH: &str = "/";
pub const METRICS_PATH: &str = "/metrics";

/// Everything the handlers share, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<dyn ConnectionPool>,
    pub metrics: Arc<Metrics>,
    pub healthcheck_timeout: Duration,
}

/// Two literal routes, everything else falls through to 404. Routing is by
/// path only; the method is not inspected, so CORS preflights reach the
/// handlers like any other request.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, any(health_check))
        .route(METRICS_PATH, any(metrics_handler))
        .fallback(not_found)
        .layer(RequestLogLayer::new(state.metrics.clone()))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::fake::{Behavior, FakePool};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state_with(pool: FakePool) -> AppState {
        AppState {
            pool: Arc::new(pool),
            metrics: Arc::new(Metrics::new("test").unwrap()),
            healthcheck_timeout: Duration::from_millis(200),
        }
    }

    async fn send(app: &Router, method: Method, uri: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, Method::GET, uri).await
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_json_headers(response: &Response) {
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_root_with_admin() {
        let pool = FakePool::with_admin();
        let app = router(state_with(pool.clone()));

        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({"database": true, "userAdmin": true})
        );
        assert_eq!(pool.acquired(), 1);
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn test_root_without_admin() {
        let app = router(state_with(FakePool::new(Behavior::FirstRole(None))));

        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({"database": true, "userAdmin": false})
        );
    }

    #[tokio::test]
    async fn test_root_database_down() {
        let app = router(state_with(FakePool::new(Behavior::Unreachable)));

        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_json_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({"database": false, "userAdmin": false})
        );
    }

    #[tokio::test]
    async fn test_root_failures_release_every_lease() {
        for behavior in [Behavior::QueryFails, Behavior::QueryHangs] {
            let pool = FakePool::new(behavior);
            let app = router(state_with(pool.clone()));

            for _ in 0..3 {
                let response = get(&app, "/").await;
                assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            }
            assert_eq!(pool.acquired(), 3);
            assert_eq!(pool.released(), 3);
        }
    }

    #[tokio::test]
    async fn test_root_is_idempotent() {
        let pool = FakePool::with_admin();
        let app = router(state_with(pool.clone()));

        let first = json_body(get(&app, "/").await).await;
        for _ in 0..5 {
            let response = get(&app, "/").await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await, first);
        }
        assert_eq!(pool.acquired(), 6);
        assert_eq!(pool.released(), 6);
    }

    #[tokio::test]
    async fn test_root_ignores_method_and_query() {
        let app = router(state_with(FakePool::with_admin()));

        let response = send(&app, Method::POST, "/?check=1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"database": true, "userAdmin": true})
        );
    }

    #[tokio::test]
    async fn test_preflight_runs_health_check() {
        let pool = FakePool::with_admin();
        let app = router(state_with(pool.clone()));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "https://dashboard.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_json_headers(&response);
        assert_eq!(
            json_body(response).await,
            json!({"database": true, "userAdmin": true})
        );
        assert_eq!(pool.acquired(), 1);
        assert_eq!(pool.released(), 1);
    }

    #[tokio::test]
    async fn test_unknown_paths_are_404() {
        let pool = FakePool::with_admin();
        let app = router(state_with(pool.clone()));

        for uri in ["/foo", "/admin", "//", "/metrics/", "/health", "/a/b/c"] {
            let response = get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {}", uri);
            assert_json_headers(&response);
            assert_eq!(
                json_body(response).await,
                json!({"message": "Rota não encontrada"})
            );
        }
        assert_eq!(pool.acquired(), 0);
    }

    #[tokio::test]
    async fn test_metrics_independent_of_database() {
        let pool = FakePool::new(Behavior::Unreachable);
        let app = router(state_with(pool.clone()));

        let response = get(&app, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            prometheus::TEXT_FORMAT
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.is_empty());
        assert!(text.contains("test_pool_max_size 4"));
        assert_eq!(pool.acquired(), 0);
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let app = router(state_with(FakePool::new(Behavior::Unreachable)));

        let _ = get(&app, "/").await;
        let _ = get(&app, "/nope").await;

        let response = get(&app, "/metrics").await;
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains(r#"test_http_requests_total{route="/",status="500"} 1"#));
        assert!(text.contains(r#"test_http_requests_total{route="unmatched",status="404"} 1"#));
        assert!(text.contains(r#"test_health_checks_total{outcome="database_unreachable"} 1"#));
    }
}
