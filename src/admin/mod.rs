//! Admin API: breaker inspection and manual control.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breaker", get(get_breaker))
        .route("/admin/breaker/isolate", post(isolate_breaker))
        .route("/admin/breaker/reset", post(reset_breaker))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

#[cfg(test)]
mod tests {
    use crate::config::ServiceConfig;
    use crate::http::HttpServer;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn admin_config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "secret".into();
        config
    }

    fn request(method: Method, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let router = HttpServer::new(admin_config()).unwrap().into_router();

        let response = router
            .clone()
            .oneshot(request(Method::GET, "/admin/status", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(request(Method::GET, "/admin/status", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_isolate_and_reset_breaker() {
        let router = HttpServer::new(admin_config()).unwrap().into_router();

        let response = router
            .clone()
            .oneshot(request(Method::POST, "/admin/breaker/isolate", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["state"], "isolated");

        let response = router
            .clone()
            .oneshot(request(Method::GET, "/api/products/1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["kind"], "isolated");

        let response = router
            .oneshot(request(Method::POST, "/admin/breaker/reset", Some("secret")))
            .await
            .unwrap();
        assert_eq!(json(response).await["state"], "closed");
    }

    #[tokio::test]
    async fn test_breaker_endpoints_absent_for_retry_policy() {
        let mut config = admin_config();
        config.resilience.policy = crate::resilience::PolicyChoice::Retry;
        let router = HttpServer::new(config).unwrap().into_router();

        let response = router
            .clone()
            .oneshot(request(Method::GET, "/admin/breaker", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(request(Method::GET, "/admin/status", Some("secret")))
            .await
            .unwrap();
        assert_eq!(json(response).await["policy"], "retry");
    }

    #[tokio::test]
    async fn test_admin_routes_disabled_by_default() {
        let router = HttpServer::new(ServiceConfig::default()).unwrap().into_router();
        let response = router
            .oneshot(request(Method::GET, "/admin/status", Some("CHANGE_ME_IN_PRODUCTION")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
