//! Route registration: module routes plus system endpoints.

use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the complete router. Module routers carry their own prefixes and
/// authentication.
pub fn build_router(module_routes: Vec<Router>, allowed_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for router in module_routes {
        app = app.merge(router);
    }

    app.layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "henhoused",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_system_endpoints() {
        let app = build_router(Vec::new(), &[]);

        let (status, body) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));

        let (status, body) = get_json(app, "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "henhoused");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = build_router(Vec::new(), &["http://localhost:5173".to_string()]);
        let resp = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/health")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let allowed = resp.headers().get("access-control-allow-origin").unwrap();
        assert_eq!(allowed.to_str().unwrap(), "http://localhost:5173");
    }

    #[tokio::test]
    async fn test_system_endpoints_are_public_next_to_farm_routes() {
        use std::sync::Arc;

        use farm::payment::SandboxGateway;
        use farm::service::FarmConfig;
        use farm::FarmModule;
        use henhouse_core::Module;

        let sql = Arc::new(henhouse_sql::SqliteStore::open_in_memory().unwrap());
        let module = FarmModule::new(
            sql,
            FarmConfig::default(),
            Arc::new(SandboxGateway::new("174379")),
        )
        .unwrap();
        let app = build_router(vec![module.routes()], &[]);

        let (status, _) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = get_json(app, "/api/v1/flocks").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }
}
