use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    api,
    config::{AppConfig, CorsConfig},
    pipeline::ContentPipeline,
    repo,
    util::html::SanitizePolicy,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub pipeline: Arc<ContentPipeline>,
}

pub async fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.db.url)
        .await
        .context("failed to connect to database")?;

    repo::migrations::ensure_schema(&pool).await?;

    let policy = Arc::new(SanitizePolicy::ugc());
    let pipeline = ContentPipeline::new(&config.fetcher, &config.tagger, policy)?;

    tracing::info!(
        ollama = %config.tagger.base_url,
        model = %config.tagger.model,
        "content pipeline ready"
    );

    let state = AppState {
        pool,
        pipeline: Arc::new(pipeline),
    };

    router(state, &config.cors)
}

pub fn router(state: AppState, cors: &CorsConfig) -> anyhow::Result<Router> {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors)?);

    let router = Router::new()
        .route("/healthz", get(api::health::health_check))
        .route(
            "/api/notes",
            get(api::notes::list_notes)
                .post(api::notes::create_note)
                .delete(api::notes::delete_notes),
        )
        .route("/api/notes/:id", get(api::notes::get_note))
        .layer(middleware)
        .with_state(state);

    Ok(router)
}

fn cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let origin = config.allow_origin.trim();
    if origin == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("invalid CORS origin {origin:?}"))?;
    Ok(layer.allow_origin(origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::{FetcherConfig, TaggerConfig};

    fn test_router() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://notes@localhost/notes")
            .unwrap();
        let pipeline = ContentPipeline::new(
            &FetcherConfig::default(),
            &TaggerConfig::default(),
            Arc::new(SanitizePolicy::ugc()),
        )
        .unwrap();
        router(
            AppState {
                pool,
                pipeline: Arc::new(pipeline),
            },
            &CorsConfig::default(),
        )
        .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_responds() {
        let response = test_router()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ok"], true);
    }

    #[tokio::test]
    async fn blank_note_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::post("/api/notes")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"text": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "BadRequest");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let response = test_router()
            .oneshot(
                Request::post("/api/notes")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "BadRequest");
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let response = test_router()
            .oneshot(Request::get("/api/notes/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn preflight_allows_configured_origin() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/notes")
                    .header(header::ORIGIN, "http://localhost:4200")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:4200"
        );
    }

    #[test]
    fn rejects_invalid_origin() {
        let config = CorsConfig {
            allow_origin: "bad\norigin".to_string(),
        };
        assert!(cors_layer(&config).is_err());
    }
}
