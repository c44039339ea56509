use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::{json, Value};

use crate::middleware::{require_access, Principal};
use crate::models::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/protected", get(protected))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access))
        .with_state(state)
}

async fn protected(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "success": true,
        "subject": principal.subject,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::middleware::Claims;
    use crate::storage::UploadDir;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app(secret: Option<&str>) -> (TempDir, Router) {
        let temp = TempDir::new().unwrap();
        let mut config = Config::for_upstream(temp.path(), "http://127.0.0.1:9");
        config.auth.jwt_secret = secret.map(String::from);
        let upload_dir = UploadDir::init(temp.path()).await.unwrap();
        let state = AppState::new(config, upload_dir).unwrap();
        (temp, router(state))
    }

    fn bearer(secret: &str, sub: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    async fn get(router: Router, authorization: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_valid_token_echoes_subject() {
        let (_temp, router) = app(Some("s3cret")).await;
        let (status, body) = get(router, Some(bearer("s3cret", "alice"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "alice");
    }

    #[tokio::test]
    async fn test_missing_token_is_401_envelope() {
        let (_temp, router) = app(Some("s3cret")).await;
        let (status, body) = get(router, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Unauthorized"));
    }

    #[tokio::test]
    async fn test_unconfigured_secret_refuses() {
        let (_temp, router) = app(None).await;
        let (status, _) = get(router, Some(bearer("anything", "alice"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
