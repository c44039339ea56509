//! Static File Serving
//!
//! Serves the upload form from `STATIC_DIR`. When the directory has no
//! `index.html`, `/` falls back to a minimal built-in form so the service is
//! usable out of the box.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Create router for serving static files
pub fn router(static_dir: PathBuf) -> Router {
    if static_dir.is_dir() {
        info!(path = %static_dir.display(), "Serving static files");
    } else {
        warn!(path = %static_dir.display(), "Static directory not found, serving built-in page");
    }

    let serve_dir = ServeDir::new(&static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(serve_index))
        .fallback_service(serve_dir)
        .with_state(Arc::new(static_dir))
}

async fn serve_index(State(static_dir): State<Arc<PathBuf>>) -> Response {
    let html = match tokio::fs::read_to_string(static_dir.join("index.html")).await {
        Ok(content) => content,
        Err(_) => FALLBACK_HTML.to_string(),
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>docprompt</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 720px; margin: 0 auto; padding: 40px 20px; }
        textarea { width: 100%; min-height: 80px; }
        pre { background: #f4f4f4; padding: 15px; border-radius: 6px; white-space: pre-wrap; }
    </style>
</head>
<body>
    <h1>docprompt</h1>
    <p>Upload an image or PDF and ask a question about it.</p>
    <form id="form">
        <p><input type="file" name="file" accept="image/jpeg,image/png,image/gif,image/webp,application/pdf" required></p>
        <p><textarea name="prompt" placeholder="What would you like to know?" required></textarea></p>
        <p><button type="submit">Process</button></p>
    </form>
    <pre id="result"></pre>
    <script>
        document.getElementById('form').addEventListener('submit', async (event) => {
            event.preventDefault();
            const result = document.getElementById('result');
            result.textContent = 'Processing...';
            const response = await fetch('/api/process', { method: 'POST', body: new FormData(event.target) });
            const body = await response.json();
            result.textContent = body.success ? body.output : 'Error: ' + body.error;
        });
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_index_from_static_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.html"), "<h1>custom</h1>").unwrap();
        std::fs::write(temp.path().join("app.js"), "console.log(1)").unwrap();

        let (status, body) = get_body(router(temp.path().to_path_buf()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>custom</h1>");

        let (status, body) = get_body(router(temp.path().to_path_buf()), "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");
    }

    #[tokio::test]
    async fn test_fallback_page_without_static_dir() {
        let temp = TempDir::new().unwrap();
        let (status, body) = get_body(router(temp.path().join("missing")), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/process"));
    }
}
