use axum::{extract::Request, middleware::Next, response::Response};
use chrono::Utc;
use std::time::Instant;
use tracing::info;

/// Access log line per request, under the `access_log` target
///
/// Query strings are left out; search keywords may carry personal data.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    info!(
        target: "access_log",
        timestamp = %Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        user_agent = %user_agent,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_logging_middleware_passes_response_through() {
        let app = Router::new()
            .route("/realms/{realm}/users", get(|| async { "[]" }))
            .layer(axum::middleware::from_fn(logging_middleware));

        let server = TestServer::new(app).unwrap();
        let response = server.get("/realms/acme/users?search=bob").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "[]");
    }
}
