//! Access Log
//! Mission: One structured line per API call, level picked by how it ended

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

/// Paths polled by load balancers; logging them drowns real traffic
const QUIET_PATHS: &[&str] = &["/health"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Served,
    Refused,
    Broken,
}

impl Outcome {
    fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::Broken
        } else if status.is_client_error() {
            Outcome::Refused
        } else {
            Outcome::Served
        }
    }

    fn label(self) -> &'static str {
        match self {
            Outcome::Served => "served",
            Outcome::Refused => "refused",
            Outcome::Broken => "broken",
        }
    }
}

/// Access log for the whole router. Server errors go out at WARN.
pub async fn request_logging(request: Request, next: Next) -> Response {
    if QUIET_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let route = format!("{} {}", request.method(), request.uri().path());
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_us = started.elapsed().as_micros() as u64;

    let status = response.status();
    let outcome = Outcome::of(status);
    match outcome {
        Outcome::Broken => warn!(
            %route,
            status = status.as_u16(),
            elapsed_us,
            outcome = outcome.label(),
            "🔥 API call"
        ),
        Outcome::Served | Outcome::Refused => info!(
            %route,
            status = status.as_u16(),
            elapsed_us,
            outcome = outcome.label(),
            "📨 API call"
        ),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_outcome_by_status_class() {
        assert_eq!(Outcome::of(StatusCode::OK), Outcome::Served);
        assert_eq!(Outcome::of(StatusCode::NO_CONTENT), Outcome::Served);
        assert_eq!(Outcome::of(StatusCode::FORBIDDEN), Outcome::Refused);
        assert_eq!(Outcome::of(StatusCode::NOT_FOUND), Outcome::Refused);
        assert_eq!(Outcome::of(StatusCode::INTERNAL_SERVER_ERROR), Outcome::Broken);
        assert_eq!(Outcome::Broken.label(), "broken");
    }

    #[tokio::test]
    async fn test_responses_untouched() {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .route("/boom", get(|| async { StatusCode::BAD_GATEWAY }))
            .layer(middleware::from_fn(request_logging));

        for (uri, expected) in [
            ("/health", StatusCode::OK),
            ("/teapot", StatusCode::IM_A_TEAPOT),
            ("/boom", StatusCode::BAD_GATEWAY),
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{}", uri);
        }
    }
}
