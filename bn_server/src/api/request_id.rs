//! Request IDs, access logging and HTTP metrics.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::metrics;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request ID that is echoed back
const MAX_REQUEST_ID_LEN: usize = 128;

/// Reuse the caller's request ID when it is sane, else mint a new one
fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Tag every request with an ID, log start and completion, record metrics
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use bn_server::api::request_id::request_id_middleware;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// # }
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let method = request.method().clone();
    // Route templates keep the metric label set bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Request started"
    );

    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    let status = response.status();
    metrics::http_requests_total(method.as_str(), &path, status.as_u16());
    metrics::http_request_duration_ms(method.as_str(), &path, elapsed_ms);

    tracing::info!(
        request_id = %request_id,
        status = %status,
        duration_ms = elapsed_ms,
        "Request completed"
    );

    response
}

/// Request ID of the current request, inserted by [`request_id_middleware`]
///
/// Handlers extract it to tag security log events.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Axum extractor for request ID
impl<S> axum::extract::FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request ID not found in extensions",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("test-id-123"));
        assert_eq!(get_or_generate_request_id(&headers), "test-id-123");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let request_id = get_or_generate_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&request_id).is_ok());
    }

    #[tokio::test]
    async fn test_handlers_see_the_echoed_request_id() {
        use axum::{Router, body::Body, http::Request as HttpRequest, routing::get};
        use http_body_util::BodyExt;
        use tower::ServiceExt;

        async fn echo(request_id: RequestId) -> String {
            request_id.as_str().to_string()
        }

        let app: Router = Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn(request_id_middleware));
        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, header.as_bytes());
    }

    #[tokio::test]
    async fn test_extractor_fails_without_middleware() {
        use axum::{Router, body::Body, http::Request as HttpRequest, routing::get};
        use tower::ServiceExt;

        async fn echo(request_id: RequestId) -> String {
            request_id.0
        }

        let app: Router = Router::new().route("/", get(echo));
        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_oversized_request_id_is_replaced() {
        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        let request_id = get_or_generate_request_id(&headers);
        assert!(Uuid::parse_str(&request_id).is_ok());
    }
}
