//! Request correlation and HTTP span helpers.
//!
//! The request id of the request being served is kept in a task-local so that
//! error bodies and service logs can echo it without threading it through
//! every call.

use axum::http::Request;
use std::{cell::RefCell, fmt};
use tower_http::{
    classify::{SharedClassifier, StatusInRangeAsFailures},
    trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer},
};
use uuid::Uuid;

pub use tracing::{debug, error, info, warn};

/// Request ID tracking information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .or_else(|| {
                request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .map(RequestId::new)
            })
            .unwrap_or_default();

        tracing::info_span!(
            "http.request",
            request_id = %request_id.as_str(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<StatusInRangeAsFailures>,
    RequestSpanMaker,
    DefaultOnRequest,
    DefaultOnResponse,
    tower_http::trace::DefaultOnBodyChunk,
    tower_http::trace::DefaultOnEos,
    DefaultOnFailure,
>;

/// Trace layer that treats only 5xx responses as failures; 4xx count
/// rejections (mismatch, conflict) are normal operator outcomes.
pub fn configure_http_tracing() -> HttpTraceLayer {
    let classifier = SharedClassifier::new(StatusInRangeAsFailures::new(500..=599));
    TraceLayer::new(classifier)
        .make_span_with(RequestSpanMaker)
        .on_request(DefaultOnRequest::default())
        .on_response(DefaultOnResponse::default())
        .on_failure(DefaultOnFailure::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_id_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());
        let seen = scope_request_id(RequestId::new("req-7"), async { current_request_id() }).await;
        assert_eq!(seen, Some(RequestId::new("req-7")));
        assert!(current_request_id().is_none());
    }

    #[test]
    fn default_request_id_is_a_uuid() {
        let id = RequestId::default();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_eq!(id.to_string(), id.as_str());
    }
}
