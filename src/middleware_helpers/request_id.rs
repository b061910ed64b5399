use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with an id (the caller's, when it is a usable header
/// value) and echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let (request_id, header_value) = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .and_then(|v| HeaderValue::from_str(v).ok().map(|hv| (RequestId::new(v), hv)))
        .unwrap_or_else(|| {
            let generated = RequestId::default();
            // uuid text is always a valid header value
            let value = HeaderValue::from_str(generated.as_str())
                .unwrap_or_else(|_| HeaderValue::from_static("invalid"));
            (generated, value)
        });

    request.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        header_value.clone(),
    );
    request.extensions_mut().insert(request_id.clone());

    let mut response =
        crate::tracing::scope_request_id(request_id, async move { next.run(request).await })
            .await;

    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn extension_handler(
        Extension(request_id): Extension<RequestId>,
    ) -> (StatusCode, String) {
        (
            StatusCode::OK,
            format!("request-id:{}", request_id.as_str()),
        )
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(extension_handler))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn middleware_adds_request_id_header_and_extension() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response.headers().get(REQUEST_ID_HEADER).cloned();
        assert!(header.is_some());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.starts_with("request-id:"));
    }

    #[tokio::test]
    async fn caller_supplied_id_is_echoed() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "scanner-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "scanner-42"
        );
    }
}
