//! HTTP message types used across the router.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type routed by Waypoint.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by handlers, middleware and strategies.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Extension trait for building common responses.
///
/// All constructors are infallible: the status and headers are set on an
/// already-built response rather than going through `http::response::Builder`.
pub trait ResponseExt {
    /// Creates an empty `200 OK` response.
    fn empty() -> Response;

    /// Creates a plain response with the given status, content type and body.
    fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>)
        -> Response;

    /// Creates a `200 OK` HTML response.
    fn html(body: impl Into<Bytes>) -> Response;

    /// Creates a `200 OK` JSON response from an already-encoded value.
    fn json(value: &serde_json::Value) -> Response;

    /// Creates an error response with the given status code and message.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates a `302 Found` redirect to `location`.
    ///
    /// A location that is not a valid header value yields an empty `Location`.
    fn redirect(location: &str) -> Response;
}

impl ResponseExt for Response {
    fn empty() -> Response {
        Response::new(Full::new(Bytes::new()))
    }

    fn with_body(
        status: StatusCode,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) -> Response {
        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    fn html(body: impl Into<Bytes>) -> Response {
        Self::with_body(StatusCode::OK, "text/html; charset=utf-8", body)
    }

    fn json(value: &serde_json::Value) -> Response {
        Self::with_body(StatusCode::OK, "application/json", value.to_string())
    }

    fn error(status: StatusCode, message: &str) -> Response {
        Self::with_body(status, "text/plain; charset=utf-8", message.to_string())
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        Self::with_body(status, "application/json", body.to_string())
    }

    fn redirect(location: &str) -> Response {
        let mut response = Self::empty();
        *response.status_mut() = StatusCode::FOUND;
        let value = HeaderValue::from_str(location).unwrap_or(HeaderValue::from_static(""));
        response.headers_mut().insert(header::LOCATION, value);
        response
    }
}
