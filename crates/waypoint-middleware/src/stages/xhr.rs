//! XHR-only middleware.
//!
//! Browsers' `XMLHttpRequest` wrappers conventionally send
//! `X-Requested-With: XMLHttpRequest`. Routes declared with `xhr` carry this
//! middleware and answer anything else with `403 Forbidden`.

use http::StatusCode;

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};
use waypoint_core::{BoxFuture, Request, Response, ResponseExt};

/// The header inspected by [`XhrMiddleware`].
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// The value marking an XHR request.
pub const XHR_MARKER: &str = "XMLHttpRequest";

/// Middleware that only lets XHR requests through.
///
/// # Example
///
/// ```
/// use waypoint_middleware::Middleware;
/// use waypoint_middleware::stages::XhrMiddleware;
///
/// assert_eq!(XhrMiddleware::new().name(), "xhr");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct XhrMiddleware;

impl XhrMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns true if `request` was sent as XHR.
    #[must_use]
    pub fn is_xhr(request: &Request) -> bool {
        request
            .headers()
            .get(REQUESTED_WITH_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case(XHR_MARKER))
    }
}

impl Middleware for XhrMiddleware {
    fn name(&self) -> &'static str {
        "xhr"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if Self::is_xhr(&request) {
                next.run(ctx, request).await
            } else {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    path = %request.uri().path(),
                    "rejecting non-XHR request"
                );
                Response::error(StatusCode::FORBIDDEN, "XHR request required")
            }
        })
    }
}
