//! Dispatch strategies.
//!
//! A strategy decides how a matched handler is invoked and how its
//! [`Reply`] becomes a [`Response`]. Two strategies ship with the router:
//!
//! | Strategy | Text | JSON | Empty | Failure | 405 |
//! |---|---|---|---|---|---|
//! | [`ApplicationStrategy`] | `text/html` | `application/json` | `200` | plain text | plain text |
//! | [`JsonStrategy`] | JSON string | `application/json` | `200` | error envelope | error envelope |
//!
//! The JSON strategy also answers automatic `OPTIONS` routes.

use std::fmt;
use std::sync::Arc;

use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use waypoint_core::{
    BoxFuture, ClassRegistry, Handler, Lookup, Reply, Request, Resolver, Response, ResponseExt,
    RouteArgs, RoutingError, RoutingResult,
};

/// Header listing the methods accepted for a CORS preflight.
pub const ACCESS_CONTROL_ALLOW_METHODS: &str = "access-control-allow-methods";

/// Turns a handler invocation into a response.
pub trait DispatchStrategy: Send + Sync + 'static {
    /// Returns the strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// Invokes `handler` with the route variables and the request, then
    /// coerces and decorates the reply.
    fn invoke<'a>(
        &'a self,
        handler: Arc<dyn Handler>,
        args: RouteArgs,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let reply = handler.call(args, request).await;
            self.decorate(self.coerce(reply))
        })
    }

    /// Converts a handler reply into a response.
    fn coerce(&self, reply: Reply) -> Response;

    /// Final touch applied to every response this strategy produces.
    fn decorate(&self, response: Response) -> Response {
        response
    }

    /// Renders a routing error.
    fn error_response(&self, error: &RoutingError) -> Response {
        Response::error(error.status_code(), &error.to_string())
    }

    /// Renders `405 Method Not Allowed` with an `Allow` header.
    fn method_not_allowed(&self, error: &RoutingError) -> Response {
        let mut response = self.error_response(error);
        if let RoutingError::MethodNotAllowed { allowed, .. } = error {
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        self.decorate(response)
    }

    /// Returns a handler answering `OPTIONS` for a path that accepts
    /// `methods`, if this strategy generates such routes.
    fn options_handler(&self, methods: Vec<Method>) -> Option<Arc<dyn Handler>> {
        let _ = methods;
        None
    }
}

/// A strategy given either as an instance or as an alias.
#[derive(Clone)]
pub enum StrategyRef {
    /// A ready strategy.
    Instance(Arc<dyn DispatchStrategy>),
    /// An alias resolved at dispatch.
    Alias(String),
}

impl StrategyRef {
    /// Resolves this reference.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnresolvableStrategy`] if the alias names
    /// nothing.
    pub fn resolve(
        &self,
        resolver: Option<&dyn Resolver>,
        classes: &ClassRegistry,
    ) -> RoutingResult<Arc<dyn DispatchStrategy>> {
        match self {
            Self::Instance(strategy) => Ok(Arc::clone(strategy)),
            Self::Alias(alias) => Lookup::Cascading
                .resolve::<Arc<dyn DispatchStrategy>>(alias, resolver, classes)
                .ok_or_else(|| RoutingError::unresolvable_strategy(alias.clone())),
        }
    }
}

impl fmt::Debug for StrategyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(strategy) => f.debug_tuple("Instance").field(&strategy.name()).finish(),
            Self::Alias(alias) => f.debug_tuple("Alias").field(alias).finish(),
        }
    }
}

impl<S: DispatchStrategy> From<S> for StrategyRef {
    fn from(strategy: S) -> Self {
        Self::Instance(Arc::new(strategy))
    }
}

impl From<Arc<dyn DispatchStrategy>> for StrategyRef {
    fn from(strategy: Arc<dyn DispatchStrategy>) -> Self {
        Self::Instance(strategy)
    }
}

impl From<&str> for StrategyRef {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for StrategyRef {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}

/// The default strategy for HTML applications.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationStrategy;

impl ApplicationStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for ApplicationStrategy {
    fn name(&self) -> &'static str {
        "app"
    }

    fn coerce(&self, reply: Reply) -> Response {
        match reply {
            Reply::Response(response) => response,
            Reply::Json(value) => Response::json(&value),
            Reply::Text(text) => Response::html(text),
            Reply::Empty => Response::empty(),
            Reply::Failure(error) => self.error_response(&error),
        }
    }
}

/// A strategy for JSON APIs.
///
/// Every response gets `content-type: application/json` unless it already
/// has a content type, and errors render as an error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStrategy;

impl JsonStrategy {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DispatchStrategy for JsonStrategy {
    fn name(&self) -> &'static str {
        "json"
    }

    fn coerce(&self, reply: Reply) -> Response {
        match reply {
            Reply::Response(response) => response,
            Reply::Json(value) => Response::json(&value),
            Reply::Text(text) => Response::json(&serde_json::Value::String(text)),
            Reply::Empty => Response::empty(),
            Reply::Failure(error) => self.error_response(&error),
        }
    }

    fn decorate(&self, mut response: Response) -> Response {
        response
            .headers_mut()
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        response
    }

    fn error_response(&self, error: &RoutingError) -> Response {
        let body = serde_json::to_string(&error.to_envelope(None)).unwrap_or_default();
        Response::with_body(error.status_code(), "application/json", body)
    }

    fn options_handler(&self, methods: Vec<Method>) -> Option<Arc<dyn Handler>> {
        let allowed = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let handler = move |_args: RouteArgs, _request: Request| {
            let allowed = allowed.clone();
            async move { preflight_response(&allowed) }
        };
        Some(Arc::new(handler))
    }
}

fn preflight_response(allowed: &str) -> Response {
    let mut response = Response::empty();
    *response.status_mut() = StatusCode::NO_CONTENT;
    if let Ok(value) = HeaderValue::from_str(allowed) {
        response.headers_mut().insert(header::ALLOW, value.clone());
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    response
}
