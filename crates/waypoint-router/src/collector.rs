//! Route declaration shorthands shared by tables and groups.

use http::Method;
use waypoint_core::HandlerRef;
use waypoint_middleware::{MiddlewareAware, MiddlewareRef};

use crate::route::Route;
use crate::strategy::StrategyRef;

/// Prefix of container aliases naming middleware.
pub const MIDDLEWARE_ALIAS_PREFIX: &str = "routing.middleware.";

/// Prefix of container aliases naming dispatch strategies.
pub const STRATEGY_ALIAS_PREFIX: &str = "routing.strategy.";

/// Returns the container alias of the middleware registered as `alias`.
///
/// ```
/// assert_eq!(waypoint_router::middleware_alias("xhr"), "routing.middleware.xhr");
/// ```
#[must_use]
pub fn middleware_alias(alias: &str) -> String {
    format!("{MIDDLEWARE_ALIAS_PREFIX}{alias}")
}

/// A lazy reference to the middleware registered as `alias`.
#[must_use]
pub fn middle(alias: &str) -> MiddlewareRef {
    MiddlewareRef::Alias(middleware_alias(alias))
}

/// A lazy reference to the strategy registered as `alias`.
#[must_use]
pub fn strategy_alias(alias: &str) -> StrategyRef {
    StrategyRef::Alias(format!("{STRATEGY_ALIAS_PREFIX}{alias}"))
}

/// Anything routes can be declared on.
///
/// Implementors provide [`map`](Self::map); the verb shorthands forward to
/// it and return the new route for chaining.
pub trait RouteCollector {
    /// Declares a route for `method` and `path`.
    fn map(&mut self, method: Method, path: &str, handler: impl Into<HandlerRef>) -> &mut Route;

    /// Declares a `GET` route.
    fn get(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::GET, path, handler)
    }

    /// Declares a `POST` route.
    fn post(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::POST, path, handler)
    }

    /// Declares a `PUT` route.
    fn put(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::PUT, path, handler)
    }

    /// Declares a `PATCH` route.
    fn patch(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::PATCH, path, handler)
    }

    /// Declares a `DELETE` route.
    fn delete(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::DELETE, path, handler)
    }

    /// Declares a `HEAD` route.
    fn head(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::HEAD, path, handler)
    }

    /// Declares an `OPTIONS` route.
    fn options(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.map(Method::OPTIONS, path, handler)
    }

    /// Declares a `POST` route that only answers XHR requests.
    fn xhr(&mut self, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.xhr_with(Method::POST, path, handler)
    }

    /// Declares a route for `method` that only answers XHR requests.
    ///
    /// The `xhr` middleware is attached by alias, so it must be registered
    /// in the resolver (see `register_defaults`).
    fn xhr_with(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<HandlerRef>,
    ) -> &mut Route {
        self.map(method, path, handler)
            .lazy_middleware(middleware_alias("xhr"))
    }
}
