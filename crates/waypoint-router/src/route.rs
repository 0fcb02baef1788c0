//! A single declared route.

use http::Method;
use waypoint_core::{HandlerRef, RequestTarget};
use waypoint_middleware::{MiddlewareAware, MiddlewareStack};

use crate::strategy::StrategyRef;

/// Index of a compiled group, used as a non-owning back reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    /// Returns the position of the group in the compiled table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A method + path pattern bound to a handler.
///
/// Host, scheme and port constraints are optional: `None` accepts any
/// request. Setters return `&mut Self` for chaining.
///
/// # Example
///
/// ```
/// use http::Method;
/// use waypoint_core::{Request, RouteArgs};
/// use waypoint_router::Route;
///
/// async fn show(_args: RouteArgs, _req: Request) -> &'static str {
///     "post"
/// }
///
/// let mut route = Route::new(Method::GET, "/post/{id}", show);
/// route.name("post.show").host("blog.example.com").port(8080);
///
/// assert_eq!(route.get_name(), Some("post.show"));
/// assert_eq!(route.get_port(), Some(8080));
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: HandlerRef,
    name: Option<String>,
    host: Option<String>,
    scheme: Option<String>,
    port: Option<u16>,
    middleware: MiddlewareStack,
    strategy: Option<StrategyRef>,
    group: Option<GroupId>,
}

impl Route {
    /// Creates a route.
    pub fn new(method: Method, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
        Self {
            method,
            path: path.into(),
            handler: handler.into(),
            name: None,
            host: None,
            scheme: None,
            port: None,
            middleware: MiddlewareStack::new(),
            strategy: None,
            group: None,
        }
    }

    /// Names the route for URL generation.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Restricts the route to a host (compared case-insensitively).
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Restricts the route to a scheme (compared case-insensitively).
    pub fn scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Restricts the route to a port.
    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    /// Overrides the dispatch strategy for this route.
    pub fn strategy(&mut self, strategy: impl Into<StrategyRef>) -> &mut Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Returns the method.
    #[must_use]
    pub const fn get_method(&self) -> &Method {
        &self.method
    }

    /// Returns the path pattern.
    #[must_use]
    pub fn get_path(&self) -> &str {
        &self.path
    }

    /// Returns the handler reference.
    #[must_use]
    pub const fn get_handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Returns the route name.
    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the host constraint.
    #[must_use]
    pub fn get_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the scheme constraint.
    #[must_use]
    pub fn get_scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Returns the port constraint.
    #[must_use]
    pub const fn get_port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the strategy override.
    #[must_use]
    pub const fn get_strategy(&self) -> Option<&StrategyRef> {
        self.strategy.as_ref()
    }

    /// Returns the group this route was declared in, once compiled.
    #[must_use]
    pub const fn get_group(&self) -> Option<GroupId> {
        self.group
    }

    /// Returns true if the host, scheme and port constraints accept `target`.
    #[must_use]
    pub fn matches_target(&self, target: &RequestTarget) -> bool {
        let host_ok = self
            .host
            .as_deref()
            .map_or(true, |host| host.eq_ignore_ascii_case(&target.host));
        let scheme_ok = self
            .scheme
            .as_deref()
            .map_or(true, |scheme| scheme.eq_ignore_ascii_case(&target.scheme));
        let port_ok = self.port.map_or(true, |port| target.port == Some(port));
        host_ok && scheme_ok && port_ok
    }

    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.group = Some(group);
    }

    /// Fills unset host, scheme, port and strategy from a group.
    pub(crate) fn inherit(
        &mut self,
        host: Option<&String>,
        scheme: Option<&String>,
        port: Option<u16>,
        strategy: Option<&StrategyRef>,
    ) {
        if self.host.is_none() {
            self.host = host.cloned();
        }
        if self.scheme.is_none() {
            self.scheme = scheme.cloned();
        }
        if self.port.is_none() {
            self.port = port;
        }
        if self.strategy.is_none() {
            self.strategy = strategy.cloned();
        }
    }
}

impl MiddlewareAware for Route {
    fn middleware_stack(&self) -> &MiddlewareStack {
        &self.middleware
    }

    fn middleware_stack_mut(&mut self) -> &mut MiddlewareStack {
        &mut self.middleware
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{Request, RouteArgs};

    async fn noop(_args: RouteArgs, _req: Request) {}

    fn target(scheme: &str, host: &str, port: Option<u16>) -> RequestTarget {
        RequestTarget {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
        }
    }

    #[test]
    fn test_unconstrained_route_matches_anything() {
        let route = Route::new(Method::GET, "/", noop);
        assert!(route.matches_target(&target("https", "a.test", Some(443))));
        assert!(route.matches_target(&target("http", "", None)));
    }

    #[test]
    fn test_constraints_compare() {
        let mut route = Route::new(Method::GET, "/", noop);
        route.host("API.example.com").scheme("HTTPS").port(8443);

        assert!(route.matches_target(&target("https", "api.example.com", Some(8443))));
        assert!(!route.matches_target(&target("http", "api.example.com", Some(8443))));
        assert!(!route.matches_target(&target("https", "www.example.com", Some(8443))));
        assert!(!route.matches_target(&target("https", "api.example.com", Some(443))));
    }

    #[test]
    fn test_inherit_only_fills_unset() {
        let mut route = Route::new(Method::GET, "/", noop);
        route.host("own.test");
        route.inherit(
            Some(&"group.test".to_string()),
            Some(&"https".to_string()),
            Some(9000),
            None,
        );
        assert_eq!(route.get_host(), Some("own.test"));
        assert_eq!(route.get_scheme(), Some("https"));
        assert_eq!(route.get_port(), Some(9000));
        assert!(route.get_strategy().is_none());
    }

    #[test]
    fn test_route_middleware_stack() {
        let mut route = Route::new(Method::POST, "/form", "FormController::submit");
        route.lazy_middleware("routing.middleware.xhr");
        assert_eq!(route.middleware_stack().len(), 1);
        assert_eq!(route.get_handler().alias(), Some("FormController::submit"));
    }
}
