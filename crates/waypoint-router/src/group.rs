//! Route groups.
//!
//! A group shares a path prefix, middleware, host/scheme/port constraints
//! and a strategy among its routes. Its routes are usually declared by a
//! builder callback that runs when the table compiles:
//!
//! ```
//! use waypoint_router::{RouteCollector, RouteGroup};
//! use waypoint_core::{Request, RouteArgs};
//!
//! async fn list(_args: RouteArgs, _req: Request) -> &'static str {
//!     "posts"
//! }
//!
//! let group = RouteGroup::with_builder("/admin", |group| {
//!     group.get("/posts", list).name("admin.posts");
//! });
//! assert_eq!(group.get_prefix(), "/admin");
//! ```

use std::fmt;
use std::sync::Arc;

use http::Method;
use waypoint_core::HandlerRef;
use waypoint_middleware::{MiddlewareAware, MiddlewareStack};

use crate::route::Route;
use crate::strategy::StrategyRef;
use crate::RouteCollector;

/// Callback declaring a group's routes.
pub type GroupBuilder = Arc<dyn Fn(&mut RouteGroup) + Send + Sync>;

/// A prefix shared by routes and nested groups.
#[derive(Clone)]
pub struct RouteGroup {
    prefix: String,
    builder: Option<GroupBuilder>,
    host: Option<String>,
    scheme: Option<String>,
    port: Option<u16>,
    strategy: Option<StrategyRef>,
    middleware: MiddlewareStack,
    declared: Declarations,
}

impl RouteGroup {
    /// Creates an empty group. The prefix is normalized to start with `/`.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
            builder: None,
            host: None,
            scheme: None,
            port: None,
            strategy: None,
            middleware: MiddlewareStack::new(),
            declared: Declarations::default(),
        }
    }

    /// Creates a group whose routes are declared by `builder` at compile time.
    pub fn with_builder<F>(prefix: impl AsRef<str>, builder: F) -> Self
    where
        F: Fn(&mut RouteGroup) + Send + Sync + 'static,
    {
        let mut group = Self::new(prefix);
        group.builder = Some(Arc::new(builder));
        group
    }

    /// Declares a nested group under this group's prefix.
    pub fn group<F>(&mut self, prefix: &str, builder: F) -> &mut RouteGroup
    where
        F: Fn(&mut RouteGroup) + Send + Sync + 'static,
    {
        let nested = Self::with_builder(join_path(&self.prefix, prefix), builder);
        self.declared.push_group(nested)
    }

    /// Sets the host constraint inherited by routes without their own.
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the scheme constraint inherited by routes without their own.
    pub fn scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets the port constraint inherited by routes without their own.
    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    /// Sets the strategy inherited by routes without their own.
    pub fn strategy(&mut self, strategy: impl Into<StrategyRef>) -> &mut Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Returns the normalized prefix.
    #[must_use]
    pub fn get_prefix(&self) -> &str {
        &self.prefix
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

    /// Returns the strategy.
    #[must_use]
    pub const fn get_strategy(&self) -> Option<&StrategyRef> {
        self.strategy.as_ref()
    }

    /// Returns a copy of this group with its builder applied.
    pub(crate) fn expand(&self) -> Self {
        let mut expanded = self.clone();
        if let Some(builder) = &self.builder {
            builder(&mut expanded);
        }
        expanded
    }

    pub(crate) const fn declared(&self) -> &Declarations {
        &self.declared
    }
}

impl RouteCollector for RouteGroup {
    /// Declares a route under the group prefix.
    ///
    /// A path of `/` maps to the prefix itself; any other path is joined to
    /// the prefix with exactly one `/`.
    fn map(&mut self, method: Method, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        let route = Route::new(method, join_path(&self.prefix, path), handler);
        self.declared.push_route(route)
    }
}

impl MiddlewareAware for RouteGroup {
    fn middleware_stack(&self) -> &MiddlewareStack {
        &self.middleware
    }

    fn middleware_stack_mut(&mut self) -> &mut MiddlewareStack {
        &mut self.middleware
    }
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .field("has_builder", &self.builder.is_some())
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("port", &self.port)
            .field("strategy", &self.strategy)
            .field("middleware", &self.middleware)
            .field("routes", &self.declared.routes.len())
            .field("groups", &self.declared.groups.len())
            .finish()
    }
}

/// Routes and groups in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Declarations {
    routes: Vec<Route>,
    groups: Vec<RouteGroup>,
    order: Vec<Slot>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Route(usize),
    Group(usize),
}

/// A declared item, borrowed.
pub(crate) enum Declared<'a> {
    Route(&'a Route),
    Group(&'a RouteGroup),
}

impl Declarations {
    pub(crate) fn push_route(&mut self, route: Route) -> &mut Route {
        let index = self.routes.len();
        self.routes.push(route);
        self.order.push(Slot::Route(index));
        &mut self.routes[index]
    }

    pub(crate) fn push_group(&mut self, group: RouteGroup) -> &mut RouteGroup {
        let index = self.groups.len();
        self.groups.push(group);
        self.order.push(Slot::Group(index));
        &mut self.groups[index]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = Declared<'_>> {
        self.order.iter().filter_map(|slot| match *slot {
            Slot::Route(i) => self.routes.get(i).map(Declared::Route),
            Slot::Group(i) => self.groups.get(i).map(Declared::Group),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// Normalizes a prefix to `/x` form.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    format!("/{}", prefix.trim_start_matches('/'))
}

/// Joins a child path to a group prefix.
pub(crate) fn join_path(prefix: &str, path: &str) -> String {
    if path == "/" {
        return prefix.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
