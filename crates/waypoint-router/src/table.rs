//! The route table.
//!
//! Declarations are kept in registration order. The first lookup compiles
//! them: groups are expanded once, constraints are inherited, optional
//! automatic `OPTIONS` routes are added, and the [`Matcher`] is built. The
//! compiled form is cached until the next declaration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use parking_lot::RwLock;
use waypoint_core::{HandlerRef, RequestTarget, RoutingError, RoutingResult};
use waypoint_middleware::{MiddlewareAware, MiddlewareStack};

use crate::group::{Declarations, Declared, RouteGroup};
use crate::matcher::{MatchResult, Matcher};
use crate::patterns::PatternMatchers;
use crate::route::{GroupId, Route};
use crate::strategy::{ApplicationStrategy, DispatchStrategy, StrategyRef};
use crate::RouteCollector;

/// A compiled group: its prefix, middleware and parent.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    prefix: String,
    middleware: MiddlewareStack,
    strategy: Option<StrategyRef>,
    parent: Option<GroupId>,
}

impl GroupInfo {
    /// Returns the full prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the middleware declared on the group itself.
    #[must_use]
    pub const fn middleware(&self) -> &MiddlewareStack {
        &self.middleware
    }

    /// Returns the effective strategy of the group.
    #[must_use]
    pub const fn strategy(&self) -> Option<&StrategyRef> {
        self.strategy.as_ref()
    }

    /// Returns the enclosing group.
    #[must_use]
    pub const fn parent(&self) -> Option<GroupId> {
        self.parent
    }
}

/// The compiled form of a [`RouteTable`].
#[derive(Debug)]
pub struct CompiledRoutes {
    groups: Vec<GroupInfo>,
    names: HashMap<String, Option<usize>>,
    matcher: Matcher,
}

impl CompiledRoutes {
    /// Returns every compiled route, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        self.matcher.routes()
    }

    /// Returns the route named `name`, or `None` if unknown or ambiguous.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<Arc<Route>> {
        self.try_route(name).ok().flatten()
    }

    /// Returns the route named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::DuplicateRouteName`] if several routes share
    /// the name.
    pub fn try_route(&self, name: &str) -> RoutingResult<Option<Arc<Route>>> {
        match self.names.get(name) {
            None => Ok(None),
            Some(None) => Err(RoutingError::duplicate_name(name)),
            Some(Some(index)) => Ok(self.routes().get(*index).cloned()),
        }
    }

    /// Returns a compiled group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&GroupInfo> {
        self.groups.get(id.index())
    }

    /// Returns the groups enclosing `id`, outermost first, `id` included.
    #[must_use]
    pub fn group_chain(&self, id: GroupId) -> Vec<&GroupInfo> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(group) = current.and_then(|id| self.group(id)) {
            chain.push(group);
            current = group.parent;
        }
        chain.reverse();
        chain
    }

    /// Returns the matcher.
    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

/// Ordered route and group declarations plus the compiled lookup.
pub struct RouteTable {
    declared: Declarations,
    patterns: PatternMatchers,
    default_strategy: Arc<dyn DispatchStrategy>,
    options_routes: bool,
    compiled: RwLock<Option<Arc<CompiledRoutes>>>,
}

impl RouteTable {
    /// Creates an empty table with the default constraint aliases and the
    /// application strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declared: Declarations::default(),
            patterns: PatternMatchers::default(),
            default_strategy: Arc::new(ApplicationStrategy),
            options_routes: true,
            compiled: RwLock::new(None),
        }
    }

    /// Appends a route.
    pub fn add_route(&mut self, route: Route) -> &mut Route {
        self.invalidate();
        self.declared.push_route(route)
    }

    /// Appends a group.
    pub fn add_group(&mut self, group: RouteGroup) -> &mut RouteGroup {
        self.invalidate();
        self.declared.push_group(group)
    }

    /// Declares a group whose routes `builder` declares at compile time.
    pub fn group<F>(&mut self, prefix: &str, builder: F) -> &mut RouteGroup
    where
        F: Fn(&mut RouteGroup) + Send + Sync + 'static,
    {
        self.add_group(RouteGroup::with_builder(prefix, builder))
    }

    /// Returns the constraint alias table.
    #[must_use]
    pub const fn url_patterns(&self) -> &PatternMatchers {
        &self.patterns
    }

    /// Adds a constraint alias.
    pub fn add_pattern_matcher(&mut self, alias: impl Into<String>, regex: impl Into<String>) -> &mut Self {
        self.invalidate();
        self.patterns.add(alias, regex);
        self
    }

    /// Sets the strategy used by routes without one.
    pub fn set_default_strategy(&mut self, strategy: Arc<dyn DispatchStrategy>) -> &mut Self {
        self.invalidate();
        self.default_strategy = strategy;
        self
    }

    /// Returns the strategy used by routes without one.
    #[must_use]
    pub fn default_strategy(&self) -> Arc<dyn DispatchStrategy> {
        Arc::clone(&self.default_strategy)
    }

    /// Enables or disables automatic `OPTIONS` routes.
    pub fn set_options_routes(&mut self, enabled: bool) -> &mut Self {
        self.invalidate();
        self.options_routes = enabled;
        self
    }

    /// Returns the route named `name`, or `None` if unknown, ambiguous or
    /// the table does not compile.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<Arc<Route>> {
        self.compile().ok()?.route(name)
    }

    /// Returns the route named `name`.
    ///
    /// # Errors
    ///
    /// Fails if the table does not compile or the name is ambiguous.
    pub fn try_route(&self, name: &str) -> RoutingResult<Option<Arc<Route>>> {
        self.compile()?.try_route(name)
    }

    /// Matches a request against the table.
    ///
    /// # Errors
    ///
    /// Fails if the table does not compile.
    pub fn dispatch(&self, method: &Method, path: &str, target: &RequestTarget) -> RoutingResult<MatchResult> {
        Ok(self.compile()?.matcher().lookup(method, path, target))
    }

    /// Compiles the declarations, or returns the cached result.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::BadRouteDeclaration`] for an invalid pattern.
    pub fn compile(&self) -> RoutingResult<Arc<CompiledRoutes>> {
        if let Some(compiled) = self.compiled.read().as_ref() {
            return Ok(Arc::clone(compiled));
        }

        let mut slot = self.compiled.write();
        if let Some(compiled) = slot.as_ref() {
            return Ok(Arc::clone(compiled));
        }

        let mut routes = Vec::new();
        let mut groups = Vec::new();
        flatten(&self.declared, None, &mut routes, &mut groups);
        if self.options_routes {
            self.add_options_routes(&mut routes);
        }

        let mut names: HashMap<String, Option<usize>> = HashMap::new();
        for (index, route) in routes.iter().enumerate() {
            if let Some(name) = route.get_name() {
                names
                    .entry(name.to_string())
                    .and_modify(|slot| *slot = None)
                    .or_insert(Some(index));
            }
        }

        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let matcher = Matcher::build(&routes, &self.patterns)?;
        tracing::debug!(
            routes = routes.len(),
            groups = groups.len(),
            strategy = self.default_strategy.name(),
            "route table compiled"
        );

        let compiled = Arc::new(CompiledRoutes {
            groups,
            names,
            matcher,
        });
        *slot = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    fn add_options_routes(&self, routes: &mut Vec<Route>) {
        type Key = (Option<String>, Option<String>, Option<u16>, String);

        let mut paths: IndexMap<Key, Vec<Method>> = IndexMap::new();
        for route in routes.iter() {
            let key = (
                route.get_scheme().map(str::to_ascii_lowercase),
                route.get_host().map(str::to_ascii_lowercase),
                route.get_port(),
                route.get_path().to_string(),
            );
            let methods = paths.entry(key).or_default();
            if !methods.contains(route.get_method()) {
                methods.push(route.get_method().clone());
            }
        }

        for ((scheme, host, port, path), methods) in paths {
            if methods.contains(&Method::OPTIONS) {
                continue;
            }
            let Some(handler) = self.default_strategy.options_handler(methods) else {
                return;
            };
            let mut route = Route::new(Method::OPTIONS, path, HandlerRef::from(handler));
            if let Some(scheme) = scheme {
                route.scheme(scheme);
            }
            if let Some(host) = host {
                route.host(host);
            }
            if let Some(port) = port {
                route.port(port);
            }
            routes.push(route);
        }
    }

    fn invalidate(&mut self) {
        self.compiled.get_mut().take();
    }
}

/// Effective constraints of an enclosing group.
#[derive(Default)]
struct Inherited {
    host: Option<String>,
    scheme: Option<String>,
    port: Option<u16>,
    strategy: Option<StrategyRef>,
}

fn flatten(
    declared: &Declarations,
    parent: Option<(GroupId, &Inherited)>,
    routes: &mut Vec<Route>,
    groups: &mut Vec<GroupInfo>,
) {
    for item in declared.iter() {
        match item {
            Declared::Route(route) => {
                let mut route = route.clone();
                if let Some((id, inherited)) = parent {
                    route.set_group(id);
                    route.inherit(
                        inherited.host.as_ref(),
                        inherited.scheme.as_ref(),
                        inherited.port,
                        inherited.strategy.as_ref(),
                    );
                }
                routes.push(route);
            }
            Declared::Group(group) => {
                let expanded = group.expand();
                let outer = parent.map(|(_, inherited)| inherited);
                let inherited = Inherited {
                    host: expanded
                        .get_host()
                        .map(str::to_string)
                        .or_else(|| outer.and_then(|o| o.host.clone())),
                    scheme: expanded
                        .get_scheme()
                        .map(str::to_string)
                        .or_else(|| outer.and_then(|o| o.scheme.clone())),
                    port: expanded.get_port().or_else(|| outer.and_then(|o| o.port)),
                    strategy: expanded
                        .get_strategy()
                        .cloned()
                        .or_else(|| outer.and_then(|o| o.strategy.clone())),
                };

                let id = GroupId(groups.len());
                groups.push(GroupInfo {
                    prefix: expanded.get_prefix().to_string(),
                    middleware: expanded.middleware_stack().clone(),
                    strategy: inherited.strategy.clone(),
                    parent: parent.map(|(id, _)| id),
                });
                flatten(expanded.declared(), Some((id, &inherited)), routes, groups);
            }
        }
    }
}

impl RouteCollector for RouteTable {
    fn map(&mut self, method: Method, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.add_route(Route::new(method, path, handler))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RouteTable {
    fn clone(&self) -> Self {
        Self {
            declared: self.declared.clone(),
            patterns: self.patterns.clone(),
            default_strategy: Arc::clone(&self.default_strategy),
            options_routes: self.options_routes,
            compiled: RwLock::new(self.compiled.read().clone()),
        }
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("declared", &self.declared.len())
            .field("patterns", &self.patterns)
            .field("default_strategy", &self.default_strategy.name())
            .field("options_routes", &self.options_routes)
            .field("compiled", &self.compiled.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::JsonStrategy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use waypoint_core::{Request, RouteArgs};

    async fn noop(_args: RouteArgs, _req: Request) {}

    fn target() -> RequestTarget {
        RequestTarget {
            scheme: "http".to_string(),
            host: "example.com".to_string(),
            port: Some(80),
        }
    }

    fn matched_name(table: &RouteTable, method: Method, path: &str) -> Option<String> {
        match table.dispatch(&method, path, &target()).unwrap() {
            MatchResult::Found(m) => m.route.get_name().map(str::to_string),
            _ => None,
        }
    }

    #[test]
    fn test_group_prefix_and_nesting() {
        let mut table = RouteTable::new();
        table.group("/admin", |admin| {
            admin.get("/", noop).name("admin.home");
            admin.group("/users", |users| {
                users.get("/{id:number}", noop).name("admin.user");
            });
        });

        assert_eq!(matched_name(&table, Method::GET, "/admin").as_deref(), Some("admin.home"));
        assert_eq!(
            matched_name(&table, Method::GET, "/admin/users/3").as_deref(),
            Some("admin.user")
        );

        let compiled = table.compile().unwrap();
        let user = compiled.route("admin.user").unwrap();
        let chain = compiled.group_chain(user.get_group().unwrap());
        let prefixes: Vec<_> = chain.iter().map(|g| g.prefix()).collect();
        assert_eq!(prefixes, ["/admin", "/admin/users"]);
    }

    #[test]
    fn test_groups_expand_once_per_compilation() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut table = RouteTable::new();
        table.group("/api", |api| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            api.get("/ping", noop);
        });

        for _ in 0..3 {
            let _ = table.dispatch(&Method::GET, "/api/ping", &target()).unwrap();
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(table.compile().unwrap().routes().len(), 1);

        table.get("/other", noop);
        let _ = table.compile().unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_group_constraints_are_inherited() {
        let mut table = RouteTable::new();
        table
            .group("/v1", |v1| {
                v1.get("/a", noop).name("a");
                v1.get("/b", noop).name("b").host("other.test");
            })
            .host("api.test")
            .strategy(JsonStrategy);

        let compiled = table.compile().unwrap();
        let a = compiled.route("a").unwrap();
        let b = compiled.route("b").unwrap();
        assert_eq!(a.get_host(), Some("api.test"));
        assert_eq!(b.get_host(), Some("other.test"));
        assert!(a.get_strategy().is_some());
    }

    #[test]
    fn test_duplicate_names() {
        let mut table = RouteTable::new();
        table.get("/a", noop).name("dup");
        table.get("/b", noop).name("dup");
        table.get("/c", noop).name("unique");

        assert!(table.route("dup").is_none());
        assert!(matches!(
            table.try_route("dup"),
            Err(RoutingError::DuplicateRouteName { .. })
        ));
        assert!(table.route("unique").is_some());
        assert!(table.route("missing").is_none());
        assert!(table.try_route("missing").unwrap().is_none());
    }

    #[test]
    fn test_options_routes_only_with_json_strategy() {
        let mut table = RouteTable::new();
        table.get("/posts", noop);
        table.post("/posts", noop);
        assert!(matches!(
            table.dispatch(&Method::OPTIONS, "/posts", &target()).unwrap(),
            MatchResult::MethodNotAllowed { .. }
        ));

        table.set_default_strategy(Arc::new(JsonStrategy));
        assert!(matches!(
            table.dispatch(&Method::OPTIONS, "/posts", &target()).unwrap(),
            MatchResult::Found(_)
        ));

        table.set_options_routes(false);
        assert!(!matches!(
            table.dispatch(&Method::OPTIONS, "/posts", &target()).unwrap(),
            MatchResult::Found(_)
        ));
    }

    #[test]
    fn test_bad_declaration_surfaces_on_compile() {
        let mut table = RouteTable::new();
        table.get("/a[/b]/c", noop);
        assert!(matches!(
            table.compile(),
            Err(RoutingError::BadRouteDeclaration { .. })
        ));
        assert!(table.route("anything").is_none());
    }

    #[test]
    fn test_custom_pattern_matcher() {
        let mut table = RouteTable::new();
        table.add_pattern_matcher("year", "[0-9]{4}");
        table.get("/y/{y:year}", noop).name("year");
        assert_eq!(matched_name(&table, Method::GET, "/y/2024").as_deref(), Some("year"));
        assert!(matched_name(&table, Method::GET, "/y/24").is_none());
    }
}
