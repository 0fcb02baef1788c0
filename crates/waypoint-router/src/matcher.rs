//! Segment tree matcher.
//!
//! Routes are indexed per method. Fully literal paths live in a hash map;
//! everything else goes into a tree keyed by `/`-delimited segments:
//!
//! ```text
//!                  (root)
//!                    │
//!          ┌─────────┴─────────┐
//!        "post"             "files"
//!          │                   │
//!     ┌────┴─────┐       {path:.+} (tail)
//!   "new"   {id:[0-9]+}
//!                │
//!             (leaf)
//! ```
//!
//! At every node literal children are tried first (binary search), then
//! capture children and tails together, in the order their routes were
//! registered. A failed branch rolls back its captures and the search
//! backtracks.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use waypoint_core::{Params, RequestTarget, RoutingResult};

use crate::pattern::{literal_path, segments, RoutePattern, Segment, SegmentPattern};
use crate::patterns::PatternMatchers;
use crate::route::Route;

/// A successful match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route.
    pub route: Arc<Route>,
    /// Captured variables, in pattern order.
    pub params: Params,
}

/// Outcome of a lookup.
#[derive(Debug, Clone)]
pub enum MatchResult {
    /// A route accepted the request.
    Found(RouteMatch),
    /// No route accepts the path.
    NotFound,
    /// The path exists, but not for this method.
    MethodNotAllowed {
        /// Methods the path accepts, sorted.
        allowed: Vec<Method>,
    },
}

/// Compiled lookup structure over a fixed set of routes.
#[derive(Debug, Default)]
pub struct Matcher {
    routes: Vec<Arc<Route>>,
    methods: HashMap<Method, MethodTable>,
}

#[derive(Debug, Default)]
struct MethodTable {
    statics: HashMap<String, Vec<usize>>,
    tree: Node,
}

#[derive(Debug, Default)]
struct Node {
    literals: Vec<(String, Node)>,
    patterns: Vec<(SegmentPattern, Node)>,
    tails: Vec<(SegmentPattern, Vec<usize>)>,
    /// Capture edges in registration order.
    order: Vec<Edge>,
    routes: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Pattern(usize),
    Tail(usize),
}

impl Matcher {
    /// Compiles `routes`, substituting constraint aliases from `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`waypoint_core::RoutingError::BadRouteDeclaration`] for the
    /// first route whose pattern does not parse.
    pub fn build(routes: &[Arc<Route>], patterns: &PatternMatchers) -> RoutingResult<Self> {
        let mut methods: HashMap<Method, MethodTable> = HashMap::new();

        for (index, route) in routes.iter().enumerate() {
            let source = patterns.substitute(route.get_path());
            let pattern = RoutePattern::parse(&source)?;
            let table = methods.entry(route.get_method().clone()).or_default();

            for alternative in pattern.alternatives() {
                if let Some(path) = literal_path(alternative) {
                    table.statics.entry(path).or_default().push(index);
                } else {
                    let segments = segments(&source, alternative)?;
                    table.tree.insert(segments, index);
                }
            }
        }

        Ok(Self {
            routes: routes.to_vec(),
            methods,
        })
    }

    /// Returns the compiled routes.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Finds the route for `method` and `path`.
    ///
    /// `HEAD` falls back to `GET` routes. When nothing matches for the
    /// method, every other method is tried to tell `405` from `404`.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str, target: &RequestTarget) -> MatchResult {
        if let Some(found) = self.find(method, path, target) {
            return MatchResult::Found(found);
        }
        if method == Method::HEAD {
            if let Some(found) = self.find(&Method::GET, path, target) {
                return MatchResult::Found(found);
            }
        }

        let mut allowed: Vec<Method> = self
            .methods
            .keys()
            .filter(|m| *m != method && self.find(m, path, target).is_some())
            .cloned()
            .collect();
        if allowed.is_empty() {
            return MatchResult::NotFound;
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        MatchResult::MethodNotAllowed { allowed }
    }

    fn find(&self, method: &Method, path: &str, target: &RequestTarget) -> Option<RouteMatch> {
        let table = self.methods.get(method)?;
        let accept = |index: usize| {
            self.routes
                .get(index)
                .is_some_and(|route| route.matches_target(target))
        };

        if let Some(candidates) = table.statics.get(path) {
            if let Some(&index) = candidates.iter().find(|&&i| accept(i)) {
                return Some(self.found(index, Params::new()));
            }
        }

        let rest = path.strip_prefix('/')?;
        let mut params = Params::new();
        let index = table.tree.find(Some(rest), &mut params, &accept)?;
        Some(self.found(index, params))
    }

    fn found(&self, index: usize, params: Params) -> RouteMatch {
        RouteMatch {
            route: Arc::clone(&self.routes[index]),
            params,
        }
    }
}

impl Node {
    fn insert(&mut self, segments: Vec<Segment>, index: usize) {
        let mut node = self;
        for segment in segments {
            node = match segment {
                Segment::Literal(text) => {
                    let position = match node.literals.binary_search_by(|(s, _)| s.as_str().cmp(&text)) {
                        Ok(position) => position,
                        Err(position) => {
                            node.literals.insert(position, (text, Node::default()));
                            position
                        }
                    };
                    &mut node.literals[position].1
                }
                Segment::Pattern(pattern) => {
                    let position = match node.patterns.iter().position(|(p, _)| p.key() == pattern.key()) {
                        Some(position) => position,
                        None => {
                            node.patterns.push((pattern, Node::default()));
                            node.order.push(Edge::Pattern(node.patterns.len() - 1));
                            node.patterns.len() - 1
                        }
                    };
                    &mut node.patterns[position].1
                }
                Segment::Tail(pattern) => {
                    match node.tails.iter_mut().find(|(p, _)| p.key() == pattern.key()) {
                        Some((_, routes)) => routes.push(index),
                        None => {
                            node.tails.push((pattern, vec![index]));
                            node.order.push(Edge::Tail(node.tails.len() - 1));
                        }
                    }
                    return;
                }
            };
        }
        node.routes.push(index);
    }

    /// Searches below this node. `remaining` is the unconsumed path after a
    /// `/`, or `None` once every segment has been consumed.
    fn find(
        &self,
        remaining: Option<&str>,
        params: &mut Params,
        accept: &dyn Fn(usize) -> bool,
    ) -> Option<usize> {
        let Some(rest) = remaining else {
            return self.routes.iter().copied().find(|&i| accept(i));
        };
        let (segment, next) = match rest.split_once('/') {
            Some((segment, next)) => (segment, Some(next)),
            None => (rest, None),
        };

        if let Ok(position) = self
            .literals
            .binary_search_by(|(s, _)| s.as_str().cmp(segment))
        {
            if let Some(found) = self.literals[position].1.find(next, params, accept) {
                return Some(found);
            }
        }

        let mark = params.len();
        for edge in &self.order {
            let found = match *edge {
                Edge::Pattern(position) => {
                    let (pattern, child) = &self.patterns[position];
                    if pattern.capture(segment, params) {
                        child.find(next, params, accept)
                    } else {
                        None
                    }
                }
                Edge::Tail(position) => {
                    let (pattern, routes) = &self.tails[position];
                    if pattern.capture(rest, params) {
                        routes.iter().copied().find(|&i| accept(i))
                    } else {
                        None
                    }
                }
            };
            if found.is_some() {
                return found;
            }
            params.truncate(mark);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{Request, RouteArgs};

    async fn noop(_args: RouteArgs, _req: Request) {}

    fn route(method: Method, path: &str, name: &str) -> Arc<Route> {
        let mut route = Route::new(method, path, noop);
        route.name(name);
        Arc::new(route)
    }

    fn target() -> RequestTarget {
        RequestTarget {
            scheme: "http".to_string(),
            host: "example.com".to_string(),
            port: Some(80),
        }
    }

    fn matcher(routes: Vec<Arc<Route>>) -> Matcher {
        Matcher::build(&routes, &PatternMatchers::default()).unwrap()
    }

    fn found(matcher: &Matcher, method: Method, path: &str) -> Option<(String, Params)> {
        match matcher.lookup(&method, path, &target()) {
            MatchResult::Found(m) => Some((m.route.get_name().unwrap_or_default().to_string(), m.params)),
            _ => None,
        }
    }

    #[test]
    fn test_root_and_static() {
        let matcher = matcher(vec![
            route(Method::GET, "/", "home"),
            route(Method::GET, "/about", "about"),
        ]);
        assert_eq!(found(&matcher, Method::GET, "/").unwrap().0, "home");
        assert_eq!(found(&matcher, Method::GET, "/about").unwrap().0, "about");
        assert!(found(&matcher, Method::GET, "/about/").is_none());
    }

    #[test]
    fn test_literal_beats_capture() {
        let matcher = matcher(vec![
            route(Method::GET, "/post/{id}", "show"),
            route(Method::GET, "/post/new", "new"),
            route(Method::GET, "/post/new/{step}", "wizard"),
            route(Method::GET, "/post/{id}/{action}", "action"),
        ]);
        assert_eq!(found(&matcher, Method::GET, "/post/new").unwrap().0, "new");
        assert_eq!(found(&matcher, Method::GET, "/post/7").unwrap().0, "show");
        assert_eq!(found(&matcher, Method::GET, "/post/new/2").unwrap().0, "wizard");

        let (name, params) = found(&matcher, Method::GET, "/post/7/edit").unwrap();
        assert_eq!(name, "action");
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("action"), Some("edit"));
    }

    #[test]
    fn test_backtracking_rolls_back_params() {
        let matcher = matcher(vec![
            route(Method::GET, "/{a:[a-z]+}/x", "letters"),
            route(Method::GET, "/{b}/y", "any"),
        ]);
        let (name, params) = found(&matcher, Method::GET, "/abc/y").unwrap();
        assert_eq!(name, "any");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("b"), Some("abc"));
    }

    #[test]
    fn test_constraint_alias_and_optional_parts() {
        let matcher = matcher(vec![route(
            Method::GET,
            "/archive[/{year:number}[/{month:number}]]",
            "archive",
        )]);
        assert_eq!(found(&matcher, Method::GET, "/archive").unwrap().1.len(), 0);
        assert_eq!(found(&matcher, Method::GET, "/archive/2024").unwrap().1.len(), 1);
        let (_, params) = found(&matcher, Method::GET, "/archive/2024/05").unwrap();
        assert_eq!(params.values(), ["2024", "05"]);
        assert!(found(&matcher, Method::GET, "/archive/latest").is_none());
    }

    #[test]
    fn test_tail_capture() {
        let matcher = matcher(vec![route(Method::GET, "/files/{path:.+}", "files")]);
        let (_, params) = found(&matcher, Method::GET, "/files/a/b/c.txt").unwrap();
        assert_eq!(params.get("path"), Some("a/b/c.txt"));
        assert!(found(&matcher, Method::GET, "/files").is_none());
    }

    #[test]
    fn test_tail_and_capture_follow_registration_order() {
        let tail_first = matcher(vec![
            route(Method::GET, "/files/{path:.+}", "tail"),
            route(Method::GET, "/files/{name}", "name"),
        ]);
        let (name, params) = found(&tail_first, Method::GET, "/files/readme").unwrap();
        assert_eq!(name, "tail");
        assert_eq!(params.get("path"), Some("readme"));

        let capture_first = matcher(vec![
            route(Method::GET, "/files/{name}", "name"),
            route(Method::GET, "/files/{path:.+}", "tail"),
        ]);
        assert_eq!(found(&capture_first, Method::GET, "/files/readme").unwrap().0, "name");
        assert_eq!(found(&capture_first, Method::GET, "/files/a/b").unwrap().0, "tail");
    }

    #[test]
    fn test_tail_regex_with_suffix() {
        let matcher = matcher(vec![route(Method::GET, "/files/{path:.+\\.txt}", "text")]);
        let (_, params) = found(&matcher, Method::GET, "/files/a/b.txt").unwrap();
        assert_eq!(params.get("path"), Some("a/b.txt"));
        assert!(found(&matcher, Method::GET, "/files/a/b.png").is_none());
    }

    #[test]
    fn test_method_not_allowed_lists_sorted_methods() {
        let matcher = matcher(vec![
            route(Method::POST, "/posts", "create"),
            route(Method::GET, "/posts", "list"),
        ]);
        match matcher.lookup(&Method::DELETE, "/posts", &target()) {
            MatchResult::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::GET, Method::POST]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
        assert!(matches!(
            matcher.lookup(&Method::GET, "/nope", &target()),
            MatchResult::NotFound
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let matcher = matcher(vec![route(Method::GET, "/ping", "ping")]);
        assert_eq!(found(&matcher, Method::HEAD, "/ping").unwrap().0, "ping");
    }

    #[test]
    fn test_host_constraint_selects_route() {
        let mut api = Route::new(Method::GET, "/", noop);
        api.name("api").host("api.example.com");
        let matcher = matcher(vec![Arc::new(api), route(Method::GET, "/", "www")]);

        assert_eq!(found(&matcher, Method::GET, "/").unwrap().0, "www");

        let api_target = RequestTarget {
            host: "api.example.com".to_string(),
            ..target()
        };
        let MatchResult::Found(m) = matcher.lookup(&Method::GET, "/", &api_target) else {
            panic!("expected a match");
        };
        assert_eq!(m.route.get_name(), Some("api"));
    }

    #[test]
    fn test_bad_pattern_fails_build() {
        let routes = vec![route(Method::GET, "/a[/b]/c", "bad")];
        assert!(Matcher::build(&routes, &PatternMatchers::default()).is_err());
    }
}
