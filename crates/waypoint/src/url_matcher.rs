//! Matching without dispatching.

use std::sync::Arc;

use waypoint_core::{Request, RequestTarget, RoutingResult};
use waypoint_router::MatchResult;

use crate::matched::MatchedRoute;
use crate::router::Router;

/// Matches requests against an isolated copy of a [`Router`].
///
/// The copy's current request is its own: matching through a `UrlMatcher`
/// never changes what the original router reports.
///
/// # Example
///
/// ```
/// use waypoint::prelude::*;
/// use waypoint::{MatchedRoute, UrlMatcher};
///
/// async fn show(_args: RouteArgs, _req: Request) {}
///
/// let mut router = Router::new();
/// router.get("/post/{id}", show).name("post.show");
///
/// let mut matcher = UrlMatcher::new(&router);
/// let mut request = http::Request::get("/post/9").body(Default::default()).unwrap();
/// matcher.match_request(&mut request).unwrap();
///
/// let matched = request.extensions().get::<MatchedRoute>().unwrap();
/// assert_eq!(matched.name(), Some("post.show"));
/// assert_eq!(matched.params().get("id"), Some("9"));
/// ```
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    router: Router,
}

impl UrlMatcher {
    /// Creates a matcher over a clone of `router`.
    #[must_use]
    pub fn new(router: &Router) -> Self {
        Self {
            router: router.clone(),
        }
    }

    /// Matches `request` and records it as the current request.
    ///
    /// On a match, the request's extensions receive the [`MatchedRoute`]
    /// and the captured [`Params`](waypoint_core::Params).
    ///
    /// # Errors
    ///
    /// Fails if the route table does not compile.
    pub fn match_request(&mut self, request: &mut Request) -> RoutingResult<MatchResult> {
        let target = RequestTarget::from_request(request);
        request.extensions_mut().insert(target.clone());
        self.router.set_current_request(target);
        let result = self.router.match_request(request)?;
        if let MatchResult::Found(found) = &result {
            self.router.set_current_route(Arc::clone(&found.route));
            let matched = MatchedRoute::new(Arc::clone(&found.route), found.params.clone());
            request.extensions_mut().insert(found.params.clone());
            request.extensions_mut().insert(matched);
        }
        Ok(result)
    }

    /// Returns the isolated router.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}
