//! The route a request was dispatched to.

use std::sync::Arc;

use waypoint_core::Params;
use waypoint_router::Route;

/// A matched route and the variables captured from the path.
///
/// The router stores one in the extensions of every request it dispatches
/// and of every response produced by a matched route.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    route: Arc<Route>,
    params: Params,
}

impl MatchedRoute {
    /// Creates a matched route.
    #[must_use]
    pub fn new(route: Arc<Route>, params: Params) -> Self {
        Self { route, params }
    }

    /// Returns the route.
    #[must_use]
    pub const fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Returns the route name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.route.get_name()
    }

    /// Returns the captured variables in declaration order.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }
}
