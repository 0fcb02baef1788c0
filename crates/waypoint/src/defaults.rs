//! Built-in services addressed by alias.

use std::sync::Arc;

use waypoint_core::{ClassRegistry, Container};
use waypoint_middleware::stages::XhrMiddleware;
use waypoint_middleware::BoxedMiddleware;
use waypoint_router::{
    middleware_alias, ApplicationStrategy, DispatchStrategy, JsonStrategy, STRATEGY_ALIAS_PREFIX,
};

/// Registers the `xhr` middleware and the `app` and `json` strategies.
///
/// Aliases are `routing.middleware.xhr`, `routing.strategy.app` and
/// `routing.strategy.json`. Needed once a resolver is configured, since
/// middleware aliases then resolve through it alone.
///
/// ```
/// use waypoint::register_defaults;
/// use waypoint_core::{Container, Resolver};
///
/// let mut container = Container::new();
/// register_defaults(&mut container);
/// assert!(container.has("routing.middleware.xhr"));
/// assert!(container.has("routing.strategy.json"));
/// ```
pub fn register_defaults(container: &mut Container) {
    container.insert(middleware_alias("xhr"), xhr());
    container.insert(format!("{STRATEGY_ALIAS_PREFIX}app"), app());
    container.insert(format!("{STRATEGY_ALIAS_PREFIX}json"), json());
}

pub(crate) fn define_default_classes(classes: &mut ClassRegistry) {
    classes.define(middleware_alias("xhr"), xhr);
    classes.define(format!("{STRATEGY_ALIAS_PREFIX}app"), app);
    classes.define(format!("{STRATEGY_ALIAS_PREFIX}json"), json);
}

fn xhr() -> BoxedMiddleware {
    Arc::new(XhrMiddleware::new())
}

fn app() -> Arc<dyn DispatchStrategy> {
    Arc::new(ApplicationStrategy::new())
}

fn json() -> Arc<dyn DispatchStrategy> {
    Arc::new(JsonStrategy::new())
}
