//! # Waypoint
//!
//! **An HTTP request router with middleware pipelines, pluggable dispatch
//! strategies and reverse URL generation.**
//!
//! - Route patterns with typed captures: `/post/{id:number}[/{slug}]`
//! - Literal segments always win over captures, with backtracking
//! - `405 Method Not Allowed` with `Allow`, `HEAD` served by `GET` routes
//! - Host, scheme and port constraints on routes and groups
//! - Onion middleware: global, then group, then route
//! - Application (HTML) and JSON dispatch strategies
//! - Named routes and URL generation that validates arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use waypoint::prelude::*;
//!
//! async fn show(args: RouteArgs, _req: Request) -> Json<serde_json::Value> {
//!     Json(serde_json::json!({ "id": args.named("id") }))
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RoutingError> {
//! let mut router = Router::new();
//! router.set_default_strategy(JsonStrategy::new());
//! router.group("/api", |api| {
//!     api.get("/post/{id:number}", show).name("post.show");
//! });
//!
//! let request = http::Request::get("/api/post/42").body(Default::default()).unwrap();
//! let response = router.handle_request(request).await?;
//! assert_eq!(response.status(), 200);
//! assert_eq!(router.url("post.show", &UrlArgs::new().arg(42), false)?, "/api/post/42");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → strip base prefix → match → global → group → route → strategy → handler
//!                                                                              ↓
//! Response ← global ← group ← route ← coerce reply ←───────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/waypoint/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod defaults;
mod matched;
mod router;
mod url_matcher;

pub use defaults::register_defaults;
pub use matched::MatchedRoute;
pub use router::Router;
pub use url_matcher::UrlMatcher;

// Re-export member crates
pub use waypoint_config as config;
pub use waypoint_core as core;
pub use waypoint_middleware as middleware;
pub use waypoint_router as routing;
pub use waypoint_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use waypoint::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{MatchedRoute, Router, UrlMatcher};

    pub use waypoint_core::{
        Container, Handler, HandlerRef, IntoReply, Json, Params, Reply, Request, Resolver,
        Response, ResponseExt, RouteArgs, RoutingError, RoutingResult,
    };

    pub use waypoint_middleware::{Middleware, MiddlewareAware, MiddlewareContext, Next};

    pub use waypoint_router::{
        middle, strategy_alias, ApplicationStrategy, DispatchStrategy, JsonStrategy, Route,
        RouteCollector, RouteGroup, UrlArgs,
    };
}
