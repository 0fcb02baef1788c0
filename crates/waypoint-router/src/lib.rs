//! # Waypoint Router
//!
//! Route declaration, matching and reverse routing for Waypoint.
//!
//! # Features
//!
//! - **Patterns**: `{name}`, `{name:regex}`, constraint aliases
//!   (`{id:number}`) and optional trailing parts (`/archive[/{year}]`)
//! - **Groups**: shared prefixes, middleware and host/scheme/port
//!   constraints, declared by builder callbacks
//! - **Segment tree matching**: literal segments beat captures, captures
//!   are tried in registration order, `405` is told apart from `404`
//! - **Strategies**: [`ApplicationStrategy`] and [`JsonStrategy`] turn
//!   handler replies into responses
//! - **Reverse routing**: [`UrlGenerator`] fills patterns back in
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use waypoint_core::{Request, RequestTarget, RouteArgs};
//! use waypoint_router::{MatchResult, RouteCollector, RouteTable};
//!
//! async fn show(_args: RouteArgs, _req: Request) -> &'static str {
//!     "post"
//! }
//!
//! let mut table = RouteTable::new();
//! table.get("/post/{id:number}", show).name("post.show");
//! table.group("/admin", |admin| {
//!     admin.get("/", show).name("admin.home");
//! });
//!
//! let target = RequestTarget {
//!     scheme: "http".into(),
//!     host: "example.com".into(),
//!     port: Some(80),
//! };
//! let MatchResult::Found(found) = table.dispatch(&Method::GET, "/post/42", &target).unwrap() else {
//!     panic!("no match");
//! };
//! assert_eq!(found.route.get_name(), Some("post.show"));
//! assert_eq!(found.params.get("id"), Some("42"));
//! ```
//!
//! # Architecture
//!
//! Declarations live in a [`RouteTable`]. The first lookup compiles them
//! into [`CompiledRoutes`]: groups are expanded, constraints inherited and
//! a per-method [`Matcher`] built. The compiled form is shared behind an
//! `Arc` until the table changes.

#![doc(html_root_url = "https://docs.rs/waypoint-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod collector;
mod generator;
mod group;
mod matcher;
pub mod pattern;
mod patterns;
mod route;
mod strategy;
mod table;

pub use collector::{
    middle, middleware_alias, strategy_alias, RouteCollector, MIDDLEWARE_ALIAS_PREFIX,
    STRATEGY_ALIAS_PREFIX,
};
pub use generator::{UrlArgs, UrlContext, UrlGenerator};
pub use group::{GroupBuilder, RouteGroup};
pub use matcher::{MatchResult, Matcher, RouteMatch};
pub use patterns::PatternMatchers;
pub use route::{GroupId, Route};
pub use strategy::{
    ApplicationStrategy, DispatchStrategy, JsonStrategy, StrategyRef, ACCESS_CONTROL_ALLOW_METHODS,
};
pub use table::{CompiledRoutes, GroupInfo, RouteTable};
