//! # Waypoint Middleware
//!
//! Middleware composition for the Waypoint request router.
//!
//! Middleware wraps a matched route's handler like an onion. The router
//! assembles one pipeline per request, outer to inner:
//!
//! ```text
//! Request → global → group (outermost ancestor first) → route → strategy/handler
//!                                                                   ↓
//! Response ← global ← group ← route ←───────────────────────────────┘
//! ```
//!
//! Each layer implements [`Middleware::process`] and may short-circuit by
//! returning a response without calling [`Next::run`].
//!
//! Middleware may also be declared by alias ([`MiddlewareRef::Alias`]) and
//! resolved when the pipeline is built. Resolution consults the configured
//! [`Resolver`](waypoint_core::Resolver) only; without one, the
//! [`ClassRegistry`](waypoint_core::ClassRegistry) constructs the alias.
//!
//! A separate [`Middleware::before_send`] hook runs when the response is
//! handed to the emitter, driven by a [`BeforeSendChain`].
//!
//! ## Example
//!
//! ```
//! use waypoint_middleware::{MiddlewareAware, MiddlewareStack};
//! use waypoint_middleware::stages::XhrMiddleware;
//!
//! let mut stack = MiddlewareStack::new();
//! stack.middleware(XhrMiddleware::new()).lazy_middleware("routing.middleware.audit");
//! assert_eq!(stack.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/waypoint-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod before_send;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stack;
pub mod stages;

pub use before_send::BeforeSendChain;
pub use context::MiddlewareContext;
pub use middleware::{BoxedMiddleware, Middleware, Next};
pub use pipeline::Pipeline;
pub use stack::{MiddlewareAware, MiddlewareRef, MiddlewareStack};
pub use waypoint_core::{BoxFuture, Request, Response, ResponseExt};
