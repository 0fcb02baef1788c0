//! Core middleware trait and the [`Next`] continuation.
//!
//! # Example
//!
//! ```
//! use waypoint_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "request timed");
//!             response
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::before_send::BeforeSendChain;
use crate::context::MiddlewareContext;
use waypoint_core::{BoxFuture, Request, Response};

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The middleware trait.
///
/// Middleware receives the mutable context, the request and a [`Next`]
/// continuation. Calling `next.run()` passes control inward; not calling it
/// short-circuits the rest of the pipeline, handler included.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;

    /// Runs when the response is about to be emitted.
    ///
    /// The default hands the response to the next queued middleware.
    /// Returning without calling [`BeforeSendChain::proceed`] stops the chain.
    fn before_send(&self, response: Response, chain: &mut BeforeSendChain) -> Response {
        chain.proceed(response)
    }
}

/// Continuation to the next middleware, or to the handler at the end.
///
/// Consumed by [`Next::run`], so it can run at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

type Terminal<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>;

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `middleware`, then continues with `next`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or the handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}
