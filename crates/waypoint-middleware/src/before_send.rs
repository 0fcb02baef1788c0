//! The before-send hook chain.
//!
//! When the router sends a response it queues the dispatched route's
//! middleware (global, then group, then route) and shifts one entry off the
//! front per [`BeforeSendChain::proceed`]. Each middleware's
//! [`Middleware::before_send`](crate::Middleware::before_send) decides
//! whether the chain continues; the default implementation proceeds.

use std::collections::VecDeque;
use std::fmt;

use crate::middleware::BoxedMiddleware;
use waypoint_core::Response;

/// A queue of middleware whose before-send hooks have yet to run.
#[derive(Default)]
pub struct BeforeSendChain {
    queue: VecDeque<BoxedMiddleware>,
}

impl BeforeSendChain {
    /// Creates a chain over `middleware`, first entry first.
    pub fn new(middleware: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self {
            queue: middleware.into_iter().collect(),
        }
    }

    /// Queues another middleware at the back.
    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.queue.push_back(middleware);
    }

    /// Shifts the next middleware and runs its hook.
    ///
    /// Returns `response` untouched when the queue is empty.
    pub fn proceed(&mut self, response: Response) -> Response {
        match self.queue.pop_front() {
            Some(middleware) => {
                tracing::trace!(middleware = middleware.name(), "running before-send hook");
                middleware.before_send(response, self)
            }
            None => response,
        }
    }

    /// Runs hooks until the queue is empty, whether or not they proceed.
    pub fn drain(&mut self, mut response: Response) -> Response {
        while !self.queue.is_empty() {
            response = self.proceed(response);
        }
        response
    }

    /// Returns the number of queued hooks.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Debug for BeforeSendChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.queue.iter().map(|m| m.name()).collect();
        f.debug_struct("BeforeSendChain").field("queue", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MiddlewareContext;
    use crate::middleware::{Middleware, Next};
    use http::HeaderValue;
    use std::sync::Arc;
    use waypoint_core::{BoxFuture, Request, ResponseExt};

    /// Appends its tag to `x-trail`; optionally stops the chain.
    struct Tag {
        tag: &'static str,
        stop: bool,
    }

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.tag
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(next.run(ctx, request))
        }

        fn before_send(&self, mut response: Response, chain: &mut BeforeSendChain) -> Response {
            let trail = response
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .map_or_else(|| self.tag.to_string(), |t| format!("{t},{}", self.tag));
            response
                .headers_mut()
                .insert("x-trail", HeaderValue::from_str(&trail).unwrap());
            if self.stop {
                response
            } else {
                chain.proceed(response)
            }
        }
    }

    struct Silent;

    impl Middleware for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(next.run(ctx, request))
        }
    }

    fn tag(tag: &'static str, stop: bool) -> BoxedMiddleware {
        Arc::new(Tag { tag, stop })
    }

    fn trail(response: &Response) -> &str {
        response.headers().get("x-trail").unwrap().to_str().unwrap()
    }

    #[test]
    fn test_hooks_run_front_to_back() {
        let mut chain = BeforeSendChain::new([tag("global", false), tag("route", false)]);
        let response = chain.proceed(Response::empty());
        assert_eq!(trail(&response), "global,route");
        assert_eq!(chain.remaining(), 0);
    }

    #[test]
    fn test_default_hook_passes_through() {
        let mut chain = BeforeSendChain::new([Arc::new(Silent) as BoxedMiddleware, tag("route", false)]);
        let response = chain.proceed(Response::empty());
        assert_eq!(trail(&response), "route");
    }

    #[test]
    fn test_stopping_hook_leaves_rest_queued() {
        let mut chain = BeforeSendChain::new([tag("a", true), tag("b", false)]);
        let response = chain.proceed(Response::empty());
        assert_eq!(trail(&response), "a");
        assert_eq!(chain.remaining(), 1);

        let response = chain.drain(response);
        assert_eq!(trail(&response), "a,b");
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let mut chain = BeforeSendChain::default();
        let response = chain.proceed(Response::redirect("/x"));
        assert_eq!(response.status(), http::StatusCode::FOUND);
    }
}
