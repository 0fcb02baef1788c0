//! Per-request middleware pipeline.
//!
//! The router assembles a [`Pipeline`] once a route is matched and its
//! middleware references are resolved. Stages run in the order given, the
//! first stage being the outermost layer of the onion.

use std::fmt;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxedMiddleware, Next};
use waypoint_core::{BoxFuture, Request, Response};

/// An ordered, resolved list of middleware around a terminal handler.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use waypoint_middleware::Pipeline;
/// use waypoint_middleware::stages::XhrMiddleware;
///
/// let pipeline = Pipeline::new(vec![Arc::new(XhrMiddleware::new())]);
/// assert_eq!(pipeline.stage_names(), vec!["xhr"]);
/// ```
#[derive(Default, Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a pipeline from resolved stages, outermost first.
    #[must_use]
    pub fn new(stages: Vec<BoxedMiddleware>) -> Self {
        Self { stages }
    }

    /// Appends stages as the new innermost layers.
    pub fn extend(&mut self, stages: impl IntoIterator<Item = BoxedMiddleware>) {
        self.stages.extend(stages);
    }

    /// Runs `request` through every stage and finally `handler`.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the resolved stages, outermost first.
    #[must_use]
    pub fn stages(&self) -> &[BoxedMiddleware] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
