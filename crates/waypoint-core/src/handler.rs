//! Route handlers and their return values.
//!
//! A [`Handler`] receives the captured route variables as positional
//! [`RouteArgs`] plus the request, and produces a [`Reply`]. Any async
//! function or closure with the shape `Fn(RouteArgs, Request) -> impl Future`
//! whose output implements [`IntoReply`] is a handler.
//!
//! The dispatch strategy decides how a reply becomes a response.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::di::{ClassRegistry, Controller, Lookup, Resolver};
use crate::{BoxFuture, Params, Request, Response, RoutingError, RoutingResult};

/// Handles a matched request.
///
/// # Example
///
/// ```rust
/// use waypoint_core::{Handler, Request, RouteArgs};
///
/// async fn show(args: RouteArgs, _req: Request) -> String {
///     format!("post {}", args.get(0).unwrap_or("?"))
/// }
///
/// fn assert_handler<H: Handler>(_: H) {}
/// assert_handler(show);
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Invokes the handler.
    fn call(&self, args: RouteArgs, request: Request) -> BoxFuture<'static, Reply>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RouteArgs, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn call(&self, args: RouteArgs, request: Request) -> BoxFuture<'static, Reply> {
        let fut = self(args, request);
        Box::pin(async move { fut.await.into_reply() })
    }
}

/// What a handler produced, before the strategy turns it into a response.
#[derive(Debug)]
pub enum Reply {
    /// A finished response, passed through untouched.
    Response(Response),
    /// A JSON-serializable value.
    Json(serde_json::Value),
    /// A textual body.
    Text(String),
    /// Nothing.
    Empty,
    /// The handler failed.
    Failure(RoutingError),
}

/// Conversion into a [`Reply`].
pub trait IntoReply {
    /// Performs the conversion.
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply {
        Reply::Response(self)
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Reply {
        Reply::Json(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Text(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Text(self.to_string())
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Empty
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        self.map_or(Reply::Empty, IntoReply::into_reply)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<RoutingError>,
{
    fn into_reply(self) -> Reply {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Reply::Failure(err.into()),
        }
    }
}

impl From<anyhow::Error> for RoutingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Marks a serializable value as a JSON reply.
///
/// A value that fails to serialize produces an empty reply.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Reply {
        match serde_json::to_value(&self.0) {
            Ok(value) => Reply::Json(value),
            Err(err) => {
                tracing::debug!(error = %err, "handler value is not JSON-serializable");
                Reply::Empty
            }
        }
    }
}

/// Route variables handed to a handler, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    params: Params,
}

impl RouteArgs {
    /// Returns the variable at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.params.at(index)
    }

    /// Returns the variable named `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if the route captured nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the underlying named captures.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the values as an owned vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.params.values()
    }
}

impl From<Params> for RouteArgs {
    fn from(params: Params) -> Self {
        Self { params }
    }
}

/// A handler given either as a callable or as an alias resolved at dispatch.
///
/// Aliases of the form `"Controller::action"` resolve the controller and
/// ask it for the named action. Any other alias resolves a handler directly.
#[derive(Clone)]
pub enum HandlerRef {
    /// A ready-to-call handler.
    Callable(Arc<dyn Handler>),
    /// A name to resolve.
    Alias(String),
}

impl HandlerRef {
    /// Resolves this reference to a callable handler.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnresolvableHandler`] if the alias names
    /// nothing callable.
    pub fn resolve(
        &self,
        resolver: Option<&dyn Resolver>,
        classes: &ClassRegistry,
    ) -> RoutingResult<Arc<dyn Handler>> {
        match self {
            Self::Callable(handler) => Ok(Arc::clone(handler)),
            Self::Alias(alias) => {
                let resolved = match alias.split_once("::") {
                    Some((class, action)) => Lookup::Cascading
                        .resolve::<Arc<dyn Controller>>(class, resolver, classes)
                        .and_then(|controller| controller.action(action)),
                    None => Lookup::Cascading.resolve::<Arc<dyn Handler>>(alias, resolver, classes),
                };
                resolved.ok_or_else(|| RoutingError::unresolvable_handler(alias.clone()))
            }
        }
    }

    /// Returns the alias, if this reference is one.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Callable(_) => None,
            Self::Alias(alias) => Some(alias),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Alias(alias) => f.debug_tuple("Alias").field(alias).finish(),
        }
    }
}

impl<H: Handler> From<H> for HandlerRef {
    fn from(handler: H) -> Self {
        Self::Callable(Arc::new(handler))
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Self::Callable(handler)
    }
}

impl From<&str> for HandlerRef {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for HandlerRef {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}
