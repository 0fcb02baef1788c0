//! Ordered middleware declarations on routers, groups and routes.
//!
//! A [`MiddlewareStack`] holds [`MiddlewareRef`]s: ready instances or
//! aliases to resolve when a pipeline is built. The [`MiddlewareAware`]
//! trait gives anything that owns a stack the chaining helpers used at
//! declaration time.

use std::fmt;
use std::sync::Arc;

use crate::middleware::{BoxedMiddleware, Middleware};
use waypoint_core::{ClassRegistry, Lookup, Resolver, RoutingError, RoutingResult};

/// A middleware instance, or an alias resolved at pipeline-build time.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// A ready middleware.
    Instance(BoxedMiddleware),
    /// An alias resolved through the resolver or the class registry.
    Alias(String),
}

impl MiddlewareRef {
    /// Resolves this reference.
    ///
    /// With a resolver configured, only the resolver is consulted. Without
    /// one, the alias is constructed from the class registry.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnresolvableMiddleware`] when the alias
    /// resolves to nothing.
    pub fn resolve(
        &self,
        resolver: Option<&dyn Resolver>,
        classes: &ClassRegistry,
    ) -> RoutingResult<BoxedMiddleware> {
        match self {
            Self::Instance(middleware) => Ok(Arc::clone(middleware)),
            Self::Alias(alias) => Lookup::Exclusive
                .resolve::<BoxedMiddleware>(alias, resolver, classes)
                .ok_or_else(|| {
                    tracing::warn!(alias = %alias, "middleware alias did not resolve");
                    RoutingError::unresolvable_middleware(alias.clone())
                }),
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(middleware) => f.debug_tuple("Instance").field(&middleware.name()).finish(),
            Self::Alias(alias) => f.debug_tuple("Alias").field(alias).finish(),
        }
    }
}

impl<M: Middleware> From<M> for MiddlewareRef {
    fn from(middleware: M) -> Self {
        Self::Instance(Arc::new(middleware))
    }
}

impl From<BoxedMiddleware> for MiddlewareRef {
    fn from(middleware: BoxedMiddleware) -> Self {
        Self::Instance(middleware)
    }
}

impl From<&str> for MiddlewareRef {
    fn from(alias: &str) -> Self {
        Self::Alias(alias.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(alias: String) -> Self {
        Self::Alias(alias)
    }
}

/// An ordered list of middleware declarations, outermost first.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareStack {
    entries: Vec<MiddlewareRef>,
}

impl MiddlewareStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the declarations in order.
    #[must_use]
    pub fn entries(&self) -> &[MiddlewareRef] {
        &self.entries
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every declaration, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first alias that does not resolve.
    pub fn resolve(
        &self,
        resolver: Option<&dyn Resolver>,
        classes: &ClassRegistry,
    ) -> RoutingResult<Vec<BoxedMiddleware>> {
        self.entries
            .iter()
            .map(|entry| entry.resolve(resolver, classes))
            .collect()
    }
}

impl MiddlewareAware for MiddlewareStack {
    fn middleware_stack(&self) -> &MiddlewareStack {
        self
    }

    fn middleware_stack_mut(&mut self) -> &mut MiddlewareStack {
        self
    }
}

/// Declaration helpers for anything owning a [`MiddlewareStack`].
pub trait MiddlewareAware {
    /// Returns the stack.
    fn middleware_stack(&self) -> &MiddlewareStack;

    /// Returns the stack mutably.
    fn middleware_stack_mut(&mut self) -> &mut MiddlewareStack;

    /// Appends a middleware (instance or alias) as the innermost layer.
    fn middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.middleware_stack_mut().entries.push(middleware.into());
        self
    }

    /// Appends several middleware, in order.
    fn middlewares<I>(&mut self, middlewares: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareRef>,
    {
        self.middleware_stack_mut()
            .entries
            .extend(middlewares.into_iter().map(Into::into));
        self
    }

    /// Inserts a middleware as the outermost layer.
    fn prepend_middleware(&mut self, middleware: impl Into<MiddlewareRef>) -> &mut Self {
        self.middleware_stack_mut()
            .entries
            .insert(0, middleware.into());
        self
    }

    /// Appends an alias to resolve when the pipeline is built.
    fn lazy_middleware(&mut self, alias: impl Into<String>) -> &mut Self {
        self.middleware_stack_mut()
            .entries
            .push(MiddlewareRef::Alias(alias.into()));
        self
    }

    /// Appends several aliases, in order.
    fn lazy_middlewares<I>(&mut self, aliases: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.middleware_stack_mut()
            .entries
            .extend(aliases.into_iter().map(|a| MiddlewareRef::Alias(a.into())));
        self
    }

    /// Inserts an alias as the outermost layer.
    fn lazy_prepend_middleware(&mut self, alias: impl Into<String>) -> &mut Self {
        self.middleware_stack_mut()
            .entries
            .insert(0, MiddlewareRef::Alias(alias.into()));
        self
    }

    /// Removes and returns the outermost declaration.
    fn shift_middleware(&mut self) -> Option<MiddlewareRef> {
        let entries = &mut self.middleware_stack_mut().entries;
        if entries.is_empty() {
            None
        } else {
            Some(entries.remove(0))
        }
    }
}
