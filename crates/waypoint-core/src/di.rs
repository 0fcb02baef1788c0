//! Alias resolution.
//!
//! Handlers, middleware, strategies and fallbacks may be declared by alias
//! instead of by instance. Aliases are resolved at dispatch time through two
//! optional capabilities:
//!
//! - a [`Resolver`] (usually a [`Container`]) answering `has`/`get` by alias
//! - a [`ClassRegistry`] that can construct an instance from a class name
//!
//! Services are stored type-erased. A service registered as
//! `Arc<dyn Middleware>` is resolved back by asking for that same type.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waypoint_core::di::{Container, Resolver};
//!
//! let mut container = Container::new();
//! container.insert("greeting", String::from("hello"));
//!
//! assert!(container.has("greeting"));
//! let value: Option<String> = container.resolve("greeting");
//! assert_eq!(value.as_deref(), Some("hello"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::Handler;

/// A type-erased service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn() -> Service + Send + Sync>;

/// Resolves services by alias.
pub trait Resolver: Send + Sync {
    /// Returns true if `alias` is known.
    fn has(&self, alias: &str) -> bool;

    /// Returns the service registered under `alias`.
    fn get(&self, alias: &str) -> Option<Service>;
}

impl dyn Resolver {
    /// Resolves `alias` and downcasts it to `T`.
    #[must_use]
    pub fn resolve<T: Any + Clone>(&self, alias: &str) -> Option<T> {
        self.get(alias)
            .and_then(|service| service.downcast_ref::<T>().cloned())
    }
}

/// A controller exposing named actions, addressed as `"Controller::action"`.
pub trait Controller: Send + Sync + 'static {
    /// Returns the handler for `action`, if the controller has one.
    fn action(&self, action: &str) -> Option<Arc<dyn Handler>>;
}

enum Entry {
    Shared(Service),
    Factory(Factory),
}

/// An alias-keyed service container.
///
/// Entries are either shared instances, returned as-is on every lookup,
/// or factories invoked on each lookup.
#[derive(Default)]
pub struct Container {
    entries: HashMap<String, Entry>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared instance under `alias`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, alias: impl Into<String>, service: T) {
        self.entries
            .insert(alias.into(), Entry::Shared(Arc::new(service)));
    }

    /// Registers a factory under `alias`, invoked on every lookup.
    pub fn factory<T, F>(&mut self, alias: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Arc::new(factory()) as Service);
        self.entries.insert(alias.into(), Entry::Factory(factory));
    }

    /// Resolves `alias` and downcasts it to `T`.
    #[must_use]
    pub fn resolve<T: Any + Clone>(&self, alias: &str) -> Option<T> {
        self.get(alias)
            .and_then(|service| service.downcast_ref::<T>().cloned())
    }

    /// Returns the number of registered aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Resolver for Container {
    fn has(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn get(&self, alias: &str) -> Option<Service> {
        self.entries.get(alias).map(|entry| match entry {
            Entry::Shared(service) => Arc::clone(service),
            Entry::Factory(factory) => factory(),
        })
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<_> = self.entries.keys().collect();
        aliases.sort();
        f.debug_struct("Container").field("aliases", &aliases).finish()
    }
}

/// Constructors addressable by class name.
///
/// Used when an alias is not (or cannot be) served by a [`Resolver`].
#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, Factory>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines the class `name`.
    pub fn define<T, F>(&mut self, name: impl Into<String>, constructor: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Arc::new(constructor()) as Service);
        self.classes.insert(name.into(), factory);
    }

    /// Returns true if the class `name` exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Constructs a new instance of `name`.
    #[must_use]
    pub fn instantiate(&self, name: &str) -> Option<Service> {
        self.classes.get(name).map(|constructor| constructor())
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.classes.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}

/// How an alias is looked up across a resolver and a class registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// With a resolver, only the resolver is consulted.
    /// Without one, the class registry is.
    Exclusive,
    /// The resolver is consulted first, then the class registry.
    Cascading,
}

impl Lookup {
    /// Looks up `alias` and downcasts the result to `T`.
    #[must_use]
    pub fn resolve<T: Any + Clone>(
        self,
        alias: &str,
        resolver: Option<&dyn Resolver>,
        classes: &ClassRegistry,
    ) -> Option<T> {
        let service = match (self, resolver) {
            (Self::Exclusive, Some(resolver)) => {
                if resolver.has(alias) {
                    resolver.get(alias)
                } else {
                    None
                }
            }
            (Self::Cascading, Some(resolver)) if resolver.has(alias) => resolver.get(alias),
            (_, _) => classes.instantiate(alias),
        };
        service.and_then(|service| service.downcast_ref::<T>().cloned())
    }
}
