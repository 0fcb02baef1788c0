//! The router: declaration, dispatch, sending and URL helpers.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};
use waypoint_config::{DefaultStrategy, RouterConfig};
use waypoint_core::{
    BoxFuture, ClassRegistry, Emitter, HandlerRef, Request, RequestTarget, Resolver, Response,
    ResponseExt, RouteArgs, RoutingError, RoutingResult,
};
use waypoint_middleware::{
    BeforeSendChain, BoxedMiddleware, MiddlewareAware, MiddlewareContext, MiddlewareStack,
    Pipeline,
};
use waypoint_router::{
    ApplicationStrategy, CompiledRoutes, DispatchStrategy, JsonStrategy, MatchResult, Route,
    RouteCollector, RouteGroup, RouteMatch, RouteTable, UrlArgs, UrlContext, UrlGenerator,
};
use waypoint_telemetry::{record_dispatch, DispatchOutcome};

use crate::defaults::define_default_classes;
use crate::matched::MatchedRoute;

/// The request and route recorded on an isolated copy of a router.
#[derive(Debug, Clone, Default)]
struct Current {
    target: Option<RequestTarget>,
    route: Option<Arc<Route>>,
}

/// An HTTP request router.
///
/// Routes and groups are declared during bootstrap through
/// [`RouteCollector`] and [`MiddlewareAware`] (the latter for global
/// middleware). Dispatch takes `&self` and never mutates the router, so a
/// bootstrapped router can be shared across concurrent requests. Per-request
/// state travels in the request extensions: the [`RequestTarget`] and, once
/// matched, the [`MatchedRoute`].
///
/// # Example
///
/// ```
/// use waypoint::prelude::*;
///
/// async fn show(args: RouteArgs, _req: Request) -> String {
///     format!("post {}", args.get(0).unwrap_or_default())
/// }
///
/// let mut router = Router::new();
/// router.get("/post/{id:number}", show).name("post.show");
///
/// let url = router.url("post.show", &UrlArgs::new().arg(7), false).unwrap();
/// assert_eq!(url, "/post/7");
/// ```
#[derive(Clone)]
pub struct Router {
    table: RouteTable,
    middleware: MiddlewareStack,
    resolver: Option<Arc<dyn Resolver>>,
    classes: ClassRegistry,
    fallback: Option<HandlerRef>,
    base_prefix: String,
    emitter: Option<Arc<dyn Emitter>>,
    current: Current,
}

impl Router {
    /// Creates a router with the application strategy and the built-in
    /// middleware and strategies defined as classes.
    #[must_use]
    pub fn new() -> Self {
        let mut classes = ClassRegistry::new();
        define_default_classes(&mut classes);
        Self {
            table: RouteTable::new(),
            middleware: MiddlewareStack::new(),
            resolver: None,
            classes,
            fallback: None,
            base_prefix: String::new(),
            emitter: None,
            current: Current::default(),
        }
    }

    /// Creates a router from loaded configuration.
    #[must_use]
    pub fn from_config(config: &RouterConfig) -> Self {
        let mut router = Self::new();
        router.set_base_prefix(&config.routing.base_prefix);
        match config.routing.default_strategy {
            DefaultStrategy::App => router.set_default_strategy(ApplicationStrategy::new()),
            DefaultStrategy::Json => router.set_default_strategy(JsonStrategy::new()),
        };
        router.table.set_options_routes(config.routing.options_routes);
        for (alias, regex) in &config.routing.patterns {
            router.table.add_pattern_matcher(alias.clone(), regex.clone());
        }
        router
    }

    /// Declares a group whose routes `builder` declares.
    pub fn group<F>(&mut self, prefix: &str, builder: F) -> &mut RouteGroup
    where
        F: Fn(&mut RouteGroup) + Send + Sync + 'static,
    {
        self.table.group(prefix, builder)
    }

    /// Returns the route table.
    #[must_use]
    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Returns the route table for direct declarations.
    pub fn table_mut(&mut self) -> &mut RouteTable {
        &mut self.table
    }

    /// Adds a constraint alias usable as `{name:alias}`.
    pub fn add_pattern_matcher(
        &mut self,
        alias: impl Into<String>,
        regex: impl Into<String>,
    ) -> &mut Self {
        self.table.add_pattern_matcher(alias, regex);
        self
    }

    /// Sets the strategy used by routes and groups without one.
    pub fn set_default_strategy(&mut self, strategy: impl DispatchStrategy) -> &mut Self {
        self.table.set_default_strategy(Arc::new(strategy));
        self
    }

    /// Sets the resolver handler, middleware and strategy aliases go through.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) -> &mut Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Returns the class registry, to define constructible aliases.
    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    /// Sets the handler answering requests no route matches.
    pub fn set_fallback(&mut self, fallback: impl Into<HandlerRef>) -> &mut Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Sets the emitter [`send_response`](Self::send_response) writes to.
    pub fn set_emitter(&mut self, emitter: impl Emitter + 'static) -> &mut Self {
        self.emitter = Some(Arc::new(emitter));
        self
    }

    /// Sets the prefix stripped from request paths and prepended to
    /// generated URLs. Normalized to `/x`, or empty.
    pub fn set_base_prefix(&mut self, prefix: &str) -> &mut Self {
        let trimmed = prefix.trim_matches('/');
        self.base_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    /// Returns the base prefix.
    #[must_use]
    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    /// Records `target` as the current request.
    ///
    /// The current request supplies scheme, host and port to absolute URLs
    /// built by [`url`](Self::url). Dispatch never sets it; a
    /// [`UrlMatcher`](crate::UrlMatcher) sets it on its own copy.
    pub fn set_current_request(&mut self, target: RequestTarget) -> &mut Self {
        self.current = Current {
            target: Some(target),
            route: None,
        };
        self
    }

    pub(crate) fn set_current_route(&mut self, route: Arc<Route>) {
        self.current.route = Some(route);
    }

    /// Returns the current route, as recorded by a
    /// [`UrlMatcher`](crate::UrlMatcher).
    ///
    /// During dispatch the matched route is in the request and response
    /// extensions as a [`MatchedRoute`].
    #[must_use]
    pub fn current_route(&self) -> Option<Arc<Route>> {
        self.current.route.clone()
    }

    /// Returns the name of [`current_route`](Self::current_route).
    #[must_use]
    pub fn current_route_name(&self) -> Option<String> {
        self.current_route()
            .and_then(|route| route.get_name().map(str::to_string))
    }

    /// Matches `request` without dispatching it.
    ///
    /// # Errors
    ///
    /// Fails if the route table does not compile.
    pub fn match_request(&self, request: &Request) -> RoutingResult<MatchResult> {
        let target = RequestTarget::from_request(request);
        match self.strip_base_prefix(request.uri().path()) {
            Some(path) => self.table.dispatch(request.method(), path, &target),
            None => Ok(MatchResult::NotFound),
        }
    }

    /// Dispatches `request` and returns the response.
    ///
    /// A matched route runs through global, group and route middleware
    /// around its strategy. A path known under other methods is answered
    /// with `405` by the default strategy. Anything else goes to the
    /// fallback.
    ///
    /// # Errors
    ///
    /// - [`RoutingError::BadRouteDeclaration`] if the table does not compile
    /// - an unresolvable middleware, handler, strategy or fallback
    /// - [`RoutingError::Dispatch`] when nothing matches and there is no
    ///   fallback
    pub async fn handle_request(&self, request: Request) -> RoutingResult<Response> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (outcome, result) = self.route_request(request).await;
        let outcome = match (&result, outcome) {
            (Err(_), DispatchOutcome::Matched | DispatchOutcome::Fallback) => DispatchOutcome::Error,
            (_, outcome) => outcome,
        };

        record_dispatch(outcome, started.elapsed());
        tracing::debug!(
            method = %method,
            path = %path,
            outcome = outcome.as_str(),
            elapsed_us = started.elapsed().as_micros(),
            "request dispatched"
        );
        result
    }

    async fn route_request(&self, mut request: Request) -> (DispatchOutcome, RoutingResult<Response>) {
        let target = RequestTarget::from_request(&request);
        request.extensions_mut().insert(target.clone());

        let compiled = match self.table.compile() {
            Ok(compiled) => compiled,
            Err(e) => return (DispatchOutcome::Error, Err(e)),
        };

        let method = request.method().clone();
        let Some(path) = self
            .strip_base_prefix(request.uri().path())
            .map(str::to_string)
        else {
            return self.not_found(&method, request.uri().path().to_string(), request).await;
        };

        match compiled.matcher().lookup(&method, &path, &target) {
            MatchResult::Found(found) => (
                DispatchOutcome::Matched,
                self.dispatch_route(&compiled, found, request).await,
            ),
            MatchResult::MethodNotAllowed { allowed } => {
                let allowed = allowed.iter().map(ToString::to_string).collect();
                let error = RoutingError::method_not_allowed(method.as_str(), path, allowed);
                tracing::debug!(error = %error, "method not allowed");
                let response = self.table.default_strategy().method_not_allowed(&error);
                (DispatchOutcome::MethodNotAllowed, Ok(response))
            }
            MatchResult::NotFound => self.not_found(&method, path, request).await,
        }
    }

    async fn dispatch_route(
        &self,
        compiled: &CompiledRoutes,
        found: RouteMatch,
        mut request: Request,
    ) -> RoutingResult<Response> {
        let RouteMatch { route, params } = found;
        let resolver = self.resolver.as_deref();

        let stages = self.resolve_stages(compiled, Some(&route))?;
        let handler = route.get_handler().resolve(resolver, &self.classes)?;
        let strategy = match route.get_strategy() {
            Some(strategy) => strategy.resolve(resolver, &self.classes)?,
            None => self.table.default_strategy(),
        };

        let matched = MatchedRoute::new(Arc::clone(&route), params.clone());
        request.extensions_mut().insert(matched.clone());

        tracing::debug!(
            route = route.get_name().unwrap_or(route.get_path()),
            strategy = strategy.name(),
            stages = stages.len(),
            "route matched"
        );

        let args = RouteArgs::from(params);
        let mut ctx = MiddlewareContext::new();
        ctx.set_extension(matched.clone());

        let mut response = Pipeline::new(stages)
            .process(
                &mut ctx,
                request,
                move |_ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, Response> {
                    Box::pin(async move { strategy.invoke(handler, args, request).await })
                },
            )
            .await;

        response.extensions_mut().insert(matched);
        Ok(response)
    }

    async fn not_found(
        &self,
        method: &Method,
        path: String,
        request: Request,
    ) -> (DispatchOutcome, RoutingResult<Response>) {
        let error = RoutingError::not_found(method.as_str(), path);
        match &self.fallback {
            Some(fallback) => (
                DispatchOutcome::Fallback,
                self.dispatch_fallback(fallback, request).await,
            ),
            None => {
                tracing::debug!(error = %error, "no route and no fallback");
                (DispatchOutcome::NotFound, Err(RoutingError::dispatch(error.to_string())))
            }
        }
    }

    async fn dispatch_fallback(
        &self,
        fallback: &HandlerRef,
        request: Request,
    ) -> RoutingResult<Response> {
        let handler = fallback
            .resolve(self.resolver.as_deref(), &self.classes)
            .map_err(|e| {
                tracing::warn!(fallback = ?fallback, "fallback did not resolve");
                RoutingError::unresolvable_fallback(e.to_string())
            })?;
        let stages = self.middleware.resolve(self.resolver.as_deref(), &self.classes)?;
        let strategy = self.table.default_strategy();

        let mut ctx = MiddlewareContext::new();
        let response = Pipeline::new(stages)
            .process(
                &mut ctx,
                request,
                move |_ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, Response> {
                    Box::pin(async move {
                        strategy.invoke(handler, RouteArgs::default(), request).await
                    })
                },
            )
            .await;
        Ok(response)
    }

    /// Runs the before-send hooks of the route that produced `response`,
    /// then hands it to the emitter.
    ///
    /// Returns `false` if the emitter failed or none is configured.
    ///
    /// # Errors
    ///
    /// Fails if a middleware alias does not resolve.
    pub fn send_response(&self, response: Response) -> RoutingResult<bool> {
        let response = self.prepare_response(response)?;
        match &self.emitter {
            Some(emitter) => Ok(emitter.emit(response)),
            None => {
                tracing::warn!("no emitter configured, response dropped");
                Ok(false)
            }
        }
    }

    /// Runs the before-send hooks: global, then group, then route middleware.
    ///
    /// The route is taken from the response's [`MatchedRoute`], else the
    /// current route. Without either, only global middleware runs.
    ///
    /// # Errors
    ///
    /// Fails if the table does not compile or an alias does not resolve.
    pub fn prepare_response(&self, response: Response) -> RoutingResult<Response> {
        let route = response
            .extensions()
            .get::<MatchedRoute>()
            .map(|matched| Arc::clone(matched.route()))
            .or_else(|| self.current_route());
        let compiled = self.table.compile()?;
        let stages = self.resolve_stages(&compiled, route.as_deref())?;
        Ok(BeforeSendChain::new(stages).proceed(response))
    }

    fn resolve_stages(
        &self,
        compiled: &CompiledRoutes,
        route: Option<&Route>,
    ) -> RoutingResult<Vec<BoxedMiddleware>> {
        let resolver = self.resolver.as_deref();
        let mut stages = self.middleware.resolve(resolver, &self.classes)?;
        let Some(route) = route else {
            return Ok(stages);
        };
        if let Some(group) = route.get_group() {
            for info in compiled.group_chain(group) {
                stages.extend(info.middleware().resolve(resolver, &self.classes)?);
            }
        }
        stages.extend(route.middleware_stack().resolve(resolver, &self.classes)?);
        Ok(stages)
    }

    /// Generates the URL of the route named `name`.
    ///
    /// Absolute URLs fall back to the current request for what the route
    /// leaves open. Inside a handler use [`request_url`](Self::request_url).
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidRouteUrl`] if the name is unknown or
    /// the arguments do not fit, and [`RoutingError::DuplicateRouteName`]
    /// if several routes share the name.
    pub fn url(&self, name: &str, args: &UrlArgs, absolute: bool) -> RoutingResult<String> {
        let route = self.named_route(name)?;
        self.generate(&route, args, absolute, self.current.target.as_ref())
    }

    /// Generates the URL of the route named `name` while handling `request`.
    ///
    /// Absolute URLs take scheme, host and port from `request` unless the
    /// route constrains them.
    ///
    /// # Errors
    ///
    /// As for [`url`](Self::url).
    pub fn request_url(
        &self,
        request: &Request,
        name: &str,
        args: &UrlArgs,
        absolute: bool,
    ) -> RoutingResult<String> {
        let route = self.named_route(name)?;
        let target = request
            .extensions()
            .get::<RequestTarget>()
            .cloned()
            .unwrap_or_else(|| RequestTarget::from_request(request));
        self.generate(&route, args, absolute, Some(&target))
    }

    /// Like [`url`](Self::url), but `None` on failure.
    #[must_use]
    pub fn named_route_url(&self, name: &str, args: &UrlArgs, absolute: bool) -> Option<String> {
        self.url(name, args, absolute)
            .map_err(|e| tracing::debug!(name, error = %e, "url generation failed"))
            .ok()
    }

    /// Generates the URL of `route`, or `None` on failure.
    #[must_use]
    pub fn route_url(&self, route: &Route, args: &UrlArgs, absolute: bool) -> Option<String> {
        self.generate(route, args, absolute, self.current.target.as_ref())
            .map_err(|e| tracing::debug!(path = route.get_path(), error = %e, "url generation failed"))
            .ok()
    }

    /// Redirects to the route named `name`, with `302` unless `status` is given.
    ///
    /// The `Location` header is empty when the URL cannot be generated.
    #[must_use]
    pub fn named_route_redirect(
        &self,
        name: &str,
        args: &UrlArgs,
        status: Option<StatusCode>,
    ) -> Response {
        redirect(self.named_route_url(name, args, false), status)
    }

    /// Redirects to `route`, with `302` unless `status` is given.
    #[must_use]
    pub fn route_redirect(&self, route: &Route, args: &UrlArgs, status: Option<StatusCode>) -> Response {
        redirect(self.route_url(route, args, false), status)
    }

    fn named_route(&self, name: &str) -> RoutingResult<Arc<Route>> {
        self.table
            .try_route(name)?
            .ok_or_else(|| RoutingError::invalid_url(name, "no route has this name"))
    }

    fn generate(
        &self,
        route: &Route,
        args: &UrlArgs,
        absolute: bool,
        target: Option<&RequestTarget>,
    ) -> RoutingResult<String> {
        let generator = UrlGenerator::new(self.table.url_patterns().clone(), self.base_prefix.clone());
        let context = UrlContext {
            scheme: route.get_scheme().map(str::to_string),
            host: route.get_host().map(str::to_string),
            port: route.get_port(),
            request: target.cloned(),
        };
        generator.generate(route.get_path(), args, absolute, &context)
    }

    fn strip_base_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.base_prefix.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base_prefix.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

fn redirect(location: Option<String>, status: Option<StatusCode>) -> Response {
    let mut response = Response::redirect(location.as_deref().unwrap_or_default());
    if let Some(status) = status {
        *response.status_mut() = status;
    }
    response
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .field("middleware", &self.middleware)
            .field("classes", &self.classes)
            .field("fallback", &self.fallback)
            .field("base_prefix", &self.base_prefix)
            .field("has_resolver", &self.resolver.is_some())
            .field("has_emitter", &self.emitter.is_some())
            .finish_non_exhaustive()
    }
}

impl RouteCollector for Router {
    fn map(&mut self, method: Method, path: &str, handler: impl Into<HandlerRef>) -> &mut Route {
        self.table.map(method, path, handler)
    }
}

impl MiddlewareAware for Router {
    fn middleware_stack(&self) -> &MiddlewareStack {
        &self.middleware
    }

    fn middleware_stack_mut(&mut self) -> &mut MiddlewareStack {
        &mut self.middleware
    }
}
