//! End-to-end dispatch through the router.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use tokio::sync::Notify;
use waypoint::prelude::*;
use waypoint::{register_defaults, MatchedRoute};
use waypoint_config::ConfigLoader;
use waypoint_core::{BoxFuture, Controller};
use waypoint_middleware::BeforeSendChain;

type Log = Arc<Mutex<Vec<String>>>;

struct Trace {
    tag: &'static str,
    log: Log,
}

impl Middleware for Trace {
    fn name(&self) -> &'static str {
        self.tag
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.log.lock().push(format!("{}>", self.tag));
            let response = next.run(ctx, request).await;
            self.log.lock().push(format!("{}<", self.tag));
            response
        })
    }

    fn before_send(&self, response: Response, chain: &mut BeforeSendChain) -> Response {
        self.log.lock().push(format!("send:{}", self.tag));
        chain.proceed(response)
    }
}

fn trace(tag: &'static str, log: &Log) -> Trace {
    Trace {
        tag,
        log: Arc::clone(log),
    }
}

fn request(method: &str, uri: &str) -> Request {
    request_to("example.com", method, uri)
}

fn request_to(host: &str, method: &str, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("host", host)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

async fn body(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn ok(_args: RouteArgs, _req: Request) -> &'static str {
    "ok"
}

async fn echo(args: RouteArgs, _req: Request) -> String {
    args.into_vec().join(",")
}

#[tokio::test]
async fn test_middleware_wraps_handler_in_onion_order() {
    let log: Log = Arc::default();
    let mut router = Router::new();
    router.middleware(trace("G", &log));

    let group_log = Arc::clone(&log);
    router
        .group("/admin", move |admin| {
            let handler_log = Arc::clone(&group_log);
            admin
                .get("/users", move |_args: RouteArgs, _req: Request| {
                    let log = Arc::clone(&handler_log);
                    async move {
                        log.lock().push("handler".to_string());
                        "users"
                    }
                })
                .middleware(trace("R", &group_log));
        })
        .middleware(trace("M", &log));

    let response = router.handle_request(request("GET", "/admin/users")).await.unwrap();
    assert_eq!(body(response).await, "users");
    assert_eq!(
        *log.lock(),
        ["G>", "M>", "R>", "handler", "R<", "M<", "G<"]
    );
}

#[tokio::test]
async fn test_nested_group_middleware_runs_outermost_first() {
    let log: Log = Arc::default();
    let mut router = Router::new();

    let inner_log = Arc::clone(&log);
    router
        .group("/a", move |outer| {
            let log = Arc::clone(&inner_log);
            outer
                .group("/b", move |inner| {
                    inner.get("/c", ok);
                })
                .middleware(trace("inner", &log));
        })
        .middleware(trace("outer", &log));

    router.handle_request(request("GET", "/a/b/c")).await.unwrap();
    assert_eq!(*log.lock(), ["outer>", "inner>", "inner<", "outer<"]);
}

#[tokio::test]
async fn test_group_prefix_composition() {
    let mut router = Router::new();
    router.group("/api", |api| {
        api.get("/", ok).name("api.index");
        api.get("/users", ok).name("api.users");
    });

    for path in ["/api", "/api/users"] {
        let response = router.handle_request(request("GET", path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    assert!(router.handle_request(request("GET", "/api/")).await.is_err());
}

#[tokio::test]
async fn test_captures_bind_positionally() {
    let mut router = Router::new();
    router.get("/archive/{year:number}/{month:number}/{slug}", echo);

    let response = router
        .handle_request(request("GET", "/archive/2024/05/hello-world"))
        .await
        .unwrap();
    assert_eq!(body(response).await, "2024,05,hello-world");
}

#[tokio::test]
async fn test_method_not_allowed_lists_methods() {
    let mut router = Router::new();
    router.get("/items", ok);
    router.post("/items", ok);

    let response = router.handle_request(request("DELETE", "/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET, POST");
}

#[tokio::test]
async fn test_head_served_by_get_route() {
    let mut router = Router::new();
    router.get("/page", ok);

    let response = router.handle_request(request("HEAD", "/page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_not_found_without_fallback_is_dispatch_error() {
    let router = Router::new();
    let err = router
        .handle_request(request("GET", "/missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, RoutingError::Dispatch { .. }));
    assert!(err.to_string().contains("/missing"));
}

#[tokio::test]
async fn test_fallback_answers_unmatched_requests() {
    let mut router = Router::new();
    router.set_fallback(|_args: RouteArgs, _req: Request| async { "fallback" });

    let response = router.handle_request(request("GET", "/missing")).await.unwrap();
    assert_eq!(body(response).await, "fallback");
}

#[tokio::test]
async fn test_unresolvable_fallback() {
    let mut router = Router::new();
    router.set_fallback("NoSuchHandler");

    let err = router
        .handle_request(request("GET", "/missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoutingError::UnresolvableFallback { .. }));
}

struct Posts;

impl Controller for Posts {
    fn action(&self, action: &str) -> Option<Arc<dyn Handler>> {
        match action {
            "show" => Some(Arc::new(|args: RouteArgs, _req: Request| async move {
                format!("post {}", args.named("id").unwrap_or_default())
            })),
            _ => None,
        }
    }
}

#[tokio::test]
async fn test_controller_action_through_resolver() {
    let mut container = Container::new();
    register_defaults(&mut container);
    container.insert("Posts", Arc::new(Posts) as Arc<dyn Controller>);

    let mut router = Router::new();
    router.set_resolver(container);
    router.get("/post/{id}", "Posts::show");
    router.get("/broken", "Posts::missing");

    let response = router.handle_request(request("GET", "/post/5")).await.unwrap();
    assert_eq!(body(response).await, "post 5");

    let err = router.handle_request(request("GET", "/broken")).await.unwrap_err();
    assert!(matches!(err, RoutingError::UnresolvableHandler { .. }));
}

#[tokio::test]
async fn test_unresolvable_middleware_alias() {
    let mut router = Router::new();
    router.get("/guarded", ok).middleware(middle("auth"));

    let err = router
        .handle_request(request("GET", "/guarded"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoutingError::UnresolvableMiddleware { ref alias } if alias == "routing.middleware.auth"));
}

#[tokio::test]
async fn test_xhr_route_requires_header() {
    let mut router = Router::new();
    router.xhr("/form", ok);

    let response = router.handle_request(request("POST", "/form")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut xhr = request("POST", "/form");
    xhr.headers_mut()
        .insert("x-requested-with", "XMLHttpRequest".parse().unwrap());
    let response = router.handle_request(xhr).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_json_strategy_answers_options() {
    let mut router = Router::new();
    router.set_default_strategy(JsonStrategy::new());
    router.get("/items", |_args: RouteArgs, _req: Request| async {
        Json(serde_json::json!({ "items": [] }))
    });
    router.post("/items", ok);

    let response = router.handle_request(request("OPTIONS", "/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["allow"], "GET, POST");
    assert_eq!(response.headers()["access-control-allow-methods"], "GET, POST");

    let response = router.handle_request(request("POST", "/items")).await.unwrap();
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(body(response).await, "\"ok\"");
}

#[tokio::test]
async fn test_route_strategy_overrides_default() {
    let mut router = Router::new();
    router.get("/page", ok);
    router.get("/api/page", ok).strategy(strategy_alias("json"));

    let html = router.handle_request(request("GET", "/page")).await.unwrap();
    assert_eq!(html.headers()["content-type"], "text/html; charset=utf-8");

    let json = router.handle_request(request("GET", "/api/page")).await.unwrap();
    assert_eq!(json.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn test_base_prefix_is_stripped_and_prepended() {
    let mut router = Router::new();
    router.set_base_prefix("/app/");
    router.get("/post/{id:number}", echo).name("post.show");

    let response = router.handle_request(request("GET", "/app/post/12")).await.unwrap();
    assert_eq!(body(response).await, "12");
    assert!(router.handle_request(request("GET", "/post/12")).await.is_err());

    let url = router
        .url("post.show", &UrlArgs::new().with("id", 12), false)
        .unwrap();
    assert_eq!(url, "/app/post/12");
}

#[tokio::test]
async fn test_url_round_trip_and_invalid_argument() {
    let mut router = Router::new();
    router.get("/post/{id:number}", echo).name("post.show");

    let url = router.url("post.show", &UrlArgs::new().arg(42), false).unwrap();
    assert_eq!(url, "/post/42");
    let response = router.handle_request(request("GET", &url)).await.unwrap();
    assert_eq!(body(response).await, "42");

    let err = router
        .url("post.show", &UrlArgs::new().arg("abc"), false)
        .unwrap_err();
    assert!(matches!(err, RoutingError::InvalidRouteUrl { .. }));
    assert!(router
        .named_route_url("post.show", &UrlArgs::new().arg("abc"), false)
        .is_none());
}

#[tokio::test]
async fn test_duplicate_names_fail_on_resolution() {
    let mut router = Router::new();
    router.get("/a", ok).name("dup");
    router.get("/b", ok).name("dup");

    assert!(router.table().route("dup").is_none());
    let err = router.url("dup", &UrlArgs::new(), false).unwrap_err();
    assert!(matches!(err, RoutingError::DuplicateRouteName { .. }));
}

#[tokio::test]
async fn test_matched_route_and_request_url() {
    let mut router = Router::new();
    router.get("/post/{id}", ok).name("post.show");

    let response = router.handle_request(request("GET", "/post/3")).await.unwrap();
    let matched = response.extensions().get::<MatchedRoute>().unwrap();
    assert_eq!(matched.name(), Some("post.show"));
    assert_eq!(matched.params().get("id"), Some("3"));
    assert!(router.current_route().is_none());

    let absolute = router
        .request_url(&request("GET", "/post/3"), "post.show", &UrlArgs::new().arg(4), true)
        .unwrap();
    assert_eq!(absolute, "http://example.com/post/4");
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_target() {
    static SHARED: OnceLock<Router> = OnceLock::new();

    let release = Arc::new(Notify::new());
    let gate = Arc::clone(&release);

    let mut router = Router::new();
    router.get("/", ok).name("home");
    router.get("/slow", move |_args: RouteArgs, req: Request| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            SHARED
                .get()
                .map(|router| router.request_url(&req, "home", &UrlArgs::new(), true))
        }
    });
    router.get("/fast", |_args: RouteArgs, req: Request| async move {
        SHARED
            .get()
            .map(|router| router.request_url(&req, "home", &UrlArgs::new(), true))
    });
    assert!(SHARED.set(router).is_ok());
    let router = SHARED.get().unwrap();

    let (slow, fast) = tokio::join!(
        router.handle_request(request_to("tenant-a.test", "GET", "/slow")),
        async {
            let fast = router
                .handle_request(request_to("tenant-b.test", "GET", "/fast"))
                .await;
            release.notify_one();
            fast
        }
    );

    assert_eq!(body(fast.unwrap()).await, "http://tenant-b.test/");
    assert_eq!(body(slow.unwrap()).await, "http://tenant-a.test/");
    assert!(router.current_route().is_none());
}

#[tokio::test]
async fn test_send_response_runs_before_send_hooks() {
    let log: Log = Arc::default();
    let emitted: Arc<Mutex<Option<StatusCode>>> = Arc::default();

    let mut router = Router::new();
    router.middleware(trace("G", &log));
    let route_log = Arc::clone(&log);
    router
        .group("/shop", move |shop| {
            shop.get("/cart", ok).middleware(trace("R", &route_log));
        })
        .middleware(trace("M", &log));

    let sink = Arc::clone(&emitted);
    router.set_emitter(move |response: Response| {
        *sink.lock() = Some(response.status());
        true
    });

    let response = router.handle_request(request("GET", "/shop/cart")).await.unwrap();
    log.lock().clear();

    assert!(router.send_response(response).unwrap());
    assert_eq!(*log.lock(), ["send:G", "send:M", "send:R"]);
    assert_eq!(*emitted.lock(), Some(StatusCode::OK));
}

#[tokio::test]
async fn test_send_response_without_emitter() {
    let router = Router::new();
    let response = Response::html("orphan");
    assert!(!router.send_response(response).unwrap());
}

#[tokio::test]
async fn test_router_from_config() {
    let toml = r#"
        [routing]
        base_prefix = "/v1"
        default_strategy = "json"

        [routing.patterns]
        year = "[0-9]{4}"
    "#;
    let config = ConfigLoader::new()
        .with_string(toml, "toml")
        .unwrap()
        .load()
        .unwrap();

    let mut router = Router::from_config(&config);
    router.get("/archive/{year:year}", echo);

    let response = router.handle_request(request("GET", "/v1/archive/2024")).await.unwrap();
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(body(response).await, "\"2024\"");

    assert!(router.handle_request(request("GET", "/v1/archive/24")).await.is_err());
}
