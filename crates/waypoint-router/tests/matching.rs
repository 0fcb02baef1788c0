//! Matching properties of the route table.

use http::Method;
use proptest::prelude::*;
use waypoint_core::{Request, RequestTarget, RouteArgs};
use waypoint_router::{MatchResult, RouteCollector, RouteTable, UrlArgs, UrlContext, UrlGenerator};

async fn noop(_args: RouteArgs, _req: Request) {}

fn target() -> RequestTarget {
    RequestTarget {
        scheme: "http".to_string(),
        host: "example.com".to_string(),
        port: Some(80),
    }
}

fn lookup(table: &RouteTable, method: Method, path: &str) -> MatchResult {
    table.dispatch(&method, path, &target()).unwrap()
}

fn matched_name(result: MatchResult) -> Option<String> {
    match result {
        MatchResult::Found(found) => found.route.get_name().map(str::to_string),
        _ => None,
    }
}

#[test]
fn test_literal_beats_capture_regardless_of_order() {
    let mut table = RouteTable::new();
    table.get("/users/{id}", noop).name("user");
    table.get("/users/me", noop).name("me");

    let MatchResult::Found(found) = lookup(&table, Method::GET, "/users/me") else {
        panic!("expected a match");
    };
    assert_eq!(found.route.get_name(), Some("me"));
    assert!(found.params.is_empty());
}

#[test]
fn test_captures_are_exact_substrings_in_order() {
    let mut table = RouteTable::new();
    table.get("/a/{x}/b/{y}/c/{z}", noop);

    let MatchResult::Found(found) = lookup(&table, Method::GET, "/a/one%20two/b/2/c/x.y") else {
        panic!("expected a match");
    };
    let values: Vec<_> = found.params.iter().collect();
    assert_eq!(values, [("x", "one%20two"), ("y", "2"), ("z", "x.y")]);
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let mut table = RouteTable::new();
    table.get("/posts", noop);
    table.post("/posts", noop);

    match lookup(&table, Method::PUT, "/posts") {
        MatchResult::MethodNotAllowed { allowed } => assert_eq!(allowed, [Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
    assert!(matches!(lookup(&table, Method::GET, "/missing"), MatchResult::NotFound));
}

#[test]
fn test_trailing_slash_is_significant() {
    let mut table = RouteTable::new();
    table.get("/a", noop).name("plain");
    table.get("/a/", noop).name("slash");

    for (path, name) in [("/a", "plain"), ("/a/", "slash")] {
        let MatchResult::Found(found) = lookup(&table, Method::GET, path) else {
            panic!("expected a match for {path}");
        };
        assert_eq!(found.route.get_name(), Some(name));
    }
}

#[test]
fn test_tail_regex_spans_segments() {
    let mut table = RouteTable::new();
    table.get("/files/{path:.+\\.txt}", noop).name("text");

    let MatchResult::Found(found) = lookup(&table, Method::GET, "/files/a/b/c.txt") else {
        panic!("expected a match");
    };
    assert_eq!(found.params.get("path"), Some("a/b/c.txt"));
    assert!(matches!(lookup(&table, Method::GET, "/files/a/b/c.png"), MatchResult::NotFound));
}

#[test]
fn test_slash_capture_before_a_literal_stays_in_one_segment() {
    let mut table = RouteTable::new();
    table.get("/{dir:.+}/edit", noop).name("edit");

    let MatchResult::Found(found) = lookup(&table, Method::GET, "/docs/edit") else {
        panic!("expected a match");
    };
    assert_eq!(found.params.get("dir"), Some("docs"));
    assert!(matches!(lookup(&table, Method::GET, "/docs/api/edit"), MatchResult::NotFound));
}

#[test]
fn test_tail_and_single_segment_follow_registration_order() {
    let mut tail_first = RouteTable::new();
    tail_first.get("/files/{path:.+}", noop).name("tail");
    tail_first.get("/files/{name}", noop).name("name");
    assert_eq!(matched_name(lookup(&tail_first, Method::GET, "/files/readme")).as_deref(), Some("tail"));

    let mut name_first = RouteTable::new();
    name_first.get("/files/{name}", noop).name("name");
    name_first.get("/files/{path:.+}", noop).name("tail");
    assert_eq!(matched_name(lookup(&name_first, Method::GET, "/files/readme")).as_deref(), Some("name"));
    assert_eq!(matched_name(lookup(&name_first, Method::GET, "/files/a/b")).as_deref(), Some("tail"));
}

#[test]
fn test_concurrent_dispatch_keeps_matches_apart() {
    let mut table = RouteTable::new();
    table.get("/", noop).name("api").host("api.example.com");
    table.get("/", noop).name("www");
    table.get("/post/{id:number}", noop).name("post");
    table.compile().unwrap();

    std::thread::scope(|scope| {
        for worker in 0..8u32 {
            let table = &table;
            scope.spawn(move || {
                let host = if worker % 2 == 0 { "api.example.com" } else { "example.com" };
                let target = RequestTarget {
                    host: host.to_string(),
                    ..target()
                };
                for round in 0..200u32 {
                    let id = (worker * 1000 + round).to_string();
                    let MatchResult::Found(found) =
                        table.dispatch(&Method::GET, &format!("/post/{id}"), &target).unwrap()
                    else {
                        panic!("expected a match");
                    };
                    assert_eq!(found.params.get("id"), Some(id.as_str()));

                    let expected = if worker % 2 == 0 { "api" } else { "www" };
                    let home = table.dispatch(&Method::GET, "/", &target).unwrap();
                    assert_eq!(matched_name(home).as_deref(), Some(expected));
                }
            });
        }
    });
}

#[test]
fn test_url_round_trip() {
    let mut table = RouteTable::new();
    table.get("/post/{id:number}", noop).name("post");

    let route = table.route("post").unwrap();
    let generator = UrlGenerator::new(table.url_patterns().clone(), "");
    let url = generator
        .generate(route.get_path(), &UrlArgs::new().arg(42), false, &UrlContext::default())
        .unwrap();
    assert_eq!(url, "/post/42");

    let MatchResult::Found(found) = lookup(&table, Method::GET, &url) else {
        panic!("generated url should match");
    };
    assert_eq!(found.params.get("id"), Some("42"));
}

proptest! {
    #[test]
    fn test_literal_routes_match_themselves(
        segments in prop::collection::vec("[a-z0-9_-]{1,8}", 1..5),
    ) {
        let path = format!("/{}", segments.join("/"));
        let mut table = RouteTable::new();
        table.get(&path, noop).name("only");

        let matched = matches!(
            lookup(&table, Method::GET, &path),
            MatchResult::Found(found) if found.route.get_name() == Some("only")
        );
        prop_assert!(matched);

        let longer = format!("{path}/extra");
        prop_assert!(matches!(lookup(&table, Method::GET, &longer), MatchResult::NotFound));
    }

    #[test]
    fn test_single_capture_takes_the_whole_segment(value in "[a-zA-Z0-9._~-]{1,16}") {
        let mut table = RouteTable::new();
        table.get("/items/{value}", noop);

        let path = format!("/items/{value}");
        let MatchResult::Found(found) = lookup(&table, Method::GET, &path) else {
            return Err(TestCaseError::fail("expected a match"));
        };
        prop_assert_eq!(found.params.get("value"), Some(value.as_str()));
    }
}
