#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests: a real `HttpServer` over a temporary document root, driven
//! with raw TCP requests.

mod common;

use common::docroot;
use common::http::{get, parse_parts, send_request, setup_may_runtime};
use scriptpage::config::ServerConfig;
use scriptpage::handlers::RequestContext;
use scriptpage::pages::FAILED_TO_RENDER_PAGE;
use scriptpage::server::{AppService, HttpServer, ServerHandle};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use tempfile::TempDir;

const GREETING: &str = r#"
fn render(request) {
    let name = request.query("name");
    if type_of(name) == "()" { name = "world"; }
    `<h1>Hello, ${html_escape(name)}!</h1>`
}
"#;

const ECHO: &str = r#"
fn render(request) {
    `${request.method} ${request.header("x-token")} ${request.cookie("sid")} ${request.body}`
}
"#;

const RECURSE: &str = r#"
fn depth(n) { if n == 0 { 0 } else { depth(n - 1) + 1 } }
fn render(request) {
    if type_of(request.query("deep")) == "()" { `${depth(2)}` } else { `${depth(100000)}` }
}
"#;

fn site() -> TempDir {
    docroot::with_files(&[
        ("index.rhai", GREETING),
        ("echo.rhai", ECHO),
        ("broken.rhai", "fn render(request) {\n  let = ;\n}\n"),
        ("library.rhai", "fn helper(x) { x }"),
        ("throws.rhai", r#"fn render(request) { throw "exploded"; }"#),
        ("recurse.rhai", RECURSE),
        ("docs/readme.txt", "read me"),
        ("docs/style.css", "body {}"),
        ("empty/.keep", ""),
    ])
}

fn config_for(root: &TempDir) -> ServerConfig {
    ServerConfig {
        root_path: root.path().to_path_buf(),
        ..ServerConfig::default()
    }
}

fn start(config: &ServerConfig) -> (ServerHandle, SocketAddr) {
    setup_may_runtime();
    let service = AppService::from_config(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let handle = HttpServer(service).start(addr).unwrap();
    handle.wait_ready().unwrap();
    (handle, addr)
}

#[test]
fn test_script_page_served() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let resp = get(&addr, "/index.rhai?name=%3Cscript%3E");
    handle.stop();

    let (status, ct, body) = parse_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(ct, "text/html; charset=utf-8");
    assert_eq!(body, "<h1>Hello, &lt;script&gt;!</h1>");
}

#[test]
fn test_root_serves_index_script() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let resp = get(&addr, "/");
    handle.stop();

    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "<h1>Hello, world!</h1>");
}

#[test]
fn test_request_surface_reaches_script() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let resp = send_request(
        &addr,
        "POST /echo.rhai HTTP/1.1\r\nHost: localhost\r\nX-Token: t0k\r\nCookie: sid=42; theme=dark\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    );
    handle.stop();

    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "POST t0k 42 hello");
}

#[test]
fn test_broken_script_shows_diagnostics() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let first = get(&addr, "/broken.rhai");
    let second = get(&addr, "/broken.rhai");
    handle.stop();

    let (status, _, body) = parse_parts(&first);
    assert_eq!(status, 200);
    assert!(body.contains("Compilation failure"));
    assert!(body.contains("broken.rhai:2:"));
    assert_eq!(parse_parts(&second).2, body);
}

#[test]
fn test_hidden_diagnostics() {
    let root = site();
    let config = ServerConfig {
        show_diagnostics: false,
        ..config_for(&root)
    };
    let (handle, addr) = start(&config);
    let broken = get(&addr, "/broken.rhai");
    let throws = get(&addr, "/throws.rhai");
    handle.stop();

    assert_eq!(parse_parts(&broken).2, FAILED_TO_RENDER_PAGE);
    let (status, _, body) = parse_parts(&throws);
    assert_eq!(status, 500);
    assert!(!body.contains("exploded"));
}

#[test]
fn test_script_without_entry_point() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let resp = get(&addr, "/library.rhai");
    handle.stop();

    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, FAILED_TO_RENDER_PAGE);
}

#[test]
fn test_runtime_error_is_500() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let resp = get(&addr, "/throws.rhai");
    handle.stop();

    let (status, ct, body) = parse_parts(&resp);
    assert_eq!(status, 500);
    assert_eq!(ct, "text/html; charset=utf-8");
    assert!(body.contains("exploded"));
}

#[test]
fn test_deep_recursion_fails_the_request_not_the_server() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let shallow = get(&addr, "/recurse.rhai");
    let deep = get(&addr, "/recurse.rhai?deep=1");
    let after = get(&addr, "/index.rhai");
    handle.stop();

    assert_eq!(parse_parts(&shallow).2, "2");
    let (status, ct, _) = parse_parts(&deep);
    assert_eq!(status, 500);
    assert_eq!(ct, "text/html; charset=utf-8");
    assert_eq!(parse_parts(&after).0, 200);
}

#[test]
fn test_directory_listing_and_static_files() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let listing = get(&addr, "/docs");
    let css = get(&addr, "/docs/style.css");
    handle.stop();

    let (status, ct, body) = parse_parts(&listing);
    assert_eq!(status, 200);
    assert_eq!(ct, "text/html; charset=utf-8");
    assert!(body.contains("Index of &#x2f;docs"));
    assert!(body.contains("[F] <a href=\"/docs/readme.txt\">readme.txt</a>"));

    let (status, ct, body) = parse_parts(&css);
    assert_eq!(status, 200);
    assert_eq!(ct, "text/css");
    assert_eq!(body, "body {}");
}

#[test]
fn test_listing_disabled() {
    let root = site();
    let config = ServerConfig {
        directory_listing: false,
        ..config_for(&root)
    };
    let (handle, addr) = start(&config);
    let resp = get(&addr, "/empty");
    handle.stop();
    assert_eq!(parse_parts(&resp).0, 404);
}

#[test]
fn test_traversal_and_missing_are_404() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));
    let traversal = get(&addr, "/../Cargo.toml");
    let encoded = get(&addr, "/docs/%2e%2e/%2e%2e/etc/passwd");
    let missing = get(&addr, "/nope.rhai");
    handle.stop();

    assert_eq!(parse_parts(&traversal).0, 404);
    assert_eq!(parse_parts(&encoded).0, 404);
    let (status, ct, body) = parse_parts(&missing);
    assert_eq!(status, 404);
    assert_eq!(ct, "text/html; charset=utf-8");
    assert!(body.contains("Not Found"));
}

#[test]
fn test_concurrent_first_requests() {
    let root = site();
    let (handle, addr) = start(&config_for(&root));

    let workers: Vec<_> = (0..8)
        .map(|i| thread::spawn(move || get(&addr, &format!("/index.rhai?name=n{i}"))))
        .collect();
    let responses: Vec<String> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    handle.stop();

    for (i, resp) in responses.iter().enumerate() {
        let (status, _, body) = parse_parts(resp);
        assert_eq!(status, 200);
        assert_eq!(body, format!("<h1>Hello, n{i}!</h1>"));
    }
}

#[test]
fn test_respond_without_network() {
    let root = site();
    let service = AppService::from_config(&config_for(&root)).unwrap();

    let resp = service.respond(&RequestContext::new("GET", "/index.rhai").with_query("name", "direct"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_text(), "<h1>Hello, direct!</h1>");

    let cache = service.script_cache().unwrap();
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_missing_root_is_error() {
    let root = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        root_path: root.path().join("not-there"),
        ..ServerConfig::default()
    };
    assert!(AppService::from_config(&config).is_err());
}
