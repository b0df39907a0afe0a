#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::docroot;
use scriptpage::handlers::RequestContext;
use scriptpage::script::{CompileError, ReferenceSet, RhaiCompiler, Script, ScriptCompiler, Severity, SourcePath};
use std::sync::Arc;

fn compile(source: &str, references: &ReferenceSet) -> (tempfile::TempDir, Result<Arc<dyn Script>, CompileError>) {
    let dir = docroot::with_files(&[("page.rhai", source)]);
    let path = SourcePath::from(dir.path().join("page.rhai"));
    let result = RhaiCompiler::new().compile(&path, references);
    (dir, result)
}

fn render(source: &str, ctx: &RequestContext) -> String {
    let (_dir, result) = compile(source, &ReferenceSet::default());
    result.expect("compiles").render(ctx).expect("renders")
}

#[test]
fn test_renders_request_data() {
    let page = render(
        r#"
        fn render(request) {
            "<p>" + request.method + " " + request.path + "</p>"
        }
        "#,
        &RequestContext::new("GET", "/hello.rhai"),
    );
    assert_eq!(page, "<p>GET /hello.rhai</p>");
}

#[test]
fn test_query_header_and_cookie_lookups() {
    let source = r#"
        fn render(request) {
            let name = request.query("name");
            if type_of(name) == "()" { name = "anonymous"; }
            let agent = request.header("USER-AGENT");
            let session = request.cookie("session");
            `${html_escape(name)}|${agent}|${session}`
        }
    "#;
    let ctx = RequestContext::new("GET", "/")
        .with_query("name", "<b>Ann</b>")
        .with_header("User-Agent", "curl")
        .with_cookie("session", "s1");
    assert_eq!(render(source, &ctx), "&lt;b&gt;Ann&lt;&#x2f;b&gt;|curl|s1");

    let ctx = RequestContext::new("GET", "/")
        .with_header("user-agent", "curl")
        .with_cookie("session", "s1");
    assert_eq!(render(source, &ctx), "anonymous|curl|s1");
}

#[test]
fn test_top_level_statements_do_not_run() {
    let page = render(
        r#"
        throw "top level code ran";
        fn render(request) { "ok" }
        "#,
        &RequestContext::default(),
    );
    assert_eq!(page, "ok");
}

#[test]
fn test_non_string_results() {
    assert_eq!(render("fn render(request) { }", &RequestContext::default()), "");
    assert_eq!(render("fn render(request) { 40 + 2 }", &RequestContext::default()), "42");
}

#[test]
fn test_same_source_renders_identically() {
    let source = "fn render(request) { `<ul>${request.path}</ul>` }";
    let ctx = RequestContext::new("GET", "/list");
    assert_eq!(render(source, &ctx), render(source, &ctx));
}

#[test]
fn test_runtime_error_is_render_error() {
    let (_dir, result) = compile(r#"fn render(request) { throw "kaput"; }"#, &ReferenceSet::default());
    let err = result.unwrap().render(&RequestContext::default()).unwrap_err();
    assert!(err.message.contains("kaput"));
    assert!(err.path.as_str().ends_with("page.rhai"));
}

#[test]
fn test_syntax_error_has_position() {
    let (_dir, result) = compile("fn render(request) {\n    let x = ;\n}\n", &ReferenceSet::default());
    let Err(CompileError::Diagnostics(diagnostics)) = result else {
        panic!("expected diagnostics");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].location.line, Some(2));
    assert!(diagnostics[0].location.file.ends_with("page.rhai"));
}

#[test]
fn test_missing_file_is_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = SourcePath::from(dir.path().join("missing.rhai"));
    let result = RhaiCompiler::new().compile(&path, &ReferenceSet::default());
    let Err(CompileError::Diagnostics(diagnostics)) = result else {
        panic!("expected diagnostics");
    };
    assert!(diagnostics[0].is_error());
    assert!(diagnostics[0].message.contains("could not be read"));
}

#[test]
fn test_unknown_reference_fails_compile() {
    let references: ReferenceSet = ["core", "graphics"].into_iter().collect();
    let (_dir, result) = compile("fn render(request) { \"x\" }", &references);
    let Err(CompileError::Diagnostics(diagnostics)) = result else {
        panic!("expected diagnostics");
    };
    assert!(diagnostics.iter().any(|d| d.message.contains("graphics")));
}

#[test]
fn test_missing_or_private_entry_point() {
    for source in [
        "let x = 1;",
        "fn render() { \"no request\" }",
        "private fn render(request) { \"hidden\" }",
        "fn page(request) { \"wrong name\" }",
    ] {
        let (_dir, result) = compile(source, &ReferenceSet::default());
        assert!(
            matches!(result, Err(CompileError::NoScriptTypeFound(_))),
            "source should have no entry point: {source}"
        );
    }
}

#[test]
fn test_references_gate_library_functions() {
    let source = r#"fn render(request) { "abc".to_upper() }"#;

    let core_only: ReferenceSet = ["core"].into_iter().collect();
    let (_dir, result) = compile(source, &core_only);
    assert!(result.unwrap().render(&RequestContext::default()).is_err());

    let with_strings: ReferenceSet = ["core", "string"].into_iter().collect();
    let (_dir, result) = compile(source, &with_strings);
    assert_eq!(result.unwrap().render(&RequestContext::default()).unwrap(), "ABC");
}

#[test]
fn test_host_library_is_always_available() {
    let (_dir, result) = compile(
        r#"fn render(request) { html_escape("<" + request.method + ">") }"#,
        &ReferenceSet::empty(),
    );
    let page = result
        .unwrap()
        .render(&RequestContext::new("POST", "/"))
        .unwrap();
    assert_eq!(page, "&lt;POST&gt;");
}
