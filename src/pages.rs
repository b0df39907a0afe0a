//! HTML pages produced by the server itself.
//!
//! Templates are compiled once into a shared [`minijinja`] environment with HTML
//! auto-escaping on for every template, so values are passed in raw. Links are the
//! exception: they are percent-encoded before rendering and emitted with `|safe`.

use crate::script::{Diagnostic, SourcePath};
use minijinja::{AutoEscape, Environment, HtmlEscape};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::error;

/// Page sent when a script produced no renderable unit.
pub const FAILED_TO_RENDER_PAGE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Compilation failure</title>
</head>
<body>
<p>Failed to render page from script.</p>
</body>
</html>
";

const DIAGNOSTICS_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Compilation failure</title>
</head>
<body>
<h1>Compilation failure</h1>
<p>{{ path }} could not be compiled.</p>
<table>
<tr><th>Severity</th><th>Location</th><th>Message</th></tr>
{% for d in diagnostics -%}
<tr><td>{{ d.severity }}</td><td>{{ d.location }}</td><td>{{ d.message }}</td></tr>
{% endfor -%}
</table>
</body>
</html>
";

const RENDER_ERROR_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Script error</title>
</head>
<body>
<h1>Script error</h1>
<p>{{ path }} failed while rendering.</p>
{% if message %}<pre>{{ message }}</pre>
{% endif -%}
</body>
</html>
";

const STATUS_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<title>{{ status }} {{ reason }}</title>
</head>
<body>
<h1>{{ reason }}</h1>
<p>{{ detail }}</p>
</body>
</html>
";

const LISTING_TEMPLATE: &str = "<!DOCTYPE html>
<html>
<head>
<title>Index of {{ directory_name }}</title>
</head>
<body>
<h1>Index of {{ directory_name }}</h1>
<table>
<tr><th>Name</th><th>Last modified</th><th>Size</th></tr>
<tr><th colspan=\"3\"><hr></th></tr>
<tr><td><a href=\"{{ parent_link|safe }}\">Parent Directory</a></td><td></td><td></td></tr>
{% for entry in entries -%}
<tr><td>{{ entry.marker }} <a href=\"{{ entry.link|safe }}\">{{ entry.name }}</a></td><td>{{ entry.modified }}</td><td>{{ entry.size }}</td></tr>
{% endfor -%}
<tr><th colspan=\"3\"><hr></th></tr>
</table>
</body>
</html>
";

static PAGES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    for (name, source) in [
        ("diagnostics", DIAGNOSTICS_TEMPLATE),
        ("render_error", RENDER_ERROR_TEMPLATE),
        ("status", STATUS_TEMPLATE),
        ("listing", LISTING_TEMPLATE),
    ] {
        if let Err(e) = env.add_template(name, source) {
            error!(template = name, error = %e, "Failed to compile page template");
        }
    }
    env
});

/// Escapes `text` for HTML with the same rules the page templates use.
#[must_use]
pub fn html_escape(text: &str) -> String {
    HtmlEscape(text).to_string()
}

fn render<S: Serialize>(template: &str, ctx: &S) -> Result<String, minijinja::Error> {
    PAGES.get_template(template)?.render(ctx)
}

#[derive(Serialize)]
struct DiagnosticRow {
    severity: String,
    location: String,
    message: String,
}

#[derive(Serialize)]
struct DiagnosticsPage {
    path: String,
    diagnostics: Vec<DiagnosticRow>,
}

/// Page listing the compiler diagnostics of a script that failed to build.
#[must_use]
pub fn diagnostics_page(path: &SourcePath, diagnostics: &[Diagnostic]) -> String {
    let page = DiagnosticsPage {
        path: path.as_str().to_string(),
        diagnostics: diagnostics
            .iter()
            .map(|d| DiagnosticRow {
                severity: d.severity.to_string(),
                location: d.location.to_string(),
                message: d.message.clone(),
            })
            .collect(),
    };
    render("diagnostics", &page).unwrap_or_else(|e| {
        error!(path = %path, error = %e, "Failed to render diagnostics page");
        FAILED_TO_RENDER_PAGE.to_string()
    })
}

#[derive(Serialize)]
struct RenderErrorPage {
    path: String,
    message: Option<String>,
}

/// Page for a script that compiled but raised an error while rendering.
///
/// `message` is omitted when diagnostics are hidden from clients.
#[must_use]
pub fn render_error_page(path: &str, message: Option<&str>) -> String {
    let page = RenderErrorPage {
        path: path.to_string(),
        message: message.map(str::to_string),
    };
    render("render_error", &page).unwrap_or_else(|e| {
        error!(path = path, error = %e, "Failed to render script error page");
        FAILED_TO_RENDER_PAGE.to_string()
    })
}

#[derive(Serialize)]
struct StatusPage<'a> {
    status: u16,
    reason: &'a str,
    detail: String,
}

/// Minimal page for a bare HTTP status such as 404 or 500.
#[must_use]
pub fn status_page(status: u16, detail: &str) -> String {
    let reason = http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Error");
    render(
        "status",
        &StatusPage {
            status,
            reason,
            detail: detail.to_string(),
        },
    )
    .unwrap_or_else(|_| format!("{status} {reason}"))
}

/// One row of a directory listing. Text fields are escaped by the template;
/// `link` is written as-is and must already be percent-encoded.
#[derive(Debug, Clone, Serialize)]
pub struct ListingEntry {
    /// `[D]` for directories, `[F]` for files
    pub marker: &'static str,
    pub name: String,
    pub link: String,
    pub modified: String,
    pub size: String,
}

#[derive(Debug, Serialize)]
pub struct ListingPage {
    pub directory_name: String,
    /// Percent-encoded like [`ListingEntry::link`]
    pub parent_link: String,
    pub entries: Vec<ListingEntry>,
}

pub fn listing_page(page: &ListingPage) -> Result<String, minijinja::Error> {
    render("listing", page)
}
