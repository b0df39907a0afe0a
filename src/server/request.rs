use crate::handlers::RequestContext;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

/// Parse the `Cookie` header (lowercase key) into name/value pairs.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name.to_string(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse query string parameters from a URL path
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
/// When a name repeats, the last value wins.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Turn an incoming `may_minihttp::Request` into the [`RequestContext`] handed to
/// handlers and scripts.
///
/// The path keeps its percent-encoding; the service decodes it when mapping onto
/// the document root. The body is read as text, lossily.
pub fn parse_request(req: Request) -> RequestContext {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_ascii_lowercase(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();
    debug!(
        header_count = headers.len(),
        header_names = ?headers.keys().take(20).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);
    debug!(
        cookie_count = cookies.len(),
        param_count = query_params.len(),
        "Cookies and query params parsed"
    );

    let mut raw_body = Vec::new();
    let body = match req.body().read_to_end(&mut raw_body) {
        Ok(size) if size > 0 => {
            debug!(body_size_bytes = size, "Request body read");
            String::from_utf8_lossy(&raw_body).into_owned()
        }
        _ => String::new(),
    };

    info!(method = %method, path = %path, "HTTP request parsed");

    RequestContext {
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    }
}
