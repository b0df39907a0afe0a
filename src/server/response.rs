use crate::handlers::HandlerResponse;
use may_minihttp::Response;

/// Reason phrase for a status code; `"Unknown"` for codes without one.
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Full `Content-Type` header line for the media types the server emits.
///
/// `may_minihttp` only accepts `&'static str` headers, so known types map to
/// literals and anything else falls back to `application/octet-stream`.
pub fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "text/html" => "Content-Type: text/html",
        "text/css" => "Content-Type: text/css",
        "application/javascript" => "Content-Type: application/javascript",
        "application/json" => "Content-Type: application/json",
        "text/plain; charset=utf-8" => "Content-Type: text/plain; charset=utf-8",
        "text/plain" => "Content-Type: text/plain",
        "application/xml" => "Content-Type: application/xml",
        "image/svg+xml" => "Content-Type: image/svg+xml",
        "image/png" => "Content-Type: image/png",
        "image/jpeg" => "Content-Type: image/jpeg",
        "image/gif" => "Content-Type: image/gif",
        "image/x-icon" => "Content-Type: image/x-icon",
        "application/wasm" => "Content-Type: application/wasm",
        "application/pdf" => "Content-Type: application/pdf",
        _ => "Content-Type: application/octet-stream",
    }
}

/// Copy a finished [`HandlerResponse`] onto the wire response.
pub fn write_handler_response(res: &mut Response, response: HandlerResponse) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    res.header(content_type_header(response.content_type));
    res.body_vec(response.body);
}
