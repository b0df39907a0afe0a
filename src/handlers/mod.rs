//! # Handlers Module
//!
//! Request handlers turn a matched request into response bytes. The HTTP service
//! resolves the request path against the document root and hands each handler
//! both forms of the path:
//!
//! - `request_path` - the decoded URL path relative to the root, without a leading `/`
//! - `local_path` - the file or directory it maps to on disk
//!
//! Two handlers ship with the crate:
//!
//! - [`ScriptHandler`](crate::script::ScriptHandler) - compiles and runs Rhai page scripts
//! - [`DirectoryListing`] - renders an HTML index of a directory
//!
//! Handlers are registered per file extension in a [`HandlerRegistry`].
//!
//! ## Writing a handler
//!
//! ```rust
//! use scriptpage::handlers::{HandlerResponse, RequestContext, RequestHandler, HTML_CONTENT_TYPE};
//! use std::io::{self, Write};
//! use std::path::Path;
//!
//! struct Hello;
//!
//! impl RequestHandler for Hello {
//!     fn handle(
//!         &self,
//!         ctx: &RequestContext,
//!         _request_path: &str,
//!         _local_path: &Path,
//!         response: &mut HandlerResponse,
//!     ) -> io::Result<()> {
//!         response.set_content_type(HTML_CONTENT_TYPE);
//!         write!(response, "<p>{} {}</p>", ctx.method, ctx.path)
//!     }
//! }
//! ```

mod context;
mod listing;

pub use context::RequestContext;
pub use listing::{size_string, DirectoryListing};

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Content type of every page produced by the built-in handlers.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A pluggable request handler.
///
/// Invoked once per matched request. Implementations must fully write the
/// response before returning; an `Err` is reported by the service as a 500.
pub trait RequestHandler: Send + Sync {
    fn handle(
        &self,
        ctx: &RequestContext,
        request_path: &str,
        local_path: &Path,
        response: &mut HandlerResponse,
    ) -> io::Result<()>;
}

/// Response being built by a handler.
///
/// Implements [`io::Write`]; everything written lands in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// Media type sent as the `Content-Type` header
    pub content_type: &'static str,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream",
            body: Vec::new(),
        }
    }
}

impl HandlerResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An HTML page with the given status.
    pub fn html(status: u16, page: impl Into<String>) -> Self {
        Self {
            status,
            content_type: HTML_CONTENT_TYPE,
            body: page.into().into_bytes(),
        }
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.content_type = content_type;
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

impl io::Write for HandlerResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Maps file extensions to the handler serving them.
///
/// Extensions are matched case-insensitively and registered without the dot.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_extension: HashMap<String, Arc<dyn RequestHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `extension` (with or without a leading dot),
    /// replacing any handler previously registered for it.
    pub fn register(&mut self, extension: &str, handler: Arc<dyn RequestHandler>) {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        self.by_extension.insert(key, handler);
    }

    /// Handler responsible for `path`, based on its extension.
    #[must_use]
    pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn RequestHandler>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&str> = self.extensions().collect();
        extensions.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}
