use super::cache::ScriptCache;
use crate::handlers::{HandlerResponse, RequestContext, RequestHandler, HTML_CONTENT_TYPE};
use crate::pages::{render_error_page, FAILED_TO_RENDER_PAGE};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

/// Serves page scripts: resolves the compiled unit through the cache and writes
/// what it renders.
#[derive(Debug, Clone)]
pub struct ScriptHandler {
    cache: Arc<ScriptCache>,
}

impl ScriptHandler {
    pub fn new(cache: Arc<ScriptCache>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }
}

impl RequestHandler for ScriptHandler {
    fn handle(
        &self,
        ctx: &RequestContext,
        request_path: &str,
        local_path: &Path,
        response: &mut HandlerResponse,
    ) -> io::Result<()> {
        response.set_content_type(HTML_CONTENT_TYPE);

        let Some(unit) = self.cache.get_or_compile(local_path) else {
            return response.write_all(FAILED_TO_RENDER_PAGE.as_bytes());
        };

        let content = match unit.render(ctx) {
            Ok(content) => content,
            Err(e) => {
                error!(path = request_path, error = %e, "Script failed while rendering");
                response.set_status(500);
                let detail = self.cache.options().show_diagnostics.then(|| e.message.as_str());
                render_error_page(request_path, detail)
            }
        };
        debug!(path = request_path, bytes = content.len(), "Script rendered");
        response.write_all(content.as_bytes())
    }
}
