use super::request::parse_request;
use super::response::write_handler_response;
use crate::config::ServerConfig;
use crate::handlers::{DirectoryListing, HandlerRegistry, HandlerResponse, RequestContext, RequestHandler};
use crate::pages::status_page;
use crate::script::{CacheOptions, RhaiCompiler, ScriptCache, ScriptHandler, SourcePath};
use crate::static_files::StaticFiles;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Index files tried, in order, when a directory is requested.
pub const DEFAULT_INDEX_FILES: &[&str] = &["index.rhai", "index.html"];

/// The HTTP service: maps request paths onto the document root and hands them to
/// the handler registered for the file's extension, the directory listing, or the
/// static file loader.
#[derive(Clone)]
pub struct AppService {
    static_files: StaticFiles,
    handlers: Arc<HandlerRegistry>,
    listing: Option<Arc<DirectoryListing>>,
    index_files: Arc<Vec<String>>,
    script_cache: Option<Arc<ScriptCache>>,
}

impl AppService {
    /// Service over `root` with the given handlers, directory listings enabled and
    /// the default index files.
    pub fn new(root: impl Into<PathBuf>, handlers: HandlerRegistry) -> Self {
        let root = root.into();
        Self {
            listing: Some(Arc::new(DirectoryListing::new(root.clone()))),
            static_files: StaticFiles::new(root),
            handlers: Arc::new(handlers),
            index_files: Arc::new(DEFAULT_INDEX_FILES.iter().map(|s| s.to_string()).collect()),
            script_cache: None,
        }
    }

    /// Build the full service from configuration: a Rhai script handler for every
    /// configured extension, backed by one shared [`ScriptCache`].
    ///
    /// # Errors
    ///
    /// Returns an error if the document root does not exist.
    pub fn from_config(config: &ServerConfig) -> io::Result<Self> {
        let root = config.root_path.canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("document root {} is not accessible: {e}", config.root_path.display()),
            )
        })?;

        let compiler = Arc::new(
            RhaiCompiler::with_entry_point(config.entry_point.clone()).with_limits(config.script_limits()),
        );
        let cache = Arc::new(ScriptCache::new(
            compiler,
            config.references.clone(),
            CacheOptions {
                enabled: config.cache_enabled,
                show_diagnostics: config.show_diagnostics,
            },
        ));
        let script_handler: Arc<dyn RequestHandler> = Arc::new(ScriptHandler::new(Arc::clone(&cache)));

        let mut handlers = HandlerRegistry::new();
        for ext in &config.script_extensions {
            handlers.register(ext, Arc::clone(&script_handler));
        }

        info!(
            root = %root.display(),
            extensions = ?config.script_extensions,
            directory_listing = config.directory_listing,
            "Document root configured"
        );

        Ok(Self::new(root, handlers)
            .with_directory_listing(config.directory_listing)
            .with_index_files(config.index_files.clone())
            .with_script_cache(cache))
    }

    #[must_use]
    pub fn with_directory_listing(mut self, enabled: bool) -> Self {
        self.listing = enabled.then(|| Arc::new(DirectoryListing::new(self.root().to_path_buf())));
        self
    }

    #[must_use]
    pub fn with_index_files(mut self, index_files: Vec<String>) -> Self {
        self.index_files = Arc::new(index_files);
        self
    }

    #[must_use]
    pub fn with_script_cache(mut self, cache: Arc<ScriptCache>) -> Self {
        self.script_cache = Some(cache);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.static_files.base_dir()
    }

    /// The script cache built by [`AppService::from_config`], for the watcher.
    #[must_use]
    pub fn script_cache(&self) -> Option<&Arc<ScriptCache>> {
        self.script_cache.as_ref()
    }

    /// Produce the response for a parsed request.
    pub fn respond(&self, ctx: &RequestContext) -> HandlerResponse {
        let decoded = match urlencoding::decode(&ctx.path) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return not_found(&ctx.path),
        };
        let Some(local_path) = self.static_files.map_path(&decoded) else {
            warn!(path = %ctx.path, "Rejected path outside the document root");
            return not_found(&ctx.path);
        };
        let request_path = SourcePath::new(&decoded).as_str().trim_start_matches('/').to_string();

        if local_path.is_dir() {
            return self.respond_directory(ctx, &request_path, &local_path);
        }
        if local_path.is_file() {
            return self.respond_file(ctx, &request_path, &local_path);
        }
        debug!(path = %ctx.path, "No such file");
        not_found(&ctx.path)
    }

    fn respond_directory(&self, ctx: &RequestContext, request_path: &str, dir: &Path) -> HandlerResponse {
        for index in self.index_files.iter() {
            let candidate = dir.join(index);
            if candidate.is_file() {
                let index_path = if request_path.is_empty() {
                    index.clone()
                } else {
                    format!("{request_path}/{index}")
                };
                return self.respond_file(ctx, &index_path, &candidate);
            }
        }
        match &self.listing {
            Some(listing) => self.run_handler("listing", listing.as_ref(), ctx, request_path, dir),
            None => not_found(&ctx.path),
        }
    }

    fn respond_file(&self, ctx: &RequestContext, request_path: &str, file: &Path) -> HandlerResponse {
        if let Some(handler) = self.handlers.for_path(file) {
            return self.run_handler("script", handler.as_ref(), ctx, request_path, file);
        }
        if ctx.method != "GET" && ctx.method != "HEAD" {
            return HandlerResponse::html(405, status_page(405, &ctx.path));
        }
        match self.static_files.load(request_path) {
            Ok((mut body, content_type)) => {
                debug!(path = %ctx.path, bytes = body.len(), content_type, "Static file served");
                if ctx.method == "HEAD" {
                    body.clear();
                }
                HandlerResponse {
                    status: 200,
                    content_type,
                    body,
                }
            }
            Err(e) => {
                error!(path = %ctx.path, error = %e, "Failed to read static file");
                not_found(&ctx.path)
            }
        }
    }

    fn run_handler(
        &self,
        kind: &str,
        handler: &dyn RequestHandler,
        ctx: &RequestContext,
        request_path: &str,
        local_path: &Path,
    ) -> HandlerResponse {
        let mut response = HandlerResponse::new();
        match handler.handle(ctx, request_path, local_path, &mut response) {
            Ok(()) => {
                info!(
                    method = %ctx.method,
                    path = %ctx.path,
                    handler = kind,
                    status = response.status,
                    "Request dispatched"
                );
                response
            }
            Err(e) => {
                error!(method = %ctx.method, path = %ctx.path, handler = kind, error = %e, "Handler failed");
                HandlerResponse::html(500, status_page(500, &ctx.path))
            }
        }
    }
}

fn not_found(path: &str) -> HandlerResponse {
    HandlerResponse::html(404, status_page(404, path))
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let ctx = parse_request(req);
        let response = self.respond(&ctx);
        write_handler_response(res, response);
        Ok(())
    }
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService")
            .field("root", &self.root())
            .field("handlers", &self.handlers)
            .field("directory_listing", &self.listing.is_some())
            .field("index_files", &self.index_files)
            .finish()
    }
}
