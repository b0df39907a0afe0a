//! # scriptpage
//!
//! **scriptpage** is an embedded page server for Rust: it serves a document root over HTTP
//! and runs [Rhai](https://rhai.rs) scripts found in it as server-side pages, compiled on
//! first request and cached from then on. It runs on the `may` coroutine runtime with
//! `may_minihttp` as the HTTP listener.
//!
//! ## Overview
//!
//! A request is mapped onto the document root and handed to a pluggable handler:
//!
//! - files with a script extension (`.rhai` by default) go to the [`ScriptHandler`](script::ScriptHandler),
//!   which compiles the file, caches the compiled unit and renders the page it returns
//! - directories render their index file, or a browsable [`DirectoryListing`](handlers::DirectoryListing)
//! - anything else is served as a static file
//!
//! Broken scripts never take the server down. Their compiler diagnostics are cached and
//! rendered in place of the page until the file changes.
//!
//! ## Architecture
//!
//! - **[`script`]** - script compilation, the compiled-unit cache and the script handler
//! - **[`handlers`]** - the handler trait, handler registry and directory listing
//! - **[`server`]** - request parsing, the HTTP service and the server wrapper
//! - **[`pages`]** - HTML pages the server produces itself (diagnostics, errors, listings)
//! - **[`static_files`]** - document root mapping and static file serving
//! - **[`config`]** - server configuration from YAML and environment
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`watch`]** - invalidation of cached scripts when their files change
//! - **[`cli`]** - the `scriptpage` command line
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::AppService
//!     participant Handler as script::ScriptHandler
//!     participant Cache as script::ScriptCache
//!     participant Compiler as script::RhaiCompiler
//!
//!     Client->>Service: GET /blog/index.rhai
//!     Service->>Service: decode + map under root
//!     Service->>Handler: handle(ctx, "blog/index.rhai", local_path)
//!     Handler->>Cache: get_or_compile(local_path)
//!     alt cached
//!         Cache-->>Handler: ScriptUnit
//!     else miss
//!         Cache->>Compiler: compile(path, references)
//!         Compiler-->>Cache: Ok(script) / Diagnostics / NoScriptTypeFound
//!         Cache->>Cache: store (first writer wins)
//!         Cache-->>Handler: Option<ScriptUnit>
//!     end
//!     Handler->>Handler: unit.render(ctx)
//!     Handler-->>Service: HTML page
//!     Service-->>Client: 200 text/html
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scriptpage::config::ServerConfig;
//! use scriptpage::server::{AppService, HttpServer};
//!
//! let config = ServerConfig {
//!     root_path: "public".into(),
//!     addr: "127.0.0.1:8181".to_string(),
//!     ..ServerConfig::default()
//! };
//! may::config().set_stack_size(config.stack_size);
//!
//! let service = AppService::from_config(&config)?;
//! let handle = HttpServer(service).start(config.addr.as_str())?;
//! let _ = handle.join();
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! With `public/index.rhai`:
//!
//! ```text
//! fn render(request) {
//!     let name = request.query("name") ?? "world";
//!     `<h1>Hello, ${html_escape(name)}!</h1>`
//! }
//! ```
//!
//! ## Runtime Configuration
//!
//! - `SCRIPTPAGE_STACK_SIZE` - coroutine stack size (decimal or `0x` hex, default `0x40000`)
//! - `SCRIPTPAGE_SCRIPT_CACHE=off` - recompile scripts on every request
//! - `SCRIPTPAGE_SHOW_DIAGNOSTICS=off` - hide compiler output from clients
//! - `SCRIPTPAGE_LOG_LEVEL` / `SCRIPTPAGE_LOG_FORMAT` - logging, see [`logging`]

pub mod cli;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod pages;
pub mod script;
pub mod server;
pub mod static_files;
pub mod watch;

pub use config::ServerConfig;
pub use handlers::{HandlerRegistry, HandlerResponse, RequestContext, RequestHandler};
pub use script::{ScriptCache, ScriptHandler, ScriptUnit};
