//! # Script Module
//!
//! Server-side page scripts written in [Rhai](https://rhai.rs).
//!
//! A request for a script file is served in three steps:
//!
//! 1. [`ScriptHandler`] asks the [`ScriptCache`] for the unit compiled from the file
//! 2. On a miss the cache hands the file to a [`ScriptCompiler`] together with the
//!    configured [`ReferenceSet`] and stores the outcome
//! 3. The resulting [`ScriptUnit`] renders the page for the request
//!
//! Compilation failures do not bring anything down. Their diagnostics are cached as
//! an error unit and rendered in place of the page until the entry is invalidated.
//!
//! ## Script contract
//!
//! A page script defines a public `render` function taking the request:
//!
//! ```text
//! fn render(request) {
//!     let name = request.query("name") ?? "world";
//!     `<p>Hello, ${html_escape(name)}!</p>`
//! }
//! ```

mod cache;
mod compiler;
mod diagnostic;
mod handler;
pub mod host;
mod path;
mod references;
mod unit;

pub use cache::{CacheOptions, ScriptCache};
pub use compiler::{CompileError, RhaiCompiler, ScriptCompiler, ScriptLimits, DEFAULT_ENTRY_POINT};
pub use diagnostic::{has_errors, Diagnostic, Location, Severity};
pub use handler::ScriptHandler;
pub use path::SourcePath;
pub use references::{ReferenceSet, HOST_REFERENCE};
pub use unit::{ErrorScript, RenderError, RhaiScript, Script, ScriptUnit};
