use super::diagnostic::Diagnostic;
use super::path::SourcePath;
use crate::handlers::RequestContext;
use crate::pages::{self, FAILED_TO_RENDER_PAGE};
use rhai::{CallFnOptions, Dynamic, Engine, Scope, AST};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The capability every page script provides: one call produces one page.
pub trait Script: Send + Sync {
    fn render(&self, ctx: &RequestContext) -> Result<String, RenderError>;
}

/// A script raised an error while producing its page.
#[derive(Debug, Clone, Error)]
#[error("{path}: {message}")]
pub struct RenderError {
    pub path: SourcePath,
    pub message: String,
}

/// A compiled Rhai script bound to the engine it was compiled with.
pub struct RhaiScript {
    path: SourcePath,
    engine: Arc<Engine>,
    ast: AST,
    entry_point: String,
}

impl RhaiScript {
    pub fn new(path: SourcePath, engine: Arc<Engine>, ast: AST, entry_point: impl Into<String>) -> Self {
        Self {
            path,
            engine,
            ast,
            entry_point: entry_point.into(),
        }
    }

    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

/// Strings are used verbatim, `()` renders as nothing, anything else through its
/// display form.
fn content_of(value: Dynamic) -> String {
    if value.is_unit() {
        String::new()
    } else if value.is_string() {
        value.into_string().unwrap_or_default()
    } else {
        value.to_string()
    }
}

impl Script for RhaiScript {
    fn render(&self, ctx: &RequestContext) -> Result<String, RenderError> {
        let mut scope = Scope::new();
        // Top-level statements are not page code; only the entry point runs.
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let value: Dynamic = self
            .engine
            .call_fn_with_options(options, &mut scope, &self.ast, &self.entry_point, (ctx.clone(),))
            .map_err(|e| RenderError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(content_of(value))
    }
}

impl fmt::Debug for RhaiScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiScript")
            .field("path", &self.path)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

/// Stand-in for a script that failed to compile. Renders its diagnostics, or the
/// generic failure page when diagnostics are hidden from clients.
#[derive(Debug, Clone)]
pub struct ErrorScript {
    path: SourcePath,
    diagnostics: Vec<Diagnostic>,
    show_diagnostics: bool,
}

impl ErrorScript {
    pub fn new(path: SourcePath, diagnostics: Vec<Diagnostic>, show_diagnostics: bool) -> Self {
        Self {
            path,
            diagnostics,
            show_diagnostics,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn render_page(&self) -> String {
        if self.show_diagnostics {
            pages::diagnostics_page(&self.path, &self.diagnostics)
        } else {
            FAILED_TO_RENDER_PAGE.to_string()
        }
    }
}

impl Script for ErrorScript {
    fn render(&self, _ctx: &RequestContext) -> Result<String, RenderError> {
        Ok(self.render_page())
    }
}

/// The cacheable result of compiling one source path.
#[derive(Clone)]
pub enum ScriptUnit {
    /// A runnable page script
    Executable(Arc<dyn Script>),
    /// A script that failed to compile, carrying its diagnostics
    Error(Arc<ErrorScript>),
}

impl ScriptUnit {
    pub fn render(&self, ctx: &RequestContext) -> Result<String, RenderError> {
        match self {
            ScriptUnit::Executable(script) => script.render(ctx),
            ScriptUnit::Error(error) => Ok(error.render_page()),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ScriptUnit::Error(_))
    }

    /// Diagnostics of an error unit; empty for executables.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ScriptUnit::Executable(_) => &[],
            ScriptUnit::Error(error) => error.diagnostics(),
        }
    }

    /// True when both values point at the same compiled unit.
    #[must_use]
    pub fn same_unit(&self, other: &ScriptUnit) -> bool {
        match (self, other) {
            (ScriptUnit::Executable(a), ScriptUnit::Executable(b)) => Arc::ptr_eq(a, b),
            (ScriptUnit::Error(a), ScriptUnit::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptUnit::Executable(_) => f.write_str("ScriptUnit::Executable"),
            ScriptUnit::Error(error) => f
                .debug_tuple("ScriptUnit::Error")
                .field(&error.diagnostics().len())
                .finish(),
        }
    }
}
