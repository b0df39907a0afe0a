use super::diagnostic::{has_errors, Diagnostic, Location};
use super::host::register_host;
use super::path::SourcePath;
use super::references::{ReferenceSet, HOST_REFERENCE};
use super::unit::{RhaiScript, Script};
use crate::config::DEFAULT_STACK_SIZE;
use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicFnPackage, BasicIteratorPackage, BasicMapPackage,
    BasicMathPackage, BasicTimePackage, CorePackage, LogicPackage, MoreStringPackage, Package,
    StandardPackage,
};
use rhai::{Engine, FnAccess, ParseError, AST};
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the function a script must define to be served.
pub const DEFAULT_ENTRY_POINT: &str = "render";

// Unoptimized builds spend several times more stack per Rhai call level.
#[cfg(debug_assertions)]
const STACK_PER_CALL_LEVEL: usize = 0x20000;
#[cfg(not(debug_assertions))]
const STACK_PER_CALL_LEVEL: usize = 0x4000;

/// Stack kept free for the HTTP server, the parser and the host functions.
const STACK_RESERVE: usize = 0x40000;

const MIN_CALL_LEVELS: usize = 4;
const MAX_CALL_LEVELS: usize = 64;

#[cfg(debug_assertions)]
const EXPR_DEPTHS: (usize, usize) = (32, 16);
#[cfg(not(debug_assertions))]
const EXPR_DEPTHS: (usize, usize) = (64, 32);

/// Resource limits applied to every script engine.
///
/// Scripts run on coroutine stacks, which are much smaller than thread stacks and
/// abort the process when overflowed. Call depth therefore scales with the stack
/// size: past the limit a script fails with a render error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Nested script function calls
    pub max_call_levels: usize,
    /// Expression nesting at the top level of a script
    pub max_expr_depth: usize,
    /// Expression nesting inside function bodies
    pub max_function_expr_depth: usize,
    /// Operations per render; 0 means unlimited
    pub max_operations: u64,
}

impl ScriptLimits {
    /// Limits whose deepest call chain fits in a stack of `stack_size` bytes.
    #[must_use]
    pub fn for_stack_size(stack_size: usize) -> Self {
        let levels = stack_size.saturating_sub(STACK_RESERVE) / STACK_PER_CALL_LEVEL;
        Self {
            max_call_levels: levels.clamp(MIN_CALL_LEVELS, MAX_CALL_LEVELS),
            max_expr_depth: EXPR_DEPTHS.0,
            max_function_expr_depth: EXPR_DEPTHS.1,
            max_operations: 1_000_000,
        }
    }

    fn apply(&self, engine: &mut Engine) {
        engine
            .set_max_call_levels(self.max_call_levels)
            .set_max_expr_depths(self.max_expr_depth, self.max_function_expr_depth)
            .set_max_operations(self.max_operations);
    }
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self::for_stack_size(DEFAULT_STACK_SIZE)
    }
}

/// Why a source file did not produce a runnable script.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// At least one error-severity diagnostic; warnings may be included too.
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),
    /// The source compiled but defines no eligible entry point.
    #[error("no script entry point found in {0}")]
    NoScriptTypeFound(SourcePath),
}

/// Compiles one source file against a reference set.
///
/// The seam between the script cache and the language toolchain. Implementations
/// must be deterministic and must not touch state shared with other requests;
/// the cache may call them concurrently for the same path.
pub trait ScriptCompiler: Send + Sync {
    fn compile(&self, source: &SourcePath, references: &ReferenceSet) -> Result<Arc<dyn Script>, CompileError>;
}

/// Compiles Rhai page scripts in memory.
///
/// Each compilation builds a fresh [`Engine`] holding the host library plus one
/// package per reference. The compiled unit keeps that engine, so a later change
/// of references never affects units already compiled.
///
/// ## Entry point selection
///
/// After parsing, the script's function table is sorted by `(name, arity)` and the
/// first function that is public (not declared `private fn`), carries the entry
/// point name and takes exactly one parameter is selected. If none qualifies the
/// result is [`CompileError::NoScriptTypeFound`]. Other overloads of the entry point
/// name are reported as warnings.
#[derive(Debug, Clone)]
pub struct RhaiCompiler {
    entry_point: String,
    limits: ScriptLimits,
}

impl Default for RhaiCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_entry_point(DEFAULT_ENTRY_POINT)
    }

    #[must_use]
    pub fn with_entry_point(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            limits: ScriptLimits::default(),
        }
    }

    /// Replaces the engine limits, normally derived from the coroutine stack size.
    #[must_use]
    pub fn with_limits(mut self, limits: ScriptLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn limits(&self) -> ScriptLimits {
        self.limits
    }

    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Engine with the host library and every resolvable reference registered.
    /// Unknown references come back as error diagnostics.
    fn build_engine(&self, references: &ReferenceSet, file: &str) -> (Engine, Vec<Diagnostic>) {
        let mut engine = Engine::new_raw();
        let mut diagnostics = Vec::new();
        self.limits.apply(&mut engine);
        register_host(&mut engine);

        for reference in references.iter() {
            if !register_reference(&mut engine, reference) {
                diagnostics.push(Diagnostic::error(
                    format!("reference `{reference}` could not be resolved"),
                    Location::file(file),
                ));
            }
        }
        (engine, diagnostics)
    }

    fn select_entry_point(&self, ast: &AST, file: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
        let mut symbols: Vec<_> = ast.iter_functions().collect();
        symbols.sort_by(|a, b| a.name.cmp(b.name).then(a.params.len().cmp(&b.params.len())));

        let selected = symbols
            .iter()
            .find(|f| f.name == self.entry_point && f.params.len() == 1 && matches!(f.access, FnAccess::Public))
            .map(|f| f.name.to_string());

        for f in symbols.iter().filter(|f| f.name == self.entry_point) {
            if f.params.len() != 1 {
                diagnostics.push(Diagnostic::warning(
                    format!(
                        "`{}` with {} parameter(s) is ignored; the entry point takes exactly one",
                        f.name,
                        f.params.len()
                    ),
                    Location::file(file),
                ));
            } else if !matches!(f.access, FnAccess::Public) {
                diagnostics.push(Diagnostic::warning(
                    format!("`{}` is private and cannot be used as the entry point", f.name),
                    Location::file(file),
                ));
            }
        }
        selected
    }
}

/// Registers the package named by `reference`; false if the name is unknown.
fn register_reference(engine: &mut Engine, reference: &str) -> bool {
    let module = match reference {
        HOST_REFERENCE => return true,
        "core" => CorePackage::new().as_shared_module(),
        "std" => StandardPackage::new().as_shared_module(),
        "arithmetic" => ArithmeticPackage::new().as_shared_module(),
        "logic" => LogicPackage::new().as_shared_module(),
        "math" => BasicMathPackage::new().as_shared_module(),
        "string" => MoreStringPackage::new().as_shared_module(),
        "array" => BasicArrayPackage::new().as_shared_module(),
        "map" => BasicMapPackage::new().as_shared_module(),
        "time" => BasicTimePackage::new().as_shared_module(),
        "fn" => BasicFnPackage::new().as_shared_module(),
        "iter" => BasicIteratorPackage::new().as_shared_module(),
        _ => return false,
    };
    engine.register_global_module(module);
    true
}

fn parse_diagnostic(err: &ParseError, file: &str) -> Diagnostic {
    let pos = err.position();
    Diagnostic::error(err.err_type().to_string(), Location::at(file, pos.line(), pos.position()))
}

impl ScriptCompiler for RhaiCompiler {
    fn compile(&self, source: &SourcePath, references: &ReferenceSet) -> Result<Arc<dyn Script>, CompileError> {
        let file = source.as_str();
        let text = fs::read_to_string(source.to_path_buf()).map_err(|e| {
            CompileError::Diagnostics(vec![Diagnostic::error(
                format!("source file could not be read: {e}"),
                Location::file(file),
            )])
        })?;

        let (engine, mut diagnostics) = self.build_engine(references, file);
        let ast = match engine.compile(&text) {
            Ok(ast) => Some(ast),
            Err(err) => {
                diagnostics.push(parse_diagnostic(&err, file));
                None
            }
        };

        let ast = match ast {
            Some(ast) if !has_errors(&diagnostics) => ast,
            _ => return Err(CompileError::Diagnostics(diagnostics)),
        };

        let entry_point = self.select_entry_point(&ast, file, &mut diagnostics);
        for warning in &diagnostics {
            warn!(path = file, diagnostic = %warning, "Script compiled with warning");
        }
        let entry_point = entry_point.ok_or_else(|| CompileError::NoScriptTypeFound(source.clone()))?;

        debug!(
            path = file,
            entry_point = %entry_point,
            functions = ast.iter_functions().count(),
            references = references.len(),
            "Script compiled"
        );
        Ok(Arc::new(RhaiScript::new(source.clone(), Arc::new(engine), ast, entry_point)))
    }
}
