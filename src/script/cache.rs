//! # Script Cache
//!
//! Thread-safe cache of compiled script units keyed by normalized source path.
//!
//! ## Overview
//!
//! Compiling a script builds an engine and parses the whole file, which is far too
//! expensive to repeat on every request. The cache compiles a path on its first
//! request and shares the resulting [`ScriptUnit`] with every later request.
//! Entries live for the lifetime of the cache unless explicitly invalidated; there
//! is no eviction.
//!
//! ## Thread Safety
//!
//! The map sits behind an `RwLock`:
//! - Cache hits take the read lock only
//! - No lock is held while compiling
//! - Inserts re-check under the write lock, and the first unit stored for a path wins
//!
//! Concurrent first requests for one path may therefore each compile, but they all
//! end up returning the same cached unit.
//!
//! ## Outcomes
//!
//! | Compiler result                    | Cached         | Returned        |
//! |------------------------------------|----------------|-----------------|
//! | success                            | `Executable`   | `Some(unit)`    |
//! | [`CompileError::Diagnostics`]      | `Error`        | `Some(unit)`    |
//! | [`CompileError::NoScriptTypeFound`]| nothing        | `None`          |

use super::compiler::{CompileError, ScriptCompiler};
use super::path::SourcePath;
use super::references::ReferenceSet;
use super::unit::{ErrorScript, ScriptUnit};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

/// Behaviour switches for a [`ScriptCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// When false every request compiles and nothing is stored
    pub enabled: bool,
    /// Whether error units show compiler diagnostics to clients
    pub show_diagnostics: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            show_diagnostics: true,
        }
    }
}

/// Concurrent map from source path to compiled script unit.
///
/// # Example
///
/// ```rust,no_run
/// use scriptpage::script::{CacheOptions, ReferenceSet, RhaiCompiler, ScriptCache};
/// use std::sync::Arc;
///
/// let cache = ScriptCache::new(Arc::new(RhaiCompiler::new()), ReferenceSet::default(), CacheOptions::default());
/// if let Some(unit) = cache.get_or_compile("public/index.rhai") {
///     println!("compiled, error unit: {}", unit.is_error());
/// }
/// ```
pub struct ScriptCache {
    entries: RwLock<HashMap<SourcePath, ScriptUnit>>,
    compiler: Arc<dyn ScriptCompiler>,
    references: ReferenceSet,
    options: CacheOptions,
}

impl ScriptCache {
    pub fn new(compiler: Arc<dyn ScriptCompiler>, references: ReferenceSet, options: CacheOptions) -> Self {
        info!(
            enabled = options.enabled,
            show_diagnostics = options.show_diagnostics,
            references = references.len(),
            "Initializing script cache"
        );
        Self {
            entries: RwLock::new(HashMap::new()),
            compiler,
            references,
            options,
        }
    }

    /// References every compilation uses.
    #[must_use]
    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Mutable access to the references. Only reachable while the cache is
    /// exclusively owned, i.e. before it is shared behind an `Arc`.
    pub fn references_mut(&mut self) -> &mut ReferenceSet {
        &mut self.references
    }

    #[must_use]
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Get the cached unit for `path`, compiling it on a miss.
    ///
    /// # Returns
    ///
    /// * `Some(ScriptUnit::Executable)` - the script compiled
    /// * `Some(ScriptUnit::Error)` - the script failed to compile; its diagnostics
    ///   are cached so later requests do not recompile
    /// * `None` - the script defines no entry point; nothing is cached
    pub fn get_or_compile(&self, path: impl Into<SourcePath>) -> Option<ScriptUnit> {
        let path = path.into();

        if self.options.enabled {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(unit) = entries.get(&path) {
                debug!(path = %path, "Script cache hit");
                return Some(unit.clone());
            }
        }

        debug!(path = %path, "Script cache miss, compiling");
        let unit = self.compile(&path)?;

        if !self.options.enabled {
            return Some(unit);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&path) {
            debug!(path = %path, "Script compiled by another request, using stored unit");
            return Some(existing.clone());
        }
        entries.insert(path.clone(), unit.clone());
        info!(
            path = %path,
            error_unit = unit.is_error(),
            cache_size = entries.len(),
            "Script unit cached"
        );
        Some(unit)
    }

    fn compile(&self, path: &SourcePath) -> Option<ScriptUnit> {
        match self.compiler.compile(path, &self.references) {
            Ok(script) => Some(ScriptUnit::Executable(script)),
            Err(CompileError::Diagnostics(diagnostics)) => {
                let errors = diagnostics.iter().filter(|d| d.is_error()).count();
                for diagnostic in &diagnostics {
                    debug!(path = %path, diagnostic = %diagnostic, "Compiler diagnostic");
                }
                error!(
                    path = %path,
                    errors = errors,
                    warnings = diagnostics.len() - errors,
                    "Script failed to compile"
                );
                Some(ScriptUnit::Error(Arc::new(ErrorScript::new(
                    path.clone(),
                    diagnostics,
                    self.options.show_diagnostics,
                ))))
            }
            Err(CompileError::NoScriptTypeFound(_)) => {
                warn!(path = %path, "Script defines no entry point");
                None
            }
        }
    }

    /// Drop the entry for `path` so the next request recompiles it.
    ///
    /// Returns true if an entry was removed.
    pub fn invalidate(&self, path: impl Into<SourcePath>) -> bool {
        let path = path.into();
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&path)
            .is_some();
        if removed {
            info!(path = %path, "Script cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        info!(dropped = dropped, "Script cache cleared");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, path: impl Into<SourcePath>) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&path.into())
    }
}

impl std::fmt::Debug for ScriptCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptCache")
            .field("entries", &self.len())
            .field("references", &self.references)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
