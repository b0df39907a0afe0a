//! # Configuration Module
//!
//! Server settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults ([`ServerConfig::default`])
//! 2. An optional YAML file ([`ServerConfig::load`])
//! 3. `SCRIPTPAGE_*` environment variables ([`ServerConfig::apply_env`])
//!
//! Command line flags are applied on top by the CLI.
//!
//! ## Environment Variables
//!
//! | Variable                     | Field              | Format                          |
//! |------------------------------|--------------------|---------------------------------|
//! | `SCRIPTPAGE_ADDR`            | `addr`             | `host:port`                     |
//! | `SCRIPTPAGE_ROOT`            | `root_path`        | path                            |
//! | `SCRIPTPAGE_SHOW_DIAGNOSTICS`| `show_diagnostics` | `on`/`off`, `true`/`false`, `1`/`0` |
//! | `SCRIPTPAGE_SCRIPT_CACHE`    | `cache_enabled`    | same as above                   |
//! | `SCRIPTPAGE_STACK_SIZE`      | `stack_size`       | decimal or `0x` hex             |
//!
//! ## Example
//!
//! ```yaml
//! addr: 127.0.0.1:8181
//! root_path: public
//! references: [core, std, string, math, array, map]
//! show_diagnostics: false
//! ```
//!
//! Coroutine stacks need headroom: the Rhai parser and evaluator are recursive,
//! so the default stack is larger than a plain request handler would need. The
//! script call depth limit is derived from `stack_size` (see
//! [`ServerConfig::script_limits`]).

use crate::script::{ReferenceSet, ScriptLimits, DEFAULT_ENTRY_POINT};
use crate::server::DEFAULT_INDEX_FILES;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default coroutine stack size (1 MiB).
pub const DEFAULT_STACK_SIZE: usize = 0x100000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address
    pub addr: String,
    /// Document root; request paths are resolved under it
    pub root_path: PathBuf,
    /// Extensions (without dot) served by the script handler
    pub script_extensions: Vec<String>,
    /// Render an index for directories without an index file
    pub directory_listing: bool,
    /// Files tried, in order, when a directory is requested
    pub index_files: Vec<String>,
    /// Show compiler diagnostics and script errors to clients
    pub show_diagnostics: bool,
    /// Cache compiled scripts; when off every request recompiles
    pub cache_enabled: bool,
    /// Libraries every script is compiled against
    pub references: ReferenceSet,
    /// Name of the function a script must define
    pub entry_point: String,
    /// Invalidate cached scripts when their files change
    pub watch: bool,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8181".to_string(),
            root_path: PathBuf::from("public"),
            script_extensions: vec!["rhai".to_string()],
            directory_listing: true,
            index_files: DEFAULT_INDEX_FILES.iter().map(|s| s.to_string()).collect(),
            show_diagnostics: true,
            cache_enabled: true,
            references: ReferenceSet::default(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            watch: false,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl ServerConfig {
    /// Script engine limits sized for coroutines with `stack_size` bytes of stack.
    #[must_use]
    pub fn script_limits(&self) -> ScriptLimits {
        ScriptLimits::for_stack_size(self.stack_size)
    }

    /// Load a YAML config file; fields it omits keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `SCRIPTPAGE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from any variable source; `lookup` returns `None` for unset names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SCRIPTPAGE_ADDR") {
            self.addr = addr;
        }
        if let Some(root) = lookup("SCRIPTPAGE_ROOT") {
            self.root_path = PathBuf::from(root);
        }
        if let Some(value) = lookup("SCRIPTPAGE_SHOW_DIAGNOSTICS") {
            self.show_diagnostics = parse_flag("SCRIPTPAGE_SHOW_DIAGNOSTICS", &value)?;
        }
        if let Some(value) = lookup("SCRIPTPAGE_SCRIPT_CACHE") {
            self.cache_enabled = parse_flag("SCRIPTPAGE_SCRIPT_CACHE", &value)?;
        }
        if let Some(value) = lookup("SCRIPTPAGE_STACK_SIZE") {
            self.stack_size = parse_stack_size(&value).ok_or(ConfigError::InvalidValue {
                name: "SCRIPTPAGE_STACK_SIZE",
                value,
            })?;
        }
        Ok(())
    }
}

/// Parse a byte count given in decimal or as `0x` hex.
#[must_use]
pub fn parse_stack_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Parse an on/off switch.
pub fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}
