//! # CLI Module
//!
//! Command-line interface of the `scriptpage` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve a document root:
//!
//! ```bash
//! scriptpage serve --root public --addr 127.0.0.1:8181 --watch
//! ```
//!
//! Options:
//! - `--root <DIR>` - Document root (default: `public`)
//! - `--addr <ADDR>` - Listen address (default: `0.0.0.0:8181`)
//! - `--watch` - Recompile scripts when their files change
//! - `--hide-diagnostics` - Show the generic failure page instead of compiler output
//! - `--no-listing` - Disable directory listings
//!
//! ### `check`
//!
//! Compile scripts without serving them; exits non-zero if any fails:
//!
//! ```bash
//! scriptpage check public/index.rhai public/admin/*.rhai
//! scriptpage check --json public/index.rhai
//! ```
//!
//! Both commands accept `--config <FILE>` (or `SCRIPTPAGE_CONFIG`) pointing at a YAML
//! config file; see [`crate::config`].

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{check_scripts, resolve_config, run, run_cli, CheckResult, CheckStatus, Cli, Commands};
