use crate::config::ServerConfig;
use crate::script::{CompileError, Diagnostic, RhaiCompiler, ScriptCompiler, SourcePath};
use crate::server::{AppService, HttpServer};
use crate::watch::watch_scripts;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for scriptpage
#[derive(Parser)]
#[command(name = "scriptpage")]
#[command(about = "Serve Rhai page scripts from a document root", long_about = None)]
#[command(version)]
pub struct Cli {
    /// YAML config file; `SCRIPTPAGE_*` variables and flags override it
    #[arg(short, long, global = true, env = "SCRIPTPAGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the page server
    Serve {
        /// Document root
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Address and port to bind the server to
        #[arg(long)]
        addr: Option<String>,

        /// Recompile scripts when their files change
        #[arg(long, default_value_t = false)]
        watch: bool,

        /// Show the generic failure page instead of compiler diagnostics
        #[arg(long, default_value_t = false)]
        hide_diagnostics: bool,

        /// Answer 404 for directories without an index file
        #[arg(long, default_value_t = false)]
        no_listing: bool,
    },
    /// Compile scripts and report their diagnostics
    Check {
        /// Script files to compile
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Outcome of compiling one file with `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Failed,
    NoEntryPoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub path: String,
    pub status: CheckStatus,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load the config file (if any) and apply environment overrides.
pub fn resolve_config(path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

/// Compile each file against the configured references.
pub fn check_scripts(files: &[PathBuf], config: &ServerConfig) -> Vec<CheckResult> {
    let compiler = RhaiCompiler::with_entry_point(config.entry_point.clone()).with_limits(config.script_limits());
    files
        .iter()
        .map(|file| {
            let source = SourcePath::from(file);
            let (status, diagnostics) = match compiler.compile(&source, &config.references) {
                Ok(_) => (CheckStatus::Ok, Vec::new()),
                Err(CompileError::Diagnostics(diagnostics)) => (CheckStatus::Failed, diagnostics),
                Err(CompileError::NoScriptTypeFound(_)) => (CheckStatus::NoEntryPoint, Vec::new()),
            };
            CheckResult {
                path: source.to_string(),
                status,
                diagnostics,
            }
        })
        .collect()
}

fn print_report(results: &[CheckResult], entry_point: &str) {
    for result in results {
        match result.status {
            CheckStatus::Ok => println!("ok      {}", result.path),
            CheckStatus::Failed => {
                println!("FAILED  {}", result.path);
                for diagnostic in &result.diagnostics {
                    println!("  {diagnostic}");
                }
            }
            CheckStatus::NoEntryPoint => {
                println!("FAILED  {}: no public `{entry_point}(request)` function", result.path)
            }
        }
    }
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the server fails to start,
/// or `check` finds a script that does not compile.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            root,
            addr,
            watch,
            hide_diagnostics,
            no_listing,
        } => {
            if let Some(root) = root {
                config.root_path = root;
            }
            if let Some(addr) = addr {
                config.addr = addr;
            }
            config.watch |= watch;
            config.show_diagnostics &= !hide_diagnostics;
            config.directory_listing &= !no_listing;
            serve(&config)
        }
        Commands::Check { files, json } => {
            let results = check_scripts(&files, &config);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_report(&results, &config.entry_point);
            }
            let failed = results.iter().filter(|r| r.status != CheckStatus::Ok).count();
            if failed > 0 {
                bail!("{failed} of {} script(s) failed to compile", results.len());
            }
            Ok(())
        }
    }
}

fn serve(config: &ServerConfig) -> Result<()> {
    may::config().set_stack_size(config.stack_size);
    info!(stack_size = config.stack_size, "Coroutine runtime configured");

    let service = AppService::from_config(config)?;
    let _watcher = match (config.watch, service.script_cache()) {
        (true, Some(cache)) => Some(
            watch_scripts(service.root(), Arc::clone(cache)).context("failed to watch document root")?,
        ),
        _ => None,
    };

    let handle = HttpServer(service)
        .start(config.addr.as_str())
        .with_context(|| format!("failed to bind {}", config.addr))?;
    handle.join().map_err(|e| anyhow!("server coroutine panicked: {e:?}"))
}

/// Parse the process arguments and run.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}
