//! Unit tests for CLI commands

use crate::cli::{check_scripts, CheckStatus, Cli, Commands};
use crate::config::ServerConfig;
use clap::Parser;
use std::fs;

#[test]
fn test_serve_command_with_flags() {
    let cli = Cli::try_parse_from([
        "scriptpage",
        "serve",
        "--root",
        "site",
        "--addr",
        "127.0.0.1:9000",
        "--watch",
        "--hide-diagnostics",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            root,
            addr,
            watch,
            hide_diagnostics,
            no_listing,
        } => {
            assert_eq!(root.unwrap().to_string_lossy(), "site");
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
            assert!(watch);
            assert!(hide_diagnostics);
            assert!(!no_listing);
        }
        _ => panic!("Expected Serve command"),
    }
}

#[test]
fn test_check_requires_files() {
    assert!(Cli::try_parse_from(["scriptpage", "check"]).is_err());

    let cli = Cli::try_parse_from(["scriptpage", "check", "a.rhai", "b.rhai", "--json"]).unwrap();
    match cli.command {
        Commands::Check { files, json } => {
            assert_eq!(files.len(), 2);
            assert!(json);
        }
        _ => panic!("Expected Check command"),
    }
}

#[test]
fn test_global_config_flag() {
    let cli = Cli::try_parse_from(["scriptpage", "serve", "--config", "scriptpage.yaml"]).unwrap();
    assert_eq!(cli.config.unwrap().to_string_lossy(), "scriptpage.yaml");
}

#[test]
fn test_check_scripts_reports_each_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let ok = dir.path().join("ok.rhai");
    let broken = dir.path().join("broken.rhai");
    let empty = dir.path().join("empty.rhai");
    fs::write(&ok, "fn render(request) { \"<p>ok</p>\" }").unwrap();
    fs::write(&broken, "fn render(request) { let x = ; }").unwrap();
    fs::write(&empty, "let unused = 1;").unwrap();

    let results = check_scripts(&[ok, broken, empty], &ServerConfig::default());
    assert_eq!(results[0].status, CheckStatus::Ok);
    assert_eq!(results[1].status, CheckStatus::Failed);
    assert!(!results[1].diagnostics.is_empty());
    assert_eq!(results[2].status, CheckStatus::NoEntryPoint);

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[1]["status"], "failed");
    assert_eq!(json[1]["diagnostics"][0]["severity"], "error");
}
