use scriptpage::cli::run_cli;
use scriptpage::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging(&LogConfig::from_env())?;
    run_cli()
}
