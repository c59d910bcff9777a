use colored::*;
use std::env;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `TOURISM_DEBUG` or `--verbose` turn on
/// debug output for the workspace crates.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose || env::var("TOURISM_DEBUG").is_ok() {
        "tourism_cli=debug,tourism_session=debug,tourism_core=debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn log_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
