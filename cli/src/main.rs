use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tourism_core::config::{get_default_config_file, ClientConfig, APP_NAME};
use tourism_session::{ApiClient, FileBackend, TokenStore};
use tracing::{debug, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::{Args, Command, ConfigCommand};
use crate::logging::{init_logging, log_error};
use crate::output::{print_usage_instructions, TerminalNavigator};

/// Main function - Builds the session pipeline and runs one command
#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let Some(command) = args.command else {
        print_usage_instructions();
        return Ok(());
    };

    // `config init` may name a file that does not exist yet
    let config_source = match &command {
        Command::Config { .. } => args.config.as_deref().filter(|path| path.exists()),
        _ => args.config.as_deref(),
    };
    let mut config = ClientConfig::load(config_source).context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(storage) = args.storage {
        config.storage_path = Some(storage);
    }

    let storage_path = config.resolved_storage_path()?;
    debug!("Using session storage at {}", storage_path.display());
    info!("Using API at {}", config.base_url);

    let store = TokenStore::new(Arc::new(FileBackend::new(storage_path)));
    let client = ApiClient::new(config, store, Arc::new(TerminalNavigator))
        .context("Failed to initialize API client")?;
    client.rehydrate_all().await;

    match command {
        Command::Login {
            kind,
            identifier,
            password,
        } => app::run_login(&client, kind.into(), identifier, password).await,
        Command::Logout { kind } => app::run_logout(&client, kind.into()).await,
        Command::Whoami { kind } => app::run_whoami(&client, kind.into()).await,
        Command::Status => {
            app::run_status(&client);
            Ok(())
        }
        Command::Request {
            method,
            path,
            body,
            kind,
        } => app::run_request(&client, &method, path, body, kind.map(Into::into)).await,
        Command::Config {
            action: ConfigCommand::Init { force },
        } => {
            let path = match args.config {
                Some(path) => path,
                None => get_default_config_file(APP_NAME)?,
            };
            app::run_config_init(client.dispatcher().config(), &path, force)
        }
    }
}
