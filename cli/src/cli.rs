use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tourism_core::SessionKind;

/// Command-line client for the tourism API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "TOURISM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the session storage file
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and persist the session
    Login {
        kind: KindArg,

        /// Username for admins, email for tourists
        #[arg(short, long)]
        identifier: String,

        /// Prompted for when omitted
        #[arg(short, long, env = "TOURISM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout { kind: KindArg },

    /// Verify the stored session with the server and show its principal
    Whoami { kind: KindArg },

    /// Show which sessions are stored locally, without contacting the server
    Status,

    /// Send an arbitrary request through the session pipeline
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,

        /// Path relative to the base URL, e.g. /admin/attractions
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Session kind to authenticate with instead of the path's default
        #[arg(long)]
        kind: Option<KindArg>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the effective configuration to the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Admin,
    Tourist,
}

impl From<KindArg> for SessionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Admin => SessionKind::Admin,
            KindArg::Tourist => SessionKind::Tourist,
        }
    }
}
