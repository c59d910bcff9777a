use colored::*;
use serde_json::Value;
use tourism_core::{Session, SessionKind};
use tourism_session::Navigator;

/// Tells the terminal user how to get back in after a forced logout.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, kind: SessionKind, surface: &str) {
        eprintln!(
            "{} Your {} session is no longer valid ({}). Run {} to sign in again.",
            "!".yellow().bold(),
            kind,
            surface.dimmed(),
            format!("tourism-cli login {} -i <identifier>", kind).green().bold()
        );
    }
}

/// Print one session's principal
pub fn print_session(session: &Session) {
    let principal = session.principal();
    println!(
        "{} {} (#{})",
        format!("{}:", session.kind()).blue().bold(),
        principal.name,
        principal.id
    );
    if let Some(handle) = principal.handle() {
        println!("  {}", handle);
    }
    if let Some(expires_at) = session.expires_at() {
        println!("  {} {}", "expires".dimmed(), expires_at.to_rfc3339());
    }
}

/// Print the local state of a kind without contacting the server
pub fn print_status(kind: SessionKind, session: Option<&Session>) {
    match session {
        Some(session) if session.is_expired() => {
            println!("{:<8} {}", kind.as_str(), "expired".yellow());
        }
        Some(session) => {
            let who = session
                .principal()
                .handle()
                .unwrap_or(session.principal().name.as_str())
                .to_string();
            println!("{:<8} {} as {}", kind.as_str(), "signed in".green(), who);
        }
        None => println!("{:<8} {}", kind.as_str(), "signed out".dimmed()),
    }
}

/// Pretty-print a response body
pub fn print_json(body: &Value) {
    match serde_json::to_string_pretty(body) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", body),
    }
}

/// Show usage instructions when no command is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "tourism-cli login admin -i root".green().bold());
    println!("    Sign in to the admin dashboard API");
    println!();
    println!("  {}", "tourism-cli request GET /admin/attractions".green().bold());
    println!("    Send a request with the matching session attached");
    println!();
    println!("  {}", "tourism-cli status".green().bold());
    println!("    Show stored admin and tourist sessions");
    println!();
    println!("  {}", "tourism-cli config init".green().bold());
    println!("    Write the current settings to the config file");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --config <PATH>     TOML config file");
    println!("  --base-url <URL>    Override the API base URL");
    println!("  --help              Show this help message");
    println!();
}
