use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use serde_json::Value;
use std::path::Path;
use tourism_core::config::ClientConfig;
use tourism_core::{ApiError, Credentials, Method, OutboundRequest, SessionKind};
use tourism_session::ApiClient;
use tracing::debug;

use crate::output::{print_json, print_session, print_status};

/// Log in as `kind`, prompting for the password when not supplied.
pub async fn run_login(
    client: &ApiClient,
    kind: SessionKind,
    identifier: String,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => dialoguer::Password::new()
            .with_prompt(format!("Password for {}", identifier))
            .interact()
            .context("Failed to read password")?,
    };

    let credentials = Credentials::new(identifier, password);
    match client.session(kind).login(&credentials).await {
        Ok(session) => {
            println!("{}", "Login successful".green().bold());
            print_session(&session);
            Ok(())
        }
        Err(e) => Err(anyhow!("Login failed: {}", e.message())),
    }
}

pub async fn run_logout(client: &ApiClient, kind: SessionKind) -> Result<()> {
    client.session(kind).logout().await;
    println!("Logged out of the {} session", kind);
    Ok(())
}

/// Verify the stored session with the server.
pub async fn run_whoami(client: &ApiClient, kind: SessionKind) -> Result<()> {
    let manager = client.session(kind);
    if !manager.check_auth().await {
        return Err(anyhow!("No valid {} session", kind));
    }
    match manager.current() {
        Some(session) => {
            print_session(&session);
            Ok(())
        }
        None => Err(anyhow!("No valid {} session", kind)),
    }
}

pub fn run_status(client: &ApiClient) {
    for kind in SessionKind::ALL {
        print_status(kind, client.session(kind).current().as_ref());
    }
}

/// Send an arbitrary request and print the response body.
pub async fn run_request(
    client: &ApiClient,
    method: &str,
    path: String,
    body: Option<String>,
    kind: Option<SessionKind>,
) -> Result<()> {
    let method = parse_method(method)?;
    let mut request = OutboundRequest::new(method, path);
    if let Some(body) = body {
        let body: Value = serde_json::from_str(&body).context("Request body is not valid JSON")?;
        request = request.with_body(body);
    }
    if let Some(kind) = kind {
        request = request.scoped(kind);
    }

    match client.send(request).await {
        Ok(body) => {
            print_json(&body);
            Ok(())
        }
        Err(ApiError::Validation {
            message,
            field_errors,
        }) => {
            for (field, messages) in &field_errors {
                for text in messages {
                    eprintln!("  {} {}", format!("{}:", field).yellow(), text);
                }
            }
            Err(anyhow!("Validation failed: {}", message))
        }
        Err(e) => {
            debug!(error = ?e, "Request failed");
            Err(anyhow!(e))
        }
    }
}

/// Write `config` to `path`, refusing to overwrite unless `force` is set.
pub fn run_config_init(config: &ClientConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to replace it",
            path.display()
        );
    }
    config
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} {}", "Wrote".green().bold(), path.display());
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("Invalid HTTP method: {}", method))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_is_case_insensitive() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("Delete").unwrap(), Method::DELETE);
        assert!(parse_method("GE T").is_err());
    }

    #[test]
    fn test_config_init_writes_loadable_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tourism-cli").join("config.toml");
        let config = ClientConfig {
            base_url: "https://tourism.example.com/api".to_string(),
            ..ClientConfig::default()
        };

        run_config_init(&config, &path, false).unwrap();
        assert_eq!(ClientConfig::load(Some(&path)).unwrap(), config);

        assert!(run_config_init(&ClientConfig::default(), &path, false).is_err());
        assert_eq!(ClientConfig::load(Some(&path)).unwrap().base_url, config.base_url);

        run_config_init(&ClientConfig::default(), &path, true).unwrap();
        assert_eq!(ClientConfig::load(Some(&path)).unwrap(), ClientConfig::default());
    }
}
