use crate::errors::{ApiError, ApiResult};
use crate::types::SessionKind;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for the default config and storage locations
pub const APP_NAME: &str = "tourism-cli";

/// Prefix for environment variable overrides, e.g. `TOURISM_BASE_URL`
pub const ENV_PREFIX: &str = "TOURISM";

/// Endpoint paths for both session kinds, relative to the base URL
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub admin_login: String,
    pub admin_logout: String,
    pub admin_profile: String,
    pub tourist_login: String,
    pub tourist_logout: String,
    pub tourist_profile: String,
}

/// The three auth endpoints of a single kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindEndpoints<'a> {
    pub login: &'a str,
    pub logout: &'a str,
    pub profile: &'a str,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            admin_login: "/admin/login".to_string(),
            admin_logout: "/admin/logout".to_string(),
            admin_profile: "/admin/profile".to_string(),
            tourist_login: "/tourist/login".to_string(),
            tourist_logout: "/tourist/logout".to_string(),
            tourist_profile: "/tourist/profile".to_string(),
        }
    }
}

impl Endpoints {
    pub fn for_kind(&self, kind: SessionKind) -> KindEndpoints<'_> {
        match kind {
            SessionKind::Admin => KindEndpoints {
                login: &self.admin_login,
                logout: &self.admin_logout,
                profile: &self.admin_profile,
            },
            SessionKind::Tourist => KindEndpoints {
                login: &self.tourist_login,
                logout: &self.tourist_logout,
                profile: &self.tourist_profile,
            },
        }
    }
}

/// Configuration for the tourism API client
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://127.0.0.1:8000/api`
    pub base_url: String,
    /// Uniform request timeout in seconds
    pub timeout_secs: u64,
    /// Paths under this prefix are admin-scoped, everything else tourist-scoped
    pub admin_prefix: String,
    /// CSRF token handed out by the hosting page, if any
    pub csrf_token: Option<String>,
    pub csrf_header: String,
    /// Session storage file; defaults to `sessions.json` in the config dir
    pub storage_path: Option<PathBuf>,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            timeout_secs: 10,
            admin_prefix: "/admin".to_string(),
            csrf_token: None,
            csrf_header: "X-CSRF-TOKEN".to_string(),
            storage_path: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Layered load: built-in defaults, then the TOML file, then
    /// `TOURISM_*` environment variables.
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// used when present.
    pub fn load(path: Option<&Path>) -> ApiResult<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Ok(default_path) = get_default_config_file(APP_NAME) {
                    builder =
                        builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to load config: {}", e)))?;

        settings
            .try_deserialize::<Self>()
            .map_err(|e| ApiError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Saves configuration to a file as TOML
    pub fn save_to_file(&self, path: &Path) -> ApiResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| ApiError::Config(format!("Failed to serialize config: {}", e)))?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| ApiError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Where sessions are persisted between runs.
    pub fn resolved_storage_path(&self) -> ApiResult<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_default_config_dir(APP_NAME)?.join("sessions.json")),
        }
    }

    /// The request path relative to the base URL, with a leading `/`.
    ///
    /// Absolute URLs lose their origin and, when it matches, the base URL's
    /// own path.
    pub fn api_path(&self, path: &str) -> String {
        let relative = match Url::parse(path) {
            Ok(url) if url.has_host() => {
                let base_path = Url::parse(&self.base_url)
                    .map(|base| base.path().trim_end_matches('/').to_string())
                    .unwrap_or_default();
                let full = url.path();
                match full.strip_prefix(base_path.as_str()) {
                    Some(rest)
                        if !base_path.is_empty() && (rest.is_empty() || rest.starts_with('/')) =>
                    {
                        rest.to_string()
                    }
                    _ => full.to_string(),
                }
            }
            _ => path.to_string(),
        };

        if relative.starts_with('/') {
            relative
        } else {
            format!("/{}", relative)
        }
    }

    /// Scope of a request path: admin when under the admin prefix.
    pub fn scope_for_path(&self, path: &str) -> SessionKind {
        let prefix = self.admin_prefix.trim_end_matches('/');
        let path = self.api_path(path);
        let path = path.split(['?', '#']).next().unwrap_or_default();
        if !prefix.is_empty() && (path == prefix || path.starts_with(&format!("{}/", prefix))) {
            SessionKind::Admin
        } else {
            SessionKind::Tourist
        }
    }

    /// Join a request path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ApiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ApiError::Config("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ApiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
