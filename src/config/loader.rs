//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

use super::Config;

const CONFIG_FILENAME: &str = "clinic.toml";

/// Environment variable that overrides `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable that overrides `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Load configuration from clinic.toml, falling back to defaults plus the
/// environment when no file exists
pub fn load_config() -> Result<Config> {
    let config = match find_config_file() {
        Ok(path) => load_config_from_path(&path)?,
        Err(Error::ConfigNotFound) => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Config::default()
        }
        Err(e) => return Err(e),
    };
    Ok(apply_env_overrides(config))
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<std::path::PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

fn apply_env_overrides(mut config: Config) -> Config {
    if let Some(secret) = env::var(JWT_SECRET_ENV).ok().filter(|s| !s.is_empty()) {
        config.auth.jwt_secret = Some(secret);
    }
    if let Some(url) = env::var(DATABASE_URL_ENV).ok().filter(|s| !s.is_empty()) {
        config.database.url = Some(url);
    }
    config
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Compile-time constant pattern; a failure here is a bug, not a runtime condition
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Clinic Configuration

[server]
host = "0.0.0.0"
port = 3000
request_timeout_secs = 30

[auth]
# Required. Generate one with 'clinic gen-secret'.
jwt_secret = "${JWT_SECRET}"
token_ttl_days = 7
bcrypt_cost = 12
# Marks the session cookie Secure
production = false
protected_paths = ["/dashboard", "/profile", "/settings", "/admin"]
admin_paths = ["/admin"]
login_path = "/login"
unauthorized_path = "/unauthorized"

[database]
# Leave empty to use the in-memory store
url = "${DATABASE_URL:-}"
"#
}
