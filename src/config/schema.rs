//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on the time spent serving any single request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Authentication and access gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign identity tokens. Required to serve.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Production mode marks the session cookie `Secure`
    #[serde(default)]
    pub production: bool,

    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,

    #[serde(default = "default_admin_paths")]
    pub admin_paths: Vec<String>,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,
}

fn default_token_ttl_days() -> i64 {
    7
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_protected_paths() -> Vec<String> {
    ["/dashboard", "/profile", "/settings", "/admin"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_admin_paths() -> Vec<String> {
    vec!["/admin".to_string()]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_unauthorized_path() -> String {
    "/unauthorized".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_days: default_token_ttl_days(),
            bcrypt_cost: default_bcrypt_cost(),
            production: false,
            protected_paths: default_protected_paths(),
            admin_paths: default_admin_paths(),
            login_path: default_login_path(),
            unauthorized_path: default_unauthorized_path(),
        }
    }
}

/// Data store configuration. An empty url selects the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

impl DatabaseConfig {
    /// The connection string, if one is configured and non-blank
    pub fn connection_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl AuthConfig {
    /// The signing secret, if one is configured and non-blank
    pub fn signing_secret(&self) -> Option<&str> {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }
}
