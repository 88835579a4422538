//! CLI command implementations

use anyhow::{bail, Result};
use rand::{distr::Alphanumeric, Rng};
use std::fs;

use crate::auth::{hash_password, Role};
use crate::cli::{info, success, warn};
use crate::config::{self, Config};
use crate::store::{self, NewUser};

/// Initialize a new clinic.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new("clinic.toml");

    if config_path.exists() {
        warn("clinic.toml already exists");
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success("Created clinic.toml");
    info("Set JWT_SECRET (see 'clinic gen-secret') and run 'clinic serve'");

    Ok(())
}

/// Start the HTTP server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting server on {}:{}", host, port));
    crate::api::run_server(config, &host, port).await?;
    Ok(())
}

/// Print a bcrypt hash of a password
pub async fn hash_password_cmd(password: &str, cost: Option<u32>) -> Result<()> {
    let cost = match cost {
        Some(cost) => cost,
        None => load_config()?.auth.bcrypt_cost,
    };
    let hash = hash_password(password, cost)?;
    println!("{}", hash);
    Ok(())
}

/// Print a random alphanumeric secret
pub async fn gen_secret(length: usize) -> Result<()> {
    if length < 32 {
        bail!("A signing secret should be at least 32 characters");
    }
    println!("{}", generate_secret(length));
    Ok(())
}

pub fn generate_secret(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Create an administrator account
pub async fn create_admin(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    let config = load_config()?;
    if config.database.connection_url().is_none() {
        bail!("database.url is not configured; an admin in the in-memory store would be lost on exit");
    }

    let store = store::open_store(&config.database).await?;
    let password_hash = hash_password(password, config.auth.bcrypt_cost)?;

    let user = store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: None,
            role: Role::Admin,
            date_of_birth: None,
        })
        .await?;

    success(&format!("Created admin {} (id {})", user.email, user.id));
    Ok(())
}

fn load_config() -> Result<Config> {
    Ok(config::load_config()?)
}
