//! Login and logout

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::warn;

use tvctl_core::Config;

use super::connect;
use crate::output::Output;

/// Log in and store the access token in the config file
pub async fn login(
    config: &Config,
    config_path: Option<&PathBuf>,
    username: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };

    let client = connect(config)?;
    let tokens = client
        .accounts
        .login(&username, &password)
        .await
        .context("Login failed")?;

    let mut saved = config.clone();
    saved.token = Some(tokens.access);
    save(&saved, config_path)?;

    output.success(&format!("Logged in as {}", username));
    Ok(())
}

/// End the server session and forget the stored token
pub async fn logout(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    if config.token.is_none() {
        output.message("Not logged in.");
        return Ok(());
    }

    let client = connect(config)?;
    // The local token goes away even if the server call fails
    if let Err(e) = client.accounts.logout().await {
        warn!("Server logout failed: {}", e);
        output.warn(&format!("Server logout failed: {}", e));
    }

    let mut saved = config.clone();
    saved.token = None;
    save(&saved, config_path)?;

    output.success("Logged out");
    Ok(())
}

fn save(config: &Config, config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&path)
        .context("Failed to save configuration")
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}
