//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use tvctl_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_url": config.server_url,
                    "logged_in": config.token.is_some(),
                    "poll_interval_secs": config.poll_interval_secs,
                    "poll_max_attempts": config.poll_max_attempts,
                    "upload_timeout_secs": config.upload_timeout_secs,
                    "page_size": config.page_size,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.server_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  server_url:          {}", config.server_url);
            println!(
                "  token:               {}",
                if config.token.is_some() { "(set)" } else { "(not set)" }
            );
            println!("  poll_interval_secs:  {}", config.poll_interval_secs);
            println!("  poll_max_attempts:   {}", config.poll_max_attempts);
            println!("  upload_timeout_secs: {}", config.upload_timeout_secs);
            println!("  page_size:           {}", config.page_size);
            println!(
                "  log_file:            {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    // "none" clears optional keys
    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value).context(
        "Valid keys: server_url, token, poll_interval_secs, poll_max_attempts, \
         upload_timeout_secs, page_size, log_file",
    )?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    // Never echo the token back
    let shown = if key == "token" && !value.is_empty() { "(hidden)" } else { value.as_str() };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_set_writes_to_cli_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        set(
            "server_url".to_string(),
            "http://tv.local:9191/".to_string(),
            Some(&path),
            &quiet(),
        )
        .unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("http://tv.local:9191"));
        assert!(!saved.contains("9191/"));
    }

    #[test]
    fn test_set_none_clears_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        set("token".to_string(), "abc".to_string(), Some(&path), &quiet()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("abc"));

        set("token".to_string(), "none".to_string(), Some(&path), &quiet()).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("abc"));
    }

    #[test]
    fn test_set_unknown_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let err = set("colour".to_string(), "red".to_string(), Some(&path), &quiet()).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown config key: colour"));
        assert!(!path.exists());
    }
}
