//! Status command handler

use anyhow::{Context, Result};
use tracing::debug;

use tvctl_core::Config;

use super::connect;
use crate::output::{Output, OutputFormat};

/// Show server version and who we are logged in as
pub async fn show(config: &Config, output: &Output) -> Result<()> {
    let client = connect(config)?;

    let version = client
        .accounts
        .version()
        .await
        .with_context(|| format!("Could not reach {}", config.server_url))?;

    // A stale token is reported, not fatal
    let user = match &config.token {
        Some(_) => match client.accounts.me().await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("Token rejected: {}", e);
                None
            }
        },
        None => None,
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_url": config.server_url,
                    "version": version.version,
                    "timestamp": version.timestamp,
                    "user": user.as_ref().map(|u| &u.username),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", version.version);
        }
        OutputFormat::Human => {
            println!("tvctl Status");
            println!("============");
            println!();
            println!("Server:");
            println!("  URL:     {}", config.server_url);
            match &version.timestamp {
                Some(ts) => println!("  Version: {} ({})", version.version, ts),
                None => println!("  Version: {}", version.version),
            }
            println!();
            println!("Session:");
            match (&user, &config.token) {
                (Some(user), _) => println!("  Logged in as {}", user.username),
                (None, Some(_)) => println!("  Stored token was rejected; run `tvctl login`"),
                (None, None) => println!("  Not logged in"),
            }
        }
    }

    Ok(())
}
