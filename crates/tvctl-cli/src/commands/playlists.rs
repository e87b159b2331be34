//! Playlist command handlers

use anyhow::{Context, Result};

use tvctl_core::models::Acknowledgement;
use tvctl_core::Config;

use super::connect;
use crate::output::Output;

/// List playlists
pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let playlists = client
        .playlists
        .list_playlists()
        .await
        .context("Failed to load playlists")?;

    output.print_playlists(&playlists);
    Ok(())
}

/// Refresh one playlist's streams
pub async fn refresh(config: &Config, id: i64, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let ack = client
        .playlists
        .refresh_playlist(id)
        .await
        .with_context(|| format!("Failed to refresh playlist {}", id))?;

    report(&ack, &format!("Refresh started for playlist {}", id), output);
    Ok(())
}

/// Refresh every active playlist
pub async fn refresh_all(config: &Config, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let ack = client
        .playlists
        .refresh_all_playlists()
        .await
        .context("Failed to refresh playlists")?;

    report(&ack, "Refresh started for all playlists", output);
    Ok(())
}

/// Refresh VOD content of an Xtream Codes playlist
pub async fn refresh_vod(config: &Config, id: i64, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let ack = client
        .playlists
        .refresh_vod(id)
        .await
        .with_context(|| format!("Failed to refresh VOD for playlist {}", id))?;

    report(&ack, &format!("VOD refresh started for playlist {}", id), output);
    Ok(())
}

/// Refresh account info (expiry, connections) of an Xtream Codes profile
pub async fn refresh_info(config: &Config, profile_id: i64, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let ack = client
        .playlists
        .refresh_account_info(profile_id)
        .await
        .with_context(|| format!("Failed to refresh account info for profile {}", profile_id))?;

    report(
        &ack,
        &format!("Account info refreshed for profile {}", profile_id),
        output,
    );
    Ok(())
}

/// Enable or disable a playlist
pub async fn set_active(config: &Config, id: i64, active: bool, output: &Output) -> Result<()> {
    let client = connect(config)?;
    client
        .playlists
        .set_active(id, active)
        .await
        .with_context(|| format!("Failed to update playlist {}", id))?;

    output.success(&format!(
        "Playlist {} {}",
        id,
        if active { "enabled" } else { "disabled" }
    ));
    Ok(())
}

/// Print the server's acknowledgement, falling back to `default` text
fn report(ack: &Acknowledgement, default: &str, output: &Output) {
    if output.is_json() {
        output.print_json(ack);
        return;
    }
    output.success(ack.summary().unwrap_or(default));
}
