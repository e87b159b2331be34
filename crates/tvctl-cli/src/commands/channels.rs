//! Channel command handlers

use anyhow::{Context, Result};

use tvctl_core::Config;

use super::{connect, ListArgs};
use crate::output::Output;

/// Query parameter the channel table filters groups by
const GROUP_PARAM: &str = "channel_group";

/// List one page of the channel table
pub async fn list(config: &Config, group: Option<String>, args: ListArgs, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let query = args.to_query(GROUP_PARAM, group.as_deref(), config);
    let page_size = query.page_size();

    let page = client
        .channels
        .query(query)
        .await
        .context("Failed to load channels")?;

    // A stale page request lands on page 1; say so
    if page.page != args.page.max(1) {
        output.warn(&format!(
            "Page {} is out of range, showing page {}",
            args.page, page.page
        ));
    }

    output.print_channels(&page, page_size);
    Ok(())
}

/// Delete one or more channels
pub async fn delete(config: &Config, ids: Vec<i64>, output: &Output) -> Result<()> {
    let client = connect(config)?;

    match ids.as_slice() {
        [id] => client
            .channels
            .delete_channel(*id)
            .await
            .with_context(|| format!("Failed to delete channel {}", id))?,
        _ => client
            .channels
            .delete_channels(&ids)
            .await
            .context("Failed to delete channels")?,
    }

    output.success(&format!("Deleted {} channel(s)", ids.len()));
    Ok(())
}
