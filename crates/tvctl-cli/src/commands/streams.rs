//! Stream command handlers

use anyhow::{Context, Result};

use tvctl_core::models::FilterOptions;
use tvctl_core::{Config, Query};

use super::{connect, ListArgs};
use crate::output::{Output, OutputFormat};

/// Query parameter the stream table filters groups by
const GROUP_PARAM: &str = "channel_group";

/// List one page of the stream table
pub async fn list(config: &Config, group: Option<String>, args: ListArgs, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let query = args.to_query(GROUP_PARAM, group.as_deref(), config);
    let page_size = query.page_size();

    let page = client
        .streams
        .query(query)
        .await
        .context("Failed to load streams")?;

    if page.page != args.page.max(1) {
        output.warn(&format!(
            "Page {} is out of range, showing page {}",
            args.page, page.page
        ));
    }

    output.print_streams(&page, page_size);
    Ok(())
}

/// Delete one or more streams
pub async fn delete(config: &Config, ids: Vec<i64>, output: &Output) -> Result<()> {
    let client = connect(config)?;

    match ids.as_slice() {
        [id] => client
            .streams
            .delete_stream(*id)
            .await
            .with_context(|| format!("Failed to delete stream {}", id))?,
        _ => client
            .streams
            .delete_streams(&ids)
            .await
            .context("Failed to delete streams")?,
    }

    output.success(&format!("Deleted {} stream(s)", ids.len()));
    Ok(())
}

/// Show the groups and accounts the stream filters can choose from
///
/// A failed lookup prints empty options with a warning instead of failing.
pub async fn filters(config: &Config, group: Option<String>, output: &Output) -> Result<()> {
    let client = connect(config)?;

    let mut query = Query::new();
    if let Some(group) = group.filter(|g| !g.is_empty()) {
        query = query.with_param(GROUP_PARAM, group);
    }

    let options = match client.streams.filter_options(&query).await {
        Ok(options) => options,
        Err(e) => {
            output.warn(&format!("Could not load filter options: {}", e));
            FilterOptions::default()
        }
    };

    match output.format {
        OutputFormat::Json => output.print_json(&options),
        OutputFormat::Quiet => {
            for group in &options.groups {
                println!("{}", label(group));
            }
        }
        OutputFormat::Human => {
            println!("Groups ({}):", options.groups.len());
            for group in &options.groups {
                println!("  {}", label(group));
            }
            println!();
            println!("Accounts ({}):", options.m3u_accounts.len());
            for account in &options.m3u_accounts {
                println!("  {}", label(account));
            }
        }
    }

    Ok(())
}

/// Display text for a filter option: a bare string or an object's `name`
fn label(option: &serde_json::Value) -> String {
    match option {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label() {
        assert_eq!(label(&json!("Sports")), "Sports");
        assert_eq!(label(&json!({"id": 3, "name": "Provider A"})), "Provider A");
        assert_eq!(label(&json!(7)), "7");
    }
}
