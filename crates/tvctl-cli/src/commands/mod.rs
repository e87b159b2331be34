//! Command handlers

pub mod accounts;
pub mod backups;
pub mod channels;
pub mod config;
pub mod logos;
pub mod playlists;
pub mod status;
pub mod streams;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use tvctl_core::{Client, Config, Query, SessionToken};

/// Paging and search flags shared by the table commands
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Free-text search on name
    #[arg(short, long)]
    pub search: Option<String>,

    /// Page number (1-based)
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Sort field, prefix with '-' for descending
    #[arg(short, long)]
    pub ordering: Option<String>,
}

impl ListArgs {
    /// Build the table query, with `group` sent under `group_key`
    pub fn to_query(&self, group_key: &str, group: Option<&str>, config: &Config) -> Query {
        let mut query = Query::new()
            .with_page(self.page.max(1))
            .with_page_size(self.page_size.unwrap_or(config.page_size).max(1));

        if let Some(group) = group.filter(|g| !g.is_empty()) {
            query = query.with_param(group_key, group);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query = query.with_param("name", search);
        }
        if let Some(ordering) = self.ordering.as_deref().filter(|o| !o.is_empty()) {
            query = query.with_param("ordering", ordering);
        }
        query
    }
}

/// Connect to the configured server with the stored session token
pub fn connect(config: &Config) -> Result<Client> {
    let session = match &config.token {
        Some(token) => SessionToken::with_token(token.clone()),
        None => SessionToken::new(),
    };
    Client::connect(config, Arc::new(session))
        .with_context(|| format!("Failed to connect to {}", config.server_url))
}
