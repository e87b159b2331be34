//! Operations on the service's entity families
//!
//! Each family wraps the shared [`Transport`] and, where the UI keeps
//! local state, the stores it writes into. [`Client`] assembles all of
//! them around one gateway.
//!
//! ## Usage
//!
//! ```ignore
//! let client = Client::connect(&config, Arc::new(StaticToken::new(token)))?;
//! let page = client.channels.query(Query::new().with_param("channel_group", "Sports")).await?;
//! let result = client.backups.create_backup(&NoProgress).await?;
//! ```

mod accounts;
mod backups;
mod channels;
mod logos;
mod playlists;
mod streams;

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::auth::TokenProvider;
use crate::config::Config;
use crate::error::ApiResult;
use crate::gateway::{Gateway, Transport};
use crate::models::{Channel, ChannelGroup, Logo, Playlist, Stream};
use crate::store::{EntityId, MemoryStore};
use crate::task::PollConfig;

pub use accounts::Accounts;
pub use backups::{Backups, BACKUP_STATUS_PREFIX};
pub use channels::Channels;
pub use logos::Logos;
pub use playlists::Playlists;
pub use streams::Streams;

/// In-memory stores backing every family with local state
#[derive(Debug, Default)]
pub struct Stores {
    pub channels: Arc<MemoryStore<Channel>>,
    pub channel_groups: Arc<MemoryStore<ChannelGroup>>,
    pub streams: Arc<MemoryStore<Stream>>,
    pub playlists: Arc<MemoryStore<Playlist>>,
    pub logos: Arc<MemoryStore<Logo>>,
}

/// All entity families over one transport
pub struct Client {
    pub accounts: Accounts,
    pub channels: Channels,
    pub streams: Streams,
    pub playlists: Playlists,
    pub backups: Backups,
    pub logos: Logos,
    pub stores: Stores,
}

impl Client {
    /// Build a client over an existing transport
    pub fn new(transport: Arc<dyn Transport>, poll: PollConfig) -> Self {
        let stores = Stores::default();

        Self {
            accounts: Accounts::new(transport.clone()),
            channels: Channels::new(
                transport.clone(),
                stores.channels.clone(),
                stores.channel_groups.clone(),
            ),
            streams: Streams::new(transport.clone(), stores.streams.clone()),
            playlists: Playlists::new(transport.clone(), stores.playlists.clone()),
            backups: Backups::new(transport.clone(), poll),
            logos: Logos::new(transport, stores.logos.clone()),
            stores,
        }
    }

    /// Build a client talking HTTP to the configured server
    pub fn connect(config: &Config, tokens: Arc<dyn TokenProvider>) -> ApiResult<Self> {
        let gateway =
            Gateway::new(&config.server_url, tokens)?.with_upload_timeout(config.upload_timeout());
        Ok(Self::new(Arc::new(gateway), config.poll_config()))
    }
}

/// A file to send as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, keeping its base name
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    fn into_part(self) -> ApiResult<Part> {
        let part = Part::bytes(self.bytes).file_name(self.file_name);
        match self.mime {
            Some(mime) => Ok(part.mime_str(&mime)?),
            None => Ok(part),
        }
    }
}

/// Multipart form carrying `fields` as text parts plus `file`
fn form_with_file(fields: &Map<String, Value>, file: UploadFile) -> ApiResult<Form> {
    let mut form = Form::new();
    for (key, value) in fields {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        form = form.text(key.clone(), text);
    }
    Ok(form.part("file", file.into_part()?))
}

/// `<collection>/<id>/`
fn entity_path(collection: &str, id: EntityId) -> String {
    format!("{}/{}/", collection.trim_end_matches('/'), id)
}

fn decode<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(body)?)
}

/// Decode a list body; an empty body is an empty list
fn decode_list<T: DeserializeOwned>(body: Value) -> ApiResult<Vec<T>> {
    match body {
        Value::Null => Ok(Vec::new()),
        body => decode(body),
    }
}
