//! Data models for the service's collections
//!
//! Only the fields the client acts on are typed. Everything else the
//! service sends is kept in `extra` so nothing is lost when an entity is
//! displayed or written back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Entity, EntityId};

/// A TV channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: EntityId,
    pub name: String,
    /// Fractional numbers such as 4.1 are allowed
    #[serde(default)]
    pub channel_number: Option<f64>,
    #[serde(default)]
    pub channel_group_id: Option<EntityId>,
    #[serde(default)]
    pub tvg_id: Option<String>,
    #[serde(default)]
    pub logo_id: Option<EntityId>,
    /// Ids of the streams feeding this channel, in failover order
    #[serde(default)]
    pub streams: Vec<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named group of channels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelGroup {
    pub id: EntityId,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A source stream imported from a playlist or added by hand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stream {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub m3u_account: Option<EntityId>,
    #[serde(default)]
    pub channel_group: Option<EntityId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An M3U / Xtream Codes account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A channel logo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Logo {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A backup archive on the server, identified by file name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Access and refresh tokens returned by login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    /// Absent when refreshing without rotation
    #[serde(default)]
    pub refresh: Option<String>,
}

/// The logged-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whether the initial administrator account exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuperuserStatus {
    pub superuser_exists: bool,
}

/// Server version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    pub version: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Values available to the stream table's filter controls
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(default)]
    pub m3u_accounts: Vec<Value>,
}

/// Reply to a fire-and-forget trigger (refreshes, settings updates)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Acknowledgement {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Acknowledgement {
    /// Text worth showing to a user
    pub fn summary(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

impl Entity for Channel {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for ChannelGroup {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Stream {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Playlist {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Logo {
    fn id(&self) -> EntityId {
        self.id
    }
}
