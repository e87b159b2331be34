//! tvctl Core Library
//!
//! This crate provides the data-access layer between a UI and a channel
//! management service: authenticated requests, paginated views that stay
//! consistent while the collection changes underneath them, and
//! long-running server tasks driven to completion by polling.
//!
//! # Architecture
//!
//! - **Gateway**: the only component that talks HTTP
//! - **Paging**: per-view query synchronizer with stale-page recovery
//! - **Task**: fire-and-poll protocol with task-scoped tokens
//! - **Store**: the interface results are written into
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = Client::connect(&config, Arc::new(StaticToken::new(token)))?;
//!
//! // First page of the channel table, filtered by group
//! let page = client.channels.query(Query::new().with_param("channel_group", "Sports")).await?;
//!
//! // Run a backup to completion
//! let result = client.backups.create_backup(&NoProgress).await?;
//! ```
//!
//! # Modules
//!
//! - `api`: operations per entity family (main entry point)
//! - `gateway`: request targets, auth modes and the HTTP transport
//! - `paging`: queries, results and the page synchronizer
//! - `task`: task state and the status poller
//! - `store`: store traits and the in-memory implementation
//! - `models`: entity types
//! - `auth`: session token providers
//! - `config`: client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod paging;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use api::{Client, Stores, UploadFile};
pub use auth::{SessionToken, StaticToken, TokenProvider};
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use gateway::{Auth, Gateway, Target, Transport};
pub use paging::{AllIdsSnapshot, PageSynchronizer, Query, QueryResult};
pub use store::{CollectionStore, Entity, EntityId, MemoryStore, Outcome, ViewState, ViewStore};
pub use task::{ChannelProgress, NoProgress, PollConfig, ProgressSink, Task, TaskPoller, TaskState, TaskStatus};
