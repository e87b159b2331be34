//! Backups
//!
//! Creating and restoring a backup are long-running server tasks driven by
//! the [`TaskPoller`]. A restore replaces the user table, so the launch
//! response carries a task token that keeps status polls authorized after
//! the session is gone.

use std::sync::Arc;

use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{decode, decode_list, UploadFile};
use crate::error::ApiResult;
use crate::gateway::{encode_segment, Target, Transport};
use crate::models::Backup;
use crate::task::{PollConfig, ProgressSink, TaskPoller};

/// Where task status lives for backup jobs
pub const BACKUP_STATUS_PREFIX: &str = "backups/status";

#[derive(Debug, Deserialize)]
struct DownloadToken {
    token: String,
}

/// Backup archive operations
pub struct Backups {
    transport: Arc<dyn Transport>,
    poller: TaskPoller,
}

impl Backups {
    pub fn new(transport: Arc<dyn Transport>, poll: PollConfig) -> Self {
        let poller = TaskPoller::new(transport.clone(), BACKUP_STATUS_PREFIX).with_config(poll);
        Self { transport, poller }
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poller.config()
    }

    /// Backups on the server; an empty body means none
    pub async fn list_backups(&self) -> ApiResult<Vec<Backup>> {
        decode_list(self.transport.send(Target::get("backups/")).await?)
    }

    /// Create a backup and wait for the task to finish
    pub async fn create_backup(&self, sink: &dyn ProgressSink) -> ApiResult<Value> {
        let result = self
            .poller
            .start(Target::post("backups/create/"), sink)
            .await?;
        info!("Backup created");
        Ok(result)
    }

    /// Restore a backup and wait for the task to finish
    ///
    /// Every session is invalidated by the restore; log in again afterwards.
    pub async fn restore_backup(&self, name: &str, sink: &dyn ProgressSink) -> ApiResult<Value> {
        let result = self
            .poller
            .start(Target::post(backup_path(name, "restore")), sink)
            .await?;
        info!("Backup {} restored", name);
        Ok(result)
    }

    /// Upload an archive; subject to the gateway's upload deadline
    pub async fn upload_backup(&self, file: UploadFile) -> ApiResult<Value> {
        let name = file.file_name.clone();
        let form = Form::new().part("file", file.into_part()?);
        let body = self
            .transport
            .send(Target::post("backups/upload/").multipart(form))
            .await?;
        info!("Uploaded backup {}", name);
        Ok(body)
    }

    pub async fn delete_backup(&self, name: &str) -> ApiResult<()> {
        self.transport
            .send(Target::delete(backup_path(name, "delete")))
            .await?;
        info!("Deleted backup {}", name);
        Ok(())
    }

    /// Short-lived token authorizing one download
    pub async fn download_token(&self, name: &str) -> ApiResult<String> {
        let body = self
            .transport
            .send(Target::get(backup_path(name, "download-token")))
            .await?;
        let DownloadToken { token } = decode(body)?;
        Ok(token)
    }

    /// Direct download URL, authorized by a fresh download token
    pub async fn download_url(&self, name: &str) -> ApiResult<String> {
        let token = self.download_token(name).await?;
        self.transport.resolve(
            &backup_path(name, "download"),
            &[("token".to_string(), token)],
        )
    }

    pub async fn backup_schedule(&self) -> ApiResult<Value> {
        self.transport.send(Target::get("backups/schedule/")).await
    }

    pub async fn update_backup_schedule(&self, settings: Value) -> ApiResult<Value> {
        self.transport
            .send(Target::put("backups/schedule/update/").json(settings))
            .await
    }
}

/// `backups/<encoded name>/<action>/`
fn backup_path(name: &str, action: &str) -> String {
    format!("backups/{}/{}/", encode_segment(name), action)
}
