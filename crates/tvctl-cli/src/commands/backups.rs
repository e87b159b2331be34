//! Backup command handlers

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tvctl_core::{ApiResult, ChannelProgress, Config, UploadFile};

use super::connect;
use crate::output::{Output, OutputFormat};

/// List backups on the server
pub async fn list(config: &Config, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let backups = client
        .backups
        .list_backups()
        .await
        .context("Failed to load backups")?;

    output.print_backups(&backups);
    Ok(())
}

/// Create a backup and wait for the server to finish it
pub async fn create(config: &Config, output: &Output) -> Result<()> {
    let client = connect(config)?;
    if !output.is_quiet() {
        eprintln!("Creating backup...");
    }

    let result = watch(output, |sink| async move {
        client.backups.create_backup(&sink).await
    })
    .await
    .context("Backup failed")?;

    output.print_task_result("Backup created", &result);
    Ok(())
}

/// Restore a backup and wait for the server to finish
pub async fn restore(config: &Config, name: String, output: &Output) -> Result<()> {
    let client = connect(config)?;
    if !output.is_quiet() {
        eprintln!("Restoring {}...", name);
    }

    let result = watch(output, |sink| {
        let name = name.clone();
        async move { client.backups.restore_backup(&name, &sink).await }
    })
    .await
    .with_context(|| format!("Restore of {} failed", name))?;

    output.print_task_result(&format!("Restored {}", name), &result);
    Ok(())
}

/// Upload a backup archive
pub async fn upload(config: &Config, file: PathBuf, output: &Output) -> Result<()> {
    let upload = UploadFile::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = upload.file_name.clone();

    let client = connect(config)?;
    let reply = client
        .backups
        .upload_backup(upload)
        .await
        .context("Failed to upload backup")?;

    match output.format {
        OutputFormat::Json => output.print_json(&reply),
        _ => output.success(&format!("Uploaded {}", file_name)),
    }
    Ok(())
}

/// Delete a backup
pub async fn delete(config: &Config, name: String, output: &Output) -> Result<()> {
    let client = connect(config)?;
    client
        .backups
        .delete_backup(&name)
        .await
        .with_context(|| format!("Failed to delete {}", name))?;

    output.success(&format!("Deleted {}", name));
    Ok(())
}

/// Print a direct, token-authorized download URL
pub async fn url(config: &Config, name: String, output: &Output) -> Result<()> {
    let client = connect(config)?;
    let url = client
        .backups
        .download_url(&name)
        .await
        .with_context(|| format!("Failed to get a download URL for {}", name))?;

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({"name": name, "url": url})),
        // The URL is the whole point, so quiet mode prints it too
        _ => println!("{}", url),
    }
    Ok(())
}

/// Run a polled task with progress on stderr and Ctrl-C cancellation
async fn watch<F, Fut>(output: &Output, run: F) -> ApiResult<Value>
where
    F: FnOnce(ChannelProgress) -> Fut,
    Fut: Future<Output = ApiResult<Value>>,
{
    let cancel = CancellationToken::new();
    let (sink, mut rx) = ChannelProgress::with_token(cancel.clone());

    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping task poll");
                cancel.cancel();
            }
        }
    });

    let printer = tokio::spawn({
        let output = *output;
        async move {
            while let Some(status) = rx.recv().await {
                output.progress(&status);
            }
        }
    });

    // The sink moves into the task; once it is dropped the printer drains and exits
    let result = run(sink).await;
    interrupt.abort();
    let _ = printer.await;

    if cancel.is_cancelled() && !output.is_quiet() {
        eprintln!("Stopped waiting. The task may still finish on the server.");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tvctl_core::{ApiError, ProgressSink, TaskState, TaskStatus};

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[tokio::test]
    async fn test_watch_returns_task_result() {
        let result = watch(&quiet(), |sink| async move {
            sink.report(&TaskStatus::new(TaskState::Running));
            Ok(json!({"filename": "backup-1.zip"}))
        })
        .await
        .unwrap();

        assert_eq!(result["filename"], "backup-1.zip");
    }

    #[tokio::test]
    async fn test_watch_cancelled_through_sink() {
        let err = watch(&quiet(), |sink| async move {
            sink.cancel();
            assert!(sink.is_cancelled());
            Err(ApiError::TaskCancelled)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::TaskCancelled));
    }
}
