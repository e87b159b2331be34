//! Logo command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use tvctl_core::{Config, UploadFile};

use super::connect;
use crate::output::{Output, OutputFormat};

/// Upload an image file as a new logo
pub async fn upload(config: &Config, file: PathBuf, name: Option<String>, output: &Output) -> Result<()> {
    let upload = UploadFile::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let client = connect(config)?;
    let logo = client
        .logos
        .upload_logo(upload, name.as_deref())
        .await
        .context("Failed to upload logo")?;

    match output.format {
        OutputFormat::Json => output.print_json(&logo),
        OutputFormat::Quiet => println!("{}", logo.id),
        OutputFormat::Human => {
            output.success(&format!("Uploaded logo {} ({})", logo.name, logo.id));
            if let Some(url) = &logo.url {
                println!("  url: {}", url);
            }
        }
    }
    Ok(())
}
