//! Channel logos

use std::sync::Arc;

use reqwest::multipart::Form;
use tracing::info;

use super::{decode, UploadFile};
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::models::Logo;
use crate::store::CollectionStore;

/// Logo library operations
pub struct Logos {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CollectionStore<Logo>>,
}

impl Logos {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CollectionStore<Logo>>) -> Self {
        Self { transport, store }
    }

    /// Upload an image as a new logo, optionally under a custom name
    ///
    /// Subject to the gateway's upload deadline; a stalled upload fails with
    /// [`ApiError::Timeout`](crate::ApiError::Timeout).
    pub async fn upload_logo(&self, file: UploadFile, name: Option<&str>) -> ApiResult<Logo> {
        let mut form = Form::new().part("file", file.into_part()?);
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            form = form.text("name", name.to_string());
        }

        let body = self
            .transport
            .send(Target::post("channels/logos/upload/").multipart(form))
            .await?;

        let logo: Logo = decode(body)?;
        info!("Uploaded logo {} ({})", logo.name, logo.id);
        self.store.add(logo.clone());
        Ok(logo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::store::MemoryStore;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    fn png() -> UploadFile {
        UploadFile::new("bbc.png", vec![0x89, 0x50, 0x4e, 0x47]).with_mime("image/png")
    }

    #[tokio::test]
    async fn test_upload_adds_to_store() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(
            json!({"id": 12, "name": "BBC", "url": "/data/logos/bbc.png"}),
        )]));
        let store = Arc::new(MemoryStore::new());
        let logos = Logos::new(transport.clone(), store.clone());

        let logo = logos.upload_logo(png(), Some("  BBC ")).await.unwrap();

        assert_eq!(logo.id, 12);
        assert_eq!(store.get(12).unwrap().name, "BBC");
        let sent = &transport.sent()[0];
        assert_eq!(sent.path, "channels/logos/upload/");
        assert!(sent.multipart);
    }

    #[tokio::test]
    async fn test_timeout_leaves_store_untouched() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Err(ApiError::Timeout {
            after: Duration::from_secs(30),
        })]));
        let store = Arc::new(MemoryStore::new());
        let logos = Logos::new(transport, store.clone());

        let err = logos.upload_logo(png(), None).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out after 30s. Please try again.");
        assert!(store.is_empty());
    }
}
