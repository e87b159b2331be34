//! Playlists (M3U and Xtream Codes accounts)

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::info;

use super::{decode, decode_list, entity_path, form_with_file, UploadFile};
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::models::{Acknowledgement, Playlist};
use crate::store::{classify, CollectionStore, EntityId, Mutation};

const ACCOUNTS: &str = "m3u/accounts";

/// Playlist account operations
pub struct Playlists {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CollectionStore<Playlist>>,
}

impl Playlists {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CollectionStore<Playlist>>) -> Self {
        Self { transport, store }
    }

    pub async fn list_playlists(&self) -> ApiResult<Vec<Playlist>> {
        let playlists: Vec<Playlist> = decode_list(
            self.transport
                .send(Target::get(format!("{}/", ACCOUNTS)))
                .await?,
        )?;
        for playlist in &playlists {
            self.store.add(playlist.clone());
        }
        Ok(playlists)
    }

    pub async fn get_playlist(&self, id: EntityId) -> ApiResult<Playlist> {
        decode(
            self.transport
                .send(Target::get(entity_path(ACCOUNTS, id)))
                .await?,
        )
    }

    /// Create an account; with a file the fields are sent as multipart
    pub async fn create_playlist(
        &self,
        fields: Map<String, Value>,
        file: Option<UploadFile>,
    ) -> ApiResult<Option<Playlist>> {
        let target = Target::post(format!("{}/", ACCOUNTS));
        let target = match file {
            Some(file) => target.multipart(form_with_file(&fields, file)?),
            None => target.json(Value::Object(fields)),
        };

        let created = classify(self.transport.send(target).await?)?
            .apply(self.store.as_ref(), Mutation::Add);
        if let Some(playlist) = &created {
            info!("Created playlist {} ({})", playlist.name, playlist.id);
        }
        Ok(created)
    }

    /// Patch an account
    ///
    /// When a replacement file is attached, `server_url` is not sent.
    pub async fn update_playlist(
        &self,
        id: EntityId,
        mut fields: Map<String, Value>,
        file: Option<UploadFile>,
    ) -> ApiResult<Option<Playlist>> {
        let target = Target::patch(entity_path(ACCOUNTS, id));
        let target = match file {
            Some(file) => {
                fields.remove("server_url");
                target.multipart(form_with_file(&fields, file)?)
            }
            None => {
                if fields
                    .get("server_url")
                    .is_some_and(|url| url.as_str().map_or(url.is_null(), str::is_empty))
                {
                    fields.remove("server_url");
                }
                target.json(Value::Object(fields))
            }
        };

        let body = self.transport.send(target).await?;
        Ok(classify(body)?.apply(self.store.as_ref(), Mutation::Update))
    }

    /// Enable or disable an account
    pub async fn set_active(&self, id: EntityId, active: bool) -> ApiResult<Option<Playlist>> {
        let target = Target::patch(entity_path(ACCOUNTS, id)).json(json!({ "is_active": active }));
        let body = self.transport.send(target).await?;
        Ok(classify(body)?.apply(self.store.as_ref(), Mutation::Update))
    }

    pub async fn delete_playlist(&self, id: EntityId) -> ApiResult<()> {
        self.transport
            .send(Target::delete(entity_path(ACCOUNTS, id)))
            .await?;
        self.store.remove(&[id]);
        Ok(())
    }

    /// Queue a refresh of one account's streams
    pub async fn refresh_playlist(&self, id: EntityId) -> ApiResult<Acknowledgement> {
        self.trigger(format!("m3u/refresh/{}/", id)).await
    }

    /// Queue a refresh of every active account
    pub async fn refresh_all_playlists(&self) -> ApiResult<Acknowledgement> {
        self.trigger("m3u/refresh/".to_string()).await
    }

    /// Queue a VOD catalogue refresh (Xtream Codes accounts with VOD enabled)
    pub async fn refresh_vod(&self, account_id: EntityId) -> ApiResult<Acknowledgement> {
        self.trigger(format!("{}refresh-vod/", entity_path(ACCOUNTS, account_id)))
            .await
    }

    /// Queue an account info refresh for an Xtream Codes profile
    ///
    /// The service answers with `{success: false, error}` and a 4xx status
    /// when the profile is missing or not Xtream Codes; that arrives as an
    /// [`ApiError::Validation`](crate::ApiError::Validation) carrying the body.
    pub async fn refresh_account_info(&self, profile_id: EntityId) -> ApiResult<Acknowledgement> {
        self.trigger(format!("m3u/refresh-account-info/{}/", profile_id))
            .await
    }

    async fn trigger(&self, path: String) -> ApiResult<Acknowledgement> {
        let body = self.transport.send(Target::post(path.as_str())).await?;
        info!("Triggered {}", path);
        match body {
            Value::Null => Ok(Acknowledgement::default()),
            body => decode(body),
        }
    }
}
