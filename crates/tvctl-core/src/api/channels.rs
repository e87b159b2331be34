//! Channels and channel groups

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::info;

use super::{decode, decode_list, entity_path};
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::models::{Channel, ChannelGroup};
use crate::paging::{PageEndpoint, PageSynchronizer, Query, QueryResult};
use crate::store::{classify, CollectionStore, EntityId, Mutation, ViewStore};

const CHANNELS: &str = "channels/channels";
const GROUPS: &str = "channels/groups";

/// Channel table operations
pub struct Channels {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CollectionStore<Channel>>,
    groups: Arc<dyn CollectionStore<ChannelGroup>>,
    view: PageSynchronizer<Channel>,
}

impl Channels {
    pub fn new<S>(
        transport: Arc<dyn Transport>,
        store: Arc<S>,
        groups: Arc<dyn CollectionStore<ChannelGroup>>,
    ) -> Self
    where
        S: CollectionStore<Channel> + ViewStore<Channel> + 'static,
    {
        let view = PageSynchronizer::new(
            transport.clone(),
            PageEndpoint::collection(CHANNELS),
            store.clone(),
        );

        Self {
            transport,
            store,
            groups,
            view,
        }
    }

    /// The paginated channel table
    pub fn view(&self) -> &PageSynchronizer<Channel> {
        &self.view
    }

    pub async fn query(&self, query: Query) -> ApiResult<QueryResult<Channel>> {
        self.view.execute(query).await
    }

    /// Refresh the channel table with its last query
    pub async fn requery(&self) -> ApiResult<Option<QueryResult<Channel>>> {
        self.view.reexecute().await
    }

    pub async fn get_channel(&self, id: EntityId) -> ApiResult<Channel> {
        decode(
            self.transport
                .send(Target::get(entity_path(CHANNELS, id)))
                .await?,
        )
    }

    /// Create a channel from form fields
    ///
    /// A blank `channel_number` is left out so the server assigns one.
    pub async fn create_channel(&self, mut fields: Map<String, Value>) -> ApiResult<Option<Channel>> {
        if fields.get("channel_number").is_some_and(is_blank) {
            fields.remove("channel_number");
        }

        let body = self
            .transport
            .send(Target::post(format!("{}/", CHANNELS)).json(Value::Object(fields)))
            .await?;

        let created = classify(body)?.apply(self.store.as_ref(), Mutation::Add);
        if let Some(channel) = &created {
            info!("Created channel {} ({})", channel.name, channel.id);
        }
        Ok(created)
    }

    /// Patch a channel
    ///
    /// Blank `channel_number` and `tvg_id` clear the value; a numeric string
    /// channel number is sent as a number.
    pub async fn update_channel(
        &self,
        id: EntityId,
        mut fields: Map<String, Value>,
    ) -> ApiResult<Option<Channel>> {
        if let Some(number) = fields.get_mut("channel_number") {
            *number = normalize_channel_number(number.take());
        }
        if fields.get("tvg_id").is_some_and(is_blank) {
            fields.insert("tvg_id".to_string(), Value::Null);
        }

        let body = self
            .transport
            .send(Target::patch(entity_path(CHANNELS, id)).json(Value::Object(fields)))
            .await?;

        Ok(classify(body)?.apply(self.store.as_ref(), Mutation::Update))
    }

    /// Delete one channel and refresh the table
    pub async fn delete_channel(&self, id: EntityId) -> ApiResult<()> {
        self.transport
            .send(Target::delete(entity_path(CHANNELS, id)))
            .await?;

        self.store.remove(&[id]);
        self.view.reexecute().await?;
        Ok(())
    }

    /// Delete several channels in one request and refresh the table
    pub async fn delete_channels(&self, ids: &[EntityId]) -> ApiResult<()> {
        self.transport
            .send(
                Target::delete(format!("{}/bulk-delete/", CHANNELS))
                    .json(json!({ "channel_ids": ids })),
            )
            .await?;

        info!("Deleted {} channels", ids.len());
        self.store.remove(ids);
        self.view.reexecute().await?;
        Ok(())
    }

    pub async fn list_groups(&self) -> ApiResult<Vec<ChannelGroup>> {
        let groups: Vec<ChannelGroup> =
            decode_list(self.transport.send(Target::get(format!("{}/", GROUPS))).await?)?;
        for group in &groups {
            self.groups.add(group.clone());
        }
        Ok(groups)
    }

    pub async fn create_group(&self, name: &str) -> ApiResult<Option<ChannelGroup>> {
        let body = self
            .transport
            .send(Target::post(format!("{}/", GROUPS)).json(json!({ "name": name })))
            .await?;
        Ok(classify(body)?.apply(self.groups.as_ref(), Mutation::Add))
    }

    pub async fn update_group(
        &self,
        id: EntityId,
        fields: Map<String, Value>,
    ) -> ApiResult<Option<ChannelGroup>> {
        let body = self
            .transport
            .send(Target::put(entity_path(GROUPS, id)).json(Value::Object(fields)))
            .await?;
        Ok(classify(body)?.apply(self.groups.as_ref(), Mutation::Update))
    }

    pub async fn delete_group(&self, id: EntityId) -> ApiResult<()> {
        self.transport
            .send(Target::delete(entity_path(GROUPS, id)))
            .await?;
        self.groups.remove(&[id]);
        Ok(())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn normalize_channel_number(value: Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .unwrap_or(Value::String(s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::store::MemoryStore;
    use crate::testing::{ScriptedTransport, Sent};
    use reqwest::Method;

    fn channel(id: EntityId, name: &str) -> Value {
        json!({"id": id, "name": name, "channel_number": id as f64})
    }

    fn page(ids: &[EntityId]) -> Value {
        let results: Vec<Value> = ids.iter().map(|&id| channel(id, "ch")).collect();
        json!({"count": ids.len(), "next": null, "previous": null, "results": results})
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn setup(
        transport: Arc<ScriptedTransport>,
    ) -> (Channels, Arc<MemoryStore<Channel>>, Arc<MemoryStore<ChannelGroup>>) {
        let store = Arc::new(MemoryStore::new());
        let groups = Arc::new(MemoryStore::new());
        let channels = Channels::new(transport, store.clone(), groups.clone());
        (channels, store, groups)
    }

    #[tokio::test]
    async fn test_create_drops_blank_channel_number() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(channel(9, "BBC One"))]));
        let (channels, store, _) = setup(transport.clone());

        let created = channels
            .create_channel(fields(json!({"name": "BBC One", "channel_number": "  "})))
            .await
            .unwrap();

        assert_eq!(created.unwrap().id, 9);
        assert_eq!(store.get(9).unwrap().name, "BBC One");
        let sent = &transport.sent()[0];
        assert_eq!(sent.path, "channels/channels/");
        assert_eq!(sent.body, Some(json!({"name": "BBC One"})));
    }

    #[tokio::test]
    async fn test_create_without_entity_is_noop() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(json!({"detail": "queued"}))]));
        let (channels, store, _) = setup(transport);

        let created = channels
            .create_channel(fields(json!({"name": "x", "channel_number": 5})))
            .await
            .unwrap();

        assert!(created.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_normalizes_fields() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(channel(3, "renamed"))]));
        let (channels, store, _) = setup(transport.clone());
        store.add(serde_json::from_value(channel(3, "old")).unwrap());

        channels
            .update_channel(3, fields(json!({"channel_number": "4.5", "tvg_id": ""})))
            .await
            .unwrap();

        let sent = &transport.sent()[0];
        assert_eq!(sent.method, Method::PATCH);
        assert_eq!(sent.path, "channels/channels/3/");
        assert_eq!(sent.body, Some(json!({"channel_number": 4.5, "tvg_id": null})));
        assert_eq!(store.get(3).unwrap().name, "renamed");
    }

    #[test]
    fn test_normalize_channel_number() {
        assert_eq!(normalize_channel_number(json!("")), Value::Null);
        assert_eq!(normalize_channel_number(json!("7")), json!(7.0));
        assert_eq!(normalize_channel_number(json!(12)), json!(12));
        assert_eq!(normalize_channel_number(json!("seven")), json!("seven"));
    }

    #[tokio::test]
    async fn test_delete_removes_and_requeries() {
        let transport = Arc::new(ScriptedTransport::new(|sent: &Sent| {
            if sent.method == Method::DELETE {
                Ok(Value::Null)
            } else if sent.path == "channels/channels/ids/" {
                Ok(json!([1, 3]))
            } else {
                Ok(page(&[1, 3]))
            }
        }));
        let (channels, store, _) = setup(transport.clone());

        channels.query(Query::new().with_page_size(10)).await.unwrap();
        store.add(serde_json::from_value(channel(2, "gone")).unwrap());

        channels.delete_channel(2).await.unwrap();

        assert!(store.get(2).is_none());
        assert_eq!(transport.count("channels/channels/2/"), 1);
        assert_eq!(transport.count("channels/channels/"), 2);
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_bulk_delete_body() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Ok(Value::Null)]));
        let (channels, _, _) = setup(transport.clone());

        // No prior query, so nothing to refresh
        channels.delete_channels(&[4, 5]).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::DELETE);
        assert_eq!(sent[0].path, "channels/channels/bulk-delete/");
        assert_eq!(sent[0].body, Some(json!({"channel_ids": [4, 5]})));
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_store() {
        let transport = Arc::new(ScriptedTransport::replies(vec![Err(
            ApiError::from_response(404, r#"{"detail": "Not found."}"#.to_string()),
        )]));
        let (channels, store, _) = setup(transport);
        store.add(serde_json::from_value(channel(2, "kept")).unwrap());

        assert!(channels.delete_channel(2).await.is_err());
        assert!(store.get(2).is_some());
    }

    #[tokio::test]
    async fn test_group_lifecycle() {
        let transport = Arc::new(ScriptedTransport::replies(vec![
            Ok(json!([{"id": 1, "name": "News"}])),
            Ok(json!({"id": 2, "name": "Sports"})),
            Ok(json!({"id": 2, "name": "Sport"})),
            Ok(Value::Null),
        ]));
        let (channels, _, groups) = setup(transport.clone());

        assert_eq!(channels.list_groups().await.unwrap().len(), 1);
        channels.create_group("Sports").await.unwrap();
        channels
            .update_group(2, fields(json!({"name": "Sport"})))
            .await
            .unwrap();
        assert_eq!(groups.get(2).unwrap().name, "Sport");

        channels.delete_group(2).await.unwrap();
        assert!(groups.get(2).is_none());
        assert_eq!(groups.len(), 1);

        let sent = transport.sent();
        assert_eq!(sent[2].method, Method::PUT);
        assert_eq!(sent[3].path, "channels/groups/2/");
    }
}
