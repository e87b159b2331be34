//! Streams

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::info;

use super::{decode, entity_path};
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::models::{FilterOptions, Stream};
use crate::paging::{PageEndpoint, PageSynchronizer, Query, QueryResult};
use crate::store::{classify, CollectionStore, EntityId, Mutation, ViewStore};

const STREAMS: &str = "channels/streams";

/// Stream table operations
///
/// Every mutation updates the store first and then refreshes the stream
/// table with its last query.
pub struct Streams {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CollectionStore<Stream>>,
    view: PageSynchronizer<Stream>,
}

impl Streams {
    pub fn new<S>(transport: Arc<dyn Transport>, store: Arc<S>) -> Self
    where
        S: CollectionStore<Stream> + ViewStore<Stream> + 'static,
    {
        let view = PageSynchronizer::new(
            transport.clone(),
            PageEndpoint::collection(STREAMS),
            store.clone(),
        );

        Self {
            transport,
            store,
            view,
        }
    }

    pub fn view(&self) -> &PageSynchronizer<Stream> {
        &self.view
    }

    pub async fn query(&self, query: Query) -> ApiResult<QueryResult<Stream>> {
        self.view.execute(query).await
    }

    pub async fn requery(&self) -> ApiResult<Option<QueryResult<Stream>>> {
        self.view.reexecute().await
    }

    pub async fn create_stream(&self, fields: Map<String, Value>) -> ApiResult<Option<Stream>> {
        let body = self
            .transport
            .send(Target::post(format!("{}/", STREAMS)).json(Value::Object(fields)))
            .await?;

        let created = classify(body)?.apply(self.store.as_ref(), Mutation::Add);
        self.view.reexecute().await?;
        Ok(created)
    }

    /// Replace a stream's fields
    pub async fn update_stream(
        &self,
        id: EntityId,
        fields: Map<String, Value>,
    ) -> ApiResult<Option<Stream>> {
        let body = self
            .transport
            .send(Target::put(entity_path(STREAMS, id)).json(Value::Object(fields)))
            .await?;

        let updated = classify(body)?.apply(self.store.as_ref(), Mutation::Update);
        self.view.reexecute().await?;
        Ok(updated)
    }

    pub async fn delete_stream(&self, id: EntityId) -> ApiResult<()> {
        self.transport
            .send(Target::delete(entity_path(STREAMS, id)))
            .await?;

        self.store.remove(&[id]);
        self.view.reexecute().await?;
        Ok(())
    }

    pub async fn delete_streams(&self, ids: &[EntityId]) -> ApiResult<()> {
        self.transport
            .send(
                Target::delete(format!("{}/bulk-delete/", STREAMS))
                    .json(json!({ "stream_ids": ids })),
            )
            .await?;

        info!("Deleted {} streams", ids.len());
        self.store.remove(ids);
        self.view.reexecute().await?;
        Ok(())
    }

    /// Filter values (groups, accounts) available under `query`'s filters
    ///
    /// Errors are returned as-is. Callers that must keep rendering can fall
    /// back to `FilterOptions::default()`.
    pub async fn filter_options(&self, query: &Query) -> ApiResult<FilterOptions> {
        let target =
            Target::get(format!("{}/filter-options/", STREAMS)).query(query.filter_pairs());
        decode(self.transport.send(target).await?)
    }
}
