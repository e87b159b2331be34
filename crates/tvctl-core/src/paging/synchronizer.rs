//! Paginated query synchronizer
//!
//! Executes a [`Query`] against a collection endpoint together with the
//! matching id snapshot, and recovers when the requested page has vanished
//! because the collection shrank since the page count was last known.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use futures_util::future::try_join;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::query::{AllIdsSnapshot, Query, QueryResult};
use crate::error::ApiResult;
use crate::gateway::{Target, Transport};
use crate::store::{ViewState, ViewStore};

/// Paths of a paginated collection and its id snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEndpoint {
    pub page_path: String,
    pub ids_path: String,
}

impl PageEndpoint {
    /// Endpoint pair following the `<collection>/` + `<collection>/ids/` layout
    pub fn collection(path: &str) -> Self {
        let base = format!("{}/", path.trim_end_matches('/'));
        Self {
            ids_path: format!("{}ids/", base),
            page_path: base,
        }
    }
}

/// Per-view record of the most recently requested query
///
/// Each paginated view owns its session, so two views never replay each
/// other's queries.
#[derive(Debug, Default)]
pub struct ViewSession {
    pending: Mutex<Option<Query>>,
}

impl ViewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The query a `reexecute` would replay
    pub fn pending(&self) -> Option<Query> {
        self.pending.lock().ok().and_then(|q| q.clone())
    }

    fn set_pending(&self, query: &Query) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(query.clone());
        }
    }
}

/// Stale-page recovery state for one `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Requested,
    ResetToFirstPage,
}

/// Keeps one paginated view in step with the server
pub struct PageSynchronizer<T> {
    transport: Arc<dyn Transport>,
    endpoint: PageEndpoint,
    session: ViewSession,
    store: Arc<dyn ViewStore<T>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PageSynchronizer<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: PageEndpoint,
        store: Arc<dyn ViewStore<T>>,
    ) -> Self {
        Self {
            transport,
            endpoint,
            session: ViewSession::new(),
            store,
            _entity: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &PageEndpoint {
        &self.endpoint
    }

    pub fn session(&self) -> &ViewSession {
        &self.session
    }

    /// Fetch the page described by `query` and publish it to the store
    ///
    /// If the server reports the page as invalid and it is not page 1, the
    /// query is reset to page 1 and sent once more. A second invalid-page
    /// response is returned as an error. Other errors leave the stored query
    /// as issued, so [`reexecute`](Self::reexecute) retries the same intent.
    pub async fn execute(&self, query: Query) -> ApiResult<QueryResult<T>> {
        let mut query = query;
        let mut attempt = Attempt::Requested;

        loop {
            self.session.set_pending(&query);

            match self.fetch(&query).await {
                Ok((result, ids)) => {
                    self.store.commit(ViewState::synchronized(
                        query,
                        result.clone(),
                        ids,
                    ));
                    return Ok(result);
                }
                Err(e)
                    if e.is_stale_page()
                        && attempt == Attempt::Requested
                        && query.page() > 1 =>
                {
                    warn!(
                        "Page {} of {} no longer exists, resetting to page 1",
                        query.page(),
                        self.endpoint.page_path
                    );
                    attempt = Attempt::ResetToFirstPage;
                    query = query.with_page(1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Replay the most recently requested query
    ///
    /// Returns `Ok(None)` without touching the network when nothing has been
    /// executed yet.
    pub async fn reexecute(&self) -> ApiResult<Option<QueryResult<T>>> {
        let Some(query) = self.session.pending() else {
            debug!("Nothing to re-execute for {}", self.endpoint.page_path);
            return Ok(None);
        };

        self.execute(query).await.map(Some)
    }

    /// Request the page and the id snapshot concurrently
    async fn fetch(&self, query: &Query) -> ApiResult<(QueryResult<T>, AllIdsSnapshot)> {
        debug!("Querying {}?{}", self.endpoint.page_path, query);

        let page = Target::get(self.endpoint.page_path.as_str()).query(query.page_pairs());
        let ids = Target::get(self.endpoint.ids_path.as_str()).query(query.filter_pairs());

        let (page_body, ids_body) =
            try_join(self.transport.send(page), self.transport.send(ids)).await?;

        let result = QueryResult::from_envelope(page_body, query.page())?;
        let ids = AllIdsSnapshot::from_value(ids_body)?;
        Ok((result, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::store::{Entity, EntityId, MemoryStore};
    use crate::testing::{invalid_page, ScriptedTransport, Sent};
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: EntityId,
        channel_group: String,
    }

    impl Entity for Row {
        fn id(&self) -> EntityId {
            self.id
        }
    }

    const PAGE_PATH: &str = "channels/channels/";
    const IDS_PATH: &str = "channels/channels/ids/";

    /// Serve `rows` matching rows, paginated the way the service does it
    fn collection(rows: i64) -> impl Fn(&Sent) -> ApiResult<Value> + Send + Sync {
        move |sent: &Sent| {
            if sent.path == IDS_PATH {
                return Ok(json!((1..=rows).collect::<Vec<_>>()));
            }

            let page: i64 = sent.param("page").unwrap_or("1").parse().unwrap();
            let size: i64 = sent.param("page_size").unwrap_or("50").parse().unwrap();
            let start = (page - 1) * size;
            if page > 1 && start >= rows {
                return Err(invalid_page());
            }

            let results: Vec<Value> = (start + 1..=(start + size).min(rows))
                .map(|id| json!({"id": id, "channel_group": "Sports"}))
                .collect();
            Ok(json!({"count": rows, "next": null, "previous": null, "results": results}))
        }
    }

    fn synchronizer(
        transport: Arc<ScriptedTransport>,
    ) -> (PageSynchronizer<Row>, Arc<MemoryStore<Row>>) {
        let store = Arc::new(MemoryStore::new());
        let sync = PageSynchronizer::new(
            transport,
            PageEndpoint::collection("channels/channels"),
            store.clone(),
        );
        (sync, store)
    }

    fn page_requests(transport: &ScriptedTransport) -> Vec<Sent> {
        transport
            .sent()
            .into_iter()
            .filter(|s| s.path == PAGE_PATH)
            .collect()
    }

    #[test]
    fn test_endpoint_collection() {
        let endpoint = PageEndpoint::collection("channels/streams");
        assert_eq!(endpoint.page_path, "channels/streams/");
        assert_eq!(endpoint.ids_path, "channels/streams/ids/");
    }

    #[tokio::test]
    async fn test_stale_page_resets_to_first_page() {
        let transport = Arc::new(ScriptedTransport::new(collection(40)));
        let (sync, store) = synchronizer(transport.clone());

        let query = Query::new()
            .with_param("channel_group", "Sports")
            .with_page(3)
            .with_page_size(25);
        let result = sync.execute(query.clone()).await.unwrap();

        assert_eq!(result.items.len(), 25);
        assert_eq!(result.total_count, 40);
        assert_eq!(result.page, 1);
        assert_eq!(result.items[0].channel_group, "Sports");

        let pages = page_requests(&transport);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].param("page"), Some("3"));
        assert_eq!(pages[1].param("page"), Some("1"));
        assert_eq!(pages[1].param("page_size"), Some("25"));
        assert_eq!(pages[1].param("channel_group"), Some("Sports"));

        // The stored intent and the published view both point at page 1
        let expected = query.with_page(1);
        assert_eq!(sync.session().pending(), Some(expected.clone()));
        let view = store.view().unwrap();
        assert_eq!(view.last_query, expected);
        assert!(view.is_consistent());
        assert_eq!(view.all_ids.unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_id_snapshot_omits_pagination() {
        let transport = Arc::new(ScriptedTransport::new(collection(10)));
        let (sync, _store) = synchronizer(transport.clone());

        sync.execute(Query::new().with_param("search", "bbc").with_page(1))
            .await
            .unwrap();

        let ids: Vec<Sent> = transport
            .sent()
            .into_iter()
            .filter(|s| s.path == IDS_PATH)
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].query, vec![("search".to_string(), "bbc".to_string())]);
    }

    #[tokio::test]
    async fn test_first_page_is_never_substituted() {
        let transport = Arc::new(ScriptedTransport::new(collection(5)));
        let (sync, _store) = synchronizer(transport);

        let result = sync.execute(Query::new()).await.unwrap();
        assert_eq!(result.page, 1);
        assert_eq!(result.items.len(), 5);
    }

    #[tokio::test]
    async fn test_second_invalid_page_propagates() {
        let transport = Arc::new(ScriptedTransport::new(|sent: &Sent| {
            if sent.path == IDS_PATH {
                Ok(json!([]))
            } else {
                Err(invalid_page())
            }
        }));
        let (sync, store) = synchronizer(transport.clone());

        let err = sync.execute(Query::new().with_page(4)).await.unwrap_err();

        assert!(err.is_stale_page());
        assert_eq!(page_requests(&transport).len(), 2);
        assert!(store.view().is_none());
    }

    #[tokio::test]
    async fn test_invalid_first_page_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(|sent: &Sent| {
            if sent.path == IDS_PATH {
                Ok(json!([]))
            } else {
                Err(invalid_page())
            }
        }));
        let (sync, _store) = synchronizer(transport.clone());

        let err = sync.execute(Query::new()).await.unwrap_err();

        assert!(err.is_stale_page());
        assert_eq!(page_requests(&transport).len(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_keep_stored_query() {
        let transport = Arc::new(ScriptedTransport::new(|_: &Sent| {
            Err(ApiError::from_response(500, "upstream down".to_string()))
        }));
        let (sync, store) = synchronizer(transport.clone());

        let query = Query::new().with_param("ordering", "name").with_page(2);
        let err = sync.execute(query.clone()).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(page_requests(&transport).len(), 1);
        assert_eq!(sync.session().pending(), Some(query));
        assert!(store.view().is_none());
    }

    #[tokio::test]
    async fn test_reexecute_without_query_is_noop() {
        let transport = Arc::new(ScriptedTransport::new(collection(3)));
        let (sync, store) = synchronizer(transport.clone());

        let result = sync.reexecute().await.unwrap();

        assert!(result.is_none());
        assert!(transport.sent().is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_reexecute_replays_last_query() {
        let transport = Arc::new(ScriptedTransport::new(collection(30)));
        let (sync, store) = synchronizer(transport.clone());

        let query = Query::new().with_page(2).with_page_size(10);
        sync.execute(query.clone()).await.unwrap();
        let replayed = sync.reexecute().await.unwrap().unwrap();

        assert_eq!(replayed.page, 2);
        assert_eq!(replayed.items[0].id, 11);
        let pages = page_requests(&transport);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].query, pages[1].query);
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_reexecute_after_shrink_recovers() {
        let rows = Arc::new(std::sync::atomic::AtomicI64::new(30));
        let live = rows.clone();
        let transport = Arc::new(ScriptedTransport::new(move |sent: &Sent| {
            collection(live.load(std::sync::atomic::Ordering::SeqCst))(sent)
        }));
        let (sync, store) = synchronizer(transport);

        sync.execute(Query::new().with_page(3).with_page_size(10))
            .await
            .unwrap();

        // Rows deleted elsewhere; page 3 no longer exists
        rows.store(12, std::sync::atomic::Ordering::SeqCst);
        let result = sync.reexecute().await.unwrap().unwrap();

        assert_eq!(result.page, 1);
        assert_eq!(result.total_count, 12);
        assert_eq!(sync.session().pending().unwrap().page(), 1);
        assert_eq!(store.view().unwrap().last_query.page(), 1);
    }

    #[tokio::test]
    async fn test_views_do_not_share_sessions() {
        let transport = Arc::new(ScriptedTransport::new(collection(3)));
        let (channels, _) = synchronizer(transport.clone());
        let (streams, _) = synchronizer(transport.clone());

        channels
            .execute(Query::new().with_param("search", "news"))
            .await
            .unwrap();

        assert!(channels.session().pending().is_some());
        assert!(streams.session().pending().is_none());
        assert!(streams.reexecute().await.unwrap().is_none());
    }

    /// Transport whose requests only complete once two are in flight
    struct RendezvousTransport {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl Transport for RendezvousTransport {
        async fn send(&self, target: Target) -> ApiResult<Value> {
            let after = std::time::Duration::from_secs(1);
            if tokio::time::timeout(after, self.barrier.wait()).await.is_err() {
                return Err(ApiError::Timeout { after });
            }

            if target.path() == IDS_PATH {
                Ok(json!([1]))
            } else {
                Ok(json!({"count": 1, "results": [{"id": 1, "channel_group": "Sports"}]}))
            }
        }

        fn resolve(&self, path: &str, _query: &[(String, String)]) -> ApiResult<String> {
            Ok(path.to_string())
        }
    }

    #[tokio::test]
    async fn test_page_and_ids_requested_concurrently() {
        let transport = Arc::new(RendezvousTransport {
            barrier: tokio::sync::Barrier::new(2),
        });
        let store = Arc::new(MemoryStore::new());
        let sync: PageSynchronizer<Row> = PageSynchronizer::new(
            transport,
            PageEndpoint::collection("channels/channels"),
            store.clone(),
        );

        let result = sync.execute(Query::new()).await.unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.items[0].id, 1);
        assert_eq!(store.view().unwrap().all_ids.unwrap().ids(), &[1]);
    }
}
