//! Collection store adapters
//!
//! The UI keeps its own state containers; this module defines the narrow
//! interface the data-access layer writes into, plus an in-memory
//! implementation used by the CLI and by tests.
//!
//! Mutation endpoints do not always echo the entity back. Their responses
//! are classified into an [`Outcome`] first, and only a `Created` outcome
//! reaches the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiResult;
use crate::paging::{AllIdsSnapshot, Query, QueryResult};

/// Numeric identifier used by every collection on the service
pub type EntityId = i64;

/// Anything with a stable numeric id
pub trait Entity {
    fn id(&self) -> EntityId;
}

/// Receiving end for single-entity changes
pub trait CollectionStore<T>: Send + Sync {
    fn add(&self, entity: T);
    fn update(&self, entity: T);
    fn remove(&self, ids: &[EntityId]);
}

/// Receiving end for a synchronized paginated view
pub trait ViewStore<T>: Send + Sync {
    /// Replace the view state in one write
    fn commit(&self, view: ViewState<T>);
}

/// What a paginated view currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub last_query: Query,
    pub last_result: Option<QueryResult<T>>,
    pub all_ids: Option<AllIdsSnapshot>,
}

impl<T> ViewState<T> {
    /// A view that has issued `query` but has nothing to show yet
    pub fn pending(query: Query) -> Self {
        Self {
            last_query: query,
            last_result: None,
            all_ids: None,
        }
    }

    /// A fully synchronized view
    pub fn synchronized(query: Query, result: QueryResult<T>, ids: AllIdsSnapshot) -> Self {
        Self {
            last_query: query,
            last_result: Some(result),
            all_ids: Some(ids),
        }
    }

    /// The result, if any, belongs to the page currently requested
    pub fn is_consistent(&self) -> bool {
        self.last_result
            .as_ref()
            .map_or(true, |result| result.page == self.last_query.page())
    }
}

/// Classified response of a mutation endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The service returned the stored entity
    Created(T),
    /// Nothing to apply (empty body, message-only body)
    NoOp,
}

/// Which store mutation a `Created` outcome should trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Update,
}

/// Classify a mutation response by whether it carries an entity id
pub fn classify<T: DeserializeOwned>(body: Value) -> ApiResult<Outcome<T>> {
    let has_id = body
        .as_object()
        .and_then(|map| map.get("id"))
        .is_some_and(|id| !id.is_null());

    if !has_id {
        return Ok(Outcome::NoOp);
    }

    Ok(Outcome::Created(serde_json::from_value(body)?))
}

impl<T: Clone> Outcome<T> {
    /// Apply a `Created` outcome to the store and hand the entity back
    pub fn apply(self, store: &dyn CollectionStore<T>, mutation: Mutation) -> Option<T> {
        match self {
            Outcome::Created(entity) => {
                match mutation {
                    Mutation::Add => store.add(entity.clone()),
                    Mutation::Update => store.update(entity.clone()),
                }
                Some(entity)
            }
            Outcome::NoOp => None,
        }
    }
}

/// In-memory store for one entity family and its paginated view
#[derive(Debug)]
pub struct MemoryStore<T> {
    entities: RwLock<Vec<T>>,
    view: RwLock<Option<ViewState<T>>>,
    commits: AtomicU64,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
            view: RwLock::new(None),
            commits: AtomicU64::new(0),
        }
    }
}

impl<T: Entity + Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all known entities
    pub fn entities(&self) -> Vec<T> {
        self.entities
            .read()
            .map(|entities| entities.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, id: EntityId) -> Option<T> {
        self.entities
            .read()
            .ok()?
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current view state
    pub fn view(&self) -> Option<ViewState<T>> {
        self.view.read().ok().and_then(|view| view.clone())
    }

    /// Number of view commits so far
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

impl<T: Entity + Clone + Send + Sync> CollectionStore<T> for MemoryStore<T> {
    fn add(&self, entity: T) {
        if let Ok(mut entities) = self.entities.write() {
            match entities.iter_mut().find(|e| e.id() == entity.id()) {
                Some(existing) => *existing = entity,
                None => entities.push(entity),
            }
        }
    }

    fn update(&self, entity: T) {
        if let Ok(mut entities) = self.entities.write() {
            if let Some(existing) = entities.iter_mut().find(|e| e.id() == entity.id()) {
                *existing = entity;
            }
        }
    }

    fn remove(&self, ids: &[EntityId]) {
        if let Ok(mut entities) = self.entities.write() {
            entities.retain(|e| !ids.contains(&e.id()));
        }
    }
}

impl<T: Entity + Clone + Send + Sync> ViewStore<T> for MemoryStore<T> {
    fn commit(&self, view: ViewState<T>) {
        if let Ok(mut current) = self.view.write() {
            *current = Some(view);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Item {
        id: EntityId,
        name: String,
    }

    impl Entity for Item {
        fn id(&self) -> EntityId {
            self.id
        }
    }

    fn item(id: EntityId, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_add_update_remove() {
        let store = MemoryStore::new();
        store.add(item(1, "one"));
        store.add(item(2, "two"));
        assert_eq!(store.len(), 2);

        store.update(item(2, "deux"));
        assert_eq!(store.get(2).unwrap().name, "deux");

        // Updating an unknown entity does not insert it
        store.update(item(9, "nine"));
        assert!(store.get(9).is_none());

        store.remove(&[1, 2]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_replaces_same_id() {
        let store = MemoryStore::new();
        store.add(item(1, "one"));
        store.add(item(1, "uno"));
        assert_eq!(store.entities(), vec![item(1, "uno")]);
    }

    #[test]
    fn test_classify_created() {
        let outcome: Outcome<Item> = classify(json!({"id": 5, "name": "five"})).unwrap();
        assert_eq!(outcome, Outcome::Created(item(5, "five")));
    }

    #[test]
    fn test_classify_noop() {
        let outcome: Outcome<Item> = classify(Value::Null).unwrap();
        assert_eq!(outcome, Outcome::NoOp);

        let outcome: Outcome<Item> = classify(json!({"message": "queued"})).unwrap();
        assert_eq!(outcome, Outcome::NoOp);

        let outcome: Outcome<Item> = classify(json!({"id": null})).unwrap();
        assert_eq!(outcome, Outcome::NoOp);
    }

    #[test]
    fn test_classify_bad_entity() {
        let outcome = classify::<Item>(json!({"id": 5}));
        assert!(outcome.is_err());
    }

    #[test]
    fn test_outcome_apply() {
        let store = MemoryStore::new();

        let added = Outcome::Created(item(1, "one")).apply(&store, Mutation::Add);
        assert_eq!(added, Some(item(1, "one")));
        assert_eq!(store.len(), 1);

        let updated = Outcome::Created(item(1, "uno")).apply(&store, Mutation::Update);
        assert_eq!(updated.unwrap().name, "uno");

        let nothing = Outcome::<Item>::NoOp.apply(&store, Mutation::Add);
        assert!(nothing.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_view_commit() {
        let store: MemoryStore<Item> = MemoryStore::new();
        assert!(store.view().is_none());

        let query = Query::new().with_page(2);
        let result = QueryResult {
            items: vec![item(3, "three")],
            total_count: 3,
            page: 2,
        };
        store.commit(ViewState::synchronized(
            query.clone(),
            result,
            AllIdsSnapshot::new(vec![1, 2, 3]),
        ));

        let view = store.view().unwrap();
        assert_eq!(view.last_query, query);
        assert!(view.is_consistent());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_commit_count_across_threads() {
        let store: MemoryStore<Item> = MemoryStore::new();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for page in 1..=10 {
                        store.commit(ViewState::pending(Query::new().with_page(page)));
                    }
                });
            }
        });

        assert_eq!(store.commit_count(), 40);
    }

    #[test]
    fn test_view_consistency() {
        let view: ViewState<Item> = ViewState {
            last_query: Query::new().with_page(3),
            last_result: Some(QueryResult {
                items: vec![],
                total_count: 0,
                page: 1,
            }),
            all_ids: None,
        };
        assert!(!view.is_consistent());
        assert!(ViewState::<Item>::pending(Query::new()).is_consistent());
    }
}
