pub mod error;
pub mod types;
pub mod execution;
pub mod storage;
pub mod cli;

use error::Result;
use execution::Executor;
use serde_json::Value;
pub use types::{
    BatchError, BatchResult, Config, Entity, GeoPoint, QueryOptions, QueryResult, StoreStats,
    SubjectId, TraverseOptions, Triple, TypedValue,
};

/// Main triple store interface.
///
/// An owned handle: create one per benchmark run or service instance and
/// pass it by reference. All state is in memory and dropped with the handle.
/// Safe to share across threads.
pub struct TripleStore {
    executor: Executor,
}

impl TripleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty store with custom configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            executor: Executor::new(config),
        }
    }

    /// Configuration the store was created with
    pub fn config(&self) -> &Config {
        self.executor.config()
    }

    // ============================================================
    // Triple API
    // ============================================================

    /// Store a triple, overwriting any value for `(subject, predicate)`
    ///
    /// # Example
    /// ```ignore
    /// store.insert_triple("u1", "follows", TypedValue::Ref("u2".into()));
    /// ```
    pub fn insert_triple(&self, subject: &str, predicate: &str, object: TypedValue) {
        self.executor.insert_triple(subject, predicate, object)
    }

    /// Store triples in order; later triples for the same pair win.
    /// Returns the number applied.
    pub fn insert_triples<I>(&self, triples: I) -> usize
    where
        I: IntoIterator<Item = Triple>,
    {
        self.executor.insert_triples(triples)
    }

    /// All triples of a subject, ordered by predicate
    pub fn get_triples(&self, subject: &str) -> Vec<Triple> {
        self.executor.get_triples(subject)
    }

    /// Triples carrying `predicate`, ordered by subject
    pub fn get_triples_by_predicate(&self, predicate: &str, limit: Option<usize>) -> Vec<Triple> {
        self.executor.get_triples_by_predicate(predicate, limit)
    }

    /// Remove one triple. Returns false if it did not exist.
    pub fn delete_triple(&self, subject: &str, predicate: &str) -> bool {
        self.executor.delete_triple(subject, predicate)
    }

    /// Every stored triple, ordered by subject then predicate
    pub fn all_triples(&self) -> Vec<Triple> {
        self.executor.all_triples()
    }

    // ============================================================
    // Entity API
    // ============================================================

    /// Insert a JSON entity, inferring value types from the JSON
    ///
    /// # Example
    /// ```ignore
    /// let id = store.insert(json!({"$id": "user:1", "$type": "User", "friend": "user:2"}))?;
    /// ```
    pub fn insert(&self, entity: Value) -> Result<SubjectId> {
        self.executor.insert(entity)
    }

    /// Insert an entity with explicitly typed values
    ///
    /// # Example
    /// ```ignore
    /// store.insert_entity("p1", Some("Person"), vec![
    ///     ("owns".to_string(), TypedValue::Ref("t1".into())),
    /// ]);
    /// ```
    pub fn insert_entity<I>(&self, id: &str, entity_type: Option<&str>, properties: I)
    where
        I: IntoIterator<Item = (String, TypedValue)>,
    {
        self.executor.insert_entity(id, entity_type, properties)
    }

    /// Materialize an entity, or `None` if the subject has no triples
    pub fn get(&self, id: &str) -> Option<Entity> {
        self.executor.get(id)
    }

    /// Overwrite properties from JSON. Strings are never treated as
    /// references here, unlike [`TripleStore::insert`].
    pub fn update(&self, id: &str, properties: Value) -> Result<()> {
        self.executor.update(id, properties)
    }

    /// Overwrite properties with explicitly typed values
    pub fn update_typed<I>(&self, id: &str, properties: I)
    where
        I: IntoIterator<Item = (String, TypedValue)>,
    {
        self.executor.update_typed(id, properties)
    }

    /// Remove every triple of an entity. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> bool {
        self.executor.delete(id)
    }

    // ============================================================
    // Graph API
    // ============================================================

    /// Breadth-first walk along `predicate`
    ///
    /// # Example
    /// ```ignore
    /// let reachable = store.traverse("u1", "follows", TraverseOptions::new().with_max_depth(2));
    /// ```
    pub fn traverse(&self, start: &str, predicate: &str, options: TraverseOptions) -> Vec<Entity> {
        self.executor.traverse(start, predicate, options)
    }

    /// Entities whose `predicate` currently points at `target`
    pub fn reverse_traverse(&self, target: &str, predicate: &str, limit: Option<usize>) -> Vec<Entity> {
        self.executor.reverse_traverse(target, predicate, limit)
    }

    /// Follow a fixed predicate path from `start`
    ///
    /// # Example
    /// ```ignore
    /// let cities = store.path_traverse("alice", &["employer", "city"], None);
    /// ```
    pub fn path_traverse<S: AsRef<str>>(&self, start: &str, path: &[S], limit: Option<usize>) -> Vec<Entity> {
        self.executor.path_traverse(start, path, limit)
    }

    // ============================================================
    // Batch API
    // ============================================================

    /// Look up several entities; results keep the input positions
    pub fn batch_get<S: AsRef<str>>(&self, ids: &[S]) -> BatchResult<Option<Entity>> {
        self.executor.batch_get(ids)
    }

    /// Insert entities one by one; failures are recorded by position
    pub fn batch_insert<I>(&self, entities: I) -> BatchResult<Option<SubjectId>>
    where
        I: IntoIterator<Item = Value>,
    {
        self.executor.batch_insert(entities)
    }

    // ============================================================
    // Query & stats
    // ============================================================

    /// Run a query string
    ///
    /// # Example
    /// ```ignore
    /// let people = store.query("type:Person")?;
    /// let in_berlin = store.query("city:Berlin")?;
    /// ```
    pub fn query(&self, query: &str) -> Result<QueryResult> {
        self.executor.query(query, QueryOptions::default())
    }

    /// Run a query string with pagination
    pub fn query_with(&self, query: &str, options: QueryOptions) -> Result<QueryResult> {
        self.executor.query(query, options)
    }

    /// Number of distinct subjects
    pub fn count(&self) -> usize {
        self.executor.count()
    }

    /// Triple, entity and distinct predicate counts
    pub fn stats(&self) -> StoreStats {
        self.executor.stats()
    }

    /// Drop all data; the store stays usable and empty
    pub fn close(&self) {
        self.executor.close()
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export commonly used types
pub use error::TripleDbError;
pub use execution::Query;
pub use storage::{LoadFailure, LoadReport};
