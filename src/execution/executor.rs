use crate::error::{Result, TripleDbError};
use crate::execution::query::{self, Query};
use crate::execution::traverse;
use crate::execution::TripleIndex;
use crate::types::{
    BatchError, BatchResult, Config, Entity, QueryOptions, QueryResult, StoreStats, SubjectId,
    TraverseOptions, Triple, TypedValue, ID_KEY, TYPE_PREDICATE,
};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// Executor runs every store operation against the index.
///
/// Reads share the lock; each mutation, including the multi-index update of
/// a single triple, runs under one write guard.
pub struct Executor {
    index: RwLock<TripleIndex>,
    config: Config,
}

impl Executor {
    pub fn new(config: Config) -> Self {
        Self {
            index: RwLock::new(TripleIndex::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ------------------------------------------------------------
    // Triple level
    // ------------------------------------------------------------

    pub fn insert_triple(&self, subject: &str, predicate: &str, object: TypedValue) {
        self.index.write().insert(subject, predicate, object);
    }

    /// Apply triples in order under one write guard; later triples win
    pub fn insert_triples<I>(&self, triples: I) -> usize
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut index = self.index.write();
        let mut applied = 0;
        for triple in triples {
            index.insert(&triple.subject, &triple.predicate, triple.object);
            applied += 1;
        }
        debug!(applied, "inserted triple batch");
        applied
    }

    pub fn get_triples(&self, subject: &str) -> Vec<Triple> {
        self.index.read().triples_of(subject)
    }

    pub fn get_triples_by_predicate(&self, predicate: &str, limit: Option<usize>) -> Vec<Triple> {
        let index = self.index.read();
        index
            .subjects_with(predicate)
            .filter_map(|subject| {
                index
                    .value(subject, predicate)
                    .map(|object| Triple::new(subject.as_str(), predicate, object.clone()))
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn delete_triple(&self, subject: &str, predicate: &str) -> bool {
        self.index.write().remove(subject, predicate).is_some()
    }

    /// Every stored triple, ordered by subject then predicate
    pub fn all_triples(&self) -> Vec<Triple> {
        let index = self.index.read();
        index
            .subjects()
            .flat_map(|(subject, predicates)| {
                predicates
                    .iter()
                    .map(move |(predicate, object)| Triple::new(subject.as_str(), predicate.as_str(), object.clone()))
            })
            .collect()
    }

    // ------------------------------------------------------------
    // Entity level
    // ------------------------------------------------------------

    /// Insert an untyped JSON entity, inferring value types.
    ///
    /// Missing `$id` gets a generated `entity:<uuid>`. Existing predicates of
    /// the same subject are overwritten, others are kept.
    pub fn insert(&self, data: Value) -> Result<SubjectId> {
        let map = into_object(data)?;

        let id = match map.get(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(_) => {
                return Err(TripleDbError::InvalidEntity(
                    "$id must be a non-empty string".to_string(),
                ))
            }
            None => format!("entity:{}", Uuid::new_v4()),
        };

        let properties = self.typed_properties(&map, &self.config.ref_prefixes)?;
        self.write_properties(&id, properties, true);
        Ok(id)
    }

    /// Insert an entity from caller-typed values; no inference happens
    pub fn insert_entity<I>(&self, id: &str, entity_type: Option<&str>, properties: I)
    where
        I: IntoIterator<Item = (String, TypedValue)>,
    {
        let mut index = self.index.write();
        if let Some(entity_type) = entity_type {
            index.insert(id, TYPE_PREDICATE, TypedValue::String(entity_type.to_string()));
        }
        for (predicate, value) in properties {
            index.insert(id, &predicate, value);
        }
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.index.read().materialize(id)
    }

    /// Overwrite the given properties of `id`, inferring types without
    /// reference detection: strings always stay `String`.
    pub fn update(&self, id: &str, properties: Value) -> Result<()> {
        let map = into_object(properties)?;
        let properties = self.typed_properties(&map, &[])?;
        self.write_properties(id, properties, false);
        Ok(())
    }

    pub fn update_typed<I>(&self, id: &str, properties: I)
    where
        I: IntoIterator<Item = (String, TypedValue)>,
    {
        self.insert_entity(id, None, properties);
    }

    pub fn delete(&self, id: &str) -> bool {
        let removed = self.index.write().remove_subject(id);
        if let Some(ref predicates) = removed {
            debug!(id, triples = predicates.len(), "deleted entity");
        }
        removed.is_some()
    }

    // ------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------

    pub fn traverse(&self, start: &str, predicate: &str, options: TraverseOptions) -> Vec<Entity> {
        let max_depth = options.max_depth.unwrap_or(self.config.default_max_depth);
        let limit = options.limit.unwrap_or(self.config.default_limit);
        traverse::traverse_bfs(&self.index.read(), start, predicate, max_depth, limit)
    }

    pub fn reverse_traverse(&self, target: &str, predicate: &str, limit: Option<usize>) -> Vec<Entity> {
        let limit = limit.unwrap_or(self.config.default_limit);
        traverse::reverse_lookup(&self.index.read(), target, predicate, limit)
    }

    pub fn path_traverse<S: AsRef<str>>(&self, start: &str, path: &[S], limit: Option<usize>) -> Vec<Entity> {
        let limit = limit.unwrap_or(self.config.default_limit);
        traverse::follow_path(&self.index.read(), start, path, limit)
    }

    // ------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------

    pub fn batch_get<S: AsRef<str>>(&self, ids: &[S]) -> BatchResult<Option<Entity>> {
        let mut batch = BatchResult::with_capacity(ids.len());
        for id in ids {
            batch.results.push(self.get(id.as_ref()));
        }
        batch
    }

    /// Insert each entity independently; a failure is recorded at its index
    /// and the batch carries on.
    pub fn batch_insert<I>(&self, entities: I) -> BatchResult<Option<SubjectId>>
    where
        I: IntoIterator<Item = Value>,
    {
        let entities = entities.into_iter();
        let mut batch = BatchResult::with_capacity(entities.size_hint().0);

        for (index, entity) in entities.enumerate() {
            match self.insert(entity) {
                Ok(id) => batch.results.push(Some(id)),
                Err(e) => {
                    warn!(index, error = %e, "batch insert item failed");
                    batch.errors.push(BatchError {
                        index,
                        error: e.to_string(),
                    });
                    batch.results.push(None);
                }
            }
        }

        debug!(
            inserted = batch.results.len() - batch.errors.len(),
            failed = batch.errors.len(),
            "batch insert finished"
        );
        batch
    }

    // ------------------------------------------------------------
    // Query and stats
    // ------------------------------------------------------------

    pub fn query(&self, query_str: &str, options: QueryOptions) -> Result<QueryResult> {
        let query = Query::parse(query_str)?;
        Ok(query::execute(&self.index.read(), &query, options))
    }

    pub fn count(&self) -> usize {
        self.index.read().subject_count()
    }

    pub fn stats(&self) -> StoreStats {
        let index = self.index.read();
        StoreStats {
            triples: index.triple_count(),
            entities: index.subject_count(),
            predicates: index.predicate_count(),
        }
    }

    pub fn close(&self) {
        let mut index = self.index.write();
        let entities = index.subject_count();
        index.clear();
        debug!(entities, "store cleared");
    }

    // Helper methods

    fn typed_properties(&self, map: &Map<String, Value>, ref_prefixes: &[String]) -> Result<Vec<(String, TypedValue)>> {
        let mut properties = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key == ID_KEY {
                continue;
            }
            let typed = if key == TYPE_PREDICATE {
                match value {
                    Value::String(entity_type) => TypedValue::String(entity_type.clone()),
                    _ => {
                        return Err(TripleDbError::InvalidEntity(
                            "$type must be a string".to_string(),
                        ))
                    }
                }
            } else {
                TypedValue::infer(value, ref_prefixes)
            };
            properties.push((key.clone(), typed));
        }
        Ok(properties)
    }

    // With `ensure_type`, an entity without `$type` still gets a Null `$type`
    // triple unless it already has one, so every inserted id exists.
    fn write_properties(&self, id: &str, properties: Vec<(String, TypedValue)>, ensure_type: bool) {
        let mut index = self.index.write();
        let typed = properties.iter().any(|(predicate, _)| predicate == TYPE_PREDICATE);
        if ensure_type && !typed && index.value(id, TYPE_PREDICATE).is_none() {
            index.insert(id, TYPE_PREDICATE, TypedValue::Null);
        }
        for (predicate, value) in properties {
            index.insert(id, &predicate, value);
        }
    }
}

fn into_object(data: Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(TripleDbError::InvalidEntity(format!(
            "entity must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor() -> Executor {
        Executor::new(Config::default())
    }

    #[test]
    fn test_insert_and_get() {
        let executor = executor();
        let id = executor
            .insert(json!({"$id": "user:1", "$type": "User", "name": "Alice", "age": 30, "best": "user:2"}))
            .unwrap();
        assert_eq!(id, "user:1");

        let entity = executor.get("user:1").unwrap();
        assert_eq!(entity.entity_type.as_deref(), Some("User"));
        assert_eq!(entity.get("name"), Some(&TypedValue::String("Alice".into())));
        assert_eq!(entity.get("age"), Some(&TypedValue::Float64(30.0)));
        assert_eq!(entity.get("best"), Some(&TypedValue::Ref("user:2".into())));
    }

    #[test]
    fn test_insert_generates_id() {
        let executor = executor();
        let id = executor.insert(json!({"$type": "Note"})).unwrap();
        assert!(id.starts_with("entity:"));
        assert!(executor.get(&id).is_some());
    }

    #[test]
    fn test_insert_id_only_entity_exists() {
        let executor = executor();
        assert_eq!(executor.insert(json!({"$id": "a"})).unwrap(), "a");
        let batch = executor.batch_insert(vec![json!({"$id": "b"})]);
        assert_eq!(batch.results[0].as_deref(), Some("b"));

        let entity = executor.get("a").unwrap();
        assert_eq!(entity.entity_type, None);
        assert!(entity.properties.is_empty());
        assert_eq!(entity.to_value(), json!({"$id": "a"}));
        assert!(executor.get("b").is_some());
        assert_eq!(executor.count(), 2);
    }

    #[test]
    fn test_insert_without_type_keeps_existing_type() {
        let executor = executor();
        executor.insert(json!({"$id": "a", "$type": "User"})).unwrap();
        executor.insert(json!({"$id": "a", "name": "Alice"})).unwrap();

        let entity = executor.get("a").unwrap();
        assert_eq!(entity.entity_type.as_deref(), Some("User"));
        assert_eq!(entity.get("name"), Some(&TypedValue::String("Alice".into())));
    }

    #[test]
    fn test_insert_rejects_malformed_entities() {
        let executor = executor();
        assert!(matches!(executor.insert(json!([1, 2])), Err(TripleDbError::InvalidEntity(_))));
        assert!(executor.insert(json!({"$id": 7})).is_err());
        assert!(executor.insert(json!({"$id": "a", "$type": 7})).is_err());
        assert_eq!(executor.count(), 0);
    }

    #[test]
    fn test_update_does_not_infer_refs() {
        let executor = executor();
        executor.insert(json!({"$id": "a", "$type": "X"})).unwrap();
        executor.update("a", json!({"owner": "user:9", "score": 2})).unwrap();

        let entity = executor.get("a").unwrap();
        assert_eq!(entity.get("owner"), Some(&TypedValue::String("user:9".into())));
        assert_eq!(entity.get("score"), Some(&TypedValue::Float64(2.0)));
        assert!(executor.reverse_traverse("user:9", "owner", None).is_empty());
    }

    #[test]
    fn test_get_triples_by_predicate_limit() {
        let executor = executor();
        for i in 0..5 {
            executor.insert_triple(&format!("s{}", i), "tag", TypedValue::Int32(i));
        }

        assert_eq!(executor.get_triples_by_predicate("tag", None).len(), 5);
        assert_eq!(executor.get_triples_by_predicate("tag", Some(2)).len(), 2);
        assert!(executor.get_triples_by_predicate("missing", None).is_empty());
    }

    #[test]
    fn test_batch_insert_continues_past_failures() {
        let executor = executor();
        let batch = executor.batch_insert(vec![
            json!({"$id": "a", "$type": "X"}),
            json!("not an entity"),
            json!({"$id": "c", "$type": "X"}),
        ]);

        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.results[0].as_deref(), Some("a"));
        assert_eq!(batch.results[1], None);
        assert_eq!(batch.results[2].as_deref(), Some("c"));
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].index, 1);
        assert_eq!(executor.count(), 2);
    }

    #[test]
    fn test_batch_get_keeps_positions() {
        let executor = executor();
        executor.insert(json!({"$id": "a", "$type": "X"})).unwrap();

        let batch = executor.batch_get(&["a", "missing"]);
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results[0].is_some());
        assert!(batch.results[1].is_none());
        assert!(batch.is_ok());
    }

    #[test]
    fn test_close_resets() {
        let executor = executor();
        executor.insert(json!({"$id": "a", "$type": "X", "link": "entity:b"})).unwrap();
        executor.close();

        assert_eq!(executor.count(), 0);
        assert_eq!(executor.stats(), StoreStats::default());
        assert!(executor.reverse_traverse("entity:b", "link", None).is_empty());

        executor.insert_triple("a", "name", TypedValue::String("again".into()));
        assert_eq!(executor.count(), 1);
    }
}
