//! The ad-hoc query language: `type:<Name>`, `<predicate>:<value>`, or `*`.

use super::TripleIndex;
use crate::error::{Result, TripleDbError};
use crate::types::{QueryOptions, QueryResult, QueryStats, SubjectId, TYPE_PREDICATE};
use std::str::FromStr;
use std::time::Instant;

/// A parsed query.
///
/// Both halves of `key:value` are trimmed. The key `type` always selects on
/// `$type`, so a predicate literally named `type` cannot be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every entity in the store
    All,
    /// Entities whose `$type` equals the name
    Type(String),
    /// Entities whose text value for `predicate` equals `value`
    PredicateEquals { predicate: String, value: String },
}

impl Query {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() || input == "*" {
            return Ok(Query::All);
        }

        let (key, value) = input.split_once(':').ok_or_else(|| {
            TripleDbError::InvalidQuery(format!(
                "'{}': expected type:<Name>, <predicate>:<value> or *",
                input
            ))
        })?;
        let (key, value) = (key.trim(), value.trim());

        if key.is_empty() {
            return Err(TripleDbError::InvalidQuery(format!("'{}': missing predicate", input)));
        }

        if key == "type" {
            if value.is_empty() {
                return Err(TripleDbError::InvalidQuery("type: requires a type name".to_string()));
            }
            return Ok(Query::Type(value.to_string()));
        }

        Ok(Query::PredicateEquals {
            predicate: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Predicate whose index narrows the candidate set, if any
    fn indexed_predicate(&self) -> Option<&str> {
        match self {
            Query::All => None,
            Query::Type(_) => Some(TYPE_PREDICATE),
            Query::PredicateEquals { predicate, .. } => Some(predicate.as_str()),
        }
    }

    fn expected_text(&self) -> Option<&str> {
        match self {
            Query::All => None,
            Query::Type(name) => Some(name.as_str()),
            Query::PredicateEquals { value, .. } => Some(value.as_str()),
        }
    }
}

impl FromStr for Query {
    type Err = TripleDbError;

    fn from_str(s: &str) -> Result<Self> {
        Query::parse(s)
    }
}

/// Run a query against the index
pub fn execute(index: &TripleIndex, query: &Query, options: QueryOptions) -> QueryResult {
    let started = Instant::now();
    let limit = options.limit.unwrap_or(usize::MAX);
    let mut stats = QueryStats::default();

    let candidates: Box<dyn Iterator<Item = &SubjectId> + '_> = match query.indexed_predicate() {
        Some(predicate) => Box::new(index.subjects_with(predicate)),
        None => Box::new(index.subjects().map(|(subject, _)| subject)),
    };

    let mut matched = 0usize;
    let mut entities = Vec::new();
    let mut has_more = false;

    for subject in candidates {
        stats.subjects_scanned += 1;

        let is_match = match (query.indexed_predicate(), query.expected_text()) {
            (Some(predicate), Some(expected)) => {
                stats.triples_scanned += 1;
                index
                    .value(subject, predicate)
                    .and_then(|value| value.as_str())
                    .map(|text| text == expected)
                    .unwrap_or(false)
            }
            _ => {
                stats.triples_scanned += index.predicates_of(subject).map(|p| p.len()).unwrap_or(0);
                true
            }
        };
        if !is_match {
            continue;
        }

        matched += 1;
        if matched <= options.skip {
            continue;
        }
        if entities.len() >= limit {
            has_more = true;
            break;
        }
        if let Some(entity) = index.materialize(subject) {
            entities.push(entity);
        }
    }

    stats.entities_returned = entities.len();
    stats.duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    QueryResult {
        entities,
        has_more,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypedValue;

    fn people() -> TripleIndex {
        let mut index = TripleIndex::new();
        for (id, kind, city) in [
            ("p1", "Person", "Berlin"),
            ("p2", "Person", "Paris"),
            ("p3", "Person", "Berlin"),
            ("c1", "City", "Berlin"),
        ] {
            index.insert(id, TYPE_PREDICATE, TypedValue::String(kind.into()));
            index.insert(id, "city", TypedValue::String(city.into()));
        }
        index.insert("p1", "age", TypedValue::Float64(30.0));
        index
    }

    fn ids(result: &QueryResult) -> Vec<&str> {
        result.entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(Query::parse("type:User").unwrap(), Query::Type("User".into()));
        assert_eq!(
            Query::parse("email:a@b.c").unwrap(),
            Query::PredicateEquals { predicate: "email".into(), value: "a@b.c".into() }
        );
        assert_eq!(
            Query::parse("url:http://x").unwrap(),
            Query::PredicateEquals { predicate: "url".into(), value: "http://x".into() }
        );
        assert_eq!(Query::parse("*").unwrap(), Query::All);
        assert_eq!(Query::parse("  ").unwrap(), Query::All);
        assert!(matches!(Query::parse("SELECT *"), Err(TripleDbError::InvalidQuery(_))));
        assert!(Query::parse(":x").is_err());
        assert!(Query::parse("type:").is_err());
        assert!("type:X".parse::<Query>().is_ok());
        assert_eq!(Query::parse("type: User ").unwrap(), Query::Type("User".into()));
        assert_eq!(
            Query::parse("city : Berlin").unwrap(),
            Query::PredicateEquals { predicate: "city".into(), value: "Berlin".into() }
        );
        assert!(Query::parse("type:  ").is_err());
    }

    #[test]
    fn test_type_query() {
        let index = people();
        let result = execute(&index, &Query::Type("Person".into()), QueryOptions::default());

        assert_eq!(ids(&result), vec!["p1", "p2", "p3"]);
        assert!(!result.has_more);
        assert_eq!(result.stats.entities_returned, 3);
        assert_eq!(result.stats.subjects_scanned, 4);

        let none = execute(&index, &Query::Type("Robot".into()), QueryOptions::default());
        assert!(none.entities.is_empty());
    }

    #[test]
    fn test_predicate_query_is_string_equality() {
        let index = people();
        let berlin = Query::parse("city:Berlin").unwrap();
        assert_eq!(ids(&execute(&index, &berlin, QueryOptions::default())), vec!["c1", "p1", "p3"]);

        let age = Query::parse("age:30").unwrap();
        assert!(execute(&index, &age, QueryOptions::default()).entities.is_empty());
    }

    #[test]
    fn test_pagination() {
        let index = people();
        let query = Query::All;

        let first = execute(&index, &query, QueryOptions { limit: Some(2), skip: 0 });
        assert_eq!(ids(&first), vec!["c1", "p1"]);
        assert!(first.has_more);

        let rest = execute(&index, &query, QueryOptions { limit: Some(2), skip: 2 });
        assert_eq!(ids(&rest), vec!["p2", "p3"]);
        assert!(!rest.has_more);
    }

    #[test]
    fn test_full_scan_counts_triples() {
        let index = people();
        let result = execute(&index, &Query::All, QueryOptions::default());

        assert_eq!(result.stats.subjects_scanned, 4);
        assert_eq!(result.stats.triples_scanned, index.triple_count());
    }
}
