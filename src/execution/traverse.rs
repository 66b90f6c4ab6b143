//! Graph walks over `Ref`/`RefArray` edges.
//!
//! All three walks only return subjects that currently have triples; a
//! reference to an unknown subject is skipped.

use super::TripleIndex;
use crate::types::{Entity, SubjectId};
use std::collections::{HashSet, VecDeque};

/// Breadth-first walk along `predicate` from `start`.
///
/// The start itself is never returned. Each subject is visited at most once
/// per walk, so cycles terminate. Stops when the queue drains, every frontier
/// is deeper than `max_depth`, or `limit` entities were collected.
pub fn traverse_bfs(
    index: &TripleIndex,
    start: &str,
    predicate: &str,
    max_depth: usize,
    limit: usize,
) -> Vec<Entity> {
    let mut results = Vec::new();
    if limit == 0 {
        return results;
    }

    let mut visited: HashSet<SubjectId> = HashSet::new();
    visited.insert(start.to_string());

    // (subject, hops from start)
    let mut queue: VecDeque<(SubjectId, usize)> = VecDeque::new();
    queue.push_back((start.to_string(), 0));

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        let targets = match index.value(&node, predicate) {
            Some(value) => value.ref_targets(),
            None => continue,
        };

        for target in targets {
            if !visited.insert(target.clone()) {
                continue;
            }
            if let Some(entity) = index.materialize(target) {
                results.push(entity);
                if results.len() >= limit {
                    return results;
                }
                queue.push_back((target.clone(), depth + 1));
            }
        }
    }

    results
}

/// Subjects whose current `predicate` value points at `target`. Single hop.
pub fn reverse_lookup(index: &TripleIndex, target: &str, predicate: &str, limit: usize) -> Vec<Entity> {
    index
        .referrers_of(target)
        .filter(|subject| {
            index
                .value(subject, predicate)
                .map(|value| value.references(target))
                .unwrap_or(false)
        })
        .filter_map(|subject| index.materialize(subject))
        .take(limit)
        .collect()
}

/// Follow a fixed sequence of predicates, one hop each.
///
/// Each step carries forward the set of ids reached by the previous one,
/// de-duplicated within the step only. An empty path yields the start entity;
/// a step reaching nothing yields no entities.
pub fn follow_path<S: AsRef<str>>(index: &TripleIndex, start: &str, path: &[S], limit: usize) -> Vec<Entity> {
    let mut current: Vec<SubjectId> = vec![start.to_string()];

    for predicate in path {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut next: Vec<SubjectId> = Vec::new();

        for id in &current {
            if let Some(value) = index.value(id, predicate.as_ref()) {
                for target in value.ref_targets() {
                    if seen.insert(target.as_str()) {
                        next.push(target.clone());
                    }
                }
            }
        }

        current = next;
        if current.is_empty() {
            break;
        }
    }

    current
        .iter()
        .filter_map(|id| index.materialize(id))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypedValue;
    use proptest::prelude::*;

    fn r(target: &str) -> TypedValue {
        TypedValue::Ref(target.to_string())
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    fn chain() -> TripleIndex {
        let mut index = TripleIndex::new();
        index.insert("u1", "follows", r("u2"));
        index.insert("u2", "follows", r("u3"));
        index.insert("u3", "follows", r("u4"));
        index.insert("u4", "name", TypedValue::String("last".into()));
        index
    }

    #[test]
    fn test_traverse_depth() {
        let index = chain();

        assert_eq!(ids(&traverse_bfs(&index, "u1", "follows", 1, 100)), vec!["u2"]);
        assert_eq!(ids(&traverse_bfs(&index, "u1", "follows", 2, 100)), vec!["u2", "u3"]);
        assert_eq!(ids(&traverse_bfs(&index, "u1", "follows", 10, 100)), vec!["u2", "u3", "u4"]);
        assert!(traverse_bfs(&index, "u1", "follows", 0, 100).is_empty());
    }

    #[test]
    fn test_traverse_limit() {
        let index = chain();
        assert_eq!(ids(&traverse_bfs(&index, "u1", "follows", 10, 2)), vec!["u2", "u3"]);
        assert!(traverse_bfs(&index, "u1", "follows", 10, 0).is_empty());
    }

    #[test]
    fn test_traverse_cycle_is_deduplicated() {
        let mut index = TripleIndex::new();
        index.insert("a", "p", r("b"));
        index.insert("b", "p", r("a"));

        let found = traverse_bfs(&index, "a", "p", 10, 100);
        assert_eq!(ids(&found), vec!["b"]);
    }

    #[test]
    fn test_traverse_follows_ref_arrays_in_order() {
        let mut index = TripleIndex::new();
        index.insert("root", "child", TypedValue::RefArray(vec!["c2".into(), "c1".into()]));
        index.insert("c1", "child", r("leaf"));
        index.insert("c2", "name", TypedValue::String("two".into()));
        index.insert("c1", "name", TypedValue::String("one".into()));
        index.insert("leaf", "name", TypedValue::String("leaf".into()));

        let found = traverse_bfs(&index, "root", "child", 2, 100);
        assert_eq!(ids(&found), vec!["c2", "c1", "leaf"]);
    }

    #[test]
    fn test_traverse_skips_dangling_refs() {
        let mut index = TripleIndex::new();
        index.insert("a", "p", r("ghost"));
        assert!(traverse_bfs(&index, "a", "p", 3, 100).is_empty());
    }

    #[test]
    fn test_reverse_lookup_filters_by_predicate() {
        let mut index = TripleIndex::new();
        index.insert("p1", "owns", r("t1"));
        index.insert("p2", "likes", r("t1"));
        index.insert("p3", "owns", r("t1"));

        assert_eq!(ids(&reverse_lookup(&index, "t1", "owns", 100)), vec!["p1", "p3"]);
        assert_eq!(ids(&reverse_lookup(&index, "t1", "likes", 100)), vec!["p2"]);
        assert_eq!(ids(&reverse_lookup(&index, "t1", "owns", 1)), vec!["p1"]);
        assert!(reverse_lookup(&index, "t2", "owns", 100).is_empty());
    }

    #[test]
    fn test_follow_path() {
        let mut index = TripleIndex::new();
        index.insert("alice", "employer", r("acme"));
        index.insert("bob", "employer", r("acme"));
        index.insert("acme", "city", r("berlin"));
        index.insert("berlin", "name", TypedValue::String("Berlin".into()));

        let found = follow_path(&index, "alice", &["employer", "city"], 100);
        assert_eq!(ids(&found), vec!["berlin"]);

        let empty: [&str; 0] = [];
        assert_eq!(ids(&follow_path(&index, "alice", &empty, 100)), vec!["alice"]);
        assert!(follow_path(&index, "alice", &["missing", "city"], 100).is_empty());
    }

    #[test]
    fn test_follow_path_dedups_within_step() {
        let mut index = TripleIndex::new();
        index.insert("team", "members", TypedValue::RefArray(vec!["a".into(), "b".into()]));
        index.insert("a", "manager", r("m"));
        index.insert("b", "manager", r("m"));
        index.insert("m", "name", TypedValue::String("M".into()));

        let found = follow_path(&index, "team", &["members", "manager"], 100);
        assert_eq!(ids(&found), vec!["m"]);
    }

    proptest! {
        #[test]
        fn prop_traverse_unique_and_depth_bounded(
            edges in proptest::collection::vec((0u8..8, 0u8..8), 0..20),
            max_depth in 0usize..5,
        ) {
            let mut index = TripleIndex::new();
            for (s, t) in &edges {
                index.insert(&format!("n{s}"), "p", r(&format!("n{t}")));
                index.insert(&format!("n{t}"), "seen", TypedValue::Bool(true));
            }

            let found = traverse_bfs(&index, "n0", "p", max_depth, 100);

            let unique: HashSet<&str> = found.iter().map(|e| e.id.as_str()).collect();
            prop_assert_eq!(unique.len(), found.len());
            prop_assert!(!unique.contains("n0"));

            // Single-valued predicate: hop k of the chain from n0 is unique.
            let mut reachable = HashSet::new();
            let mut node = "n0".to_string();
            for _ in 0..max_depth {
                match index.value(&node, "p") {
                    Some(TypedValue::Ref(next)) => {
                        reachable.insert(next.clone());
                        node = next.clone();
                    }
                    _ => break,
                }
            }
            for entity in &found {
                prop_assert!(reachable.contains(&entity.id));
            }
        }
    }
}
