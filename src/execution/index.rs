use crate::types::{Entity, SubjectId, Triple, TypedValue, TYPE_PREDICATE};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Predicate -> value map of a single subject
pub type PredicateMap = BTreeMap<String, TypedValue>;

/// The three coupled in-memory indexes of the triple store.
///
/// Not synchronized; the executor guards it with a single lock so the
/// multi-index updates below are never observed half-applied. Subjects and
/// predicates iterate in lexicographic order.
#[derive(Debug, Default)]
pub struct TripleIndex {
    // subject -> (predicate -> value)
    by_subject: BTreeMap<SubjectId, PredicateMap>,
    // predicate -> subjects having it
    by_predicate: HashMap<String, BTreeSet<SubjectId>>,
    // ref target -> subjects pointing at it through any predicate
    by_referenced_object: HashMap<SubjectId, BTreeSet<SubjectId>>,
}

impl TripleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a triple, replacing any value already held for
    /// `(subject, predicate)`. Returns the replaced value.
    pub fn insert(&mut self, subject: &str, predicate: &str, object: TypedValue) -> Option<TypedValue> {
        let new_targets = object.ref_targets().to_vec();

        let previous = self
            .by_subject
            .entry(subject.to_string())
            .or_default()
            .insert(predicate.to_string(), object);

        self.by_predicate
            .entry(predicate.to_string())
            .or_default()
            .insert(subject.to_string());

        if let Some(ref old) = previous {
            for target in old.ref_targets() {
                self.unlink_reference(subject, target);
            }
        }

        for target in new_targets {
            self.by_referenced_object
                .entry(target)
                .or_default()
                .insert(subject.to_string());
        }

        previous
    }

    /// Remove a single triple. Returns the removed value.
    pub fn remove(&mut self, subject: &str, predicate: &str) -> Option<TypedValue> {
        let predicates = self.by_subject.get_mut(subject)?;
        let removed = predicates.remove(predicate)?;
        if predicates.is_empty() {
            self.by_subject.remove(subject);
        }

        self.unlink_predicate(subject, predicate);
        for target in removed.ref_targets() {
            self.unlink_reference(subject, target);
        }

        Some(removed)
    }

    /// Remove every triple of a subject. Returns its former predicate map.
    pub fn remove_subject(&mut self, subject: &str) -> Option<PredicateMap> {
        let predicates = self.by_subject.remove(subject)?;

        for (predicate, value) in &predicates {
            self.unlink_predicate(subject, predicate);
            for target in value.ref_targets() {
                self.unlink_reference(subject, target);
            }
        }

        Some(predicates)
    }

    pub fn value(&self, subject: &str, predicate: &str) -> Option<&TypedValue> {
        self.by_subject.get(subject)?.get(predicate)
    }

    pub fn predicates_of(&self, subject: &str) -> Option<&PredicateMap> {
        self.by_subject.get(subject)
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.by_subject.contains_key(subject)
    }

    /// Subjects that hold a value for `predicate`
    pub fn subjects_with<'a>(&'a self, predicate: &str) -> impl Iterator<Item = &'a SubjectId> + 'a {
        self.by_predicate.get(predicate).into_iter().flatten()
    }

    /// Subjects holding a reference to `target` through any predicate
    pub fn referrers_of<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a SubjectId> + 'a {
        self.by_referenced_object.get(target).into_iter().flatten()
    }

    pub fn subjects(&self) -> impl Iterator<Item = (&SubjectId, &PredicateMap)> {
        self.by_subject.iter()
    }

    /// All triples of a subject, ordered by predicate
    pub fn triples_of(&self, subject: &str) -> Vec<Triple> {
        self.by_subject
            .get(subject)
            .map(|predicates| {
                predicates
                    .iter()
                    .map(|(predicate, object)| Triple::new(subject, predicate.as_str(), object.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Build the entity view of a subject.
    ///
    /// A text `$type` becomes `entity_type` and a Null one means untyped; any
    /// other `$type` value stays in `properties` so nothing stored is hidden.
    pub fn materialize(&self, subject: &str) -> Option<Entity> {
        let predicates = self.by_subject.get(subject)?;

        let entity_type = predicates
            .get(TYPE_PREDICATE)
            .and_then(|value| value.as_str())
            .map(str::to_string);

        let properties = predicates
            .iter()
            .filter(|(predicate, value)| {
                let type_tag = value.as_str().is_some() || matches!(value, TypedValue::Null);
                !(predicate.as_str() == TYPE_PREDICATE && type_tag)
            })
            .map(|(predicate, value)| (predicate.clone(), value.clone()))
            .collect();

        Some(Entity {
            id: subject.to_string(),
            entity_type,
            properties,
        })
    }

    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }

    pub fn triple_count(&self) -> usize {
        self.by_subject.values().map(|predicates| predicates.len()).sum()
    }

    pub fn predicate_count(&self) -> usize {
        self.by_predicate.len()
    }

    pub fn clear(&mut self) {
        self.by_subject.clear();
        self.by_predicate.clear();
        self.by_referenced_object.clear();
    }

    fn unlink_predicate(&mut self, subject: &str, predicate: &str) {
        if let Some(subjects) = self.by_predicate.get_mut(predicate) {
            subjects.remove(subject);
            if subjects.is_empty() {
                self.by_predicate.remove(predicate);
            }
        }
    }

    // A subject may reach the same target through several predicates; it
    // only leaves the reverse index once none of them points there.
    fn unlink_reference(&mut self, subject: &str, target: &str) {
        let still_referenced = self
            .by_subject
            .get(subject)
            .map(|predicates| predicates.values().any(|value| value.references(target)))
            .unwrap_or(false);
        if still_referenced {
            return;
        }

        if let Some(subjects) = self.by_referenced_object.get_mut(target) {
            subjects.remove(subject);
            if subjects.is_empty() {
                self.by_referenced_object.remove(target);
            }
        }
    }
}
