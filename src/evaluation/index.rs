//! Hash indexes for body joins. O(1) candidate lookup by the bound columns
//! of a literal.
//!
//! ```text
//! IndexCache (one rule evaluation)
//!   `-- HashMap<JoinKeySpec, HashIndex>
//!         `-- HashIndex: HashMap<key terms, Vec<&Tuple>>
//! ```
//!
//! Indexes borrow the relations of the round snapshot, so they are built
//! lazily on first probe and dropped with the rule evaluation.

use crate::ast::{Predicate, Term};
use crate::relation::{Relation, Tuple};
use std::collections::HashMap;

/// Which relation an index covers and on which columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct JoinKeySpec {
    pub predicate: Predicate,
    /// Built over the delta instead of the totals
    pub delta: bool,
    pub key_columns: Vec<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct HashIndex<'a> {
    entries: HashMap<Vec<Term>, Vec<&'a Tuple>>,
}

impl<'a> HashIndex<'a> {
    pub fn build(relation: &'a Relation, key_columns: &[usize]) -> Self {
        let mut entries: HashMap<Vec<Term>, Vec<&'a Tuple>> = HashMap::new();
        for tuple in relation {
            let key: Option<Vec<Term>> = key_columns.iter().map(|&c| tuple.get(c).cloned()).collect();
            if let Some(key) = key {
                entries.entry(key).or_default().push(tuple);
            }
        }
        HashIndex { entries }
    }

    pub fn probe(&self, key: &[Term]) -> &[&'a Tuple] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Lazily built indexes for one rule evaluation
#[derive(Debug, Default)]
pub(crate) struct IndexCache<'a> {
    indexes: HashMap<JoinKeySpec, HashIndex<'a>>,
}

impl<'a> IndexCache<'a> {
    /// Tuples of `relation` whose key columns equal `key`
    pub fn candidates(
        &mut self,
        spec: JoinKeySpec,
        relation: &'a Relation,
        key: &[Term],
    ) -> Vec<&'a Tuple> {
        let index = self
            .indexes
            .entry(spec)
            .or_insert_with_key(|spec| HashIndex::build(relation, &spec.key_columns));
        index.probe(key).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges() -> Relation {
        Relation::from_tuples(
            2,
            [(1, 2), (1, 3), (2, 4)].map(|(a, b)| Tuple::from_values([a, b])),
        )
    }

    #[test]
    fn test_probe_by_first_column() {
        let relation = edges();
        let index = HashIndex::build(&relation, &[0]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.probe(&[Term::constant(1)]).len(), 2);
        assert!(index.probe(&[Term::constant(9)]).is_empty());
    }

    #[test]
    fn test_cache_reuses_index() {
        let relation = edges();
        let mut cache = IndexCache::default();
        let spec = JoinKeySpec {
            predicate: Predicate::new("edge", 2),
            delta: false,
            key_columns: vec![1],
        };
        let found = cache.candidates(spec.clone(), &relation, &[Term::constant(4)]);
        assert_eq!(found, vec![&Tuple::from_values([2, 4])]);
        assert_eq!(cache.indexes.len(), 1);
        cache.candidates(spec, &relation, &[Term::constant(3)]);
        assert_eq!(cache.indexes.len(), 1);
    }

    #[test]
    fn test_cross_type_key_matches() {
        let relation = edges();
        let index = HashIndex::build(&relation, &[0]);
        assert_eq!(index.probe(&[Term::constant(1.0)]).len(), 2);
    }
}
