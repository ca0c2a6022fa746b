//! Relations: sets of ground tuples
//!
//! The engine only needs the abstract "set of tuples of a fixed arity"
//! contract. Membership goes through [`Term`] equality, so numeric constants
//! of different datatypes collapse (`p(5)` and `p(5.0)` are one tuple).

use crate::ast::{Atom, Predicate, Term};
use crate::value::Value;
use std::collections::hash_set;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Ordered list of ground terms
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tuple(pub Vec<Term>);

impl Tuple {
    pub fn new(terms: Vec<Term>) -> Self {
        debug_assert!(terms.iter().all(Term::is_ground), "tuples hold ground terms");
        Tuple(terms)
    }

    /// Tuple of constants
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Tuple(values.into_iter().map(|v| Term::Constant(v.into())).collect())
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn terms(&self) -> &[Term] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.0.get(index)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str(")")
    }
}

/// Duplicate-free set of tuples of one arity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    arity: usize,
    tuples: HashSet<Tuple>,
}

impl Relation {
    pub fn new(arity: usize) -> Self {
        Relation {
            arity,
            tuples: HashSet::new(),
        }
    }

    pub fn from_tuples(arity: usize, tuples: impl IntoIterator<Item = Tuple>) -> Self {
        let mut relation = Relation::new(arity);
        for t in tuples {
            relation.insert(t);
        }
        relation
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Insert a tuple; returns true if it was new
    pub fn insert(&mut self, tuple: Tuple) -> bool {
        debug_assert_eq!(tuple.arity(), self.arity, "tuple arity mismatch");
        self.tuples.insert(tuple)
    }

    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples.contains(tuple)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    /// Add every tuple of `other`; returns the number of new tuples
    pub fn extend_from(&mut self, other: &Relation) -> usize {
        other
            .iter()
            .filter(|t| self.tuples.insert((*t).clone()))
            .count()
    }

    /// Tuples in a deterministic order
    pub fn sorted(&self) -> Vec<Tuple> {
        let mut tuples: Vec<Tuple> = self.tuples.iter().cloned().collect();
        tuples.sort();
        tuples
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Tuple;
    type IntoIter = hash_set::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, t) in self.sorted().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("}")
    }
}

/// Predicate to relation mapping (the extensional database, or a model)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facts {
    relations: HashMap<Predicate, Relation>,
}

impl Facts {
    pub fn new() -> Self {
        Facts::default()
    }

    /// Add one fact; returns true if it was new
    pub fn insert(&mut self, predicate: &Predicate, tuple: Tuple) -> bool {
        self.relations
            .entry(predicate.clone())
            .or_insert_with(|| Relation::new(predicate.arity))
            .insert(tuple)
    }

    /// Add a ground atom as a fact; returns `false` for non-ground atoms
    pub fn insert_atom(&mut self, atom: &Atom) -> bool {
        if !atom.is_ground() {
            return false;
        }
        self.insert(&atom.predicate, Tuple(atom.terms.clone()))
    }

    /// Convenience: `facts.add("edge", ["a", "b"])`
    pub fn add<I, V>(&mut self, symbol: &str, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let tuple = Tuple::from_values(values);
        let predicate = Predicate::new(symbol, tuple.arity());
        self.insert(&predicate, tuple)
    }

    pub fn get(&self, predicate: &Predicate) -> Option<&Relation> {
        self.relations.get(predicate)
    }

    pub fn get_mut(&mut self, predicate: &Predicate) -> &mut Relation {
        self.relations
            .entry(predicate.clone())
            .or_insert_with(|| Relation::new(predicate.arity))
    }

    pub fn contains(&self, predicate: &Predicate, tuple: &Tuple) -> bool {
        self.relations
            .get(predicate)
            .is_some_and(|r| r.contains(tuple))
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.relations.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Predicate, &Relation)> {
        self.relations.iter()
    }

    /// Total number of tuples over all predicates
    pub fn len(&self) -> usize {
        self.relations.values().map(Relation::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `other` into `self`; returns the number of new tuples
    pub fn merge(&mut self, other: &Facts) -> usize {
        other
            .relations
            .iter()
            .map(|(p, r)| self.get_mut(p).extend_from(r))
            .sum()
    }

    pub fn remove(&mut self, predicate: &Predicate) -> Option<Relation> {
        self.relations.remove(predicate)
    }
}

impl FromIterator<(Predicate, Tuple)> for Facts {
    fn from_iter<T: IntoIterator<Item = (Predicate, Tuple)>>(iter: T) -> Self {
        let mut facts = Facts::new();
        for (p, t) in iter {
            facts.insert(&p, t);
        }
        facts
    }
}
