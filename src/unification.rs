//! Term unification and substitutions
//!
//! Substitutions are kept acyclic: binding a variable performs an occurs check,
//! so resolving a binding chain always terminates and [`Substitution::apply`]
//! is idempotent once the substitution is resolved.

use crate::ast::{Atom, Term};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Mapping from variable name to term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: HashMap<String, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Direct binding of `var`, without following chains
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    /// Bind `var` to `term` without checks.
    ///
    /// Callers must ensure `var` is unbound and does not occur in the
    /// resolved `term`.
    pub fn bind(&mut self, var: impl Into<String>, term: Term) {
        self.bindings.insert(var.into(), term);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.bindings.iter()
    }

    /// Follow variable bindings until reaching a non-variable or unbound variable
    fn walk<'a>(&'a self, term: &'a Term) -> &'a Term {
        let mut current = term;
        while let Term::Variable(name) = current {
            match self.bindings.get(name) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Recursively replace bound variables in `term`
    pub fn apply(&self, term: &Term) -> Term {
        match self.walk(term) {
            Term::Construct(functor, args) => {
                Term::Construct(functor.clone(), args.iter().map(|a| self.apply(a)).collect())
            }
            resolved => resolved.clone(),
        }
    }

    pub fn apply_all(&self, terms: &[Term]) -> Vec<Term> {
        terms.iter().map(|t| self.apply(t)).collect()
    }

    pub fn apply_atom(&self, atom: &Atom) -> Atom {
        Atom {
            predicate: atom.predicate.clone(),
            terms: self.apply_all(&atom.terms),
            builtin: atom.builtin.clone(),
        }
    }

    /// True if `var` resolves to a ground term
    pub fn is_bound(&self, var: &str) -> bool {
        self.apply(&Term::Variable(var.to_string())).is_ground()
    }

    fn occurs(&self, var: &str, term: &Term) -> bool {
        match self.walk(term) {
            Term::Variable(name) => name == var,
            Term::Constant(_) => false,
            Term::Construct(_, args) => args.iter().any(|a| self.occurs(var, a)),
        }
    }

    fn unify_in_place(&mut self, t1: &Term, t2: &Term) -> bool {
        let a = self.walk(t1).clone();
        let b = self.walk(t2).clone();
        match (&a, &b) {
            (Term::Variable(x), Term::Variable(y)) if x == y => true,
            (Term::Variable(x), other) | (other, Term::Variable(x)) => {
                if self.occurs(x, other) {
                    return false;
                }
                self.bindings.insert(x.clone(), other.clone());
                true
            }
            (Term::Constant(v1), Term::Constant(v2)) => v1 == v2,
            (Term::Construct(f1, args1), Term::Construct(f2, args2)) => {
                f1 == f2
                    && args1.len() == args2.len()
                    && args1
                        .iter()
                        .zip(args2)
                        .all(|(x, y)| self.unify_in_place(x, y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        f.write_str("{")?;
        for (i, (var, term)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var} -> {term}")?;
        }
        f.write_str("}")
    }
}

/// Extend `subst` so that both terms become equal, or `None` if impossible
pub fn unify(t1: &Term, t2: &Term, subst: &Substitution) -> Option<Substitution> {
    let mut extended = subst.clone();
    extended.unify_in_place(t1, t2).then_some(extended)
}

/// Positions holding ground terms
pub fn groundness(terms: &[Term]) -> BTreeSet<usize> {
    terms
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_ground())
        .map(|(i, _)| i)
        .collect()
}

/// Match `pattern` against a ground `value`, extending `subst` in place.
///
/// Cheaper than [`unify`] for the evaluator's hot path: the right-hand side
/// is known to be ground, so no occurs check is needed. On failure `subst`
/// may hold partial bindings and must be discarded.
pub fn match_ground(pattern: &Term, value: &Term, subst: &mut Substitution) -> bool {
    match pattern {
        Term::Variable(name) => match subst.bindings.get(name) {
            Some(bound) => {
                let bound = bound.clone();
                match_ground(&bound, value, subst)
            }
            None => {
                subst.bindings.insert(name.clone(), value.clone());
                true
            }
        },
        Term::Constant(c) => matches!(value, Term::Constant(v) if v == c),
        Term::Construct(functor, args) => match value {
            Term::Construct(vf, vargs) => {
                functor == vf
                    && args.len() == vargs.len()
                    && args
                        .iter()
                        .zip(vargs)
                        .all(|(p, v)| match_ground(p, v, subst))
            }
            _ => false,
        },
    }
}
