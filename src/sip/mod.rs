//! # Sideways Information Passing
//!
//! For one rule and one binding pattern of its head, the SIP graph records
//! how bindings flow left to right through the body: from the bound head
//! arguments (the [`SipSource::Head`] vertex) and from earlier body literals
//! to later literals sharing their variables.
//!
//! ## Binding rules
//!
//! - A positive ordinary literal binds every variable it contains.
//! - A builtin binds its free variables only if it is *evaluable* under the
//!   bindings reaching it; a non-evaluable builtin takes no part in
//!   propagation.
//! - A negative literal receives bindings but never emits them.
//! - Repeated identical literals collapse into one vertex.
//!
//! ## Example
//!
//! ```text
//! sg^bf(X, Y) :- up(X, X1), sg(X1, Y1), down(Y1, Y).
//!
//! Head --{X}--> up(X, X1) --{X1}--> sg(X1, Y1) --{Y1}--> down(Y1, Y)
//! ```
//!
//! Adornment ([`adornment`]) walks these graphs from the query's binding
//! pattern to produce the adorned program consumed by magic sets.

use crate::ast::{Atom, Literal, Term};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

pub mod adornment;

pub use adornment::{adorn, AdornedPredicate, AdornedProgram, AdornedRule, Adornment};

/// Origin of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SipSource {
    /// Bound argument of the rule head (or the query's binding pattern)
    Head,
    /// Body literal by index into [`SipGraph::literals`]
    Literal(usize),
}

/// Variables passed from `from` to literal `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipEdge {
    pub from: SipSource,
    pub to: usize,
    pub variables: BTreeSet<String>,
}

/// Left-to-right SIP graph of one rule body under one head binding pattern
#[derive(Debug, Clone)]
pub struct SipGraph {
    literals: Vec<Literal>,
    edges: Vec<SipEdge>,
    bound: Vec<BTreeSet<String>>,
    emits: Vec<bool>,
    head_bound: BTreeSet<String>,
}

/// Variables of `term` are all in `bound`
pub(crate) fn term_is_bound(term: &Term, bound: &HashSet<String>) -> bool {
    term.variables().iter().all(|v| bound.contains(v))
}

impl SipGraph {
    /// Build the graph for `body` when the variables in `head_bound` are
    /// known on entry
    pub fn build(head_bound: &BTreeSet<String>, body: &[Literal]) -> Self {
        let mut literals: Vec<Literal> = Vec::with_capacity(body.len());
        for literal in body {
            if !literals.contains(literal) {
                literals.push(literal.clone());
            }
        }

        let mut binder: HashMap<String, SipSource> = head_bound
            .iter()
            .map(|v| (v.clone(), SipSource::Head))
            .collect();
        let mut edges = Vec::new();
        let mut bound = Vec::with_capacity(literals.len());
        let mut emits = Vec::with_capacity(literals.len());

        for (idx, literal) in literals.iter().enumerate() {
            let known: HashSet<String> = binder.keys().cloned().collect();
            let evaluable = match &literal.atom.builtin {
                Some(builtin) => {
                    let mask: Vec<bool> = literal
                        .atom
                        .terms
                        .iter()
                        .map(|t| term_is_bound(t, &known))
                        .collect();
                    builtin.can_evaluate(&mask)
                }
                None => true,
            };
            if !evaluable {
                bound.push(BTreeSet::new());
                emits.push(false);
                continue;
            }

            let vars = literal.variables();
            let mut incoming: BTreeMap<SipSource, BTreeSet<String>> = BTreeMap::new();
            for var in &vars {
                if let Some(source) = binder.get(var) {
                    incoming.entry(*source).or_default().insert(var.clone());
                }
            }
            bound.push(incoming.values().flatten().cloned().collect());
            for (from, variables) in incoming {
                edges.push(SipEdge {
                    from,
                    to: idx,
                    variables,
                });
            }

            let emitting = literal.positive;
            if emitting {
                for var in vars {
                    binder.entry(var).or_insert(SipSource::Literal(idx));
                }
            }
            emits.push(emitting);
        }

        SipGraph {
            literals,
            edges,
            bound,
            emits,
            head_bound: head_bound.clone(),
        }
    }

    /// Body literals after collapsing duplicates
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn edges(&self) -> &[SipEdge] {
        &self.edges
    }

    pub fn head_bound(&self) -> &BTreeSet<String> {
        &self.head_bound
    }

    /// Variables of literal `idx` bound when it is reached
    pub fn bound_variables(&self, idx: usize) -> &BTreeSet<String> {
        &self.bound[idx]
    }

    /// Whether literal `idx` passes bindings to later literals
    pub fn emits(&self, idx: usize) -> bool {
        self.emits[idx]
    }

    pub fn edges_into(&self, idx: usize) -> impl Iterator<Item = &SipEdge> {
        self.edges.iter().filter(move |e| e.to == idx)
    }

    /// Distinct body literals feeding `idx` directly
    pub fn literal_sources(&self, idx: usize) -> Vec<usize> {
        let mut sources: Vec<usize> = self
            .edges_into(idx)
            .filter_map(|e| match e.from {
                SipSource::Literal(j) => Some(j),
                SipSource::Head => None,
            })
            .collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }

    /// Binding pattern of `atom` as seen at literal `idx`
    pub fn pattern_at(&self, idx: usize, atom: &Atom) -> Vec<bool> {
        let bound: HashSet<String> = self.bound[idx].iter().cloned().collect();
        atom.terms.iter().map(|t| term_is_bound(t, &bound)).collect()
    }
}

impl fmt::Display for SipGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edge in &self.edges {
            let from = match edge.from {
                SipSource::Head => "head".to_string(),
                SipSource::Literal(j) => self.literals[j].to_string(),
            };
            let vars: Vec<&str> = edge.variables.iter().map(String::as_str).collect();
            writeln!(f, "{from} --{{{}}}--> {}", vars.join(", "), self.literals[edge.to])?;
        }
        Ok(())
    }
}
