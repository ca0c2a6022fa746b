//! Adornment: binding patterns propagated from a query through the rules
//!
//! Starting from the query's binding pattern, every reachable IDB predicate
//! occurrence is annotated with which arguments are bound (`b`) or free
//! (`f`) when it is called. Each distinct `(predicate, adornment)` pair is
//! processed once; the worklist's seen-set is the memo table.

use super::SipGraph;
use crate::ast::{Atom, Literal, Predicate, Query, Rule};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use tracing::trace;

/// Binding adornment for a predicate: `true` = bound, `false` = free
///
/// For `reach^bf`, positions = [true, false] meaning first arg bound, second free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Adornment {
    pub positions: Vec<bool>,
}

impl Adornment {
    /// Create adornment from bound/free pattern
    pub fn new(positions: Vec<bool>) -> Self {
        Adornment { positions }
    }

    pub fn all_free(arity: usize) -> Self {
        Adornment {
            positions: vec![false; arity],
        }
    }

    /// Produce the adornment string suffix like "bf", "bb", "fb"
    pub fn suffix(&self) -> String {
        self.positions
            .iter()
            .map(|b| if *b { 'b' } else { 'f' })
            .collect()
    }

    /// True if at least one position is bound
    pub fn has_bound(&self) -> bool {
        self.positions.iter().any(|b| *b)
    }

    /// Get indices of bound positions
    pub fn bound_indices(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| i)
            .collect()
    }
}

impl fmt::Display for Adornment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}

/// A predicate together with the binding pattern it is called with
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdornedPredicate {
    pub predicate: Predicate,
    pub adornment: Adornment,
}

impl AdornedPredicate {
    pub fn new(predicate: Predicate, adornment: Adornment) -> Self {
        debug_assert_eq!(predicate.arity, adornment.positions.len());
        AdornedPredicate {
            predicate,
            adornment,
        }
    }

    /// Relation name of the adorned copy, e.g. `reach^bf`
    pub fn adorned_name(&self) -> String {
        format!("{}^{}", self.predicate.symbol, self.adornment)
    }

    /// Name of the magic (demand) predicate, e.g. `magic_reach_bf`
    pub fn magic_name(&self) -> String {
        format!("magic_{}_{}", self.predicate.symbol, self.adornment)
    }

    /// Terms of `atom` at the bound positions
    pub fn bound_terms(&self, atom: &Atom) -> Vec<crate::ast::Term> {
        self.adornment
            .bound_indices()
            .into_iter()
            .map(|i| atom.terms[i].clone())
            .collect()
    }
}

impl fmt::Display for AdornedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.adorned_name())
    }
}

/// One rule specialised for one head adornment
#[derive(Debug, Clone)]
pub struct AdornedRule {
    pub head: AdornedPredicate,
    /// Head atom with the original predicate
    pub head_atom: Atom,
    /// Body after duplicate collapse; index-aligned with `sip` literals
    pub sip: SipGraph,
    /// Adornment of each body literal that refers to an IDB predicate
    pub body_adornments: Vec<Option<AdornedPredicate>>,
}

/// Output of adornment: adorned rules plus the adorned query
#[derive(Debug, Clone)]
pub struct AdornedProgram {
    pub rules: Vec<AdornedRule>,
    pub query: Query,
    /// SIP graph of the query, with nothing bound on entry
    pub query_sip: SipGraph,
    pub query_adornments: Vec<Option<AdornedPredicate>>,
    /// Every adorned predicate reached, in discovery order
    pub predicates: Vec<AdornedPredicate>,
}

/// Adornment of body literal `idx` if it refers to an IDB predicate
fn literal_adornment(
    sip: &SipGraph,
    idx: usize,
    literal: &Literal,
    idb: &HashSet<Predicate>,
) -> Option<AdornedPredicate> {
    if literal.is_builtin() || !idb.contains(literal.predicate()) {
        return None;
    }
    let adornment = if literal.positive {
        Adornment::new(sip.pattern_at(idx, &literal.atom))
    } else {
        // Negative literals consume bindings but never restrict their predicate
        Adornment::all_free(literal.predicate().arity)
    };
    Some(AdornedPredicate::new(literal.predicate().clone(), adornment))
}

/// A body literal identical to the head only passes bindings to itself
fn is_tautological(rule: &Rule) -> bool {
    let head = rule.head_atom();
    rule.body
        .iter()
        .any(|lit| lit.is_positive_ordinary() && &lit.atom == head)
}

/// Adorn `rules` for `query`.
///
/// Returns `None` when no reachable predicate gets a bound argument: the
/// query offers no starting point and magic sets cannot restrict anything.
pub fn adorn(rules: &[Rule], query: &Query) -> Option<AdornedProgram> {
    let idb: HashSet<Predicate> = rules.iter().map(|r| r.head_predicate().clone()).collect();

    let query_sip = SipGraph::build(&BTreeSet::new(), &query.literals);
    let query_adornments: Vec<Option<AdornedPredicate>> = query_sip
        .literals()
        .iter()
        .enumerate()
        .map(|(idx, lit)| literal_adornment(&query_sip, idx, lit, &idb))
        .collect();

    let mut seen: HashSet<AdornedPredicate> = HashSet::new();
    let mut order = Vec::new();
    let mut worklist: VecDeque<AdornedPredicate> = VecDeque::new();
    for adorned in query_adornments.iter().flatten() {
        if seen.insert(adorned.clone()) {
            order.push(adorned.clone());
            worklist.push_back(adorned.clone());
        }
    }

    let mut adorned_rules = Vec::new();
    while let Some(current) = worklist.pop_front() {
        for rule in rules.iter().filter(|r| r.head_predicate() == &current.predicate) {
            if is_tautological(rule) {
                trace!(rule = %rule, "skipping tautological rule");
                continue;
            }
            let head_atom = rule.head_atom().clone();
            let head_bound: BTreeSet<String> = current
                .adornment
                .bound_indices()
                .into_iter()
                .flat_map(|i| head_atom.terms[i].variables())
                .collect();
            let sip = SipGraph::build(&head_bound, &rule.body);
            let body_adornments: Vec<Option<AdornedPredicate>> = sip
                .literals()
                .iter()
                .enumerate()
                .map(|(idx, lit)| literal_adornment(&sip, idx, lit, &idb))
                .collect();
            for adorned in body_adornments.iter().flatten() {
                if seen.insert(adorned.clone()) {
                    trace!(from = %current, to = %adorned, "new adornment");
                    order.push(adorned.clone());
                    worklist.push_back(adorned.clone());
                }
            }
            adorned_rules.push(AdornedRule {
                head: current.clone(),
                head_atom,
                sip,
                body_adornments,
            });
        }
    }

    if !order.iter().any(|a| a.adornment.has_bound()) {
        return None;
    }

    Some(AdornedProgram {
        rules: adorned_rules,
        query: query.clone(),
        query_sip,
        query_adornments,
        predicates: order,
    })
}
