//! # Magic Sets Transformation
//!
//! Demand-driven rewriting for queries with bound arguments.
//!
//! When a query like `?- reach(1, Y)` is issued against recursive rules, plain
//! bottom-up evaluation computes the full transitive closure and then filters.
//! Magic sets rewrites the program so that the fixpoint only derives tuples
//! demanded by the query's bindings.
//!
//! ## Example
//!
//! Original program:
//! ```datalog
//! reach(X, Y) :- edge(X, Y).
//! reach(X, Z) :- reach(X, Y), edge(Y, Z).
//! ?- reach(1, Y).
//! ```
//!
//! After the rewrite:
//! ```datalog
//! magic_reach_bf(1).
//! reach^bf(X, Y) :- magic_reach_bf(X), edge(X, Y).
//! reach^bf(X, Z) :- magic_reach_bf(X), reach^bf(X, Y), edge(Y, Z).
//! magic_reach_bf(X) :- magic_reach_bf(X).
//! reach^bf(V0, V1) :- magic_reach_bf(V0), reach(V0, V1).
//! ?- reach^bf(1, Y).
//! ```
//!
//! The last rule bridges facts stored directly under `reach` into the adorned
//! relation. Trivial self-propagation rules are dropped.
//!
//! ## Labeled predicates
//!
//! When the bound arguments of a body literal come from several earlier
//! literals, one `label_<name>_<k>_<adornment>` rule is emitted per source
//! and the magic rule joins the labels. A label carries the variables its
//! source passes on plus those it shares with the other labels, so the join
//! keeps bindings from the same derivation together.
//!
//! Propagation and label bodies repeat every earlier positive literal of the
//! rule, builtins included, so demand never outgrows what the rule itself
//! could reach.
//!
//! ## Pipeline Position
//!
//! ```text
//! safety -> stratify -> adorn -> [Magic Sets] -> safety/stratify re-check -> evaluate
//! ```

use crate::ast::{Atom, Literal, Query, Rule, Term};
use crate::sip::{adorn, AdornedPredicate, AdornedProgram, SipGraph, SipSource};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// Counts of generated rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MagicStats {
    pub adorned_rules: usize,
    pub magic_rules: usize,
    pub labeled_rules: usize,
    pub seed_rules: usize,
    pub bridge_rules: usize,
}

/// Rewritten program ready for bottom-up evaluation
#[derive(Debug, Clone)]
pub struct MagicProgram {
    pub rules: Vec<Rule>,
    pub query: Query,
    pub stats: MagicStats,
}

/// Magic Sets rewriter
#[derive(Debug, Default)]
pub struct MagicSetRewriter {
    next_label: usize,
    stats: MagicStats,
}

/// Adorn and rewrite in one step; `None` if the query has no usable bindings
pub fn rewrite(rules: &[Rule], query: &Query) -> Option<MagicProgram> {
    let adorned = adorn(rules, query)?;
    Some(MagicSetRewriter::new().rewrite_program(&adorned))
}

/// Literal `literal` with its predicate renamed to the adorned relation
fn adorned_literal(literal: &Literal, adorned: Option<&AdornedPredicate>) -> Literal {
    match adorned {
        Some(ap) => Literal {
            atom: literal.atom.renamed(ap.adorned_name()),
            positive: literal.positive,
        },
        None => literal.clone(),
    }
}

impl MagicSetRewriter {
    pub fn new() -> Self {
        MagicSetRewriter::default()
    }

    /// Rewrite an adorned program
    pub fn rewrite_program(mut self, adorned: &AdornedProgram) -> MagicProgram {
        let mut rules = Vec::new();

        for ar in &adorned.rules {
            let guard = ar.head.adornment.has_bound().then(|| {
                Literal::positive(Atom::new(ar.head.magic_name(), ar.head.bound_terms(&ar.head_atom)))
            });
            let body: Vec<Literal> = ar
                .sip
                .literals()
                .iter()
                .zip(&ar.body_adornments)
                .map(|(lit, ap)| adorned_literal(lit, ap.as_ref()))
                .collect();

            let mut modified = Vec::with_capacity(body.len() + 1);
            modified.extend(guard.clone());
            modified.extend(body.iter().cloned());
            rules.push(Rule::new(ar.head_atom.renamed(ar.head.adorned_name()), modified));
            self.stats.adorned_rules += 1;

            for (idx, ap) in ar.body_adornments.iter().enumerate() {
                let literal = &ar.sip.literals()[idx];
                if let Some(ap) = ap {
                    if literal.positive && ap.adornment.has_bound() {
                        rules.extend(self.demand_rules(ap, idx, literal, &ar.sip, guard.as_ref(), &body));
                    }
                }
            }
        }

        // Seeds and propagation from the query itself
        let query_body: Vec<Literal> = adorned
            .query_sip
            .literals()
            .iter()
            .zip(&adorned.query_adornments)
            .map(|(lit, ap)| adorned_literal(lit, ap.as_ref()))
            .collect();
        for (idx, ap) in adorned.query_adornments.iter().enumerate() {
            let literal = &adorned.query_sip.literals()[idx];
            if let Some(ap) = ap {
                if literal.positive && ap.adornment.has_bound() {
                    rules.extend(self.demand_rules(ap, idx, literal, &adorned.query_sip, None, &query_body));
                }
            }
        }

        for ap in &adorned.predicates {
            rules.push(self.bridge_rule(ap));
        }

        // Drop duplicates and trivial `m(X) :- m(X).` propagation
        let mut seen = HashSet::new();
        rules.retain(|rule| {
            let trivial = rule.body.len() == 1 && rule.body[0].positive && rule.body[0].atom == *rule.head_atom();
            !trivial && seen.insert(rule.clone())
        });
        self.stats.seed_rules = rules.iter().filter(|r| r.body.is_empty()).count();

        for rule in &rules {
            trace!(rule = %rule, "magic sets rule");
        }
        debug!(
            adorned = self.stats.adorned_rules,
            magic = self.stats.magic_rules,
            labeled = self.stats.labeled_rules,
            seeds = self.stats.seed_rules,
            "magic sets rewrite complete"
        );

        MagicProgram {
            rules,
            query: Query::new(query_body),
            stats: self.stats,
        }
    }

    /// Rules deriving the demand `magic_<ap>` for body literal `idx`
    fn demand_rules(
        &mut self,
        ap: &AdornedPredicate,
        idx: usize,
        literal: &Literal,
        sip: &SipGraph,
        guard: Option<&Literal>,
        body: &[Literal],
    ) -> Vec<Rule> {
        let magic_head = Atom::new(ap.magic_name(), ap.bound_terms(&literal.atom));
        let sources = sip.literal_sources(idx);

        if sources.len() <= 1 {
            let propagation = Self::propagation_body(guard, sip, idx, body);
            self.stats.magic_rules += 1;
            return vec![Rule::new(magic_head, propagation)];
        }

        // Several literals supply bindings: one label per source, then join
        let label_bodies: Vec<Vec<Literal>> = sources
            .iter()
            .map(|source| Self::propagation_body(guard, sip, source + 1, body))
            .collect();
        let body_vars: Vec<BTreeSet<String>> = label_bodies
            .iter()
            .map(|lits| lits.iter().flat_map(Literal::variables).collect())
            .collect();

        let mut out = Vec::with_capacity(sources.len() + 1);
        let mut magic_body: Vec<Literal> = guard.cloned().into_iter().collect();
        for (k, (source, label_body)) in sources.iter().zip(label_bodies).enumerate() {
            // Passed variables plus those joining this label to the others
            let mut head_vars: BTreeSet<String> = sip
                .edges_into(idx)
                .filter(|e| e.from == SipSource::Literal(*source))
                .flat_map(|e| e.variables.iter().cloned())
                .collect();
            for (other, vars) in body_vars.iter().enumerate() {
                if other != k {
                    head_vars.extend(body_vars[k].intersection(vars).cloned());
                }
            }
            let label = Atom::new(
                format!("label_{}_{}_{}", ap.predicate.symbol, self.next_label, ap.adornment),
                head_vars.into_iter().map(Term::Variable).collect(),
            );
            self.next_label += 1;

            out.push(Rule::new(label.clone(), label_body));
            self.stats.labeled_rules += 1;
            magic_body.push(Literal::positive(label));
        }
        out.push(Rule::new(magic_head, magic_body));
        self.stats.magic_rules += 1;
        out
    }

    /// `guard` followed by every binding-emitting literal before `limit`, in
    /// body order. Negative literals and builtins not evaluable at their
    /// position are left out.
    fn propagation_body(
        guard: Option<&Literal>,
        sip: &SipGraph,
        limit: usize,
        body: &[Literal],
    ) -> Vec<Literal> {
        let mut out: Vec<Literal> = guard.cloned().into_iter().collect();
        out.extend(
            body.iter()
                .enumerate()
                .take(limit)
                .filter(|(j, _)| sip.emits(*j))
                .map(|(_, literal)| literal.clone()),
        );
        out
    }

    /// `p^a(V0..Vn) :- [magic_p_a(bound Vi)], p(V0..Vn).`
    fn bridge_rule(&mut self, ap: &AdornedPredicate) -> Rule {
        let vars: Vec<Term> = (0..ap.predicate.arity)
            .map(|i| Term::Variable(format!("V{i}")))
            .collect();
        let original = Atom::new(ap.predicate.symbol.clone(), vars.clone());
        let mut body = Vec::with_capacity(2);
        if ap.adornment.has_bound() {
            body.push(Literal::positive(Atom::new(ap.magic_name(), ap.bound_terms(&original))));
        }
        body.push(Literal::positive(original));
        self.stats.bridge_rules += 1;
        Rule::new(Atom::new(ap.adorned_name(), vars), body)
    }
}
