//! # Rule Safety (range restriction)
//!
//! A rule is safe when every variable it uses is bound by something that
//! produces finitely many values: a positive ordinary body literal, or a
//! builtin able to compute it from already-bound arguments.
//!
//! ## Policies
//!
//! - **Strict**: literals are checked left to right. A negative literal or a
//!   builtin must find its variables already bound when it is reached (a
//!   builtin may instead bind its free variables when its binding pattern
//!   allows). Any violation is an [`UnsafeRuleError`].
//! - **Augmenting**: the body is reordered so every literal comes after the
//!   literals binding its variables. A negated literal with variables that
//!   occur nowhere else is replaced by the negation of an auxiliary
//!   projection `aux_proj_<k>` defined by a new rule. Rules that stay unsafe
//!   after that are rejected.
//!
//! ```datalog
//! % Safe
//! ancestor(X, Y) :- parent(X, Y).
//! r(X, Y) :- p(X), q(Y), ADD(X, Y, 3).
//!
//! % Unsafe: X is never bound by a finite literal
//! p(X) :- ADD(X, X, 2).
//! bad(X) :- not good(X).
//! ```

use crate::ast::{Atom, Literal, Query, Rule, Term};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, trace};

/// A rule (or query) fails range restriction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsafe rule '{rule}': {reason} (variables: {})", .variables.join(", "))]
pub struct UnsafeRuleError {
    pub rule: String,
    pub variables: Vec<String>,
    pub reason: String,
}

/// How unsafe rules are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyPolicy {
    /// Reject any rule that is not safe as written
    #[default]
    Strict,
    /// Reorder bodies and add projection rules where that makes a rule safe
    Augmenting,
}

/// Bound set tracking while walking a body
#[derive(Debug, Clone, Default)]
struct Bindings(HashSet<String>);

impl Bindings {
    fn term_bound(&self, term: &Term) -> bool {
        term.variables().iter().all(|v| self.0.contains(v))
    }

    fn unbound_vars(&self, atom: &Atom) -> Vec<String> {
        atom.variables()
            .into_iter()
            .filter(|v| !self.0.contains(v))
            .collect()
    }

    fn bind_atom(&mut self, atom: &Atom) {
        self.0.extend(atom.variables());
    }

    fn mask(&self, atom: &Atom) -> Vec<bool> {
        atom.terms.iter().map(|t| self.term_bound(t)).collect()
    }
}

/// Outcome of trying to place one literal
enum Placement {
    /// The literal is acceptable here; its variables are now bound
    Accepted,
    /// Variables the literal needs but finds unbound
    Blocked(Vec<String>),
}

/// Check one literal against the current bound set, binding on success
fn place(literal: &Literal, bound: &mut Bindings) -> Placement {
    let unbound = bound.unbound_vars(&literal.atom);
    if literal.is_positive_ordinary() {
        bound.bind_atom(&literal.atom);
        return Placement::Accepted;
    }
    if unbound.is_empty() {
        return Placement::Accepted;
    }
    if literal.positive {
        if let Some(builtin) = &literal.atom.builtin {
            if builtin.can_evaluate(&bound.mask(&literal.atom)) {
                bound.bind_atom(&literal.atom);
                return Placement::Accepted;
            }
        }
    }
    Placement::Blocked(unbound)
}

fn describe(literal: &Literal) -> &'static str {
    match (literal.positive, literal.is_builtin()) {
        (true, true) => "builtin cannot bind its free arguments",
        (false, true) => "negated builtin uses unbound variables",
        _ => "negated literal uses unbound variables",
    }
}

/// Strict left-to-right check of a body plus the variables it must bind
fn check_body(
    display: &str,
    body: &[Literal],
    required: &[String],
) -> Result<(), UnsafeRuleError> {
    let mut bound = Bindings::default();
    for literal in body {
        if let Placement::Blocked(variables) = place(literal, &mut bound) {
            return Err(UnsafeRuleError {
                rule: display.to_string(),
                variables,
                reason: format!("{} in '{literal}'", describe(literal)),
            });
        }
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|v| !bound.0.contains(*v))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(UnsafeRuleError {
            rule: display.to_string(),
            variables: missing,
            reason: "head variables are not bound by the body".to_string(),
        })
    }
}

/// Strict safety check of a single rule
pub fn check_rule(rule: &Rule) -> Result<(), UnsafeRuleError> {
    check_body(&rule.to_string(), &rule.body, &rule.head_variables())
}

/// Strict safety check of a query
pub fn check_query(query: &Query) -> Result<(), UnsafeRuleError> {
    check_body(&query.to_string(), &query.literals, &query.variables())
}

pub fn is_safe(rule: &Rule) -> bool {
    check_rule(rule).is_ok()
}

/// Applies a [`SafetyPolicy`] to rules and queries
#[derive(Debug, Clone)]
pub struct SafetyAnalyzer {
    policy: SafetyPolicy,
    next_aux: usize,
}

impl SafetyAnalyzer {
    pub fn new(policy: SafetyPolicy) -> Self {
        SafetyAnalyzer {
            policy,
            next_aux: 0,
        }
    }

    pub fn policy(&self) -> SafetyPolicy {
        self.policy
    }

    /// Check (strict) or augment every rule
    ///
    /// Returns the rules to evaluate: unchanged under the strict policy,
    /// possibly reordered and followed by auxiliary projection rules under
    /// the augmenting one.
    pub fn process_rules(&mut self, rules: &[Rule]) -> Result<Vec<Rule>, UnsafeRuleError> {
        let mut out = Vec::with_capacity(rules.len());
        let mut aux_rules = Vec::new();
        for rule in rules {
            match self.policy {
                SafetyPolicy::Strict => {
                    check_rule(rule)?;
                    out.push(rule.clone());
                }
                SafetyPolicy::Augmenting => {
                    let (body, aux) = self.augment(
                        &rule.to_string(),
                        &rule.body,
                        &rule.head_variables(),
                    )?;
                    if body != rule.body {
                        debug!(rule = %rule, "reordered body for safety");
                    }
                    out.push(Rule {
                        head: rule.head.clone(),
                        body,
                    });
                    aux_rules.extend(aux);
                }
            }
        }
        out.extend(aux_rules);
        Ok(out)
    }

    /// Check or augment a query; returns the query and any auxiliary rules
    pub fn process_query(&mut self, query: &Query) -> Result<(Query, Vec<Rule>), UnsafeRuleError> {
        match self.policy {
            SafetyPolicy::Strict => {
                check_query(query)?;
                Ok((query.clone(), Vec::new()))
            }
            SafetyPolicy::Augmenting => {
                let (literals, aux) =
                    self.augment(&query.to_string(), &query.literals, &query.variables())?;
                Ok((Query::new(literals), aux))
            }
        }
    }

    fn augment(
        &mut self,
        display: &str,
        body: &[Literal],
        required: &[String],
    ) -> Result<(Vec<Literal>, Vec<Rule>), UnsafeRuleError> {
        let (projected, aux_rules) = self.project_local_negations(body, required);

        // Greedy reordering: repeatedly take the first literal that is placeable
        let mut remaining = projected;
        let mut ordered = Vec::with_capacity(remaining.len());
        let mut bound = Bindings::default();
        while !remaining.is_empty() {
            let next = remaining.iter().position(|lit| {
                let mut trial = bound.clone();
                matches!(place(lit, &mut trial), Placement::Accepted)
            });
            match next {
                Some(idx) => {
                    let literal = remaining.remove(idx);
                    place(&literal, &mut bound);
                    ordered.push(literal);
                }
                None => {
                    let literal = &remaining[0];
                    return Err(UnsafeRuleError {
                        rule: display.to_string(),
                        variables: bound.unbound_vars(&literal.atom),
                        reason: format!("{} in '{literal}'", describe(literal)),
                    });
                }
            }
        }

        check_body(display, &ordered, required)?;
        Ok((ordered, aux_rules))
    }

    /// Replace `not q(X, Y)` where `Y` occurs nowhere else by `not aux(X)`
    /// with `aux(X) :- q(X, Y).`
    fn project_local_negations(
        &mut self,
        body: &[Literal],
        required: &[String],
    ) -> (Vec<Literal>, Vec<Rule>) {
        let mut literals = Vec::with_capacity(body.len());
        let mut aux_rules = Vec::new();
        for (idx, literal) in body.iter().enumerate() {
            if literal.positive || literal.is_builtin() {
                literals.push(literal.clone());
                continue;
            }
            let elsewhere: HashSet<String> = body
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .flat_map(|(_, l)| l.variables())
                .chain(required.iter().cloned())
                .collect();
            let vars = literal.variables();
            if vars.iter().all(|v| elsewhere.contains(v)) {
                literals.push(literal.clone());
                continue;
            }
            let kept: Vec<Term> = vars
                .iter()
                .filter(|v| elsewhere.contains(*v))
                .map(|v| Term::Variable(v.clone()))
                .collect();
            let name = format!("aux_proj_{}", self.next_aux);
            self.next_aux += 1;
            let aux_head = Atom::new(name, kept);
            trace!(literal = %literal, projection = %aux_head, "projecting local variables");
            aux_rules.push(Rule::new(
                aux_head.clone(),
                vec![Literal::positive(literal.atom.clone())],
            ));
            literals.push(Literal::negative(aux_head));
        }
        (literals, aux_rules)
    }
}
