//! # Bottom-Up Evaluation
//!
//! Rule-body evaluation shared by every strategy, plus the strategy drivers:
//!
//! | Module | Strategy |
//! |--------|----------|
//! | [`naive`] | stratified, every rule re-evaluated against the full relations each round |
//! | [`semi_naive`] | stratified, rounds join at least one literal against the previous round's delta |
//! | [`well_founded`] | alternating fixpoint, three-valued model |
//!
//! ## Body evaluation
//!
//! A body is a left-to-right nested-loop join. Positive ordinary literals
//! enumerate matching tuples; builtins compute or check bindings; negative
//! literals test absence in the *negation source* (the current relations for
//! stratified evaluation, a fixed interpretation for the well-founded one).
//! Safety analysis guarantees that every negative or builtin literal is
//! sufficiently bound when reached; a violation surfaces as
//! [`EvaluationError::InsufficientBindings`].
//!
//! ## Rounds
//!
//! Within one round every rule reads the same snapshot of the relations and
//! results are merged afterwards, so rules can run in parallel (rayon) when
//! configured. Timeout and resource limits are checked between rounds.

use crate::ast::{Literal, Predicate, Query, Rule, Term};
use crate::builtins::{BuiltinError, BuiltinOutcome};
use crate::config::DivideByZeroPolicy;
use crate::execution::{ExecutionGuard, Interruption};
use crate::relation::{Facts, Relation, Tuple};
use crate::unification::{match_ground, Substitution};
use index::{IndexCache, JoinKeySpec};
use rayon::prelude::*;
use thiserror::Error;

mod index;
pub mod naive;
pub mod semi_naive;
pub mod well_founded;

pub use naive::evaluate_naive;
pub use semi_naive::evaluate_semi_naive;
pub use well_founded::{evaluate_well_founded, TruthValue, WellFoundedModel};

/// Runtime evaluation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("division by zero in rule '{rule}'")]
    DivideByZero { rule: String },

    #[error("arithmetic overflow in rule '{rule}'")]
    ArithmeticOverflow { rule: String },

    #[error("literal '{literal}' reached with unbound arguments in rule '{rule}'")]
    InsufficientBindings { literal: String, rule: String },

    #[error("rule '{rule}' derived a non-ground head '{head}'")]
    NonGroundHead { rule: String, head: String },

    #[error("evaluation interrupted: {0}")]
    Interrupted(#[from] Interruption),
}

/// Settings shared by all evaluators
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    pub divide_by_zero: DivideByZeroPolicy,
    pub parallel: bool,
    pub guard: ExecutionGuard,
}

/// Counters collected while evaluating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Fixpoint rounds, per stratum in evaluation order
    pub rounds_per_stratum: Vec<usize>,
    /// Tuples added beyond the input facts
    pub derived_tuples: usize,
    /// Individual rule-body evaluations
    pub rule_evaluations: usize,
}

impl EvalStats {
    pub fn total_rounds(&self) -> usize {
        self.rounds_per_stratum.iter().sum()
    }
}

/// Where negative literals are checked
#[derive(Debug, Clone, Copy)]
pub(crate) enum NegationSource<'a> {
    /// The relations being evaluated (lower strata are complete)
    Current,
    /// A fixed interpretation
    Fixed(&'a Facts),
}

/// Read-only view a body is evaluated against
#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyContext<'a> {
    pub full: &'a Facts,
    /// Relations read by the literal at `delta_index`
    pub delta: Option<&'a Facts>,
    pub delta_index: Option<usize>,
    pub negation: &'a Facts,
    pub policy: DivideByZeroPolicy,
}

impl<'a> BodyContext<'a> {
    pub fn new(full: &'a Facts, negation: NegationSource<'a>, policy: DivideByZeroPolicy) -> Self {
        BodyContext {
            full,
            delta: None,
            delta_index: None,
            negation: match negation {
                NegationSource::Current => full,
                NegationSource::Fixed(facts) => facts,
            },
            policy,
        }
    }

    pub fn with_delta(mut self, delta: &'a Facts, index: usize) -> Self {
        self.delta = Some(delta);
        self.delta_index = Some(index);
        self
    }

    /// The relation literal `idx` reads, and whether it is the delta
    fn source_for(&self, idx: usize, predicate: &Predicate) -> (Option<&'a Relation>, bool) {
        match (self.delta_index, self.delta) {
            (Some(d), Some(delta)) if d == idx => (delta.get(predicate), true),
            _ => (self.full.get(predicate), false),
        }
    }
}

/// Enumerate every substitution satisfying `body`
pub(crate) fn solve_body<'a, F>(
    body: &[Literal],
    ctx: &BodyContext<'a>,
    rule_display: &dyn Fn() -> String,
    on_solution: &mut F,
) -> Result<(), EvaluationError>
where
    F: FnMut(&Substitution) -> Result<(), EvaluationError>,
{
    let mut indexes = IndexCache::default();
    solve_from(body, 0, &Substitution::new(), ctx, &mut indexes, rule_display, on_solution)
}

fn solve_from<'a, F>(
    body: &[Literal],
    idx: usize,
    subst: &Substitution,
    ctx: &BodyContext<'a>,
    indexes: &mut IndexCache<'a>,
    rule_display: &dyn Fn() -> String,
    on_solution: &mut F,
) -> Result<(), EvaluationError>
where
    F: FnMut(&Substitution) -> Result<(), EvaluationError>,
{
    let Some(literal) = body.get(idx) else {
        return on_solution(subst);
    };
    let atom = &literal.atom;

    if let Some(builtin) = &atom.builtin {
        let applied: Vec<Term> = subst.apply_all(&atom.terms);
        let args: Vec<Option<&Term>> = applied
            .iter()
            .map(|t| t.is_ground().then_some(t))
            .collect();
        if !literal.positive && args.iter().any(Option::is_none) {
            return Err(insufficient(literal, rule_display));
        }
        let outcome = match builtin.evaluate_checked(&args) {
            Ok(outcome) => outcome,
            Err(BuiltinError::DivideByZero { .. }) => {
                return match ctx.policy {
                    DivideByZeroPolicy::Discard => Ok(()),
                    DivideByZeroPolicy::Stop => Err(EvaluationError::DivideByZero {
                        rule: rule_display(),
                    }),
                };
            }
            Err(BuiltinError::Overflow { .. }) => {
                return match ctx.policy {
                    DivideByZeroPolicy::Discard => Ok(()),
                    DivideByZeroPolicy::Stop => Err(EvaluationError::ArithmeticOverflow {
                        rule: rule_display(),
                    }),
                };
            }
            Err(_) => return Err(insufficient(literal, rule_display)),
        };
        return match (literal.positive, outcome) {
            (true, BuiltinOutcome::Accept) | (false, BuiltinOutcome::Reject) => {
                solve_from(body, idx + 1, subst, ctx, indexes, rule_display, on_solution)
            }
            (true, BuiltinOutcome::Reject) | (false, BuiltinOutcome::Accept) => Ok(()),
            (true, BuiltinOutcome::Complete(values)) => {
                let mut extended = subst.clone();
                let matched = atom
                    .terms
                    .iter()
                    .zip(&values)
                    .all(|(pattern, value)| match_ground(pattern, value, &mut extended));
                if matched {
                    solve_from(body, idx + 1, &extended, ctx, indexes, rule_display, on_solution)
                } else {
                    Ok(())
                }
            }
            (false, BuiltinOutcome::Complete(_)) => Err(insufficient(literal, rule_display)),
        };
    }

    if !literal.positive {
        let applied = subst.apply_all(&atom.terms);
        if !applied.iter().all(Term::is_ground) {
            return Err(insufficient(literal, rule_display));
        }
        if ctx.negation.contains(&atom.predicate, &Tuple(applied)) {
            return Ok(());
        }
        return solve_from(body, idx + 1, subst, ctx, indexes, rule_display, on_solution);
    }

    let (Some(relation), delta) = ctx.source_for(idx, &atom.predicate) else {
        return Ok(());
    };
    // Resolve the pattern once; bound variables become constants
    let pattern = subst.apply_all(&atom.terms);
    let key_columns: Vec<usize> = (0..pattern.len()).filter(|&c| pattern[c].is_ground()).collect();
    let candidates: Vec<&Tuple> = if key_columns.is_empty() {
        relation.iter().collect()
    } else {
        let key: Vec<Term> = key_columns.iter().map(|&c| pattern[c].clone()).collect();
        let spec = JoinKeySpec {
            predicate: atom.predicate.clone(),
            delta,
            key_columns,
        };
        indexes.candidates(spec, relation, &key)
    };
    for tuple in candidates {
        let mut extended = subst.clone();
        let matched = pattern
            .iter()
            .zip(tuple.terms())
            .all(|(p, v)| match_ground(p, v, &mut extended));
        if matched {
            solve_from(body, idx + 1, &extended, ctx, indexes, rule_display, on_solution)?;
        }
    }
    Ok(())
}

fn insufficient(literal: &Literal, rule_display: &dyn Fn() -> String) -> EvaluationError {
    EvaluationError::InsufficientBindings {
        literal: literal.to_string(),
        rule: rule_display(),
    }
}

/// Head tuples derived by one rule under `ctx`
pub(crate) fn evaluate_rule(rule: &Rule, ctx: &BodyContext<'_>) -> Result<Vec<Tuple>, EvaluationError> {
    let head = rule.head_atom();
    let display = || rule.to_string();
    let mut derived = Vec::new();
    solve_body(&rule.body, ctx, &display, &mut |subst| {
        let terms = subst.apply_all(&head.terms);
        if !terms.iter().all(Term::is_ground) {
            return Err(EvaluationError::NonGroundHead {
                rule: rule.to_string(),
                head: subst.apply_atom(head).to_string(),
            });
        }
        derived.push(Tuple(terms));
        Ok(())
    })?;
    Ok(derived)
}

/// One unit of round work: a rule, optionally with a delta literal
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkItem<'r> {
    pub rule: &'r Rule,
    pub delta_index: Option<usize>,
}

/// Evaluate a round's work items against one snapshot
///
/// Results are returned unmerged; the caller merges them after the barrier.
pub(crate) fn run_round(
    items: &[WorkItem<'_>],
    full: &Facts,
    delta: Option<&Facts>,
    negation: NegationSource<'_>,
    opts: &EvalOptions,
) -> Result<Vec<(Predicate, Vec<Tuple>)>, EvaluationError> {
    let run = |item: &WorkItem<'_>| -> Result<(Predicate, Vec<Tuple>), EvaluationError> {
        let mut ctx = BodyContext::new(full, negation, opts.divide_by_zero);
        if let (Some(idx), Some(delta)) = (item.delta_index, delta) {
            ctx = ctx.with_delta(delta, idx);
        }
        Ok((item.rule.head_predicate().clone(), evaluate_rule(item.rule, &ctx)?))
    };
    if opts.parallel && items.len() > 1 {
        items.par_iter().map(run).collect()
    } else {
        items.iter().map(run).collect()
    }
}

/// Answer `query` over a model.
///
/// Positive literals read `positive`, negative literals read `negation`.
/// The result holds one tuple per distinct binding of the query's variables
/// (first-occurrence order); a ground query yields a single empty tuple when
/// it holds.
pub fn answer_query(
    query: &Query,
    positive: &Facts,
    negation: &Facts,
    policy: DivideByZeroPolicy,
) -> Result<Relation, EvaluationError> {
    project_bindings(query, &query.variables(), positive, negation, policy)
}

/// Like [`answer_query`] with an explicit output column order
pub(crate) fn project_bindings(
    query: &Query,
    variables: &[String],
    positive: &Facts,
    negation: &Facts,
    policy: DivideByZeroPolicy,
) -> Result<Relation, EvaluationError> {
    let ctx = BodyContext::new(positive, NegationSource::Fixed(negation), policy);
    let display = || query.to_string();
    let mut relation = Relation::new(variables.len());
    solve_body(&query.literals, &ctx, &display, &mut |subst| {
        let terms: Vec<Term> = variables
            .iter()
            .map(|v| subst.apply(&Term::Variable(v.clone())))
            .collect();
        if terms.iter().all(Term::is_ground) {
            relation.insert(Tuple(terms));
        }
        Ok(())
    })?;
    Ok(relation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{constant, var, RuleBuilder};
    use crate::ast::Atom;
    use crate::builtins::BuiltinRegistry;

    fn facts() -> Facts {
        let mut f = Facts::new();
        for x in 0..3 {
            f.add("p", [x]);
        }
        for y in 2..5 {
            f.add("q", [y]);
        }
        f
    }

    fn builtin(name: &str, terms: Vec<Term>) -> Literal {
        Literal::positive(BuiltinRegistry::standard().atom(name, terms).expect("builtin"))
    }

    #[test]
    fn test_join_with_binding_builtin() {
        // r(X, Y) :- p(X), q(Y), ADD(X, Y, 3).
        let rule = RuleBuilder::new("r")
            .head_vars(["X", "Y"])
            .body_atom("p", ["X"])
            .body_atom("q", ["Y"])
            .body_literal(builtin("ADD", vec![var("X"), var("Y"), constant(3)]))
            .build();
        let f = facts();
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        let mut tuples = evaluate_rule(&rule, &ctx).expect("evaluates");
        tuples.sort();
        assert_eq!(tuples, vec![Tuple::from_values([0, 3]), Tuple::from_values([1, 2])]);
    }

    #[test]
    fn test_builtin_computes_binding() {
        // s(X, Z) :- p(X), ADD(X, 10, Z).
        let rule = RuleBuilder::new("s")
            .head_vars(["X", "Z"])
            .body_atom("p", ["X"])
            .body_literal(builtin("ADD", vec![var("X"), constant(10), var("Z")]))
            .build();
        let f = facts();
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        let tuples = evaluate_rule(&rule, &ctx).expect("evaluates");
        assert!(tuples.contains(&Tuple::from_values([2, 12])));
        assert_eq!(tuples.len(), 3);
    }

    #[test]
    fn test_negation_against_source() {
        // n(X) :- q(X), not p(X).
        let rule = RuleBuilder::new("n")
            .head_vars(["X"])
            .body_atom("q", ["X"])
            .body_negated("p", ["X"])
            .build();
        let f = facts();
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        let mut tuples = evaluate_rule(&rule, &ctx).expect("evaluates");
        tuples.sort();
        assert_eq!(tuples, vec![Tuple::from_values([3]), Tuple::from_values([4])]);

        let empty = Facts::new();
        let ctx = BodyContext::new(&f, NegationSource::Fixed(&empty), DivideByZeroPolicy::Discard);
        assert_eq!(evaluate_rule(&rule, &ctx).expect("evaluates").len(), 3);
    }

    #[test]
    fn test_divide_by_zero_policies() {
        let mut f = Facts::new();
        f.add("a", [0]);
        f.add("a", [1]);
        f.add("b", [0]);
        // d(Z) :- a(X), b(Y), DIVIDE(X, Y, Z).
        let rule = RuleBuilder::new("d")
            .head_vars(["Z"])
            .body_atom("a", ["X"])
            .body_atom("b", ["Y"])
            .body_literal(builtin("DIVIDE", vec![var("X"), var("Y"), var("Z")]))
            .build();
        let discard = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        assert!(evaluate_rule(&rule, &discard).expect("discarded").is_empty());
        let stop = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Stop);
        assert!(matches!(
            evaluate_rule(&rule, &stop),
            Err(EvaluationError::DivideByZero { .. })
        ));
    }

    #[test]
    fn test_unsafe_negation_reports_insufficient_bindings() {
        let rule = RuleBuilder::new("bad")
            .head_vars(["X"])
            .body_negated("p", ["X"])
            .build();
        let f = facts();
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        assert!(matches!(
            evaluate_rule(&rule, &ctx),
            Err(EvaluationError::InsufficientBindings { .. })
        ));
    }

    #[test]
    fn test_unbound_head_variable_is_non_ground() {
        // Bypasses the safety analyzer: Y never bound
        let rule = RuleBuilder::new("h")
            .head_vars(["X", "Y"])
            .body_atom("p", ["X"])
            .build();
        let f = facts();
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard);
        assert!(matches!(
            evaluate_rule(&rule, &ctx),
            Err(EvaluationError::NonGroundHead { .. })
        ));
    }

    #[test]
    fn test_delta_literal_reads_delta_only() {
        // r(X, Y) :- p(X), q(Y). with q read from a one-tuple delta
        let rule = RuleBuilder::new("r")
            .head_vars(["X", "Y"])
            .body_atom("p", ["X"])
            .body_atom("q", ["Y"])
            .build();
        let f = facts();
        let mut delta = Facts::new();
        delta.add("q", [4]);
        let ctx = BodyContext::new(&f, NegationSource::Current, DivideByZeroPolicy::Discard)
            .with_delta(&delta, 1);
        let tuples = evaluate_rule(&rule, &ctx).expect("evaluates");
        assert_eq!(tuples.len(), 3);
        assert!(tuples.iter().all(|t| t.get(1) == Some(&constant(4))));
    }

    #[test]
    fn test_answer_query_projection_and_ground() {
        let f = facts();
        let query = Query::new(vec![
            Literal::positive(Atom::new("p", vec![var("X")])),
            Literal::positive(Atom::new("q", vec![var("X")])),
        ]);
        let result = answer_query(&query, &f, &f, DivideByZeroPolicy::Discard).expect("answers");
        assert_eq!(result.sorted(), vec![Tuple::from_values([2])]);

        let ground = Query::atom(Atom::new("p", vec![constant(1)]));
        let result = answer_query(&ground, &f, &f, DivideByZeroPolicy::Discard).expect("answers");
        assert_eq!(result.arity(), 0);
        assert_eq!(result.len(), 1);

        let missing = Query::atom(Atom::new("p", vec![constant(9)]));
        let result = answer_query(&missing, &f, &f, DivideByZeroPolicy::Discard).expect("answers");
        assert!(result.is_empty());
    }
}
