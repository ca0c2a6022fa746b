//! Semi-naive stratified evaluation
//!
//! Strata are split into strongly connected components and evaluated in
//! dependency order. A non-recursive component takes a single pass. A
//! recursive component runs a first full pass, then delta rounds: each
//! recursive rule is re-joined once per body literal over a component
//! predicate, with that literal reading only the tuples new in the previous
//! round and the others reading the totals.

use super::{run_round, EvalOptions, EvalStats, EvaluationError, NegationSource, WorkItem};
use crate::ast::{Predicate, Rule};
use crate::recursion::{components, partition_recursive, StratumAssignment};
use crate::relation::{Facts, Tuple};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Evaluate `rules` over `facts` stratum by stratum
pub fn evaluate_semi_naive(
    rules: &[Rule],
    facts: &Facts,
    strata: &StratumAssignment,
    opts: &EvalOptions,
) -> Result<(Facts, EvalStats), EvaluationError> {
    let mut model = facts.clone();
    let mut stats = EvalStats::default();

    for (stratum, stratum_rules) in strata.rules_by_stratum(rules).iter().enumerate() {
        debug!(stratum, rules = stratum_rules.len(), "evaluating stratum");
        let rounds = evaluate_components(
            stratum_rules,
            &mut model,
            NegationSource::Current,
            opts,
            stratum,
            &mut stats,
        )?;
        stats.rounds_per_stratum.push(rounds);
    }

    Ok((model, stats))
}

/// Least fixpoint of `rules` over `model`, component by component
///
/// Returns the number of rounds run. With [`NegationSource::Fixed`] the
/// rules behave as a positive program, which is how the well-founded
/// evaluator computes each half of its alternation.
pub(crate) fn evaluate_components(
    rules: &[Rule],
    model: &mut Facts,
    negation: NegationSource<'_>,
    opts: &EvalOptions,
    stratum: usize,
    stats: &mut EvalStats,
) -> Result<usize, EvaluationError> {
    let mut rounds = 0;
    for component in components(rules) {
        trace!(predicates = ?component.predicates, recursive = component.recursive, "component");
        rounds += if component.recursive {
            saturate(&component.rules, &component.predicates, model, negation, opts, stratum, rounds, stats)?
        } else {
            single_pass(&component.rules, model, negation, opts, stratum, rounds, stats)?
        };
    }
    Ok(rounds)
}

fn single_pass(
    rules: &[Rule],
    model: &mut Facts,
    negation: NegationSource<'_>,
    opts: &EvalOptions,
    stratum: usize,
    rounds_so_far: usize,
    stats: &mut EvalStats,
) -> Result<usize, EvaluationError> {
    opts.guard.check_round(stratum, rounds_so_far + 1)?;
    let items = full_items(rules);
    let results = run_round(&items, model, None, negation, opts)?;
    stats.rule_evaluations += items.len();
    let added = merge_new(results, model).len();
    stats.derived_tuples += added;
    opts.guard.check_derived(stats.derived_tuples)?;
    Ok(1)
}

fn saturate(
    rules: &[Rule],
    predicates: &[Predicate],
    model: &mut Facts,
    negation: NegationSource<'_>,
    opts: &EvalOptions,
    stratum: usize,
    rounds_so_far: usize,
    stats: &mut EvalStats,
) -> Result<usize, EvaluationError> {
    let members: HashSet<&Predicate> = predicates.iter().collect();
    let members = &members;
    let (_, recursive) = partition_recursive(rules);

    // Every (rule, literal) pair where the literal reads the delta
    let delta_items: Vec<WorkItem<'_>> = recursive
        .iter()
        .flat_map(move |rule| {
            rule.body
                .iter()
                .enumerate()
                .filter(move |(_, lit)| lit.is_positive_ordinary() && members.contains(lit.predicate()))
                .map(move |(idx, _)| WorkItem {
                    rule,
                    delta_index: Some(idx),
                })
        })
        .collect();

    let mut round = 1;
    opts.guard.check_round(stratum, rounds_so_far + round)?;
    let items = full_items(rules);
    let results = run_round(&items, model, None, negation, opts)?;
    stats.rule_evaluations += items.len();
    let mut delta = merge_new(results, model);
    stats.derived_tuples += delta.len();
    opts.guard.check_derived(stats.derived_tuples)?;
    debug!(stratum, round, added = delta.len(), "semi-naive round");

    while !delta.is_empty() {
        round += 1;
        opts.guard.check_round(stratum, rounds_so_far + round)?;
        let results = run_round(&delta_items, model, Some(&delta), negation, opts)?;
        stats.rule_evaluations += delta_items.len();
        delta = merge_new(results, model);
        stats.derived_tuples += delta.len();
        opts.guard.check_derived(stats.derived_tuples)?;
        debug!(stratum, round, added = delta.len(), "semi-naive round");
    }

    Ok(round)
}

fn full_items(rules: &[Rule]) -> Vec<WorkItem<'_>> {
    rules
        .iter()
        .map(|rule| WorkItem {
            rule,
            delta_index: None,
        })
        .collect()
}

/// Merge round results into `model`; returns the tuples that were new
fn merge_new(results: Vec<(Predicate, Vec<Tuple>)>, model: &mut Facts) -> Facts {
    let mut delta = Facts::new();
    for (predicate, tuples) in results {
        for tuple in tuples {
            if model.insert(&predicate, tuple.clone()) {
                delta.insert(&predicate, tuple);
            }
        }
    }
    delta
}
