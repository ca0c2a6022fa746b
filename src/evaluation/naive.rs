//! Naive stratified evaluation
//!
//! Each round re-evaluates every rule of the stratum against the full
//! relations and stops when a round adds nothing. Kept as the reference the
//! other strategies are checked against.

use super::{run_round, EvalOptions, EvalStats, EvaluationError, NegationSource, WorkItem};
use crate::ast::Rule;
use crate::recursion::StratumAssignment;
use crate::relation::Facts;
use tracing::debug;

/// Evaluate `rules` over `facts` stratum by stratum
pub fn evaluate_naive(
    rules: &[Rule],
    facts: &Facts,
    strata: &StratumAssignment,
    opts: &EvalOptions,
) -> Result<(Facts, EvalStats), EvaluationError> {
    let mut model = facts.clone();
    let mut stats = EvalStats::default();

    for (stratum, stratum_rules) in strata.rules_by_stratum(rules).iter().enumerate() {
        let items: Vec<WorkItem<'_>> = stratum_rules
            .iter()
            .map(|rule| WorkItem {
                rule,
                delta_index: None,
            })
            .collect();

        let mut round = 0;
        loop {
            round += 1;
            opts.guard.check_round(stratum, round)?;

            let results = run_round(&items, &model, None, NegationSource::Current, opts)?;
            stats.rule_evaluations += items.len();

            let mut added = 0;
            for (predicate, tuples) in results {
                for tuple in tuples {
                    if model.insert(&predicate, tuple) {
                        added += 1;
                    }
                }
            }
            stats.derived_tuples += added;
            opts.guard.check_derived(stats.derived_tuples)?;
            debug!(stratum, round, added, "naive round");

            if added == 0 {
                break;
            }
        }
        stats.rounds_per_stratum.push(round);
    }

    Ok((model, stats))
}
