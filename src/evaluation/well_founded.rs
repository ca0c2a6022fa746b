//! Well-founded evaluation by alternating fixpoint
//!
//! `Γ(J)` is the least model of the program when every negative literal is
//! decided against the fixed interpretation `J`. Γ is antimonotone, so
//! alternating it from the input facts produces a growing underestimate of the
//! true facts and a shrinking overestimate of the possible ones:
//!
//! ```text
//! T₀ = facts
//! Uᵢ = Γ(Tᵢ)        (possibly true)
//! Tᵢ₊₁ = Γ(Uᵢ)      (certainly true)
//! ```
//!
//! Iteration stops when `T` no longer grows. Facts in `U \ T` are undefined,
//! everything outside `U` is false. Stratifiable programs get a total model.

use super::semi_naive::evaluate_components;
use super::{EvalOptions, EvalStats, EvaluationError, NegationSource};
use crate::ast::{Atom, Rule};
use crate::execution::Interruption;
use crate::relation::{Facts, Tuple};
use std::fmt;
use tracing::debug;

/// Three-valued truth of a ground atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruthValue {
    True,
    False,
    Undefined,
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TruthValue::True => "true",
            TruthValue::False => "false",
            TruthValue::Undefined => "undefined",
        })
    }
}

/// The well-founded model of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellFoundedModel {
    true_facts: Facts,
    possible: Facts,
}

impl WellFoundedModel {
    /// A total model where nothing is undefined
    pub fn total(facts: Facts) -> Self {
        WellFoundedModel {
            possible: facts.clone(),
            true_facts: facts,
        }
    }

    pub fn true_facts(&self) -> &Facts {
        &self.true_facts
    }

    /// True or undefined facts
    pub fn possible_facts(&self) -> &Facts {
        &self.possible
    }

    pub fn undefined_facts(&self) -> Facts {
        self.possible
            .iter()
            .flat_map(|(p, r)| r.iter().map(move |t| (p, t)))
            .filter(|(p, t)| !self.true_facts.contains(p, t))
            .map(|(p, t)| (p.clone(), t.clone()))
            .collect()
    }

    /// No fact is undefined
    pub fn is_total(&self) -> bool {
        self.true_facts.len() == self.possible.len()
    }

    /// Truth of a ground atom; non-ground atoms are reported false
    pub fn truth_value(&self, atom: &Atom) -> TruthValue {
        if !atom.is_ground() {
            return TruthValue::False;
        }
        let tuple = Tuple(atom.terms.clone());
        if self.true_facts.contains(&atom.predicate, &tuple) {
            TruthValue::True
        } else if self.possible.contains(&atom.predicate, &tuple) {
            TruthValue::Undefined
        } else {
            TruthValue::False
        }
    }
}

/// Compute the well-founded model of `rules` over `facts`
///
/// Accepts programs that are not stratifiable.
pub fn evaluate_well_founded(
    rules: &[Rule],
    facts: &Facts,
    opts: &EvalOptions,
) -> Result<(WellFoundedModel, EvalStats), EvaluationError> {
    let mut stats = EvalStats::default();
    let mut truth = facts.clone();
    let mut alternations = 0;

    loop {
        alternations += 1;
        opts.guard.timeout.check().map_err(Interruption::from)?;

        let possible = gamma(rules, facts, &truth, opts, &mut stats)?;
        let next = gamma(rules, facts, &possible, opts, &mut stats)?;
        debug!(
            alternations,
            true_facts = next.len(),
            possible_facts = possible.len(),
            "well-founded alternation"
        );

        // T only grows, so equal size means equal sets
        if next.len() == truth.len() {
            stats.derived_tuples = next.len().saturating_sub(facts.len());
            return Ok((
                WellFoundedModel {
                    true_facts: next,
                    possible,
                },
                stats,
            ));
        }
        truth = next;
    }
}

fn gamma(
    rules: &[Rule],
    facts: &Facts,
    negation: &Facts,
    opts: &EvalOptions,
    stats: &mut EvalStats,
) -> Result<Facts, EvaluationError> {
    let mut model = facts.clone();
    let mut local = EvalStats::default();
    let rounds = evaluate_components(rules, &mut model, NegationSource::Fixed(negation), opts, 0, &mut local)?;
    stats.rounds_per_stratum.push(rounds);
    stats.rule_evaluations += local.rule_evaluations;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{constant, AtomBuilder, RuleBuilder};
    use crate::evaluation::evaluate_semi_naive;
    use crate::recursion::DependencyGraph;

    fn ground(symbol: &str, value: &str) -> Atom {
        AtomBuilder::new(symbol).term(constant(value)).build()
    }

    #[test]
    fn test_mutual_negation_is_undefined() {
        let rules = vec![
            RuleBuilder::new("p")
                .head_vars(["X"])
                .body_atom("r", ["X"])
                .body_negated("q", ["X"])
                .build(),
            RuleBuilder::new("q")
                .head_vars(["X"])
                .body_atom("r", ["X"])
                .body_negated("p", ["X"])
                .build(),
        ];
        let mut facts = Facts::new();
        facts.add("r", ["a"]);
        let (model, _) = evaluate_well_founded(&rules, &facts, &EvalOptions::default()).expect("wfs");
        assert_eq!(model.truth_value(&ground("r", "a")), TruthValue::True);
        assert_eq!(model.truth_value(&ground("p", "a")), TruthValue::Undefined);
        assert_eq!(model.truth_value(&ground("q", "a")), TruthValue::Undefined);
        assert_eq!(model.truth_value(&ground("p", "b")), TruthValue::False);
        assert_eq!(model.undefined_facts().len(), 2);
        assert!(!model.is_total());
    }

    #[test]
    fn test_win_move_game() {
        let rules = vec![RuleBuilder::new("win")
            .head_vars(["X"])
            .body_atom("move", ["X", "Y"])
            .body_negated("win", ["Y"])
            .build()];
        let mut facts = Facts::new();
        for (from, to) in [("a", "b"), ("b", "a"), ("b", "c"), ("c", "d")] {
            facts.add("move", [from, to]);
        }
        let (model, _) = evaluate_well_founded(&rules, &facts, &EvalOptions::default()).expect("wfs");
        assert_eq!(model.truth_value(&ground("win", "c")), TruthValue::True);
        assert_eq!(model.truth_value(&ground("win", "d")), TruthValue::False);
        assert_eq!(model.truth_value(&ground("win", "a")), TruthValue::Undefined);
        assert_eq!(model.truth_value(&ground("win", "b")), TruthValue::Undefined);
    }

    #[test]
    fn test_stratifiable_program_is_total() {
        let rules = vec![
            RuleBuilder::new("reach")
                .head_vars(["X"])
                .body_atom("start", ["X"])
                .build(),
            RuleBuilder::new("reach")
                .head_vars(["Y"])
                .body_atom("reach", ["X"])
                .body_atom("edge", ["X", "Y"])
                .build(),
            RuleBuilder::new("dead")
                .head_vars(["X"])
                .body_atom("node", ["X"])
                .body_negated("reach", ["X"])
                .build(),
        ];
        let mut facts = Facts::new();
        facts.add("start", ["a"]);
        for n in ["a", "b", "c", "d"] {
            facts.add("node", [n]);
        }
        facts.add("edge", ["a", "b"]);
        facts.add("edge", ["b", "c"]);

        let (model, _) = evaluate_well_founded(&rules, &facts, &EvalOptions::default()).expect("wfs");
        assert!(model.is_total());
        let strata = DependencyGraph::from_rules(&rules).compute_strata().expect("stratifiable");
        let (stratified, _) =
            evaluate_semi_naive(&rules, &facts, &strata, &EvalOptions::default()).expect("semi");
        assert_eq!(model.true_facts(), &stratified);
        assert_eq!(model.truth_value(&ground("dead", "d")), TruthValue::True);
    }

    #[test]
    fn test_total_model_constructor() {
        let mut facts = Facts::new();
        facts.add("p", ["x"]);
        let model = WellFoundedModel::total(facts);
        assert!(model.is_total());
        assert!(model.undefined_facts().is_empty());
        assert_eq!(model.truth_value(&ground("p", "x")), TruthValue::True);
    }
}
