//! # Pipeline Trace
//!
//! Records what each stage of one execution did:
//! Safety -> Stratify -> Magic Sets -> Evaluate -> Answer
//!
//! Returned inside every [`crate::knowledge_base::QueryResult`]; useful for
//! seeing which strategy actually ran and how much work the fixpoint did.

use crate::config::EvaluationStrategy;
use crate::evaluation::EvalStats;
use crate::magic_sets::MagicStats;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::time::Duration;

/// Trace of one pipeline execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineTrace {
    /// Strategy from the configuration
    pub requested_strategy: EvaluationStrategy,

    /// Strategy that produced the result, after any fallback
    pub strategy: EvaluationStrategy,

    /// Rules supplied by the caller, after multi-head normalisation
    pub input_rules: usize,

    /// Auxiliary projection rules added by the augmenting safety policy
    pub auxiliary_rules: usize,

    /// Rules handed to the evaluator
    pub evaluated_rules: usize,

    /// Number of non-empty strata (0 when the well-founded evaluator ran)
    pub strata: usize,

    /// Whether the magic-sets rewrite was used
    pub magic_applied: bool,

    pub magic_stats: Option<MagicStats>,

    /// Fixpoint rounds per stratum, in evaluation order
    pub rounds_per_stratum: Vec<usize>,

    pub derived_tuples: usize,

    pub rule_evaluations: usize,

    /// Facts left undefined by the well-founded model
    pub undefined_facts: usize,

    pub result_tuples: usize,

    pub elapsed: Duration,
}

impl PipelineTrace {
    pub fn new(requested_strategy: EvaluationStrategy) -> Self {
        PipelineTrace {
            requested_strategy,
            strategy: requested_strategy,
            ..PipelineTrace::default()
        }
    }

    /// Record the safety stage
    pub fn record_safety(&mut self, input_rules: usize, processed_rules: usize) {
        self.input_rules = input_rules;
        self.auxiliary_rules = processed_rules.saturating_sub(input_rules);
    }

    /// Record a successful magic-sets rewrite
    pub fn record_magic(&mut self, stats: MagicStats) {
        self.magic_applied = true;
        self.magic_stats = Some(stats);
    }

    /// Record evaluator counters
    pub fn record_evaluation(&mut self, strategy: EvaluationStrategy, rules: usize, stats: &EvalStats) {
        self.strategy = strategy;
        self.evaluated_rules = rules;
        self.rounds_per_stratum.clone_from(&stats.rounds_per_stratum);
        self.derived_tuples = stats.derived_tuples;
        self.rule_evaluations = stats.rule_evaluations;
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds_per_stratum.iter().sum()
    }

    /// Serialize to JSON for log shipping
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Format the trace for display
    pub fn format_trace(&self) -> String {
        let mut output = String::new();

        output.push_str("═══════════════════════════════════════════════════════════\n");
        output.push_str("                    PIPELINE TRACE                          \n");
        output.push_str("═══════════════════════════════════════════════════════════\n\n");

        section(&mut output, "SAFETY");
        let _ = writeln!(output, "  Input rules:      {}", self.input_rules);
        let _ = writeln!(output, "  Auxiliary rules:  {}\n", self.auxiliary_rules);

        section(&mut output, "MAGIC SETS");
        match &self.magic_stats {
            Some(stats) if self.magic_applied => {
                let _ = writeln!(output, "  Adorned rules:    {}", stats.adorned_rules);
                let _ = writeln!(output, "  Magic rules:      {}", stats.magic_rules);
                let _ = writeln!(output, "  Labeled rules:    {}", stats.labeled_rules);
                let _ = writeln!(output, "  Seed rules:       {}", stats.seed_rules);
                let _ = writeln!(output, "  Bridge rules:     {}\n", stats.bridge_rules);
            }
            _ => output.push_str("  Not applied\n\n"),
        }

        section(&mut output, "EVALUATION");
        if self.strategy == self.requested_strategy {
            let _ = writeln!(output, "  Strategy:         {}", self.strategy);
        } else {
            let _ = writeln!(
                output,
                "  Strategy:         {} (requested {})",
                self.strategy, self.requested_strategy
            );
        }
        let _ = writeln!(output, "  Rules evaluated:  {}", self.evaluated_rules);
        let _ = writeln!(output, "  Strata:           {}", self.strata);
        let _ = writeln!(output, "  Rounds:           {:?}", self.rounds_per_stratum);
        let _ = writeln!(output, "  Derived tuples:   {}", self.derived_tuples);
        if self.undefined_facts > 0 {
            let _ = writeln!(output, "  Undefined facts:  {}", self.undefined_facts);
        }
        let _ = writeln!(output, "  Result tuples:    {}", self.result_tuples);
        let _ = writeln!(output, "  Elapsed:          {:?}", self.elapsed);

        output
    }
}

fn section(output: &mut String, title: &str) {
    output.push_str("┌---------------------------------------------------------┐\n");
    let _ = writeln!(output, "| {title:<56}|");
    output.push_str("`---------------------------------------------------------┘\n");
}

impl fmt::Display for PipelineTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {:?}: {} rules, {} strata, {} rounds, {} derived, {} results",
            self.strategy,
            self.elapsed,
            self.evaluated_rules,
            self.strata,
            self.total_rounds(),
            self.derived_tuples,
            self.result_tuples
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_safety_counts_auxiliary_rules() {
        let mut trace = PipelineTrace::new(EvaluationStrategy::SemiNaive);
        trace.record_safety(3, 5);
        assert_eq!(trace.input_rules, 3);
        assert_eq!(trace.auxiliary_rules, 2);
    }

    #[test]
    fn test_format_mentions_fallback() {
        let mut trace = PipelineTrace::new(EvaluationStrategy::MagicSets);
        trace.record_evaluation(EvaluationStrategy::SemiNaive, 2, &EvalStats::default());
        let text = trace.format_trace();
        assert!(text.contains("semi-naive (requested magic-sets)"));
        assert!(text.contains("Not applied"));
    }

    #[test]
    fn test_to_json() {
        let mut trace = PipelineTrace::new(EvaluationStrategy::MagicSets);
        trace.record_magic(MagicStats {
            magic_rules: 2,
            ..MagicStats::default()
        });
        let json: serde_json::Value =
            serde_json::from_str(&trace.to_json().expect("serializes")).expect("valid json");
        assert_eq!(json["strategy"], "magic-sets");
        assert_eq!(json["magic_applied"], true);
        assert_eq!(json["magic_stats"]["magic_rules"], 2);
    }
}
