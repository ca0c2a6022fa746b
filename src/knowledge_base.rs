//! # Knowledge Base
//!
//! Entry points tying the passes together:
//!
//! ```text
//! rules ──► normalise ──► safety ──► stratify ──┬─► naive / semi-naive ─────────┐
//!                                               ├─► adorn ─► magic sets ─► re-check ─► semi-naive
//!                                               └─► well-founded (alternating fixpoint)
//!                                                                              │
//! query ──► safety ─────────────────────────────────────────────► answer ◄──────┘
//! ```
//!
//! Rules are checked once when the knowledge base is built, so an unsafe rule
//! fails fast before any query runs. Every [`KnowledgeBase::execute`] call
//! derives from the same immutable facts and rules.
//!
//! Magic sets never fails a query: when the query has no bound argument, or
//! the rewritten program does not pass the safety and stratification checks,
//! evaluation falls back to plain semi-naive.

use crate::ast::{Program, Query, Rule};
use crate::config::{Config, EvaluationStrategy, StratifierMode};
use crate::error::Result;
use crate::evaluation::{
    answer_query, evaluate_naive, evaluate_semi_naive, evaluate_well_founded, project_bindings,
    EvalOptions, EvalStats, WellFoundedModel,
};
use crate::execution::{ExecutionGuard, QueryTimeout, ResourceLimits};
use crate::magic_sets::{rewrite, MagicProgram};
use crate::pipeline_trace::PipelineTrace;
use crate::recursion::{DependencyGraph, NotStratifiedError, StratumAssignment};
use crate::relation::{Facts, Relation, Tuple};
use crate::safety::{check_query, SafetyAnalyzer, SafetyPolicy};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Answer to one query
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Output columns, in first-occurrence order in the query
    pub variables: Vec<String>,
    /// One tuple per distinct binding of `variables`
    pub relation: Relation,
    pub trace: PipelineTrace,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.relation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relation.is_empty()
    }

    /// Tuples in sorted order
    pub fn tuples(&self) -> Vec<Tuple> {
        self.relation.sorted()
    }

    /// For a ground query: whether it holds
    pub fn holds(&self) -> bool {
        !self.relation.is_empty()
    }
}

/// Facts plus safety-checked rules under one configuration
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    facts: Facts,
    input_rules: usize,
    rules: Vec<Rule>,
    analyzer: SafetyAnalyzer,
    config: Config,
}

impl KnowledgeBase {
    /// Normalise multi-head rules and run the safety analyzer.
    ///
    /// Fails with [`crate::Error::RuleUnsafe`] before any evaluation.
    pub fn new(facts: Facts, rules: Vec<Rule>, config: Config) -> Result<Self> {
        let normalized = Program::new(rules, None).normalized().rules;
        let mut analyzer = SafetyAnalyzer::new(config.evaluation.safety);
        let processed = analyzer.process_rules(&normalized)?;
        debug!(
            rules = normalized.len(),
            auxiliary = processed.len() - normalized.len(),
            policy = ?config.evaluation.safety,
            "rules accepted"
        );
        Ok(KnowledgeBase {
            facts,
            input_rules: normalized.len(),
            rules: processed,
            analyzer,
            config,
        })
    }

    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    /// Rules as evaluated: normalised, and augmented under that policy
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add a fact; returns `false` if it was already present or not ground
    pub fn insert_fact(&mut self, atom: &crate::ast::Atom) -> bool {
        self.facts.insert_atom(atom)
    }

    /// Stratum assignment of the current rules
    pub fn strata(&self) -> std::result::Result<StratumAssignment, NotStratifiedError> {
        stratify(&self.rules)
    }

    /// Answer `query` with the configured strategy and timeout
    pub fn execute(&self, query: &Query) -> Result<QueryResult> {
        self.execute_with_timeout(query, QueryTimeout::from_millis(self.config.limits.timeout_ms))
    }

    /// Answer `query` under an explicit timeout, e.g. one whose
    /// [`crate::execution::CancelHandle`] is held by another thread
    pub fn execute_with_timeout(&self, query: &Query, timeout: QueryTimeout) -> Result<QueryResult> {
        let start = Instant::now();
        let strategy = self.config.evaluation.strategy;
        let mut trace = PipelineTrace::new(strategy);
        trace.record_safety(self.input_rules, self.rules.len());

        let mut analyzer = self.analyzer.clone();
        let (query, aux) = analyzer.process_query(query)?;
        let mut rules = self.rules.clone();
        trace.auxiliary_rules += aux.len();
        rules.extend(aux);

        let opts = self.options(timeout);
        let variables = query.variables();
        info!(%strategy, query = %query, rules = rules.len(), "executing query");

        let relation = match strategy {
            EvaluationStrategy::Naive | EvaluationStrategy::SemiNaive => {
                self.warn_if_stratifier_disabled();
                let strata = stratify(&rules)?;
                trace.strata = strata.max_stratum() + 1;
                let (model, stats) = if strategy == EvaluationStrategy::Naive {
                    evaluate_naive(&rules, &self.facts, &strata, &opts)?
                } else {
                    evaluate_semi_naive(&rules, &self.facts, &strata, &opts)?
                };
                trace.record_evaluation(strategy, rules.len(), &stats);
                answer_query(&query, &model, &model, opts.divide_by_zero)?
            }
            EvaluationStrategy::MagicSets => {
                self.warn_if_stratifier_disabled();
                let strata = stratify(&rules)?;
                trace.strata = strata.max_stratum() + 1;
                match checked_rewrite(&rules, &query) {
                    Some((program, magic_strata)) => {
                        info!(
                            magic_rules = program.stats.magic_rules,
                            rules = program.rules.len(),
                            "magic sets applied"
                        );
                        trace.record_magic(program.stats);
                        trace.strata = magic_strata.max_stratum() + 1;
                        let (model, stats) =
                            evaluate_semi_naive(&program.rules, &self.facts, &magic_strata, &opts)?;
                        trace.record_evaluation(strategy, program.rules.len(), &stats);
                        project_bindings(&program.query, &variables, &model, &model, opts.divide_by_zero)?
                    }
                    None => {
                        let (model, stats) = evaluate_semi_naive(&rules, &self.facts, &strata, &opts)?;
                        trace.record_evaluation(EvaluationStrategy::SemiNaive, rules.len(), &stats);
                        answer_query(&query, &model, &model, opts.divide_by_zero)?
                    }
                }
            }
            EvaluationStrategy::WellFounded => {
                let (model, stats, strata) = self.well_founded(&rules, &opts)?;
                trace.strata = strata.map_or(0, |s| s.max_stratum() + 1);
                trace.undefined_facts = model.undefined_facts().len();
                let used = if trace.strata > 0 {
                    EvaluationStrategy::SemiNaive
                } else {
                    EvaluationStrategy::WellFounded
                };
                trace.record_evaluation(used, rules.len(), &stats);
                answer_query(&query, model.true_facts(), model.possible_facts(), opts.divide_by_zero)?
            }
        };

        trace.result_tuples = relation.len();
        trace.elapsed = start.elapsed();
        info!(
            results = relation.len(),
            strategy = %trace.strategy,
            magic = trace.magic_applied,
            elapsed_ms = trace.elapsed.as_millis() as u64,
            "query complete"
        );

        Ok(QueryResult {
            variables,
            relation,
            trace,
        })
    }

    /// Every fact derivable from the rules, input facts included.
    ///
    /// Under the well-founded strategy only true facts are returned.
    pub fn materialize(&self) -> Result<Facts> {
        let opts = self.options(QueryTimeout::from_millis(self.config.limits.timeout_ms));
        match self.config.evaluation.strategy {
            EvaluationStrategy::WellFounded => {
                let (model, _, _) = self.well_founded(&self.rules, &opts)?;
                Ok(model.true_facts().clone())
            }
            EvaluationStrategy::Naive => {
                let strata = stratify(&self.rules)?;
                Ok(evaluate_naive(&self.rules, &self.facts, &strata, &opts)?.0)
            }
            EvaluationStrategy::SemiNaive | EvaluationStrategy::MagicSets => {
                let strata = stratify(&self.rules)?;
                Ok(evaluate_semi_naive(&self.rules, &self.facts, &strata, &opts)?.0)
            }
        }
    }

    /// Three-valued model of the rules regardless of the configured strategy
    pub fn well_founded_model(&self) -> Result<WellFoundedModel> {
        let opts = self.options(QueryTimeout::from_millis(self.config.limits.timeout_ms));
        Ok(self.well_founded(&self.rules, &opts)?.0)
    }

    /// Stratified semi-naive when allowed and possible, alternating fixpoint
    /// otherwise. The strata are returned when the stratified path ran.
    fn well_founded(
        &self,
        rules: &[Rule],
        opts: &EvalOptions,
    ) -> Result<(WellFoundedModel, EvalStats, Option<StratumAssignment>)> {
        if self.config.evaluation.stratifier == StratifierMode::Enabled {
            match stratify(rules) {
                Ok(strata) => {
                    let (model, stats) = evaluate_semi_naive(rules, &self.facts, &strata, opts)?;
                    return Ok((WellFoundedModel::total(model), stats, Some(strata)));
                }
                Err(err) => {
                    debug!(error = %err, "program not stratifiable, using alternating fixpoint");
                }
            }
        }
        let (model, stats) = evaluate_well_founded(rules, &self.facts, opts)?;
        Ok((model, stats, None))
    }

    fn options(&self, timeout: QueryTimeout) -> EvalOptions {
        let limits = &self.config.limits;
        EvalOptions {
            divide_by_zero: self.config.evaluation.divide_by_zero,
            parallel: self.config.evaluation.parallel,
            guard: ExecutionGuard::new(
                timeout,
                ResourceLimits::from_config(limits.max_derived_tuples, limits.max_iterations),
            ),
        }
    }

    fn warn_if_stratifier_disabled(&self) {
        if self.config.evaluation.stratifier == StratifierMode::Disabled {
            warn!(
                strategy = %self.config.evaluation.strategy,
                "stratifier can only be disabled for well-founded evaluation; ignoring"
            );
        }
    }
}

/// Evaluate `query` over `facts` and `rules` in one call
pub fn execute(facts: &Facts, rules: &[Rule], query: &Query, config: &Config) -> Result<QueryResult> {
    KnowledgeBase::new(facts.clone(), rules.to_vec(), config.clone())?.execute(query)
}

fn stratify(rules: &[Rule]) -> std::result::Result<StratumAssignment, NotStratifiedError> {
    DependencyGraph::from_rules(rules).compute_strata()
}

/// Magic-sets rewrite that passed the strict safety check and the stratifier
fn checked_rewrite(rules: &[Rule], query: &Query) -> Option<(MagicProgram, StratumAssignment)> {
    let Some(program) = rewrite(rules, query) else {
        warn!(query = %query, "no bound query arguments, magic sets skipped");
        return None;
    };
    let mut strict = SafetyAnalyzer::new(SafetyPolicy::Strict);
    if let Err(err) = strict
        .process_rules(&program.rules)
        .and_then(|_| check_query(&program.query))
    {
        warn!(error = %err, "rewritten program is unsafe, magic sets skipped");
        return None;
    }
    match stratify(&program.rules) {
        Ok(strata) => Some((program, strata)),
        Err(err) => {
            warn!(error = %err, "rewritten program is not stratifiable, magic sets skipped");
            None
        }
    }
}
