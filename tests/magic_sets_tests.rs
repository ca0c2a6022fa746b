//! Magic sets end to end: every rewritten program must answer exactly what
//! plain semi-naive evaluation answers.

use strata::ast::builders::{constant, var, AtomBuilder, QueryBuilder, RuleBuilder};
use strata::{
    Atom, BuiltinRegistry, Config, EvaluationStrategy, Facts, Literal, Query, QueryResult, Rule,
    Tuple,
};

// Test Helpers
fn run(facts: &Facts, rules: &[Rule], query: &Query, strategy: EvaluationStrategy) -> QueryResult {
    let config = Config::default().with_strategy(strategy);
    strata::execute(facts, rules, query, &config).unwrap()
}

/// Magic result, after asserting it matches semi-naive and used the rewrite
fn magic_matches_semi_naive(facts: &Facts, rules: &[Rule], query: &Query) -> QueryResult {
    let plain = run(facts, rules, query, EvaluationStrategy::SemiNaive);
    let magic = run(facts, rules, query, EvaluationStrategy::MagicSets);
    assert!(magic.trace.magic_applied, "rewrite was not applied for {query}");
    assert_eq!(magic.trace.strategy, EvaluationStrategy::MagicSets);
    assert_eq!(plain.tuples(), magic.tuples());
    magic
}

fn path_rules() -> Vec<Rule> {
    vec![
        RuleBuilder::new("path")
            .head_vars(["X", "Y"])
            .body_atom("edge", ["X", "Y"])
            .build(),
        RuleBuilder::new("path")
            .head_vars(["X", "Z"])
            .body_atom("path", ["X", "Y"])
            .body_atom("edge", ["Y", "Z"])
            .build(),
    ]
}

fn chain(length: i64) -> Facts {
    let mut facts = Facts::new();
    for i in 0..length {
        facts.add("edge", [i, i + 1]);
    }
    facts
}

fn path_from(source: i64) -> Query {
    QueryBuilder::new()
        .atom(AtomBuilder::new("path").constant(source).var("Y").build())
        .build()
}

// Rewrite Correctness
#[test]
fn test_labeled_sources_answer_matches() {
    let mut facts = Facts::new();
    facts.add("a", [1, 10]);
    facts.add("a", [2, 20]);
    facts.add("b", [1, 11]);
    facts.add("b", [2, 11]);
    facts.add("c", [10, 11, 100]);
    facts.add("c", [20, 11, 200]);
    facts.add("c", [10, 12, 300]);
    let rules = vec![
        RuleBuilder::new("t")
            .head_vars(["X", "Z"])
            .body_atom("a", ["X", "U"])
            .body_atom("b", ["X", "V"])
            .body_atom("t2", ["U", "V", "Z"])
            .build(),
        RuleBuilder::new("t2")
            .head_vars(["U", "V", "Z"])
            .body_atom("c", ["U", "V", "Z"])
            .build(),
    ];
    let query = Query::atom(Atom::new("t", vec![constant(1), var("Z")]));

    let magic = magic_matches_semi_naive(&facts, &rules, &query);
    assert_eq!(magic.tuples(), vec![Tuple::from_values([1, 100])]);
    let stats = magic.trace.magic_stats.unwrap();
    assert_eq!(stats.labeled_rules, 2);
    assert!(stats.magic_rules >= 1);
}

#[test]
fn test_negated_idb_literal_evaluated_in_full() {
    let mut facts = chain(4);
    for n in 0..5 {
        facts.add("node", [n]);
    }
    let mut rules = path_rules();
    rules.push(
        RuleBuilder::new("unreached")
            .head_vars(["X", "Y"])
            .body_atom("node", ["X"])
            .body_atom("node", ["Y"])
            .body_negated("path", ["X", "Y"])
            .build(),
    );
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("unreached").constant(2).var("Y").build())
        .build();

    let magic = magic_matches_semi_naive(&facts, &rules, &query);
    assert_eq!(
        magic.tuples(),
        vec![
            Tuple::from_values([2, 0]),
            Tuple::from_values([2, 1]),
            Tuple::from_values([2, 2]),
        ]
    );
    assert!(magic.trace.strata >= 2);
}

#[test]
fn test_filter_builtin_in_recursive_rule() {
    let less = |a, b| {
        Literal::positive(
            BuiltinRegistry::standard()
                .atom("LESS", vec![a, b])
                .unwrap(),
        )
    };
    let rules = vec![
        RuleBuilder::new("small")
            .head_vars(["X", "Y"])
            .body_atom("edge", ["X", "Y"])
            .body_literal(less(var("Y"), constant(5)))
            .build(),
        RuleBuilder::new("small")
            .head_vars(["X", "Z"])
            .body_atom("small", ["X", "Y"])
            .body_atom("edge", ["Y", "Z"])
            .body_literal(less(var("Z"), constant(5)))
            .build(),
    ];
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("small").constant(1).var("Y").build())
        .build();

    let magic = magic_matches_semi_naive(&chain(9), &rules, &query);
    assert_eq!(magic.len(), 3);
}

#[test]
fn test_binding_builtin_in_recursive_rule_terminates() {
    // p(X, Y) :- n(X), ADD(X, 1, Z), n(Z), p(Z, Y).  n bounds the demand
    let add = BuiltinRegistry::standard()
        .atom("ADD", vec![var("X"), constant(1), var("Z")])
        .unwrap();
    let rules = vec![
        RuleBuilder::new("p")
            .head_vars(["X", "Y"])
            .body_atom("n", ["X"])
            .body_literal(Literal::positive(add))
            .body_atom("n", ["Z"])
            .body_atom("p", ["Z", "Y"])
            .build(),
        RuleBuilder::new("p")
            .head_vars(["X", "Y"])
            .body_atom("e", ["X", "Y"])
            .build(),
    ];
    let mut facts = Facts::new();
    for n in 0..5 {
        facts.add("n", [n]);
    }
    facts.add("e", [4, 100]);
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("p").constant(0).var("Y").build())
        .build();

    let mut config = Config::default().with_strategy(EvaluationStrategy::MagicSets);
    config.limits.max_iterations = 500;
    let magic = strata::execute(&facts, &rules, &query, &config).unwrap();
    assert!(magic.trace.magic_applied);
    assert_eq!(magic.tuples(), vec![Tuple::from_values([100])]);
    assert_eq!(magic_matches_semi_naive(&facts, &rules, &query).tuples(), magic.tuples());
}

#[test]
fn test_stored_idb_facts_are_bridged() {
    let mut facts = chain(3);
    facts.add("path", [50, 51]);
    facts.add("edge", [51, 52]);

    let magic = magic_matches_semi_naive(&facts, &path_rules(), &path_from(50));
    assert_eq!(
        magic.tuples(),
        vec![Tuple::from_values([50, 51]), Tuple::from_values([50, 52])]
    );
    assert!(magic.trace.magic_stats.unwrap().bridge_rules >= 1);
}

#[test]
fn test_fully_bound_query() {
    let facts = chain(5);
    let holds = QueryBuilder::new()
        .atom(AtomBuilder::new("path").constant(0).constant(3).build())
        .build();
    let fails = QueryBuilder::new()
        .atom(AtomBuilder::new("path").constant(3).constant(0).build())
        .build();

    assert!(magic_matches_semi_naive(&facts, &path_rules(), &holds).holds());
    assert!(!magic_matches_semi_naive(&facts, &path_rules(), &fails).holds());
}

#[test]
fn test_query_with_edb_join() {
    // ?- start(S), path(S, Y).  Demand flows from the EDB literal
    let mut facts = chain(6);
    facts.add("start", [4]);
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("start").var("S").build())
        .atom(AtomBuilder::new("path").var("S").var("Y").build())
        .build();

    let magic = magic_matches_semi_naive(&facts, &path_rules(), &query);
    assert_eq!(
        magic.tuples(),
        vec![Tuple::from_values([4, 5]), Tuple::from_values([4, 6])]
    );
}

// Trace and Fallback
#[test]
fn test_trace_reports_magic_stats() {
    let magic = run(&chain(4), &path_rules(), &path_from(0), EvaluationStrategy::MagicSets);
    let trace = &magic.trace;
    let stats = trace.magic_stats.unwrap();
    assert_eq!(stats.seed_rules, 1);
    assert_eq!(stats.adorned_rules, 2);
    assert!(trace.evaluated_rules > trace.input_rules);
    assert!(trace.format_trace().contains("MAGIC SETS"));
}

#[test]
fn test_free_query_falls_back() {
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("path").var("X").var("Y").build())
        .build();
    let result = run(&chain(4), &path_rules(), &query, EvaluationStrategy::MagicSets);
    assert!(!result.trace.magic_applied);
    assert!(result.trace.magic_stats.is_none());
    assert_eq!(result.trace.requested_strategy, EvaluationStrategy::MagicSets);
    assert_eq!(result.trace.strategy, EvaluationStrategy::SemiNaive);
    assert_eq!(result.len(), 10);
}

#[test]
fn test_edb_only_query_falls_back() {
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("edge").constant(1).var("Y").build())
        .build();
    let result = run(&chain(4), &path_rules(), &query, EvaluationStrategy::MagicSets);
    assert!(!result.trace.magic_applied);
    assert_eq!(result.tuples(), vec![Tuple::from_values([1, 2])]);
}
