//! Error surface: unsafe rules, unstratifiable programs, timeouts,
//! cancellation, resource limits and builtin registry misuse.

use std::thread;
use std::time::Duration;
use strata::ast::builders::{var, AtomBuilder, QueryBuilder, RuleBuilder};
use strata::builtins::{Builtin, BuiltinError, BuiltinOutcome};
use strata::execution::{Interruption, ResourceError, TimeoutError};
use strata::{
    Atom, BuiltinRegistry, Config, Error, EvaluationStrategy, Facts, KnowledgeBase, Query,
    QueryTimeout, Rule, Term,
};

// Test Helpers
fn chain_kb(length: i64, config: Config) -> KnowledgeBase {
    let mut facts = Facts::new();
    for i in 0..length {
        facts.add("edge", [i, i + 1]);
    }
    let rules = vec![
        RuleBuilder::new("path")
            .head_vars(["X", "Y"])
            .body_atom("edge", ["X", "Y"])
            .build(),
        RuleBuilder::new("path")
            .head_vars(["X", "Z"])
            .body_atom("path", ["X", "Y"])
            .body_atom("edge", ["Y", "Z"])
            .build(),
    ];
    KnowledgeBase::new(facts, rules, config).unwrap()
}

fn all_paths() -> Query {
    QueryBuilder::new()
        .atom(AtomBuilder::new("path").var("X").var("Y").build())
        .build()
}

// Safety Errors
#[test]
fn test_unsafe_head_variable() {
    let rule = RuleBuilder::new("p")
        .head_vars(["X", "Y"])
        .body_atom("q", ["X"])
        .build();
    let err = KnowledgeBase::new(Facts::new(), vec![rule], Config::default()).unwrap_err();
    match err {
        Error::RuleUnsafe(e) => {
            assert_eq!(e.variables, vec!["Y".to_string()]);
            assert!(e.to_string().contains("p(X, Y) :- q(X)."));
        }
        other => panic!("expected RuleUnsafe, got {other}"),
    }
}

#[test]
fn test_unsafe_negation_only_variable() {
    let rule = RuleBuilder::new("bad")
        .head_vars(["X"])
        .body_negated("good", ["X"])
        .build();
    let err = KnowledgeBase::new(Facts::new(), vec![rule], Config::default()).unwrap_err();
    assert!(matches!(err, Error::RuleUnsafe(_)));
}

#[test]
fn test_unsafe_query() {
    let kb = chain_kb(2, Config::default());
    let query = QueryBuilder::new()
        .negated(Atom::new("path", vec![var("X"), var("Y")]))
        .build();
    assert!(matches!(kb.execute(&query), Err(Error::RuleUnsafe(_))));
}

// Stratification Errors
#[test]
fn test_self_negation_not_stratified() {
    let rule = RuleBuilder::new("p")
        .head_vars(["X"])
        .body_atom("r", ["X"])
        .body_negated("p", ["X"])
        .build();
    let kb = KnowledgeBase::new(Facts::new(), vec![rule], Config::default()).unwrap();
    let err = kb.materialize().unwrap_err();
    match err {
        Error::ProgramNotStratified(e) => {
            assert_eq!(e.predicate.symbol, "p");
            assert!(!e.cycle.is_empty());
        }
        other => panic!("expected ProgramNotStratified, got {other}"),
    }
}

// Timeouts and Cancellation
#[test]
fn test_timeout_reports_incomplete() {
    let mut config = Config::default().with_strategy(EvaluationStrategy::Naive);
    config.limits.timeout_ms = 1;
    let kb = chain_kb(2_000, config);
    let err = kb.execute(&all_paths()).unwrap_err();
    assert!(err.is_incomplete());
    assert!(matches!(
        err,
        Error::Incomplete(Interruption::Timeout(TimeoutError::Expired { .. }))
    ));
}

#[test]
fn test_cancel_from_another_thread() {
    let kb = chain_kb(2_000, Config::default().with_strategy(EvaluationStrategy::Naive));
    let timeout = QueryTimeout::infinite();
    let handle = timeout.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
    });
    let result = kb.execute_with_timeout(&all_paths(), timeout);
    canceller.join().unwrap();
    assert!(matches!(
        result,
        Err(Error::Incomplete(Interruption::Timeout(TimeoutError::Cancelled { .. })))
    ));
}

#[test]
fn test_generous_timeout_completes() {
    let mut config = Config::default();
    config.limits.timeout_ms = 60_000;
    let kb = chain_kb(10, config);
    assert_eq!(kb.execute(&all_paths()).unwrap().len(), 55);
}

// Resource Limits
#[test]
fn test_derived_tuple_limit() {
    let mut config = Config::default();
    config.limits.max_derived_tuples = 20;
    let kb = chain_kb(10, config);
    match kb.execute(&all_paths()).unwrap_err() {
        Error::Incomplete(Interruption::Resource(ResourceError::DerivedTuplesExceeded { limit, actual })) => {
            assert_eq!(limit, 20);
            assert!(actual > 20);
        }
        other => panic!("expected derived tuple limit, got {other}"),
    }
}

#[test]
fn test_iteration_limit() {
    let mut config = Config::default();
    config.limits.max_iterations = 3;
    let kb = chain_kb(10, config);
    let err = kb.execute(&all_paths()).unwrap_err();
    assert!(matches!(
        err,
        Error::Incomplete(Interruption::Resource(ResourceError::IterationsExceeded { limit: 3, .. }))
    ));
}

#[test]
fn test_limits_apply_to_well_founded() {
    let mut config = Config::default().with_strategy(EvaluationStrategy::WellFounded);
    config.limits.max_derived_tuples = 5;
    let kb = chain_kb(10, config);
    assert!(kb.execute(&all_paths()).unwrap_err().is_incomplete());
}

// Builtin Registry Errors
#[derive(Debug)]
struct Successor;

impl Builtin for Successor {
    fn name(&self) -> &str {
        "SUCC"
    }

    fn arity(&self) -> usize {
        2
    }

    fn can_evaluate(&self, bound: &[bool]) -> bool {
        bound[0]
    }

    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError> {
        let Some(x) = args[0].and_then(Term::as_constant).and_then(strata::Value::as_i64) else {
            return Ok(BuiltinOutcome::Reject);
        };
        let next = Term::constant(x + 1);
        match args[1] {
            Some(y) if *y == next => Ok(BuiltinOutcome::Accept),
            Some(_) => Ok(BuiltinOutcome::Reject),
            None => Ok(BuiltinOutcome::Complete(vec![Term::constant(x), next])),
        }
    }
}

#[test]
fn test_registry_rejects_duplicates_and_bad_arity() {
    let mut registry = BuiltinRegistry::standard();
    registry.register(Successor).unwrap();
    assert!(matches!(
        registry.register(Successor),
        Err(BuiltinError::Duplicate { .. })
    ));
    assert!(matches!(
        registry.atom("SUCC", vec![var("X")]),
        Err(BuiltinError::ArityMismatch { expected: 2, found: 1, .. })
    ));
    assert!(matches!(
        registry.atom("PRED", vec![var("X"), var("Y")]),
        Err(BuiltinError::Unknown { .. })
    ));
}

#[test]
fn test_user_builtin_in_rule() {
    let mut registry = BuiltinRegistry::standard();
    registry.register(Successor).unwrap();
    let mut facts = Facts::new();
    facts.add("n", [1]);
    facts.add("n", [5]);
    let rule = Rule::new(
        Atom::new("next", vec![var("Y")]),
        vec![
            strata::Literal::positive(Atom::new("n", vec![var("X")])),
            strata::Literal::positive(registry.atom("SUCC", vec![var("X"), var("Y")]).unwrap()),
        ],
    );
    let query = QueryBuilder::new()
        .atom(AtomBuilder::new("next").var("Y").build())
        .build();
    let result = strata::execute(&facts, &[rule], &query, &Config::default()).unwrap();
    assert_eq!(
        result.tuples(),
        vec![strata::Tuple::from_values([2]), strata::Tuple::from_values([6])]
    );
}
