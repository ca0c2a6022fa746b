//! Numeric edge cases: division by zero, overflow, cross-type equality,
//! signed zero, and NaN inside rule evaluation.

use strata::ast::builders::{constant, var, QueryBuilder, RuleBuilder};
use strata::evaluation::EvaluationError;
use strata::{
    Atom, BuiltinRegistry, Config, DivideByZeroPolicy, Error, Facts, Literal, Query, Rule, Term,
    Tuple, Value,
};

// Test Helpers
fn builtin(name: &str, terms: Vec<Term>) -> Literal {
    Literal::positive(BuiltinRegistry::standard().atom(name, terms).unwrap())
}

fn q(symbol: &str, arity: usize) -> Query {
    let vars = (0..arity).map(|i| var(format!("V{i}"))).collect();
    QueryBuilder::new().atom(Atom::new(symbol, vars)).build()
}

/// out(Z) :- n(X), OP(X, by, Z).
fn op_rule(op: &str, by: impl Into<Value>) -> Rule {
    RuleBuilder::new("out")
        .head_vars(["Z"])
        .body_atom("n", ["X"])
        .body_literal(builtin(op, vec![var("X"), constant(by), var("Z")]))
        .build()
}

fn run(facts: &Facts, rule: Rule, policy: DivideByZeroPolicy) -> strata::Result<Vec<Tuple>> {
    let config = Config::default().with_divide_by_zero(policy);
    Ok(strata::execute(facts, &[rule], &q("out", 1), &config)?.tuples())
}

// Division Tests
#[test]
fn test_modulus_by_zero_discarded() {
    let mut facts = Facts::new();
    facts.add("n", [7]);
    let out = run(&facts, op_rule("MODULUS", 0), DivideByZeroPolicy::Discard).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_float_division_by_zero_stops() {
    let mut facts = Facts::new();
    facts.add("n", [1.5_f64]);
    let err = run(&facts, op_rule("DIVIDE", 0.0_f64), DivideByZeroPolicy::Stop).unwrap_err();
    assert!(matches!(err, Error::Evaluation(EvaluationError::DivideByZero { .. })));
}

#[test]
fn test_discard_keeps_other_bindings() {
    let mut facts = Facts::new();
    facts.add("a", [6]);
    facts.add("b", [0]);
    facts.add("b", [3]);
    let rule = RuleBuilder::new("out")
        .head_vars(["Z"])
        .body_atom("a", ["X"])
        .body_atom("b", ["Y"])
        .body_literal(builtin("DIVIDE", vec![var("X"), var("Y"), var("Z")]))
        .build();
    let out = run(&facts, rule, DivideByZeroPolicy::Discard).unwrap();
    assert_eq!(out, vec![Tuple::from_values([2])]);
}

#[test]
fn test_integer_division_truncates() {
    let mut facts = Facts::new();
    facts.add("n", [7]);
    let out = run(&facts, op_rule("DIVIDE", 2), DivideByZeroPolicy::Discard).unwrap();
    assert_eq!(out, vec![Tuple::from_values([3])]);
}

// Overflow Tests
#[test]
fn test_integer_overflow_discarded() {
    let mut facts = Facts::new();
    facts.add("n", [i64::MAX]);
    facts.add("n", [1_i64]);
    let out = run(&facts, op_rule("ADD", 1_i64), DivideByZeroPolicy::Discard).unwrap();
    assert_eq!(out, vec![Tuple::from_values([2_i64])]);
}

#[test]
fn test_integer_overflow_stops() {
    let mut facts = Facts::new();
    facts.add("n", [i64::MIN]);
    let err = run(&facts, op_rule("MULTIPLY", -1_i64), DivideByZeroPolicy::Stop).unwrap_err();
    assert!(matches!(err, Error::Evaluation(EvaluationError::ArithmeticOverflow { .. })));
}

// Cross-type Equality Tests
#[test]
fn test_integer_joins_double() {
    let mut facts = Facts::new();
    facts.add("p", [5_i64]);
    facts.add("q", [5.0_f64]);
    facts.add("q", [5.5_f64]);
    let rule = RuleBuilder::new("both")
        .head_vars(["X"])
        .body_atom("p", ["X"])
        .body_atom("q", ["X"])
        .build();
    let result = strata::execute(&facts, &[rule], &q("both", 1), &Config::default()).unwrap();
    assert_eq!(result.len(), 1);
}

#[test]
fn test_negation_sees_cross_type_equal_value() {
    let mut facts = Facts::new();
    facts.add("p", [5_i64]);
    facts.add("p", [6_i64]);
    facts.add("q", [5.0_f32]);
    let rule = RuleBuilder::new("only_p")
        .head_vars(["X"])
        .body_atom("p", ["X"])
        .body_negated("q", ["X"])
        .build();
    let result = strata::execute(&facts, &[rule], &q("only_p", 1), &Config::default()).unwrap();
    assert_eq!(result.tuples(), vec![Tuple::from_values([6_i64])]);
}

#[test]
fn test_signed_zero_equal() {
    let mut facts = Facts::new();
    facts.add("p", [0.0_f64]);
    let query = QueryBuilder::new()
        .atom(Atom::new("p", vec![constant(-0.0_f64)]))
        .build();
    let result = strata::execute(&facts, &[], &query, &Config::default()).unwrap();
    assert!(result.holds());
}

#[test]
fn test_string_never_equals_number() {
    let mut facts = Facts::new();
    facts.add("p", ["5"]);
    facts.add("q", [5]);
    let rule = RuleBuilder::new("same")
        .head_vars(["X"])
        .body_atom("p", ["X"])
        .body_atom("q", ["X"])
        .build();
    let result = strata::execute(&facts, &[rule], &q("same", 1), &Config::default()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_nan_comparisons_reject() {
    let mut facts = Facts::new();
    facts.add("n", [f64::NAN]);
    facts.add("n", [1.0_f64]);
    let rule = RuleBuilder::new("out")
        .head_vars(["X"])
        .body_atom("n", ["X"])
        .body_literal(builtin("LESS", vec![var("X"), constant(2)]))
        .build();
    let out = run(&facts, rule, DivideByZeroPolicy::Discard).unwrap();
    assert_eq!(out, vec![Tuple::from_values([1.0_f64])]);
}

#[test]
fn test_arithmetic_promotes_to_widest_type() {
    let mut facts = Facts::new();
    facts.add("n", [2_i64]);
    let out = run(&facts, op_rule("ADD", 0.5_f64), DivideByZeroPolicy::Discard).unwrap();
    assert_eq!(out.len(), 1);
    let value = out[0].get(0).and_then(Term::as_constant).cloned().unwrap();
    assert_eq!(value, Value::Double(2.5));
}
