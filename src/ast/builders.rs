//! Builder Patterns for AST Construction
//!
//! Provides fluent APIs for constructing AST nodes, particularly useful for tests.
//!
//! ## Example
//!
//! ```rust
//! use strata::ast::builders::{AtomBuilder, RuleBuilder};
//!
//! // Build an atom: path(X, Y)
//! let atom = AtomBuilder::new("path")
//!     .var("X")
//!     .var("Y")
//!     .build();
//!
//! // Build a rule: path(X, Y) :- edge(X, Y).
//! let rule = RuleBuilder::new("path")
//!     .head_vars(["X", "Y"])
//!     .body_atom("edge", ["X", "Y"])
//!     .build();
//!
//! // Build a recursive rule: path(X, Z) :- path(X, Y), edge(Y, Z).
//! let recursive = RuleBuilder::new("path")
//!     .head_vars(["X", "Z"])
//!     .body_atom("path", ["X", "Y"])
//!     .body_atom("edge", ["Y", "Z"])
//!     .build();
//! assert_eq!(recursive.to_string(), "path(X, Z) :- path(X, Y), edge(Y, Z).");
//! ```

use super::{Atom, Literal, Query, Rule, Term};
use crate::builtins::BuiltinRef;
use crate::value::Value;

/// Variable term shorthand
pub fn var(name: impl Into<String>) -> Term {
    Term::Variable(name.into())
}

/// Constant term shorthand
pub fn constant(value: impl Into<Value>) -> Term {
    Term::Constant(value.into())
}

fn var_terms<I, S>(vars: I) -> Vec<Term>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    vars.into_iter().map(|v| Term::Variable(v.into())).collect()
}

// AtomBuilder
/// Builder for constructing Atom instances
#[derive(Debug, Clone)]
pub struct AtomBuilder {
    symbol: String,
    terms: Vec<Term>,
}

impl AtomBuilder {
    pub fn new(symbol: impl Into<String>) -> Self {
        AtomBuilder {
            symbol: symbol.into(),
            terms: Vec::new(),
        }
    }

    /// Add a variable argument
    pub fn var(mut self, name: impl Into<String>) -> Self {
        self.terms.push(Term::Variable(name.into()));
        self
    }

    /// Add a constant argument
    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.terms.push(Term::Constant(value.into()));
        self
    }

    /// Add an arbitrary term argument
    pub fn term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn build(self) -> Atom {
        Atom::new(self.symbol, self.terms)
    }
}

// RuleBuilder
/// Builder for constructing single-head Rule instances
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    head_symbol: String,
    head_terms: Vec<Term>,
    body: Vec<Literal>,
}

impl RuleBuilder {
    pub fn new(head_symbol: impl Into<String>) -> Self {
        RuleBuilder {
            head_symbol: head_symbol.into(),
            head_terms: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set the head arguments to variables
    pub fn head_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.head_terms = var_terms(vars);
        self
    }

    /// Append one head argument
    pub fn head_term(mut self, term: Term) -> Self {
        self.head_terms.push(term);
        self
    }

    /// Positive body atom over variables
    pub fn body_atom<I, S>(mut self, symbol: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body
            .push(Literal::positive(Atom::new(symbol, var_terms(vars))));
        self
    }

    /// Negated body atom over variables
    pub fn body_negated<I, S>(mut self, symbol: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body
            .push(Literal::negative(Atom::new(symbol, var_terms(vars))));
        self
    }

    /// Builtin body literal
    pub fn body_builtin(mut self, builtin: BuiltinRef, terms: Vec<Term>) -> Self {
        self.body.push(Literal::positive(Atom::builtin(builtin, terms)));
        self
    }

    /// Any prepared literal
    pub fn body_literal(mut self, literal: Literal) -> Self {
        self.body.push(literal);
        self
    }

    pub fn build(self) -> Rule {
        Rule::new(Atom::new(self.head_symbol, self.head_terms), self.body)
    }
}

// QueryBuilder
/// Builder for conjunctive queries
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    literals: Vec<Literal>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    pub fn atom(mut self, atom: Atom) -> Self {
        self.literals.push(Literal::positive(atom));
        self
    }

    pub fn negated(mut self, atom: Atom) -> Self {
        self.literals.push(Literal::negative(atom));
        self
    }

    pub fn literal(mut self, literal: Literal) -> Self {
        self.literals.push(literal);
        self
    }

    pub fn build(self) -> Query {
        Query::new(self.literals)
    }
}
