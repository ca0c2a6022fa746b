//! # Datalog AST - Rules, Literals and Terms
//!
//! Structural representation of the programs the engine evaluates. Programs are
//! produced by an external front-end (or the [`builders`] module) and are never
//! mutated by the pipeline: every analysis pass builds new values.
//!
//! ## Builders
//!
//! For programmatic construction of AST nodes, see the [`builders`] module
//! which provides fluent APIs like `AtomBuilder` and `RuleBuilder`.

use crate::builtins::BuiltinRef;
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;

pub mod builders;

// ============================================================================
// Terms
// ============================================================================

/// A term: variable, typed constant or constructed (function) term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// Named variable: X, Y, Name
    Variable(String),
    /// Typed constant
    Constant(Value),
    /// Function term: f(X, 1)
    Construct(String, Vec<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Term::Constant(value.into())
    }

    pub fn construct(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Construct(functor.into(), args)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Term::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// True if no variable occurs anywhere in the term
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Constant(_) => true,
            Term::Construct(_, args) => args.iter().all(Term::is_ground),
        }
    }

    /// Collect the variables of this term in first-occurrence order
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Term::Variable(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Term::Constant(_) => {}
            Term::Construct(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Term::Variable(v) => v == name,
            Term::Constant(_) => false,
            Term::Construct(_, args) => args.iter().any(|a| a.contains_variable(name)),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => f.write_str(name),
            Term::Constant(value) => write!(f, "{value}"),
            Term::Construct(functor, args) => {
                write!(f, "{functor}(")?;
                write_joined(f, args, ", ")?;
                f.write_str(")")
            }
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Constant(value)
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

// ============================================================================
// Predicates, atoms and literals
// ============================================================================

/// Predicate identity: symbol and arity
///
/// `p/1` and `p/2` are unrelated predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    pub symbol: String,
    pub arity: usize,
}

impl Predicate {
    pub fn new(symbol: impl Into<String>, arity: usize) -> Self {
        Predicate {
            symbol: symbol.into(),
            arity,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.arity)
    }
}

/// Predicate applied to terms
///
/// Builtin atoms carry the implementation they dispatch to; ordinary atoms
/// refer to a stored or derived relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub predicate: Predicate,
    pub terms: Vec<Term>,
    pub builtin: Option<BuiltinRef>,
}

impl Atom {
    /// Ordinary atom; arity is taken from the number of terms
    pub fn new(symbol: impl Into<String>, terms: Vec<Term>) -> Self {
        Atom {
            predicate: Predicate::new(symbol, terms.len()),
            terms,
            builtin: None,
        }
    }

    /// Builtin atom dispatching to `builtin`
    pub fn builtin(builtin: BuiltinRef, terms: Vec<Term>) -> Self {
        Atom {
            predicate: Predicate::new(builtin.name(), terms.len()),
            terms,
            builtin: Some(builtin),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.predicate.symbol
    }

    pub fn arity(&self) -> usize {
        self.predicate.arity
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin.is_some()
    }

    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    /// Variables in first-occurrence order
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        for term in &self.terms {
            term.collect_variables(&mut out);
        }
        out
    }

    /// Same atom with a different predicate symbol (used by rewrites)
    pub fn renamed(&self, symbol: impl Into<String>) -> Atom {
        Atom {
            predicate: Predicate::new(symbol, self.predicate.arity),
            terms: self.terms.clone(),
            builtin: self.builtin.clone(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate.symbol)?;
        write_joined(f, &self.terms, ", ")?;
        f.write_str(")")
    }
}

/// Atom with polarity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub atom: Atom,
    pub positive: bool,
}

impl Literal {
    pub fn positive(atom: Atom) -> Self {
        Literal {
            atom,
            positive: true,
        }
    }

    pub fn negative(atom: Atom) -> Self {
        Literal {
            atom,
            positive: false,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.atom.predicate
    }

    pub fn is_builtin(&self) -> bool {
        self.atom.is_builtin()
    }

    /// Positive, non-builtin literal: the only kind that binds by matching
    pub fn is_positive_ordinary(&self) -> bool {
        self.positive && !self.atom.is_builtin()
    }

    pub fn variables(&self) -> Vec<String> {
        self.atom.variables()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            f.write_str("not ")?;
        }
        write!(f, "{}", self.atom)
    }
}

// ============================================================================
// Rules, queries, programs
// ============================================================================

/// A rule `h1, h2 :- b1, ..., bn`
///
/// Head literals are positive. Multi-head rules are normalised with
/// [`Rule::split_heads`] before analysis; every pass after that assumes a
/// single head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: Vec<Literal>,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn new(head: Atom, body: Vec<Literal>) -> Self {
        Rule {
            head: vec![Literal::positive(head)],
            body,
        }
    }

    /// Rule with an empty body (a fact written as a rule)
    pub fn fact(head: Atom) -> Self {
        Rule::new(head, Vec::new())
    }

    /// The first head atom
    pub fn head_atom(&self) -> &Atom {
        &self.head[0].atom
    }

    pub fn head_predicate(&self) -> &Predicate {
        &self.head_atom().predicate
    }

    /// One rule per head literal, sharing the body
    pub fn split_heads(&self) -> Vec<Rule> {
        self.head
            .iter()
            .map(|h| Rule {
                head: vec![h.clone()],
                body: self.body.clone(),
            })
            .collect()
    }

    /// Variables of the head in first-occurrence order
    pub fn head_variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        for lit in &self.head {
            for term in &lit.atom.terms {
                term.collect_variables(&mut out);
            }
        }
        out
    }

    /// All variables of the rule
    pub fn variables(&self) -> HashSet<String> {
        self.head
            .iter()
            .chain(&self.body)
            .flat_map(Literal::variables)
            .collect()
    }

    /// Ordinary predicates referenced by the body with their polarity
    pub fn body_dependencies(&self) -> impl Iterator<Item = (&Predicate, bool)> {
        self.body
            .iter()
            .filter(|lit| !lit.is_builtin())
            .map(|lit| (lit.predicate(), lit.positive))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.head, ", ")?;
        if !self.body.is_empty() {
            f.write_str(" :- ")?;
            write_joined(f, &self.body, ", ")?;
        }
        f.write_str(".")
    }
}

/// Conjunctive query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub literals: Vec<Literal>,
}

impl Query {
    pub fn new(literals: Vec<Literal>) -> Self {
        Query { literals }
    }

    /// Single positive literal query
    pub fn atom(atom: Atom) -> Self {
        Query {
            literals: vec![Literal::positive(atom)],
        }
    }

    /// Output variables: first-occurrence order over all literals
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        for lit in &self.literals {
            for term in &lit.atom.terms {
                term.collect_variables(&mut out);
            }
        }
        out
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("?- ")?;
        write_joined(f, &self.literals, ", ")?;
        f.write_str(".")
    }
}

/// Ordered rule list plus an optional query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub rules: Vec<Rule>,
    pub query: Option<Query>,
}

impl Program {
    pub fn new(rules: Vec<Rule>, query: Option<Query>) -> Self {
        Program { rules, query }
    }

    /// Predicates defined by at least one rule head (the IDB)
    pub fn idb_predicates(&self) -> HashSet<Predicate> {
        self.rules
            .iter()
            .flat_map(|r| r.head.iter().map(|h| h.predicate().clone()))
            .collect()
    }

    /// Normalise every multi-head rule into single-head rules
    pub fn normalized(&self) -> Program {
        Program {
            rules: self.rules.iter().flat_map(Rule::split_heads).collect(),
            query: self.query.clone(),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        if let Some(query) = &self.query {
            writeln!(f, "{query}")?;
        }
        Ok(())
    }
}
