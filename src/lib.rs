//! # Strata Datalog Engine
//!
//! A deductive database core: facts, rules with negation and builtins, and
//! queries answered bottom-up with stratified naive or semi-naive evaluation,
//! the magic-sets rewrite, or the well-founded semantics.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Facts + Rules + Query            (built with ast::builders; no parser)
//!     ↓
//! [Normalisation]                  → one head per rule
//!     ↓
//! [Safety Analysis]                → strict check, or reorder + aux_proj rules
//!     ↓
//! [Dependency Graph]               → SCCs + minimal strata
//!     ↓
//! [SIP + Adornment]                → p^bf predicates (magic-sets strategy)
//!     ↓
//! [Magic Sets]                     → magic / label / seed / bridge rules
//!     ↓
//! [Evaluation]                     → naive | semi-naive | well-founded
//!     ↓
//! QueryResult (relation + trace)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use strata::ast::builders::{AtomBuilder, QueryBuilder, RuleBuilder};
//! use strata::{Config, Facts, KnowledgeBase};
//!
//! let mut facts = Facts::new();
//! facts.add("edge", [1, 2]);
//! facts.add("edge", [2, 3]);
//!
//! let rules = vec![
//!     RuleBuilder::new("path").head_vars(["X", "Y"]).body_atom("edge", ["X", "Y"]).build(),
//!     RuleBuilder::new("path")
//!         .head_vars(["X", "Z"])
//!         .body_atom("path", ["X", "Y"])
//!         .body_atom("edge", ["Y", "Z"])
//!         .build(),
//! ];
//!
//! let kb = KnowledgeBase::new(facts, rules, Config::default())?;
//! let query = QueryBuilder::new()
//!     .atom(AtomBuilder::new("path").constant(1).var("Y").build())
//!     .build();
//! let result = kb.execute(&query)?;
//! assert_eq!(result.len(), 2);
//! # Ok::<(), strata::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | Typed constants with cross-type numeric equality |
//! | `ast` | Terms, atoms, literals, rules, queries; fluent builders |
//! | `unification` | Substitutions, unification, groundness |
//! | `relation` | Tuples, relations, predicate → relation maps |
//! | `builtins` | Builtin contract, registry, arithmetic and comparisons |
//! | `recursion` | Dependency graph, SCCs, stratification |
//! | `safety` | Range restriction, strict and augmenting policies |
//! | `sip` | Sideways information passing and adornment |
//! | `magic_sets` | Magic-sets rewrite |
//! | `evaluation` | Naive, semi-naive and well-founded evaluators |
//! | `execution` | Timeout, cancellation, resource limits |
//! | `knowledge_base` | Pipeline entry points |

pub mod ast;
pub mod builtins;
pub mod unification;
pub mod value;

// Analysis passes
pub mod magic_sets;
pub mod recursion;
pub mod safety;
pub mod sip;

// Evaluation
pub mod evaluation;
pub mod execution; // Query timeout and resource limits
pub mod relation;

pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod logging;
pub mod pipeline_trace;

// Re-export public types
pub use ast::{Atom, Literal, Predicate, Program, Query, Rule, Term};
pub use builtins::{Builtin, BuiltinOutcome, BuiltinRef, BuiltinRegistry};
pub use config::{Config, DivideByZeroPolicy, EvaluationStrategy, StratifierMode};
pub use error::{Error, Result};
pub use evaluation::{TruthValue, WellFoundedModel};
pub use execution::{CancelHandle, QueryTimeout};
pub use knowledge_base::{execute, KnowledgeBase, QueryResult};
pub use pipeline_trace::PipelineTrace;
pub use relation::{Facts, Relation, Tuple};
pub use safety::SafetyPolicy;
pub use unification::Substitution;
pub use value::{DataType, Value};
