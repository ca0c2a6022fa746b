//! # Recursion Support
//!
//! Dependency graphs, SCC detection (Tarjan's), cycle detection and
//! stratification for Datalog programs. Handles both positive recursion and
//! stratified negation.
//!
//! A rule is recursive if its head predicate depends on itself, directly or
//! through other rules:
//! ```datalog
//! tc(X, Z) :- tc(X, Y), edge(Y, Z).
//! ```
//!
//! Stratification groups predicates into evaluation layers so that negated
//! predicates are fully computed before rules that negate them can execute.
//!
//! Graph vertices are [`Predicate`]s, i.e. symbol *and* arity: `p/1` and `p/2`
//! never share a stratum constraint. Builtin literals add no edges.

use crate::ast::{Predicate, Rule};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Global stratification is impossible: a cycle goes through negation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("program is not stratified: {reason}")]
pub struct NotStratifiedError {
    /// Head predicate of the offending negative edge
    pub predicate: Predicate,
    /// Members of the cycle through negation, sorted
    pub cycle: Vec<Predicate>,
    pub reason: String,
}

// Dependency Types for Stratification
/// Type of dependency between predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyType {
    /// Head depends on a predicate via a positive literal
    /// Can be in same stratum or higher
    Positive,
    /// Head depends on a predicate via a negated literal
    /// Negated predicate MUST be in strictly lower stratum
    Negative,
}

/// Predicate dependency graph with positive/negative edges
///
/// Edges are stored per head: `edges[h]` lists `(b, type)` for every body
/// predicate `b` of a rule defining `h` (the body → head edge of the usual
/// presentation, indexed from its target).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<Predicate, BTreeSet<(Predicate, DependencyType)>>,
    predicates: BTreeSet<Predicate>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Build the graph of a rule set
    pub fn from_rules(rules: &[Rule]) -> Self {
        let mut graph = DependencyGraph::new();
        for rule in rules {
            for head in &rule.head {
                graph.add_predicate(head.predicate());
                for (dep, positive) in rule.body_dependencies() {
                    let dep_type = if positive {
                        DependencyType::Positive
                    } else {
                        DependencyType::Negative
                    };
                    graph.add_edge(head.predicate(), dep, dep_type);
                }
            }
        }
        graph
    }

    pub fn add_predicate(&mut self, predicate: &Predicate) {
        self.predicates.insert(predicate.clone());
    }

    /// Record that `head` depends on `body`
    pub fn add_edge(&mut self, head: &Predicate, body: &Predicate, dep_type: DependencyType) {
        self.predicates.insert(head.clone());
        self.predicates.insert(body.clone());
        self.edges
            .entry(head.clone())
            .or_default()
            .insert((body.clone(), dep_type));
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    /// Every predicate `head` depends on, with the dependency type
    pub fn dependencies(&self, head: &Predicate) -> impl Iterator<Item = &(Predicate, DependencyType)> {
        self.edges.get(head).into_iter().flatten()
    }

    /// Strongly connected components, dependencies first
    ///
    /// Uses Tarjan's algorithm: DFS with discovery times, low-link tracking,
    /// and stack-based cycle detection. Tarjan emits a component only after
    /// every component reachable from it, so the output is a valid
    /// evaluation order. The DFS keeps its own frame stack, so long
    /// dependency chains do not grow the call stack.
    pub fn sccs(&self) -> Vec<Vec<Predicate>> {
        let mut state = TarjanState::default();
        for predicate in &self.predicates {
            if !state.indices.contains_key(predicate) {
                self.strongconnect(predicate, &mut state);
            }
        }
        state.sccs
    }

    fn successors(&self, v: &Predicate) -> Vec<Predicate> {
        self.dependencies(v).map(|(p, _)| p.clone()).collect()
    }

    fn strongconnect(&self, root: &Predicate, state: &mut TarjanState) {
        state.visit(root);
        let mut frames = vec![TarjanFrame {
            predicate: root.clone(),
            successors: self.successors(root),
            next: 0,
        }];

        while let Some(frame) = frames.last_mut() {
            if let Some(w) = frame.successors.get(frame.next).cloned() {
                frame.next += 1;
                if !state.indices.contains_key(&w) {
                    state.visit(&w);
                    let successors = self.successors(&w);
                    frames.push(TarjanFrame {
                        predicate: w,
                        successors,
                        next: 0,
                    });
                } else if state.on_stack.contains(&w) {
                    let index = state.indices[&w];
                    state.lower(&frame.predicate, index);
                }
                continue;
            }

            // Every successor explored: fold into the caller, pop if root
            let Some(done) = frames.pop() else { break };
            let low = state.lowlinks[&done.predicate];
            if let Some(parent) = frames.last() {
                state.lower(&parent.predicate, low);
            }
            if low == state.indices[&done.predicate] {
                let mut scc = Vec::new();
                while let Some(w) = state.stack.pop() {
                    state.on_stack.remove(&w);
                    let finished = w == done.predicate;
                    scc.push(w);
                    if finished {
                        break;
                    }
                }
                scc.sort();
                state.sccs.push(scc);
            }
        }
    }

    fn has_self_loop(&self, predicate: &Predicate) -> bool {
        self.dependencies(predicate).any(|(p, _)| p == predicate)
    }

    /// A component is cyclic if it has several members or a self-loop
    fn is_cyclic_scc(&self, scc: &[Predicate]) -> bool {
        scc.len() > 1 || scc.first().is_some_and(|p| self.has_self_loop(p))
    }

    /// True iff the graph has any cycle
    pub fn detect_cycles(&self) -> bool {
        self.sccs().iter().any(|scc| self.is_cyclic_scc(scc))
    }

    /// Check if there's a negative edge within an SCC
    /// Returns the first negative edge found (deterministic order), if any
    pub fn negative_edge_in_scc(&self, scc: &[Predicate]) -> Option<(Predicate, Predicate)> {
        let members: HashSet<&Predicate> = scc.iter().collect();
        for from in scc {
            for (to, dep_type) in self.dependencies(from) {
                if *dep_type == DependencyType::Negative && members.contains(to) {
                    return Some((from.clone(), to.clone()));
                }
            }
        }
        None
    }

    /// Assign strata by fixpoint propagation.
    ///
    /// Every predicate starts at 0 and is raised only as far as an edge
    /// requires, which yields the unique minimal assignment.
    pub fn compute_strata(&self) -> Result<StratumAssignment, NotStratifiedError> {
        // Any negative edge inside a component means negation through recursion
        for scc in self.sccs() {
            if let Some((from, to)) = self.negative_edge_in_scc(&scc) {
                let reason = if from == to {
                    format!("'{from}' negates itself")
                } else {
                    let members: Vec<String> = scc.iter().map(ToString::to_string).collect();
                    format!(
                        "'{from}' negates '{to}' within the same recursive cycle [{}]",
                        members.join(", ")
                    )
                };
                return Err(NotStratifiedError {
                    predicate: from,
                    cycle: scc,
                    reason,
                });
            }
        }

        let mut strata: BTreeMap<Predicate, usize> =
            self.predicates.iter().map(|p| (p.clone(), 0)).collect();
        // Stratum values never exceed the number of predicates in a stratifiable program
        let bound = self.predicates.len();
        let mut changed = true;
        while changed {
            changed = false;
            for (head, deps) in &self.edges {
                for (dep, dep_type) in deps {
                    let dep_stratum = strata.get(dep).copied().unwrap_or(0);
                    let required = match dep_type {
                        DependencyType::Positive => dep_stratum,
                        DependencyType::Negative => dep_stratum + 1,
                    };
                    let current = strata.entry(head.clone()).or_insert(0);
                    if *current < required {
                        if required > bound {
                            return Err(NotStratifiedError {
                                predicate: head.clone(),
                                cycle: vec![head.clone(), dep.clone()],
                                reason: format!("stratum of '{head}' grows without bound"),
                            });
                        }
                        *current = required;
                        changed = true;
                    }
                }
            }
        }
        Ok(StratumAssignment { strata })
    }
}

#[derive(Default)]
struct TarjanState {
    index: usize,
    stack: Vec<Predicate>,
    indices: HashMap<Predicate, usize>,
    lowlinks: HashMap<Predicate, usize>,
    on_stack: HashSet<Predicate>,
    sccs: Vec<Vec<Predicate>>,
}

impl TarjanState {
    fn visit(&mut self, v: &Predicate) {
        self.indices.insert(v.clone(), self.index);
        self.lowlinks.insert(v.clone(), self.index);
        self.index += 1;
        self.stack.push(v.clone());
        self.on_stack.insert(v.clone());
    }

    fn lower(&mut self, v: &Predicate, candidate: usize) {
        if let Some(low) = self.lowlinks.get_mut(v) {
            *low = (*low).min(candidate);
        }
    }
}

/// DFS frame: a vertex and how far through its successors the walk is
struct TarjanFrame {
    predicate: Predicate,
    successors: Vec<Predicate>,
    next: usize,
}

/// Mapping from predicate to stratum
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StratumAssignment {
    strata: BTreeMap<Predicate, usize>,
}

impl StratumAssignment {
    /// Stratum of `predicate`; predicates outside the graph (pure facts) are 0
    pub fn stratum_of(&self, predicate: &Predicate) -> usize {
        self.strata.get(predicate).copied().unwrap_or(0)
    }

    /// Highest stratum used, or 0 for an empty program
    pub fn max_stratum(&self) -> usize {
        self.strata.values().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Predicate, usize)> {
        self.strata.iter().map(|(p, s)| (p, *s))
    }

    /// Group rules by the stratum of their head; empty strata are removed
    pub fn rules_by_stratum(&self, rules: &[Rule]) -> Vec<Vec<Rule>> {
        let mut grouped: BTreeMap<usize, Vec<Rule>> = BTreeMap::new();
        for rule in rules {
            grouped
                .entry(self.stratum_of(rule.head_predicate()))
                .or_default()
                .push(rule.clone());
        }
        grouped.into_values().collect()
    }
}

// Recursion Detection
/// Check if a single rule is directly recursive
///
/// A rule is directly recursive if its head predicate appears in a body literal.
pub fn is_recursive_rule(rule: &Rule) -> bool {
    let head = rule.head_predicate();
    rule.body_dependencies().any(|(p, _)| p == head)
}

/// A strongly connected group of predicates with the rules defining them
#[derive(Debug, Clone)]
pub struct Component {
    pub predicates: Vec<Predicate>,
    pub rules: Vec<Rule>,
    /// Some rule in the component depends on a predicate of the component
    pub recursive: bool,
}

/// Split `rules` into per-component groups in evaluation order
///
/// Components without rules (pure fact predicates) are omitted.
pub fn components(rules: &[Rule]) -> Vec<Component> {
    let graph = DependencyGraph::from_rules(rules);
    let mut result = Vec::new();
    for scc in graph.sccs() {
        let members: HashSet<&Predicate> = scc.iter().collect();
        let scc_rules: Vec<Rule> = rules
            .iter()
            .filter(|r| members.contains(r.head_predicate()))
            .cloned()
            .collect();
        if scc_rules.is_empty() {
            continue;
        }
        let recursive = scc_rules
            .iter()
            .any(|r| r.body_dependencies().any(|(p, _)| members.contains(p)));
        result.push(Component {
            predicates: scc,
            rules: scc_rules,
            recursive,
        });
    }
    result
}

/// Partition rules into non-recursive and recursive subsets
///
/// A rule is recursive when one of its body predicates lies in the same
/// strongly connected component as its head.
pub fn partition_recursive(rules: &[Rule]) -> (Vec<Rule>, Vec<Rule>) {
    let graph = DependencyGraph::from_rules(rules);
    let mut component_of: HashMap<Predicate, usize> = HashMap::new();
    for (idx, scc) in graph.sccs().into_iter().enumerate() {
        for p in scc {
            component_of.insert(p, idx);
        }
    }
    rules.iter().cloned().partition(|rule| {
        let head = component_of.get(rule.head_predicate());
        !rule
            .body_dependencies()
            .any(|(p, _)| head.is_some() && component_of.get(p) == head)
    })
}
