//! Boolean linear model.
//!
//! A [`Model`] is a set of 0/1 variables, linear constraints over them and a
//! minimisation objective made of a few aggregate terms. It is deliberately
//! small: everything the assessment tiers need is expressible as
//! `Σ coef·var (≤ | = | ≥) rhs` plus the three objective shapes below.

use serde::{Deserialize, Serialize};

/// A 0/1 decision variable, identified by its index in the owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoolVar(u32);

impl BoolVar {
    /// Position of this variable in the model.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        BoolVar(index as u32)
    }
}

/// Relational operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Eq,
    Ge,
}

/// Role of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Part of the problem definition.
    Hard,
    /// Removes equivalent solutions only. Never consulted when checking
    /// whether an externally supplied assignment is valid.
    Symmetry,
}

/// `Σ coef·var  cmp  rhs`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub terms: Vec<(BoolVar, i64)>,
    pub cmp: Comparison,
    pub rhs: i64,
    pub kind: ConstraintKind,
}

impl LinearConstraint {
    /// Left-hand side under a complete assignment.
    pub fn activity(&self, assignment: &Assignment) -> i64 {
        self.terms
            .iter()
            .filter(|(var, _)| assignment.value(*var))
            .map(|(_, coef)| coef)
            .sum()
    }

    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        let lhs = self.activity(assignment);
        match self.cmp {
            Comparison::Le => lhs <= self.rhs,
            Comparison::Eq => lhs == self.rhs,
            Comparison::Ge => lhs >= self.rhs,
        }
    }
}

/// One weighted component of the objective.
#[derive(Debug, Clone)]
pub enum ObjectiveTerm {
    /// `weight · Σ vars`.
    Sum { weight: i64, vars: Vec<BoolVar> },
    /// `weight · (last − first)` where `positions[i]` holds the indicators
    /// of position `i` and first/last are the extreme positions with any
    /// indicator set. Zero when nothing is set.
    Span {
        weight: i64,
        positions: Vec<Vec<BoolVar>>,
        /// Fewest positions any feasible assignment sets. Only tightens the
        /// search bound; `0` when unknown.
        min_used: usize,
    },
    /// `weight · (max_g − min_g)` over the per-group sums.
    Spread {
        weight: i64,
        groups: Vec<Vec<BoolVar>>,
        /// Sum over all groups in every feasible assignment, when fixed.
        /// Only tightens the search bound.
        total: Option<i64>,
    },
}

impl ObjectiveTerm {
    pub fn weight(&self) -> i64 {
        match self {
            ObjectiveTerm::Sum { weight, .. }
            | ObjectiveTerm::Span { weight, .. }
            | ObjectiveTerm::Spread { weight, .. } => *weight,
        }
    }

    /// Unweighted value under a complete assignment.
    pub fn raw_value(&self, assignment: &Assignment) -> i64 {
        let count = |vars: &[BoolVar]| vars.iter().filter(|v| assignment.value(**v)).count() as i64;
        match self {
            ObjectiveTerm::Sum { vars, .. } => count(vars),
            ObjectiveTerm::Span { positions, .. } => {
                let used: Vec<usize> = positions
                    .iter()
                    .enumerate()
                    .filter(|(_, vars)| count(vars) > 0)
                    .map(|(i, _)| i)
                    .collect();
                match (used.first(), used.last()) {
                    (Some(first), Some(last)) => (last - first) as i64,
                    _ => 0,
                }
            }
            ObjectiveTerm::Spread { groups, .. } => {
                let counts: Vec<i64> = groups.iter().map(|g| count(g)).collect();
                match (counts.iter().max(), counts.iter().min()) {
                    (Some(max), Some(min)) => max - min,
                    _ => 0,
                }
            }
        }
    }
}

/// A complete 0/1 assignment of a model's variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Value of `var`. Variables outside the assignment read as `false`.
    #[inline]
    pub fn value(&self, var: BoolVar) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A run of variables branched on together.
///
/// Blocks are visited in order; within the first block that still has a
/// free variable, the selection rule picks which one to branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchBlock {
    /// First free variable in block order.
    InOrder(Vec<BoolVar>),
    /// Free variable whose load group currently has the fewest variables
    /// set, ties broken by block order. Variables outside every load group
    /// count as unloaded.
    LeastLoaded(Vec<BoolVar>),
}

impl BranchBlock {
    pub fn vars(&self) -> &[BoolVar] {
        match self {
            BranchBlock::InOrder(vars) | BranchBlock::LeastLoaded(vars) => vars,
        }
    }
}

/// Variables, constraints, objective and branching preference.
#[derive(Debug, Clone, Default)]
pub struct Model {
    num_vars: u32,
    constraints: Vec<LinearConstraint>,
    objective: Vec<ObjectiveTerm>,
    branching: Vec<BranchBlock>,
    load_groups: Vec<Vec<BoolVar>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh variable.
    pub fn new_var(&mut self) -> BoolVar {
        let var = BoolVar(self.num_vars);
        self.num_vars += 1;
        var
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars as usize
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    fn add_linear(&mut self, terms: Vec<(BoolVar, i64)>, cmp: Comparison, rhs: i64) {
        self.add_constraint(LinearConstraint {
            terms,
            cmp,
            rhs,
            kind: ConstraintKind::Hard,
        });
    }

    pub fn add_le(&mut self, terms: Vec<(BoolVar, i64)>, rhs: i64) {
        self.add_linear(terms, Comparison::Le, rhs);
    }

    pub fn add_eq(&mut self, terms: Vec<(BoolVar, i64)>, rhs: i64) {
        self.add_linear(terms, Comparison::Eq, rhs);
    }

    pub fn add_ge(&mut self, terms: Vec<(BoolVar, i64)>, rhs: i64) {
        self.add_linear(terms, Comparison::Ge, rhs);
    }

    /// `Σ vars ≤ 1`.
    pub fn add_at_most_one(&mut self, vars: impl IntoIterator<Item = BoolVar>) {
        self.add_le(ones(vars), 1);
    }

    /// `Σ vars = 1`.
    pub fn add_exactly_one(&mut self, vars: impl IntoIterator<Item = BoolVar>) {
        self.add_eq(ones(vars), 1);
    }

    /// Forces a variable to a value.
    pub fn fix(&mut self, var: BoolVar, value: bool) {
        self.add_eq(vec![(var, 1)], i64::from(value));
    }

    /// `Σ lhs ≤ Σ rhs`, marked as symmetry breaking.
    pub fn add_symmetry_le(&mut self, lhs: &[BoolVar], rhs: &[BoolVar]) {
        let terms = lhs
            .iter()
            .map(|v| (*v, 1))
            .chain(rhs.iter().map(|v| (*v, -1)))
            .collect();
        self.add_constraint(LinearConstraint {
            terms,
            cmp: Comparison::Le,
            rhs: 0,
            kind: ConstraintKind::Symmetry,
        });
    }

    /// Adds an objective term. Terms with zero weight are dropped.
    pub fn minimize(&mut self, term: ObjectiveTerm) {
        if term.weight() != 0 {
            self.objective.push(term);
        }
    }

    /// Appends a block of variables to branch on before any variable not
    /// named in a block.
    pub fn add_branch_block(&mut self, block: BranchBlock) {
        if !block.vars().is_empty() {
            self.branching.push(block);
        }
    }

    /// Declares a load group for [`BranchBlock::LeastLoaded`] and returns
    /// its index. A variable belongs to at most one group; a later group
    /// takes it over.
    pub fn add_load_group(&mut self, vars: Vec<BoolVar>) -> usize {
        self.load_groups.push(vars);
        self.load_groups.len() - 1
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[ObjectiveTerm] {
        &self.objective
    }

    pub fn branch_blocks(&self) -> &[BranchBlock] {
        &self.branching
    }

    pub fn load_groups(&self) -> &[Vec<BoolVar>] {
        &self.load_groups
    }

    pub fn has_objective(&self) -> bool {
        !self.objective.is_empty()
    }

    /// Objective value of a complete assignment.
    pub fn objective_value(&self, assignment: &Assignment) -> i64 {
        self.objective
            .iter()
            .map(|term| term.weight() * term.raw_value(assignment))
            .sum()
    }

    /// Whether every hard constraint holds. Symmetry constraints are ignored.
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        assignment.len() >= self.num_vars()
            && self
                .constraints
                .iter()
                .filter(|c| c.kind == ConstraintKind::Hard)
                .all(|c| c.is_satisfied_by(assignment))
    }
}

fn ones(vars: impl IntoIterator<Item = BoolVar>) -> Vec<(BoolVar, i64)> {
    vars.into_iter().map(|v| (v, 1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vars_are_sequential() {
        let mut m = Model::new();
        let a = m.new_var();
        let b = m.new_var();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(m.num_vars(), 2);
    }

    #[test]
    fn test_satisfaction_ignores_symmetry() {
        let mut m = Model::new();
        let a = m.new_var();
        let b = m.new_var();
        m.add_exactly_one([a, b]);
        m.add_symmetry_le(&[b], &[a]);

        let only_b = Assignment::new(vec![false, true]);
        assert!(m.is_satisfied_by(&only_b));
        let both = Assignment::new(vec![true, true]);
        assert!(!m.is_satisfied_by(&both));
    }

    #[test]
    fn test_objective_terms() {
        let mut m = Model::new();
        let v: Vec<BoolVar> = (0..6).map(|_| m.new_var()).collect();
        m.minimize(ObjectiveTerm::Sum {
            weight: 2,
            vars: vec![v[0], v[1]],
        });
        m.minimize(ObjectiveTerm::Span {
            weight: 1,
            positions: vec![vec![v[0]], vec![v[2]], vec![v[3]]],
            min_used: 0,
        });
        m.minimize(ObjectiveTerm::Spread {
            weight: 10,
            groups: vec![vec![v[4], v[5]], vec![v[0]]],
            total: None,
        });
        m.minimize(ObjectiveTerm::Sum {
            weight: 0,
            vars: vec![v[5]],
        });
        assert_eq!(m.objective().len(), 3);

        let assignment = Assignment::new(vec![true, false, false, true, true, true]);
        // sum 1*2, span 2-0, spread 2-1
        assert_eq!(m.objective_value(&assignment), 2 + 2 + 10);
    }

    #[test]
    fn test_span_of_nothing_is_zero() {
        let term = ObjectiveTerm::Span {
            weight: 1,
            positions: vec![vec![BoolVar(0)], vec![BoolVar(1)]],
            min_used: 2,
        };
        assert_eq!(term.raw_value(&Assignment::new(vec![false, false])), 0);
    }

    #[test]
    fn test_empty_branch_blocks_dropped() {
        let mut m = Model::new();
        let a = m.new_var();
        m.add_branch_block(BranchBlock::InOrder(Vec::new()));
        m.add_branch_block(BranchBlock::LeastLoaded(vec![a]));
        assert_eq!(m.branch_blocks(), &[BranchBlock::LeastLoaded(vec![a])]);
        assert_eq!(m.add_load_group(vec![a]), 0);
    }
}
