//! Search results.

use std::time::Duration;

use super::model::Assignment;

/// A complete assignment and its objective value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub objective: i64,
    pub assignment: Assignment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResult {
    /// Exhaustive search found no assignment.
    Infeasible,
    /// Best possible objective, proven by exhausting the search.
    Optimal(Solution),
    /// A solution was found but the search was cut short.
    Feasible(Solution),
    /// The search was cut short before any solution was found.
    Unknown,
}

impl std::fmt::Display for SolverResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverResult::Infeasible => write!(f, "Infeasible"),
            SolverResult::Optimal(s) => write!(f, "Optimal(objective={})", s.objective),
            SolverResult::Feasible(s) => write!(f, "Feasible(objective={})", s.objective),
            SolverResult::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    OptimalityProven,
    InfeasibilityProven,
    /// A monitor stopped the search; the string says which limit.
    Aborted(String),
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::OptimalityProven => write!(f, "Optimality Proven"),
            TerminationReason::InfeasibilityProven => write!(f, "Infeasibility Proven"),
            TerminationReason::Aborted(reason) => write!(f, "Aborted: {}", reason),
        }
    }
}

/// Counters collected over all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    pub nodes: u64,
    /// Improving solutions installed.
    pub solutions: u64,
    pub workers: usize,
    pub regions: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOutcome {
    pub result: SolverResult,
    pub reason: TerminationReason,
    pub statistics: SearchStatistics,
}

impl SolverOutcome {
    pub fn new(result: SolverResult, reason: TerminationReason, statistics: SearchStatistics) -> Self {
        Self {
            result,
            reason,
            statistics,
        }
    }

    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self.result, SolverResult::Optimal(_))
    }

    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self.result, SolverResult::Infeasible)
    }

    pub fn solution(&self) -> Option<&Solution> {
        match &self.result {
            SolverResult::Optimal(s) | SolverResult::Feasible(s) => Some(s),
            SolverResult::Infeasible | SolverResult::Unknown => None,
        }
    }
}
