//! Parallel depth-first branch and bound.
//!
//! The tree below the root is cut into *regions*: the decision prefixes
//! reached after a fixed number of branchings, listed in depth-first order
//! (value `true` before `false`). Workers pull region indices from a shared
//! cursor and explore each region to completion, pruning against a shared
//! incumbent ranked by `(objective, region)`.
//!
//! Because regions partition the sequential search tree in order, a search
//! that runs to completion returns the first optimal solution of the
//! sequential order, independent of the number of workers and of thread
//! timing. A search stopped by its time limit returns whatever is best at
//! that point.
//!
//! # Reference
//! Land & Doig (1960), "An Automatic Method of Solving Discrete Programming Problems"

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::incumbent::SharedIncumbent;
use super::model::{BoolVar, Model};
use super::monitor::{CompositeMonitor, InterruptMonitor, SearchCommand, SearchMonitor, TimeLimitMonitor};
use super::result::{SearchStatistics, Solution, SolverOutcome, SolverResult, TerminationReason};
use super::state::{CompiledModel, SearchState};

/// Deepest split used to create regions (at most `2^8` regions).
const MAX_REGION_DEPTH: usize = 8;

type Prefix = Vec<(BoolVar, bool)>;

/// Branch-and-bound solver for a [`Model`].
///
/// # Example
///
/// ```
/// use u_assess::cp::{BranchAndBound, Model};
/// use std::time::Duration;
///
/// let mut model = Model::new();
/// let a = model.new_var();
/// let b = model.new_var();
/// model.add_exactly_one([a, b]);
///
/// let outcome = BranchAndBound::new(&model)
///     .with_time_limit(Duration::from_secs(1))
///     .with_workers(2)
///     .solve();
/// assert!(outcome.is_optimal());
/// ```
#[derive(Debug, Clone)]
pub struct BranchAndBound<'m> {
    model: &'m Model,
    time_limit: Duration,
    workers: usize,
}

impl<'m> BranchAndBound<'m> {
    /// Creates a solver with a 10 second limit and one worker per core.
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            time_limit: Duration::from_secs(10),
            workers: 0,
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the worker count. `0` = available parallelism.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn solve(&self) -> SolverOutcome {
        let start = Instant::now();
        let compiled = CompiledModel::new(self.model);
        let requested = resolve_workers(self.workers);

        let root = match SearchState::root(&compiled) {
            Ok(root) => root,
            Err(_) => {
                debug!(event = "root_conflict", vars = self.model.num_vars());
                return infeasible(requested, 0, start);
            }
        };

        let regions = split_regions(&root, region_depth(requested));
        if regions.is_empty() {
            return infeasible(requested, 0, start);
        }
        let workers = requested.min(regions.len());
        debug!(
            event = "search_start",
            vars = self.model.num_vars(),
            constraints = self.model.constraints().len(),
            regions = regions.len(),
            workers
        );

        let shared = Shared {
            incumbent: SharedIncumbent::new(),
            cursor: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            solutions: AtomicU64::new(0),
            abort: Mutex::new(None),
        };

        thread::scope(|scope| {
            for worker in 0..workers {
                let shared = &shared;
                let regions = &regions;
                let root = &root;
                let time_limit = self.time_limit;
                scope.spawn(move || {
                    let monitor = CompositeMonitor::new()
                        .with(TimeLimitMonitor::new(start, time_limit))
                        .with(InterruptMonitor::new(&shared.stop));
                    Worker::new(worker, root.clone(), monitor, shared).run(regions);
                });
            }
        });

        let statistics = SearchStatistics {
            nodes: shared.nodes.load(Ordering::Relaxed),
            solutions: shared.solutions.load(Ordering::Relaxed),
            workers,
            regions: regions.len(),
            elapsed: start.elapsed(),
        };
        let abort = shared.abort.into_inner().unwrap_or_else(PoisonError::into_inner);
        let best = shared.incumbent.into_inner().map(|inc| Solution {
            objective: inc.objective,
            assignment: inc.assignment,
        });

        let (result, reason) = match (best, abort) {
            (Some(solution), None) => (SolverResult::Optimal(solution), TerminationReason::OptimalityProven),
            (Some(solution), Some(why)) => (SolverResult::Feasible(solution), TerminationReason::Aborted(why)),
            (None, None) => (SolverResult::Infeasible, TerminationReason::InfeasibilityProven),
            (None, Some(why)) => (SolverResult::Unknown, TerminationReason::Aborted(why)),
        };
        debug!(
            event = "search_end",
            result = %result,
            nodes = statistics.nodes,
            elapsed_ms = statistics.elapsed.as_millis() as u64
        );
        SolverOutcome::new(result, reason, statistics)
    }
}

fn infeasible(workers: usize, regions: usize, start: Instant) -> SolverOutcome {
    SolverOutcome::new(
        SolverResult::Infeasible,
        TerminationReason::InfeasibilityProven,
        SearchStatistics {
            nodes: 0,
            solutions: 0,
            workers,
            regions,
            elapsed: start.elapsed(),
        },
    )
}

fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }
}

/// Split depth giving roughly four regions per worker.
fn region_depth(workers: usize) -> usize {
    if workers <= 1 {
        return 0;
    }
    let target = workers.saturating_mul(4);
    let depth = (usize::BITS - (target - 1).leading_zeros()) as usize;
    depth.min(MAX_REGION_DEPTH)
}

/// Enumerates the live decision prefixes of length `depth` in depth-first
/// order. Branches that complete or fail earlier end early or vanish.
fn split_regions(root: &SearchState<'_, '_>, depth: usize) -> Vec<Prefix> {
    let mut state = root.clone();
    let mut prefix = Vec::new();
    let mut regions = Vec::new();
    expand(&mut state, &mut prefix, depth, &mut regions);
    regions
}

fn expand(state: &mut SearchState<'_, '_>, prefix: &mut Prefix, depth: usize, out: &mut Vec<Prefix>) {
    let var = match state.next_branch_var() {
        Some(var) if depth > 0 => var,
        _ => {
            out.push(prefix.clone());
            return;
        }
    };
    for value in [true, false] {
        let mark = state.trail_len();
        if state.decide(var, value).is_ok() {
            prefix.push((var, value));
            expand(state, prefix, depth - 1, out);
            prefix.pop();
        }
        state.backtrack(mark);
    }
}

struct Shared {
    incumbent: SharedIncumbent,
    cursor: AtomicUsize,
    stop: AtomicBool,
    nodes: AtomicU64,
    solutions: AtomicU64,
    abort: Mutex<Option<String>>,
}

struct Frame {
    var: BoolVar,
    mark: usize,
    flipped: bool,
}

struct Worker<'s, 'c, 'm, M> {
    id: usize,
    state: SearchState<'c, 'm>,
    monitor: M,
    shared: &'s Shared,
    nodes: u64,
}

impl<'s, 'c, 'm, M: SearchMonitor> Worker<'s, 'c, 'm, M> {
    fn new(id: usize, state: SearchState<'c, 'm>, monitor: M, shared: &'s Shared) -> Self {
        Self {
            id,
            state,
            monitor,
            shared,
            nodes: 0,
        }
    }

    fn run(mut self, regions: &[Prefix]) {
        let base = self.state.trail_len();
        let mut explored = 0usize;
        loop {
            let region = self.shared.cursor.fetch_add(1, Ordering::Relaxed);
            let Some(prefix) = regions.get(region) else { break };
            if let Err(reason) = self.explore(region, prefix) {
                self.shared.stop.store(true, Ordering::Relaxed);
                let mut abort = self.shared.abort.lock().unwrap_or_else(PoisonError::into_inner);
                abort.get_or_insert(reason);
                break;
            }
            explored += 1;
            self.state.backtrack(base);
        }
        self.shared.nodes.fetch_add(self.nodes, Ordering::Relaxed);
        debug!(event = "worker_done", worker = self.id, regions = explored, nodes = self.nodes);
    }

    /// Explores one region. `Err` carries the monitor's stop reason.
    fn explore(&mut self, region: usize, prefix: &[(BoolVar, bool)]) -> Result<(), String> {
        for &(var, value) in prefix {
            if self.state.decide(var, value).is_err() {
                return Ok(());
            }
        }

        let mut stack: Vec<Frame> = Vec::new();
        loop {
            if let SearchCommand::Terminate(reason) = self.monitor.on_node(self.nodes) {
                return Err(reason);
            }
            self.nodes += 1;

            if self.expand_node(region, &mut stack) {
                continue;
            }
            if !self.next_sibling(&mut stack) {
                return Ok(());
            }
        }
    }

    /// Handles the current node. Returns `true` when a child was entered.
    fn expand_node(&mut self, region: usize, stack: &mut Vec<Frame>) -> bool {
        let lower_bound = self.state.objective_lower_bound();
        if self.shared.incumbent.dominates(lower_bound, region) {
            return false;
        }
        if self.state.is_complete() {
            let assignment = self.state.to_assignment();
            if self.shared.incumbent.try_install(lower_bound, region, &assignment) {
                self.shared.solutions.fetch_add(1, Ordering::Relaxed);
                trace!(event = "incumbent", worker = self.id, region, objective = lower_bound);
            }
            return false;
        }
        let Some(var) = self.state.next_branch_var() else {
            return false;
        };
        stack.push(Frame {
            var,
            mark: self.state.trail_len(),
            flipped: false,
        });
        self.state.decide(var, true).is_ok()
    }

    /// Backtracks to the next untried `false` branch. Returns `false` once
    /// the region is exhausted.
    fn next_sibling(&mut self, stack: &mut Vec<Frame>) -> bool {
        while let Some(frame) = stack.last_mut() {
            self.state.backtrack(frame.mark);
            if frame.flipped {
                stack.pop();
                continue;
            }
            frame.flipped = true;
            let var = frame.var;
            if self.state.decide(var, false).is_ok() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::ObjectiveTerm;

    /// Three items into three positions, each position at most once.
    fn permutation_model() -> (Model, Vec<Vec<BoolVar>>) {
        let mut m = Model::new();
        let x: Vec<Vec<BoolVar>> = (0..3)
            .map(|_| (0..3).map(|_| m.new_var()).collect())
            .collect();
        for row in &x {
            m.add_exactly_one(row.iter().copied());
        }
        for pos in 0..3 {
            m.add_at_most_one(x.iter().map(|row| row[pos]));
        }
        (m, x)
    }

    #[test]
    fn test_region_depth() {
        assert_eq!(region_depth(1), 0);
        assert_eq!(region_depth(2), 3);
        assert_eq!(region_depth(4), 4);
        assert_eq!(region_depth(1000), MAX_REGION_DEPTH);
    }

    #[test]
    fn test_regions_partition_in_order() {
        let (m, _) = permutation_model();
        let compiled = CompiledModel::new(&m);
        let root = SearchState::root(&compiled).unwrap();
        let regions = split_regions(&root, 2);
        assert!(!regions.is_empty());
        // First region follows the all-true path.
        assert!(regions[0].iter().all(|(_, v)| *v));
        let whole = split_regions(&root, 0);
        assert_eq!(whole, vec![Vec::new()]);
    }

    #[test]
    fn test_feasibility_model_is_solved() {
        let (m, x) = permutation_model();
        let outcome = BranchAndBound::new(&m).with_workers(1).solve();
        assert!(outcome.is_optimal());
        let solution = outcome.solution().unwrap();
        assert!(m.is_satisfied_by(&solution.assignment));
        // True-first order puts item 0 in position 0.
        assert!(solution.assignment.value(x[0][0]));
    }

    #[test]
    fn test_minimizes_objective() {
        let (mut m, x) = permutation_model();
        // Penalise the diagonal; optimum avoids it entirely.
        m.minimize(ObjectiveTerm::Sum {
            weight: 5,
            vars: vec![x[0][0], x[1][1], x[2][2]],
        });
        let outcome = BranchAndBound::new(&m).with_workers(3).solve();
        assert!(outcome.is_optimal());
        assert_eq!(outcome.solution().unwrap().objective, 0);
    }

    #[test]
    fn test_infeasible_proven() {
        let mut m = Model::new();
        let a = m.new_var();
        let b = m.new_var();
        m.add_exactly_one([a, b]);
        m.add_ge(vec![(a, 1), (b, 1)], 2);
        let outcome = BranchAndBound::new(&m).with_workers(2).solve();
        assert!(outcome.is_infeasible());
        assert_eq!(outcome.reason, TerminationReason::InfeasibilityProven);
    }

    #[test]
    fn test_zero_time_limit_is_unknown() {
        let (m, _) = permutation_model();
        let outcome = BranchAndBound::new(&m)
            .with_time_limit(Duration::ZERO)
            .with_workers(2)
            .solve();
        assert_eq!(outcome.result, SolverResult::Unknown);
        assert!(matches!(outcome.reason, TerminationReason::Aborted(_)));
    }

    #[test]
    fn test_same_result_for_any_worker_count() {
        let (mut m, x) = permutation_model();
        m.minimize(ObjectiveTerm::Spread {
            weight: 1,
            groups: vec![vec![x[0][0], x[1][0]], vec![x[2][2]]],
            total: None,
        });
        let single = BranchAndBound::new(&m).with_workers(1).solve();
        for workers in [2, 3, 8] {
            let parallel = BranchAndBound::new(&m).with_workers(workers).solve();
            assert_eq!(parallel.result, single.result, "workers = {workers}");
        }
    }

    #[test]
    fn test_empty_model_is_optimal() {
        let m = Model::new();
        let outcome = BranchAndBound::new(&m).with_workers(4).solve();
        assert!(outcome.is_optimal());
        assert_eq!(outcome.statistics.regions, 1);
        assert!(outcome.solution().unwrap().assignment.is_empty());
    }
}
