//! Solve orchestration.
//!
//! [`SolveOrchestrator`] runs one solve as a small state machine:
//!
//! ```text
//! NotStarted → Validating ─┬─────────────→ ConfigRejected
//!                          └→ Solving ─┬─→ Optimal
//!                                      ├─→ Feasible
//!                                      ├─→ InfeasibleProven
//!                                      └─→ TimedOutNoSolution
//! ```
//!
//! It is the only place where search results are translated into the
//! user-facing [`SolveOutcome`]; nothing search-specific leaks past it.
//! `run` takes `self` by value, so an orchestrator cannot be reused.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::kpi::ScheduleKpi;
use crate::cp::{AssessmentModelBuilder, BranchAndBound, SolverResult, Tier};
use crate::models::{Config, Schedule, SolverParams};
use crate::precheck::{self, Diagnostic};

/// Lifecycle of one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveState {
    NotStarted,
    Validating,
    Solving,
    Optimal,
    Feasible,
    InfeasibleProven,
    TimedOutNoSolution,
    ConfigRejected,
}

impl SolveState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            SolveState::NotStarted | SolveState::Validating | SolveState::Solving
        )
    }
}

/// Whether a schedule is known to be the best possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Optimality {
    /// No better schedule exists.
    Proven,
    /// Best found before the time limit; a better one may exist.
    BestFound,
}

/// Terminal status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    /// Time ran out; the schedule is the best found so far.
    TimedOutWithSolution,
    InfeasibleProven,
    TimedOutNoSolution,
    ConfigRejected,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::TimedOutWithSolution => "FEASIBLE",
            SolveStatus::InfeasibleProven => "INFEASIBLE",
            SolveStatus::TimedOutNoSolution => "TIMED_OUT",
            SolveStatus::ConfigRejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A schedule was produced.
    Scheduled {
        schedule: Schedule,
        optimality: Optimality,
        objective: i64,
    },
    /// Precheck found blocking problems; no solve was attempted.
    Rejected { diagnostics: Vec<Diagnostic> },
    /// No schedule satisfies the rules.
    Infeasible,
    /// The time limit ran out before any schedule was found.
    TimedOutNoSolution { time_limit: Duration },
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Scheduled {
                optimality: Optimality::Proven,
                ..
            } => SolveStatus::Optimal,
            SolveOutcome::Scheduled {
                optimality: Optimality::BestFound,
                ..
            } => SolveStatus::TimedOutWithSolution,
            SolveOutcome::Rejected { .. } => SolveStatus::ConfigRejected,
            SolveOutcome::Infeasible => SolveStatus::InfeasibleProven,
            SolveOutcome::TimedOutNoSolution { .. } => SolveStatus::TimedOutNoSolution,
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SolveOutcome::Scheduled { schedule, .. } => Some(schedule),
            _ => None,
        }
    }

    /// One-line explanation for presentation layers.
    pub fn message(&self) -> String {
        match self {
            SolveOutcome::Scheduled {
                schedule,
                optimality: Optimality::Proven,
                ..
            } => format!("Scheduled {} assessment(s); no better timetable exists.", schedule.len()),
            SolveOutcome::Scheduled { schedule, .. } => format!(
                "Scheduled {} assessment(s); best found within the time limit.",
                schedule.len()
            ),
            SolveOutcome::Rejected { diagnostics } => format!(
                "Configuration rejected with {} problem(s); see diagnostics.",
                diagnostics.iter().filter(|d| d.is_error()).count()
            ),
            SolveOutcome::Infeasible => {
                "No timetable satisfies the constraints. Relax availability, panel size or capacity."
                    .to_string()
            }
            SolveOutcome::TimedOutNoSolution { time_limit } => format!(
                "No timetable found within {:.1}s. Try a longer time limit.",
                time_limit.as_secs_f64()
            ),
        }
    }
}

/// What to solve and with which budget.
///
/// The schedule is reproducible only when the search completes within
/// `time_limit` (status [`SolveStatus::Optimal`] or
/// [`SolveStatus::InfeasibleProven`]): it is then the same for any
/// `worker_count`. When time runs out, the best schedule found so far
/// depends on thread timing and may differ between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveRequest {
    pub tier: Tier,
    pub time_limit: Duration,
    /// `0` = one worker per available core.
    pub worker_count: usize,
}

impl Default for SolveRequest {
    fn default() -> Self {
        Self::from_params(Tier::default(), &SolverParams::default())
    }
}

impl SolveRequest {
    /// Request for `tier` with default solver parameters.
    pub fn new(tier: Tier) -> Self {
        Self::from_params(tier, &SolverParams::default())
    }

    /// Request for `tier` using a configuration's solver parameters.
    pub fn from_params(tier: Tier, params: &SolverParams) -> Self {
        Self {
            tier,
            time_limit: params.time_limit(),
            worker_count: params.worker_count,
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

/// Counters and metrics of a solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub nodes: u64,
    /// Improving schedules found during search.
    pub solutions: u64,
    pub workers: usize,
    pub wall_time: Duration,
    /// Objective breakdown of the returned schedule.
    pub kpi: Option<ScheduleKpi>,
}

/// Everything a solve produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    /// Precheck diagnostics, in detection order.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: SolveStats,
    /// States visited, `NotStarted` first, terminal state last.
    pub trace: Vec<SolveState>,
}

impl SolveReport {
    pub fn status(&self) -> SolveStatus {
        self.outcome.status()
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.outcome.schedule()
    }

    pub fn final_state(&self) -> SolveState {
        self.trace.last().copied().unwrap_or(SolveState::NotStarted)
    }
}

/// Runs precheck, builds the tier model, searches and translates the result.
///
/// # Example
/// ```
/// use u_assess::models::{Config, Lecturer, Project};
/// use u_assess::scheduler::{SolveOrchestrator, SolveRequest, SolveStatus};
/// use u_assess::cp::Tier;
///
/// let mut config = Config::new()
///     .with_lecturer(Lecturer::new("L1", "Dr One"))
///     .with_project(Project::new("P1").with_supervisor("L1"));
/// config.add_timeslot("TS1", "2026-03-10", "09:00", "09:30");
/// config.constraints.panel_size = 1;
///
/// let report = SolveOrchestrator::new(&config, SolveRequest::new(Tier::Weighted)).run();
/// assert_eq!(report.status(), SolveStatus::Optimal);
/// ```
#[derive(Debug)]
pub struct SolveOrchestrator<'a> {
    config: &'a Config,
    request: SolveRequest,
    trace: Vec<SolveState>,
}

impl<'a> SolveOrchestrator<'a> {
    pub fn new(config: &'a Config, request: SolveRequest) -> Self {
        Self {
            config,
            request,
            trace: vec![SolveState::NotStarted],
        }
    }

    pub fn state(&self) -> SolveState {
        self.trace.last().copied().unwrap_or(SolveState::NotStarted)
    }

    fn advance(&mut self, next: SolveState) {
        debug!(event = "solve_state", from = ?self.state(), to = ?next);
        self.trace.push(next);
    }

    /// Runs to a terminal state.
    pub fn run(mut self) -> SolveReport {
        let config = self.config;
        let request = self.request;
        info!(
            event = "solve_start",
            tier = request.tier.level(),
            projects = config.projects.len(),
            timeslots = config.timeslots.len(),
            lecturers = config.lecturers.len(),
            time_limit_ms = request.time_limit.as_millis() as u64,
            workers = request.worker_count
        );

        self.advance(SolveState::Validating);
        let diagnostics = precheck::precheck(config);
        for d in diagnostics.iter().filter(|d| !d.is_error()) {
            warn!(event = "precheck_warning", kind = ?d.kind, message = %d.message);
        }
        if precheck::has_errors(&diagnostics) {
            self.advance(SolveState::ConfigRejected);
            info!(
                event = "solve_rejected",
                errors = diagnostics.iter().filter(|d| d.is_error()).count()
            );
            return SolveReport {
                outcome: SolveOutcome::Rejected {
                    diagnostics: diagnostics.clone(),
                },
                diagnostics,
                stats: SolveStats::default(),
                trace: self.trace,
            };
        }

        self.advance(SolveState::Solving);
        let built = AssessmentModelBuilder::new(config)
            .with_tier(request.tier)
            .build();
        let searched = BranchAndBound::new(built.model())
            .with_time_limit(request.time_limit)
            .with_workers(request.worker_count)
            .solve();

        let mut stats = SolveStats {
            nodes: searched.statistics.nodes,
            solutions: searched.statistics.solutions,
            workers: searched.statistics.workers,
            wall_time: searched.statistics.elapsed,
            kpi: None,
        };

        let (outcome, terminal) = match &searched.result {
            SolverResult::Optimal(solution) | SolverResult::Feasible(solution) => {
                let (optimality, terminal) = if searched.is_optimal() {
                    (Optimality::Proven, SolveState::Optimal)
                } else {
                    (Optimality::BestFound, SolveState::Feasible)
                };
                let schedule = Schedule::from_assignment(config, &built, &solution.assignment);
                stats.kpi = Some(ScheduleKpi::calculate(&schedule, config));
                (
                    SolveOutcome::Scheduled {
                        schedule,
                        optimality,
                        objective: solution.objective,
                    },
                    terminal,
                )
            }
            SolverResult::Infeasible => (SolveOutcome::Infeasible, SolveState::InfeasibleProven),
            SolverResult::Unknown => (
                SolveOutcome::TimedOutNoSolution {
                    time_limit: request.time_limit,
                },
                SolveState::TimedOutNoSolution,
            ),
        };
        self.advance(terminal);

        info!(
            event = "solve_end",
            status = %outcome.status(),
            entries = outcome.schedule().map_or(0, Schedule::len),
            nodes = stats.nodes,
            wall_ms = stats.wall_time.as_millis() as u64
        );

        SolveReport {
            outcome,
            diagnostics,
            stats,
            trace: self.trace,
        }
    }
}
