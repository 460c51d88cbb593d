//! Solve orchestration and schedule metrics.
//!
//! [`SolveOrchestrator`] drives one solve from configuration to
//! [`SolveReport`]: precheck, model construction for the requested
//! [`Tier`], branch-and-bound search and translation of the result.
//! [`ScheduleKpi`] recomputes the soft-objective terms of a finished
//! schedule.
//!
//! # Tiers
//!
//! | Tier | Adds |
//! |------|------|
//! | 1 | one (slot, room) per project, room capacity, student availability |
//! | 2 | panels: size, supervisor, lecturer availability, no double booking, caps |
//! | 3 | weighted objective: span, workload imbalance, lunch use |
//!
//! Every tier keeps the rules of the tiers below it.

mod kpi;
mod orchestrator;

pub use crate::cp::Tier;
pub use kpi::ScheduleKpi;
pub use orchestrator::{
    Optimality, SolveOrchestrator, SolveOutcome, SolveReport, SolveRequest, SolveState,
    SolveStats, SolveStatus,
};
