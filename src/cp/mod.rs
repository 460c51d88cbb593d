//! Constraint model and search engine.
//!
//! - [`model`]: boolean variables, linear constraints, objective terms
//! - [`builder`]: the three assessment tiers as layers over one model
//! - [`search`]: parallel depth-first branch and bound
//! - [`incumbent`], [`monitor`]: shared best solution and stop conditions
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming", Ch. 3-4

pub mod builder;
pub mod incumbent;
pub mod model;
pub mod monitor;
pub mod result;
pub mod search;
mod state;

pub use builder::{AssessmentModelBuilder, Tier, TierModel};
pub use incumbent::SharedIncumbent;
pub use model::{Assignment, BoolVar, BranchBlock, Comparison, ConstraintKind, LinearConstraint, Model, ObjectiveTerm};
pub use monitor::{SearchCommand, SearchMonitor, TimeLimitMonitor};
pub use result::{SearchStatistics, Solution, SolverOutcome, SolverResult, TerminationReason};
pub use search::BranchAndBound;
