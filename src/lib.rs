//! Assessment timetabling.
//!
//! Places project assessments into (timeslot, room) pairs and assigns each
//! a panel of lecturers, subject to availability, capacity and workload
//! rules, then optimises a weighted soft objective.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `Lecturer`, `Student`,
//!   `Project`, `Config`, `Schedule`
//! - **`validation`**: Structural checks run when a configuration is loaded
//! - **`precheck`**: Fast feasibility diagnostics run before every solve
//! - **`cp`**: Boolean linear model, tier model builder and parallel
//!   branch-and-bound search
//! - **`scheduler`**: Solve orchestration and schedule KPIs
//! - **`session`**: Loaded/unloaded lifecycle of the working configuration
//! - **`error`**: Error types
//!
//! # Example
//!
//! ```
//! use u_assess::models::{Config, Lecturer, Project};
//! use u_assess::scheduler::{SolveOrchestrator, SolveRequest, Tier};
//!
//! let mut config = Config::new()
//!     .with_lecturer(Lecturer::new("L1", "Dr One"))
//!     .with_lecturer(Lecturer::new("L2", "Dr Two"))
//!     .with_project(Project::new("P1").with_supervisor("L1"))
//!     .with_project(Project::new("P2").with_supervisor("L2"));
//! config.add_timeslot("TS1", "2026-03-10", "09:00", "09:30");
//! config.add_timeslot("TS2", "2026-03-10", "09:30", "10:00");
//!
//! let report = SolveOrchestrator::new(&config, SolveRequest::new(Tier::Weighted)).run();
//! let schedule = report.schedule().expect("feasible");
//! assert_eq!(schedule.len(), 2);
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Achterberg (2007), "Constraint Integer Programming", Ch. 7 (domain propagation)

pub mod cp;
pub mod error;
pub mod models;
pub mod precheck;
pub mod scheduler;
pub mod session;
pub mod validation;
