//! Assessment timetabling domain models.
//!
//! Entities are flat and reference each other by identifier only; nothing
//! embeds another entity. Editing one entity therefore never requires
//! rewriting the others.
//!
//! # Entity Map
//!
//! | Entity | Role | References |
//! |--------|------|------------|
//! | TimeSlot | assessment period, ordered by ordinal | none |
//! | Lecturer | panel member | TimeSlot (unavailability) |
//! | Student | presenter | TimeSlot (unavailability) |
//! | Project | unit being scheduled | Student, Lecturer (supervisor) |
//! | Config | aggregate root + rules | all of the above |
//! | Schedule | solver output | Project, TimeSlot, Lecturer |

mod config;
mod file;
mod lecturer;
mod project;
mod schedule;
mod student;
mod timeslot;

pub use config::{Config, Constraints, IdIndex, SolverParams, Weights};
pub use lecturer::Lecturer;
pub use project::Project;
pub use schedule::{Schedule, ScheduleEntry};
pub use student::Student;
pub use timeslot::TimeSlot;
