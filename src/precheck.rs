//! Feasibility precheck.
//!
//! Cheap structural analysis run before any solve. A generic "no solution"
//! verdict cannot say *why* a timetable is impossible; these checks can, and
//! they name the offending entities. Every check is a single pass over the
//! configuration: staffing is counted from the unavailability lists, so the
//! cost grows with their total length rather than lecturers × slots. No
//! search is performed.
//!
//! Diagnostics come out in detection order, errors and warnings
//! interleaved. Any `Error` blocks solving.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PrecheckError;
use crate::models::Config;

/// Blocking or informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// `room_count` is zero.
    InvalidRoomCount,
    /// `panel_size` is zero.
    InvalidPanelSize,
    /// A project overrides its panel size with zero.
    InvalidProjectPanelSize,
    /// Fewer (slot, room) places than projects.
    InsufficientCapacity,
    /// No timeslots at all.
    NoTimeslots,
    /// A project's panel cannot be staffed at any slot.
    PanelTooLarge,
    /// Supervisor attendance is required but the project has no supervisor.
    MissingSupervisor,
    /// Supervisor attendance is required but the supervisor is never available.
    SupervisorUnavailable,
    /// A project references a student or lecturer that doesn't exist.
    UnknownEntityReference,
    /// An unavailability list names a timeslot that doesn't exist.
    UnknownSlotReference,
    /// A lecturer is unavailable at every slot.
    LecturerNeverAvailable,
    /// `lunch_slot_ids` names a timeslot that doesn't exist.
    UnknownLunchSlot,
}

/// One precheck finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Human-readable cause.
    pub message: String,
    /// Offending entities, if any.
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        entity_ids: Vec<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            entity_ids,
        }
    }

    fn error(kind: DiagnosticKind, message: impl Into<String>, entity_ids: Vec<String>) -> Self {
        Self::new(Severity::Error, kind, message, entity_ids)
    }

    fn warning(kind: DiagnosticKind, message: impl Into<String>, entity_ids: Vec<String>) -> Self {
        Self::new(Severity::Warning, kind, message, entity_ids)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", tag, self.message)
    }
}

/// Whether any diagnostic blocks solving.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Runs [`precheck`] and fails if anything blocks solving.
///
/// # Returns
/// The (warning-only) diagnostics on success.
pub fn ensure_ok(config: &Config) -> Result<Vec<Diagnostic>, PrecheckError> {
    let diagnostics = precheck(config);
    if has_errors(&diagnostics) {
        Err(PrecheckError { diagnostics })
    } else {
        Ok(diagnostics)
    }
}

/// Analyses a configuration without solving it.
pub fn precheck(config: &Config) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let c = &config.constraints;
    let slots = &config.timeslots;
    let index = config.index();

    if c.room_count == 0 {
        out.push(Diagnostic::error(
            DiagnosticKind::InvalidRoomCount,
            "room_count must be at least 1.",
            vec![],
        ));
    }
    if c.panel_size == 0 {
        out.push(Diagnostic::error(
            DiagnosticKind::InvalidPanelSize,
            "panel_size must be at least 1.",
            vec![],
        ));
    }

    if slots.is_empty() && config.projects.is_empty() {
        out.push(Diagnostic::warning(
            DiagnosticKind::NoTimeslots,
            "No timeslots are defined.",
            vec![],
        ));
    }

    let capacity = config.capacity();
    if capacity < config.projects.len() {
        out.push(Diagnostic::error(
            DiagnosticKind::InsufficientCapacity,
            format!(
                "Not enough capacity: {} room(s) x {} slot(s) = {}, but {} project(s) need scheduling.",
                c.room_count,
                slots.len(),
                capacity,
                config.projects.len()
            ),
            vec![],
        ));
    }

    // Per slot id: lecturers away. Per lecturer: away at every slot.
    let mut away: HashMap<&str, usize> = HashMap::new();
    let never_available: Vec<bool> = config
        .lecturers
        .iter()
        .map(|lecturer| {
            let mut blocked = 0;
            for id in &lecturer.unavailable_slot_ids {
                if index.slots.contains_key(id) {
                    *away.entry(id.as_str()).or_default() += 1;
                    blocked += 1;
                }
            }
            !index.slots.is_empty() && blocked == index.slots.len()
        })
        .collect();
    let best_slot_staffing = slots
        .iter()
        .map(|slot| config.lecturers.len() - away.get(slot.id()).copied().unwrap_or(0))
        .max();

    for project in &config.projects {
        let size = config.panel_size_for(project);
        if project.required_panel_size == Some(0) {
            out.push(Diagnostic::error(
                DiagnosticKind::InvalidProjectPanelSize,
                format!("Project '{}' requires a panel of size 0.", project.id),
                vec![project.id.clone()],
            ));
        } else if size as usize > config.lecturers.len() {
            out.push(Diagnostic::error(
                DiagnosticKind::PanelTooLarge,
                format!(
                    "Project '{}' needs a panel of {} but only {} lecturer(s) exist.",
                    project.id,
                    size,
                    config.lecturers.len()
                ),
                vec![project.id.clone()],
            ));
        } else if let Some(best) = best_slot_staffing.filter(|best| (size as usize) > *best) {
            out.push(Diagnostic::error(
                DiagnosticKind::PanelTooLarge,
                format!(
                    "Project '{}' needs a panel of {} but no slot has more than {} lecturer(s) available.",
                    project.id, size, best
                ),
                vec![project.id.clone()],
            ));
        }

        if c.supervisor_must_attend {
            match project.supervisor_id.as_deref() {
                None => out.push(Diagnostic::error(
                    DiagnosticKind::MissingSupervisor,
                    format!(
                        "Project '{}' has no supervisor but supervisors must attend.",
                        project.id
                    ),
                    vec![project.id.clone()],
                )),
                Some(sup_id) => {
                    if let Some(&l) = index.lecturers.get(sup_id).filter(|&&l| never_available[l]) {
                        let sup = &config.lecturers[l];
                        out.push(Diagnostic::error(
                            DiagnosticKind::SupervisorUnavailable,
                            format!(
                                "Project '{}' supervisor '{}' is unavailable at every slot.",
                                project.id, sup.id
                            ),
                            vec![project.id.clone(), sup.id.clone()],
                        ));
                    }
                }
            }
        }

        if let Some(sup_id) = project.supervisor_id.as_deref() {
            if !index.lecturers.contains_key(sup_id) {
                out.push(Diagnostic::error(
                    DiagnosticKind::UnknownEntityReference,
                    format!(
                        "Project '{}' references unknown supervisor '{}'.",
                        project.id, sup_id
                    ),
                    vec![project.id.clone(), sup_id.to_string()],
                ));
            }
        }
        for sid in &project.student_ids {
            if !index.students.contains_key(sid) {
                out.push(Diagnostic::error(
                    DiagnosticKind::UnknownEntityReference,
                    format!("Project '{}' references unknown student '{}'.", project.id, sid),
                    vec![project.id.clone(), sid.clone()],
                ));
            }
        }
    }

    for (lecturer, never) in config.lecturers.iter().zip(&never_available) {
        let bad = unknown_slots(&lecturer.unavailable_slot_ids, &index.slots);
        if !bad.is_empty() {
            out.push(Diagnostic::error(
                DiagnosticKind::UnknownSlotReference,
                format!(
                    "Lecturer '{}' lists unknown slot id(s): {}",
                    lecturer.id,
                    bad.join(", ")
                ),
                vec![lecturer.id.clone()],
            ));
        }
        if *never {
            out.push(Diagnostic::warning(
                DiagnosticKind::LecturerNeverAvailable,
                format!(
                    "Lecturer '{}' is unavailable at every slot and cannot sit on any panel.",
                    lecturer.id
                ),
                vec![lecturer.id.clone()],
            ));
        }
    }

    for student in &config.students {
        let bad = unknown_slots(&student.unavailable_slot_ids, &index.slots);
        if !bad.is_empty() {
            out.push(Diagnostic::error(
                DiagnosticKind::UnknownSlotReference,
                format!(
                    "Student '{}' lists unknown slot id(s): {}",
                    student.id,
                    bad.join(", ")
                ),
                vec![student.id.clone()],
            ));
        }
    }

    let bad_lunch = unknown_slots(&c.lunch_slot_ids, &index.slots);
    if !bad_lunch.is_empty() {
        out.push(Diagnostic::error(
            DiagnosticKind::UnknownLunchSlot,
            format!(
                "lunch_slot_ids contains unknown slot id(s): {}",
                bad_lunch.join(", ")
            ),
            bad_lunch.iter().map(|s| s.to_string()).collect(),
        ));
    }

    out
}

fn unknown_slots<'a>(
    ids: impl IntoIterator<Item = &'a String>,
    known: &HashMap<String, usize>,
) -> Vec<&'a str> {
    ids.into_iter()
        .map(String::as_str)
        .filter(|id| !known.contains_key(*id))
        .collect()
}
