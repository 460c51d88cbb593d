//! Structural validation of a configuration.
//!
//! Checks that the entity graph is well formed before anything else looks
//! at it. Detects:
//! - Empty and duplicate IDs (per entity kind)
//! - Duplicate timeslot ordinals
//! - Project references to unknown students or supervisors
//! - A student listed twice on one project
//!
//! Feasibility questions (capacity, availability) belong to
//! [`crate::precheck`], not here.

use crate::models::Config;
use std::collections::{HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An entity has an empty ID.
    EmptyId,
    /// Two entities of the same kind share an ID.
    DuplicateId,
    /// Two timeslots share an ordinal position.
    DuplicateOrdinal,
    /// A project lists a student that doesn't exist.
    UnknownStudent,
    /// A project's supervisor doesn't exist.
    UnknownSupervisor,
    /// A project lists the same student more than once.
    DuplicateStudentInProject,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the structure of a configuration.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_structure(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();

    check_ids(
        "timeslot",
        config.timeslots.iter().map(|s| s.id()),
        &mut errors,
    );
    let lecturer_ids = check_ids(
        "lecturer",
        config.lecturers.iter().map(|l| l.id.as_str()),
        &mut errors,
    );
    let student_ids = check_ids(
        "student",
        config.students.iter().map(|s| s.id.as_str()),
        &mut errors,
    );
    check_ids(
        "project",
        config.projects.iter().map(|p| p.id.as_str()),
        &mut errors,
    );

    let mut ordinals: HashMap<u32, &str> = HashMap::new();
    for slot in &config.timeslots {
        if let Some(first) = ordinals.insert(slot.ordinal(), slot.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateOrdinal,
                format!(
                    "timeslots '{}' and '{}' share ordinal {}",
                    first,
                    slot.id(),
                    slot.ordinal()
                ),
            ));
        }
    }

    for project in &config.projects {
        let mut seen = HashSet::new();
        for sid in &project.student_ids {
            if !seen.insert(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateStudentInProject,
                    format!("project '{}' lists student '{}' twice", project.id, sid),
                ));
            } else if !student_ids.contains(sid.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownStudent,
                    format!("project '{}' references unknown student '{}'", project.id, sid),
                ));
            }
        }

        if let Some(sup) = &project.supervisor_id {
            if !lecturer_ids.contains(sup.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownSupervisor,
                    format!(
                        "project '{}' references unknown supervisor '{}'",
                        project.id, sup
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reports empty and duplicate IDs; returns the set of IDs seen.
fn check_ids<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for (index, id) in ids.enumerate() {
        if id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("{} at index {} has an empty id", entity, index),
            ));
        } else if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate {} id: {}", entity, id),
            ));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lecturer, Project, Student, TimeSlot};

    fn sample_config() -> Config {
        let mut cfg = Config::new()
            .with_lecturer(Lecturer::new("L1", "Dr One"))
            .with_lecturer(Lecturer::new("L2", "Dr Two"))
            .with_student(Student::new("S1", "Ann"))
            .with_student(Student::new("S2", "Bob"))
            .with_project(
                Project::new("P1")
                    .with_student("S1")
                    .with_student("S2")
                    .with_supervisor("L1"),
            );
        cfg.add_timeslot("TS1", "2026-03-10", "09:00", "09:30");
        cfg.add_timeslot("TS2", "2026-03-10", "09:30", "10:00");
        cfg
    }

    fn kinds(result: ValidationResult) -> Vec<ValidationErrorKind> {
        result
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_structure(&sample_config()).is_ok());
        assert!(validate_structure(&Config::new()).is_ok());
    }

    #[test]
    fn test_duplicate_lecturer_id() {
        let cfg = sample_config().with_lecturer(Lecturer::new("L1", "Again"));
        let errors = validate_structure(&cfg).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateId);
        assert!(errors[0].message.contains("lecturer"));
    }

    #[test]
    fn test_empty_id() {
        let cfg = sample_config().with_student(Student::new("  ", "Nobody"));
        assert_eq!(
            kinds(validate_structure(&cfg)),
            vec![ValidationErrorKind::EmptyId]
        );
    }

    #[test]
    fn test_duplicate_ordinal() {
        let cfg = sample_config().with_timeslot(TimeSlot::new("TS3", 1, "2026-03-10", "10:00", "10:30"));
        let errors = validate_structure(&cfg).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateOrdinal);
        assert!(errors[0].message.contains("TS2"));
        assert!(errors[0].message.contains("TS3"));
    }

    #[test]
    fn test_unknown_references() {
        let cfg = sample_config().with_project(
            Project::new("P2")
                .with_student("S9")
                .with_supervisor("L9"),
        );
        assert_eq!(
            kinds(validate_structure(&cfg)),
            vec![
                ValidationErrorKind::UnknownStudent,
                ValidationErrorKind::UnknownSupervisor
            ]
        );
    }

    #[test]
    fn test_duplicate_student_in_project() {
        let cfg = sample_config().with_project(
            Project::new("P2")
                .with_student("S1")
                .with_student("S1"),
        );
        assert_eq!(
            kinds(validate_structure(&cfg)),
            vec![ValidationErrorKind::DuplicateStudentInProject]
        );
    }

    #[test]
    fn test_removal_leaves_dangling_reference() {
        let mut cfg = sample_config();
        cfg.remove_lecturer("L1");
        assert_eq!(
            kinds(validate_structure(&cfg)),
            vec![ValidationErrorKind::UnknownSupervisor]
        );
    }

    #[test]
    fn test_multiple_errors() {
        let cfg = sample_config()
            .with_lecturer(Lecturer::new("L2", "Dup"))
            .with_project(Project::new("P1").with_student("S7"));
        let errors = validate_structure(&cfg).unwrap_err();
        assert_eq!(errors.len(), 3); // dup lecturer, dup project, unknown student
    }
}
