//! Error types.
//!
//! Only conditions that stop the caller from getting an answer are errors.
//! Solver verdicts (infeasible, out of time) are ordinary outcomes, see
//! [`crate::scheduler::SolveOutcome`].

use thiserror::Error;

use crate::precheck::Diagnostic;
use crate::validation::ValidationError;

/// The configuration could not be read or is internally inconsistent.
#[derive(Debug, Error)]
pub enum ConfigStructuralError {
    #[error("malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {}", join_messages(.0))]
    Invalid(Vec<ValidationError>),
}

impl ConfigStructuralError {
    /// Validation errors, if this is a validation failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigStructuralError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Precheck found blocking problems. Carries every diagnostic, warnings
/// included, in detection order.
#[derive(Debug, Clone, Error)]
#[error("{} blocking problem(s): {}", blocking_count(.diagnostics), summary(.diagnostics))]
pub struct PrecheckError {
    pub diagnostics: Vec<Diagnostic>,
}

fn blocking_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}

fn summary(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A session operation was invoked in the wrong lifecycle state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no configuration loaded")]
    NotLoaded,

    #[error(transparent)]
    Load(#[from] ConfigStructuralError),
}

/// Tier selector text was not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier '{0}' (expected 1, 2, 3, slice1, slice2, slice3 or full)")]
pub struct ParseTierError(pub String);
