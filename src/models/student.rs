//! Student model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A student presenting a project.
///
/// Students are leaf entities referenced from `Project::student_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Student {
    /// Unique student identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Timeslot IDs at which the student cannot present.
    #[serde(default)]
    pub unavailable_slot_ids: BTreeSet<String>,
}

impl Student {
    /// Creates a student with no unavailability.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unavailable_slot_ids: BTreeSet::new(),
        }
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot_id: impl Into<String>) -> Self {
        self.unavailable_slot_ids.insert(slot_id.into());
        self
    }
}
