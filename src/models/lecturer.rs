//! Lecturer (assessor) model.
//!
//! Lecturers sit on assessment panels. Availability is expressed
//! negatively: `unavailable_slot_ids` lists the slots at which the lecturer
//! cannot assess; every other slot is available.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A lecturer who can assess projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Lecturer {
    /// Unique lecturer identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Timeslot IDs at which this lecturer cannot assess.
    #[serde(default)]
    pub unavailable_slot_ids: BTreeSet<String>,
    /// Maximum panel appearances per day. `None` = uncapped.
    #[serde(default)]
    pub max_per_day: Option<u32>,
    /// Maximum panel appearances over the whole timetable. `None` = uncapped.
    #[serde(default)]
    pub max_total: Option<u32>,
}

impl Lecturer {
    /// Creates a fully available lecturer.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unavailable_slot_ids: BTreeSet::new(),
            max_per_day: None,
            max_total: None,
        }
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot_id: impl Into<String>) -> Self {
        self.unavailable_slot_ids.insert(slot_id.into());
        self
    }

    /// Sets the per-day cap.
    pub fn with_max_per_day(mut self, max: u32) -> Self {
        self.max_per_day = Some(max);
        self
    }

    /// Sets the overall cap.
    pub fn with_max_total(mut self, max: u32) -> Self {
        self.max_total = Some(max);
        self
    }

    /// Whether the lecturer can assess at the given slot.
    #[inline]
    pub fn is_available_at(&self, slot_id: &str) -> bool {
        !self.unavailable_slot_ids.contains(slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lecturer_builder() {
        let l = Lecturer::new("L1", "Dr One")
            .with_unavailable("TS2")
            .with_max_per_day(3)
            .with_max_total(5);

        assert_eq!(l.id, "L1");
        assert_eq!(l.max_per_day, Some(3));
        assert_eq!(l.max_total, Some(5));
        assert!(l.is_available_at("TS1"));
        assert!(!l.is_available_at("TS2"));
    }

    #[test]
    fn test_lecturer_default_fully_available() {
        let l = Lecturer::new("L1", "Dr One");
        assert!(l.unavailable_slot_ids.is_empty());
        assert!(l.is_available_at("anything"));
    }
}
