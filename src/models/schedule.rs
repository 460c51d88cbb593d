//! Schedule (solution) model.
//!
//! A schedule lists, per project, the timeslot, room and panel chosen by
//! the solver. Entries are kept in chronological order: by timeslot
//! *ordinal*, then room. Slot identifiers are never compared, so `"TS10"`
//! correctly follows `"TS9"` when its ordinal says so, and precedes it when
//! its ordinal is smaller.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::cp::{Assignment, TierModel};

/// A complete timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

/// One scheduled assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub project_id: String,
    pub timeslot_id: String,
    /// Ordinal of the timeslot (sort key).
    pub ordinal: u32,
    /// Day of the timeslot.
    pub day: String,
    /// Room index in `0..room_count`.
    pub room: u32,
    /// Panel members in configuration order. Empty for slot/room-only solves.
    pub panel_lecturer_ids: Vec<String>,
}

impl ScheduleEntry {
    /// Creates an entry with an empty panel.
    pub fn new(
        project_id: impl Into<String>,
        timeslot_id: impl Into<String>,
        ordinal: u32,
        room: u32,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            timeslot_id: timeslot_id.into(),
            ordinal,
            day: String::new(),
            room,
            panel_lecturer_ids: Vec::new(),
        }
    }

    pub fn with_day(mut self, day: impl Into<String>) -> Self {
        self.day = day.into();
        self
    }

    pub fn with_panel(mut self, lecturer_ids: Vec<String>) -> Self {
        self.panel_lecturer_ids = lecturer_ids;
        self
    }

    /// Whether the lecturer sits on this panel.
    pub fn has_panelist(&self, lecturer_id: &str) -> bool {
        self.panel_lecturer_ids.iter().any(|id| id == lecturer_id)
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from entries in any order.
    pub fn from_entries(mut entries: Vec<ScheduleEntry>) -> Self {
        entries.sort_by_key(|e| (e.ordinal, e.room));
        Self { entries }
    }

    /// Reads the placements and panels out of a solver assignment.
    ///
    /// Projects the assignment leaves unplaced are omitted.
    pub fn from_assignment(config: &Config, model: &TierModel, assignment: &Assignment) -> Self {
        let entries = config
            .projects
            .iter()
            .enumerate()
            .filter_map(|(p, project)| {
                let (position, room) = model.placement(p, assignment)?;
                let slot = &config.timeslots[model.slot_at(position)?];
                let panel = model
                    .panel(p, assignment)
                    .into_iter()
                    .map(|l| config.lecturers[l].id.clone())
                    .collect();
                Some(
                    ScheduleEntry::new(&project.id, slot.id(), slot.ordinal(), room as u32)
                        .with_day(slot.day())
                        .with_panel(panel),
                )
            })
            .collect();
        Self::from_entries(entries)
    }

    /// Iterates entries in chronological order. Restartable.
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry for a given project.
    pub fn entry_for_project(&self, project_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.project_id == project_id)
    }

    /// Returns all entries a lecturer sits on.
    pub fn entries_for_lecturer(&self, lecturer_id: &str) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.has_panelist(lecturer_id))
            .collect()
    }

    /// Returns all entries held in a given timeslot.
    pub fn entries_in_slot(&self, timeslot_id: &str) -> Vec<&ScheduleEntry> {
        self.entries
            .iter()
            .filter(|e| e.timeslot_id == timeslot_id)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduleEntry;
    type IntoIter = std::slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
