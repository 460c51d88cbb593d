//! On-disk configuration records.
//!
//! [`Config`] deserializes through [`ConfigFile`], which accepts both the
//! native field names and the older file layout:
//!
//! | Older key | Native key |
//! |-----------|------------|
//! | `timeslots[].date` | `timeslots[].day` |
//! | no `ordinal` | ordinal assigned in file order |
//! | `lecturers[].available_slot_ids` | `lecturers[].unavailable_slot_ids` (complement) |
//! | `projects[].supervisor_lecturer_id` (`""` = none) | `projects[].supervisor_id` |
//!
//! Unknown keys are rejected rather than ignored, so a misspelt field can
//! never silently change the meaning of a file.

use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{Config, Constraints, Lecturer, Project, Student, TimeSlot};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ConfigFile {
    #[serde(default, deserialize_with = "null_as_default")]
    meta: BTreeMap<String, serde_json::Value>,
    timeslots: Vec<TimeSlotRecord>,
    lecturers: Vec<LecturerRecord>,
    students: Vec<Student>,
    projects: Vec<Project>,
    #[serde(default)]
    constraints: Constraints,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeSlotRecord {
    id: String,
    #[serde(default)]
    ordinal: Option<u32>,
    #[serde(alias = "date")]
    day: String,
    start: String,
    end: String,
    #[serde(default)]
    is_lunch: bool,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LecturerRecord {
    id: String,
    name: String,
    #[serde(default)]
    unavailable_slot_ids: Option<BTreeSet<String>>,
    /// Positive form: the lecturer can assess only at these slots.
    #[serde(default)]
    available_slot_ids: Option<BTreeSet<String>>,
    #[serde(default)]
    max_per_day: Option<u32>,
    #[serde(default)]
    max_total: Option<u32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TryFrom<ConfigFile> for Config {
    type Error = String;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        // Explicit ordinals stay; the rest follow the largest one in file order.
        let mut next = file
            .timeslots
            .iter()
            .filter_map(|s| s.ordinal)
            .map(|o| o.saturating_add(1))
            .max()
            .unwrap_or(0);
        let timeslots: Vec<TimeSlot> = file
            .timeslots
            .into_iter()
            .map(|s| {
                let ordinal = s.ordinal.unwrap_or_else(|| {
                    let ordinal = next;
                    next = next.saturating_add(1);
                    ordinal
                });
                TimeSlot::new(s.id, ordinal, s.day, s.start, s.end)
                    .with_lunch(s.is_lunch)
                    .with_label(s.label)
            })
            .collect();

        let slot_ids: HashSet<&str> = timeslots.iter().map(|s| s.id()).collect();
        let lecturers = file
            .lecturers
            .into_iter()
            .map(|l| {
                let unavailable_slot_ids = match (l.unavailable_slot_ids, l.available_slot_ids) {
                    (Some(_), Some(_)) => {
                        return Err(format!(
                            "lecturer '{}' sets both available_slot_ids and unavailable_slot_ids",
                            l.id
                        ))
                    }
                    (Some(unavailable), None) => unavailable,
                    (None, Some(available)) => {
                        if let Some(unknown) = available.iter().find(|id| !slot_ids.contains(id.as_str())) {
                            return Err(format!(
                                "lecturer '{}' is available at unknown slot '{}'",
                                l.id, unknown
                            ));
                        }
                        slot_ids
                            .iter()
                            .filter(|id| !available.contains(**id))
                            .map(|id| id.to_string())
                            .collect()
                    }
                    (None, None) => BTreeSet::new(),
                };
                Ok(Lecturer {
                    id: l.id,
                    name: l.name,
                    unavailable_slot_ids,
                    max_per_day: l.max_per_day,
                    max_total: l.max_total,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Config {
            meta: file.meta,
            timeslots,
            lecturers,
            students: file.students,
            projects: file.projects,
            constraints: file.constraints,
        })
    }
}
