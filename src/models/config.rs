//! Configuration aggregate.
//!
//! `Config` is the aggregate root holding every entity of one assessment
//! round plus the scheduling constraints. Entities are kept in flat lists and
//! reference each other by ID only, so any single entity can be edited
//! without rewriting the others. Dangling references left behind by an edit
//! are reported by [`crate::validation`], not repaired.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use super::{Lecturer, Project, Student, TimeSlot};
use crate::error::ConfigStructuralError;
use crate::validation;

/// Coefficients for the weighted objective. `0` switches a term off.
///
/// Terms are combined linearly without normalization: span is measured in
/// slot positions, imbalance and lunch usage in assessment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    /// Weight on the schedule span (latest minus earliest used position).
    #[serde(default = "default_compactness", alias = "span")]
    pub compactness: u32,
    /// Weight on the spread of per-lecturer panel counts.
    #[serde(default = "default_workload_balance")]
    pub workload_balance: u32,
    /// Weight on the number of assessments placed in lunch slots.
    #[serde(default = "default_lunch_penalty", alias = "lunch")]
    pub lunch_penalty: u32,
}

fn default_compactness() -> u32 {
    1
}

fn default_workload_balance() -> u32 {
    10
}

fn default_lunch_penalty() -> u32 {
    3
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            compactness: default_compactness(),
            workload_balance: default_workload_balance(),
            lunch_penalty: default_lunch_penalty(),
        }
    }
}

impl Weights {
    /// All terms switched off.
    pub fn zero() -> Self {
        Self {
            compactness: 0,
            workload_balance: 0,
            lunch_penalty: 0,
        }
    }

    /// Whether every term is switched off.
    pub fn is_zero(&self) -> bool {
        self.compactness == 0 && self.workload_balance == 0 && self.lunch_penalty == 0
    }
}

/// Search budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverParams {
    /// Wall-clock limit in seconds.
    #[serde(default = "default_time_limit_secs", alias = "max_time_in_seconds")]
    pub time_limit_secs: f64,
    /// Parallel search workers. `0` = one per available core.
    #[serde(default, alias = "num_workers", alias = "num_search_workers")]
    pub worker_count: usize,
}

fn default_time_limit_secs() -> f64 {
    10.0
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit_secs: default_time_limit_secs(),
            worker_count: 0,
        }
    }
}

impl SolverParams {
    /// The time limit as a `Duration`.
    ///
    /// Zero, negative and NaN values give `Duration::ZERO`; values too large
    /// for a `Duration` (including infinity) give `Duration::MAX`.
    pub fn time_limit(&self) -> Duration {
        if self.time_limit_secs > 0.0 {
            Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

/// Global scheduling rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    /// Number of interchangeable rooms, indexed `0..room_count`.
    #[serde(default = "default_one", alias = "rooms")]
    pub room_count: u32,
    /// Default panel size for projects without an override.
    #[serde(default = "default_panel_size")]
    pub panel_size: u32,
    /// Whether each project's supervisor must sit on its panel.
    #[serde(default = "default_true", alias = "must_include_supervisor")]
    pub supervisor_must_attend: bool,
    /// Slots to avoid where possible.
    #[serde(default)]
    pub lunch_slot_ids: Vec<String>,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub solver: SolverParams,
}

fn default_one() -> u32 {
    1
}

fn default_panel_size() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            room_count: 1,
            panel_size: default_panel_size(),
            supervisor_must_attend: true,
            lunch_slot_ids: Vec::new(),
            weights: Weights::default(),
            solver: SolverParams::default(),
        }
    }
}

/// The full description of one assessment round.
///
/// Deserializes through the on-disk `ConfigFile` records, which also
/// accept the older file layout and reject unknown keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "super::file::ConfigFile")]
pub struct Config {
    /// Free-form metadata carried through untouched.
    pub meta: BTreeMap<String, serde_json::Value>,
    pub timeslots: Vec<TimeSlot>,
    pub lecturers: Vec<Lecturer>,
    pub students: Vec<Student>,
    pub projects: Vec<Project>,
    pub constraints: Constraints,
}

/// ID → position lookup tables for one `Config`.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    pub slots: HashMap<String, usize>,
    pub lecturers: HashMap<String, usize>,
    pub students: HashMap<String, usize>,
    pub projects: HashMap<String, usize>,
}

impl Config {
    /// Creates an empty configuration with default constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a timeslot as given.
    pub fn with_timeslot(mut self, slot: TimeSlot) -> Self {
        self.timeslots.push(slot);
        self
    }

    /// Appends a lecturer.
    pub fn with_lecturer(mut self, lecturer: Lecturer) -> Self {
        self.lecturers.push(lecturer);
        self
    }

    /// Appends a student.
    pub fn with_student(mut self, student: Student) -> Self {
        self.students.push(student);
        self
    }

    /// Appends a project.
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    /// Replaces the constraints.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Creates a timeslot after every existing one and returns it.
    ///
    /// The new slot's ordinal is one past the current maximum, so slots
    /// added this way are chronological in definition order.
    pub fn add_timeslot(
        &mut self,
        id: impl Into<String>,
        day: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> &TimeSlot {
        let ordinal = self
            .timeslots
            .iter()
            .map(|s| s.ordinal() + 1)
            .max()
            .unwrap_or(0);
        self.timeslots
            .push(TimeSlot::new(id, ordinal, day, start, end));
        &self.timeslots[self.timeslots.len() - 1]
    }

    /// Removes a timeslot, returning it if present.
    pub fn remove_timeslot(&mut self, id: &str) -> Option<TimeSlot> {
        let pos = self.timeslots.iter().position(|s| s.id() == id)?;
        Some(self.timeslots.remove(pos))
    }

    /// Inserts or replaces a lecturer by ID, returning the previous value.
    pub fn upsert_lecturer(&mut self, lecturer: Lecturer) -> Option<Lecturer> {
        upsert(&mut self.lecturers, lecturer, |l| l.id.as_str())
    }

    /// Removes a lecturer, returning it if present.
    pub fn remove_lecturer(&mut self, id: &str) -> Option<Lecturer> {
        let pos = self.lecturers.iter().position(|l| l.id == id)?;
        Some(self.lecturers.remove(pos))
    }

    /// Inserts or replaces a student by ID, returning the previous value.
    pub fn upsert_student(&mut self, student: Student) -> Option<Student> {
        upsert(&mut self.students, student, |s| s.id.as_str())
    }

    /// Removes a student, returning it if present.
    pub fn remove_student(&mut self, id: &str) -> Option<Student> {
        let pos = self.students.iter().position(|s| s.id == id)?;
        Some(self.students.remove(pos))
    }

    /// Inserts or replaces a project by ID, returning the previous value.
    pub fn upsert_project(&mut self, project: Project) -> Option<Project> {
        upsert(&mut self.projects, project, |p| p.id.as_str())
    }

    /// Removes a project, returning it if present.
    pub fn remove_project(&mut self, id: &str) -> Option<Project> {
        let pos = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(pos))
    }

    pub fn timeslot(&self, id: &str) -> Option<&TimeSlot> {
        self.timeslots.iter().find(|s| s.id() == id)
    }

    pub fn lecturer(&self, id: &str) -> Option<&Lecturer> {
        self.lecturers.iter().find(|l| l.id == id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Builds ID lookup tables. Later duplicates shadow earlier ones.
    pub fn index(&self) -> IdIndex {
        IdIndex {
            slots: index_by(&self.timeslots, |s| s.id()),
            lecturers: index_by(&self.lecturers, |l| l.id.as_str()),
            students: index_by(&self.students, |s| s.id.as_str()),
            projects: index_by(&self.projects, |p| p.id.as_str()),
        }
    }

    /// Total (slot × room) places.
    pub fn capacity(&self) -> usize {
        self.constraints.room_count as usize * self.timeslots.len()
    }

    /// Effective panel size of a project.
    pub fn panel_size_for(&self, project: &Project) -> u32 {
        project.panel_size_or(self.constraints.panel_size)
    }

    /// Whether a slot counts as lunch: flagged on the slot itself or listed
    /// in `lunch_slot_ids`.
    pub fn is_lunch_slot(&self, slot: &TimeSlot) -> bool {
        slot.is_lunch()
            || self
                .constraints
                .lunch_slot_ids
                .iter()
                .any(|id| id == slot.id())
    }

    /// Parses and structurally validates a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigStructuralError> {
        let config: Config = serde_json::from_str(json)?;
        validation::validate_structure(&config).map_err(ConfigStructuralError::Invalid)?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigStructuralError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigStructuralError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn upsert<T, F>(items: &mut Vec<T>, item: T, key: F) -> Option<T>
where
    F: Fn(&T) -> &str,
{
    match items.iter().position(|existing| key(existing) == key(&item)) {
        Some(pos) => Some(std::mem::replace(&mut items[pos], item)),
        None => {
            items.push(item);
            None
        }
    }
}

fn index_by<T, F>(items: &[T], key: F) -> HashMap<String, usize>
where
    F: Fn(&T) -> &str,
{
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).to_string(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let mut cfg = Config::new()
            .with_lecturer(Lecturer::new("L1", "Dr One"))
            .with_lecturer(Lecturer::new("L2", "Dr Two"))
            .with_student(Student::new("S1", "Student A"))
            .with_project(
                Project::new("P1")
                    .with_title("Proj")
                    .with_student("S1")
                    .with_supervisor("L1"),
            );
        cfg.add_timeslot("TS1", "2026-01-01", "09:00", "09:30");
        cfg.add_timeslot("TS2", "2026-01-01", "09:30", "10:00");
        cfg
    }

    #[test]
    fn test_add_timeslot_assigns_next_ordinal() {
        let cfg = sample_config();
        assert_eq!(cfg.timeslots[0].ordinal(), 0);
        assert_eq!(cfg.timeslots[1].ordinal(), 1);

        let mut cfg = Config::new().with_timeslot(TimeSlot::new("A", 7, "d", "s", "e"));
        let added = cfg.add_timeslot("B", "d", "s", "e");
        assert_eq!(added.ordinal(), 8);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut cfg = sample_config();
        let previous = cfg.upsert_lecturer(Lecturer::new("L1", "Prof One").with_max_per_day(2));
        assert_eq!(previous.map(|l| l.name), Some("Dr One".to_string()));
        assert_eq!(cfg.lecturers.len(), 2);
        assert_eq!(cfg.lecturers[0].name, "Prof One");

        assert!(cfg.upsert_lecturer(Lecturer::new("L3", "Dr Three")).is_none());
        assert_eq!(cfg.lecturers.len(), 3);
    }

    #[test]
    fn test_remove_does_not_cascade() {
        let mut cfg = sample_config();
        assert!(cfg.remove_student("S1").is_some());
        // The project keeps its reference; validation reports it.
        assert_eq!(cfg.project("P1").unwrap().student_ids, vec!["S1".to_string()]);
        assert!(cfg.remove_student("S1").is_none());
    }

    #[test]
    fn test_lookups_and_index() {
        let cfg = sample_config();
        assert_eq!(cfg.timeslot("TS2").map(|s| s.ordinal()), Some(1));
        assert!(cfg.lecturer("L9").is_none());

        let idx = cfg.index();
        assert_eq!(idx.slots["TS2"], 1);
        assert_eq!(idx.lecturers["L2"], 1);
        assert_eq!(idx.projects["P1"], 0);
    }

    #[test]
    fn test_lunch_slot_sources() {
        let mut cfg = sample_config().with_timeslot(
            TimeSlot::new("TS3", 2, "2026-01-01", "12:00", "12:30").with_lunch(true),
        );
        cfg.constraints.lunch_slot_ids = vec!["TS1".into()];

        assert!(cfg.is_lunch_slot(&cfg.timeslots[0]));
        assert!(!cfg.is_lunch_slot(&cfg.timeslots[1]));
        assert!(cfg.is_lunch_slot(&cfg.timeslots[2]));
    }

    #[test]
    fn test_json_roundtrip() {
        let cfg = sample_config();
        let json = cfg.to_json_string().unwrap();
        let back = Config::from_json_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_json_legacy_keys_and_null_meta() {
        let json = r#"{
            "meta": null,
            "timeslots": [],
            "lecturers": [],
            "students": [],
            "projects": [],
            "constraints": {
                "rooms": 3,
                "must_include_supervisor": false,
                "weights": {"span": 4, "lunch": 7},
                "solver": {"max_time_in_seconds": 5.0, "num_search_workers": 4}
            }
        }"#;
        let cfg = Config::from_json_str(json).unwrap();
        assert!(cfg.meta.is_empty());
        assert_eq!(cfg.constraints.room_count, 3);
        assert!(!cfg.constraints.supervisor_must_attend);
        assert_eq!(cfg.constraints.weights.compactness, 4);
        assert_eq!(cfg.constraints.weights.workload_balance, 10);
        assert_eq!(cfg.constraints.weights.lunch_penalty, 7);
        assert_eq!(cfg.constraints.solver.worker_count, 4);
        assert_eq!(cfg.constraints.solver.time_limit(), Duration::from_secs(5));
    }

    #[test]
    fn test_json_missing_key_is_structural_error() {
        let json = r#"{"timeslots": [], "lecturers": [], "students": []}"#;
        let err = Config::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigStructuralError::Json(_)));
    }

    #[test]
    fn test_time_limit_clamps() {
        let limit = |secs: f64| {
            SolverParams {
                time_limit_secs: secs,
                worker_count: 1,
            }
            .time_limit()
        };
        assert_eq!(limit(-1.0), Duration::ZERO);
        assert_eq!(limit(f64::NAN), Duration::ZERO);
        assert_eq!(limit(2.5), Duration::from_millis(2500));
        // "No limit" in practice: too large for a Duration, never a panic.
        assert_eq!(limit(1e30), Duration::MAX);
        assert_eq!(limit(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn test_huge_time_limit_in_file() {
        let json = r#"{
            "timeslots": [], "lecturers": [], "students": [], "projects": [],
            "constraints": {"solver": {"max_time_in_seconds": 1e30}}
        }"#;
        let cfg = Config::from_json_str(json).unwrap();
        assert_eq!(cfg.constraints.solver.time_limit(), Duration::MAX);
    }
}
