//! Schedule quality metrics (KPIs).
//!
//! Recomputes the soft-objective terms from a finished schedule, so a
//! result can be explained (or compared with another) without access to the
//! solver's internals.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Span | Latest minus earliest chronological slot position used |
//! | Imbalance | Max minus min panel count over lecturers available at one or more slots |
//! | Lunch assessments | Entries placed in a lunch slot |

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Config, Schedule, Weights};

/// Schedule performance indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Slot positions between the first and last assessment.
    pub span: u32,
    /// Spread of per-lecturer panel counts.
    pub imbalance: u32,
    /// Assessments held in lunch slots.
    pub lunch_assessments: u32,
    /// Panel count per eligible lecturer.
    pub panel_counts: BTreeMap<String, u32>,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and the configuration it was built for.
    pub fn calculate(schedule: &Schedule, config: &Config) -> Self {
        let mut ordinals: Vec<u32> = config.timeslots.iter().map(|s| s.ordinal()).collect();
        ordinals.sort_unstable();
        let position = |ordinal: u32| ordinals.binary_search(&ordinal).unwrap_or_default() as u32;

        let first = schedule.iter().map(|e| position(e.ordinal)).min();
        let last = schedule.iter().map(|e| position(e.ordinal)).max();
        let span = match (first, last) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        };

        let mut panel_counts: BTreeMap<String, u32> = config
            .lecturers
            .iter()
            .filter(|l| config.timeslots.iter().any(|s| l.is_available_at(s.id())))
            .map(|l| (l.id.clone(), 0))
            .collect();
        for entry in schedule {
            for lecturer_id in &entry.panel_lecturer_ids {
                if let Some(count) = panel_counts.get_mut(lecturer_id) {
                    *count += 1;
                }
            }
        }
        let imbalance = match (panel_counts.values().max(), panel_counts.values().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };

        let lunch: HashMap<&str, bool> = config
            .timeslots
            .iter()
            .map(|s| (s.id(), config.is_lunch_slot(s)))
            .collect();
        let lunch_assessments = schedule
            .iter()
            .filter(|e| lunch.get(e.timeslot_id.as_str()).copied().unwrap_or(false))
            .count() as u32;

        Self {
            span,
            imbalance,
            lunch_assessments,
            panel_counts,
        }
    }

    /// Weighted objective value, as minimised by the weighted tier.
    pub fn weighted(&self, weights: &Weights) -> i64 {
        i64::from(weights.compactness) * i64::from(self.span)
            + i64::from(weights.workload_balance) * i64::from(self.imbalance)
            + i64::from(weights.lunch_penalty) * i64::from(self.lunch_assessments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lecturer, ScheduleEntry, TimeSlot};

    fn sample_config() -> Config {
        Config::new()
            .with_timeslot(TimeSlot::new("TS1", 0, "2026-03-10", "09:00", "09:30"))
            .with_timeslot(TimeSlot::new("TS2", 5, "2026-03-10", "12:00", "12:30").with_lunch(true))
            .with_timeslot(TimeSlot::new("TS3", 9, "2026-03-10", "14:00", "14:30"))
            .with_lecturer(Lecturer::new("L1", "One"))
            .with_lecturer(Lecturer::new("L2", "Two"))
            .with_lecturer(
                Lecturer::new("L3", "Away")
                    .with_unavailable("TS1")
                    .with_unavailable("TS2")
                    .with_unavailable("TS3"),
            )
    }

    #[test]
    fn test_kpi_basic() {
        let cfg = sample_config();
        let schedule = Schedule::from_entries(vec![
            ScheduleEntry::new("P1", "TS1", 0, 0).with_panel(vec!["L1".into()]),
            ScheduleEntry::new("P2", "TS2", 5, 0).with_panel(vec!["L1".into()]),
        ]);
        let kpi = ScheduleKpi::calculate(&schedule, &cfg);

        // Positions, not raw ordinals: TS1 = 0, TS2 = 1.
        assert_eq!(kpi.span, 1);
        assert_eq!(kpi.imbalance, 2);
        assert_eq!(kpi.lunch_assessments, 1);
        assert!(!kpi.panel_counts.contains_key("L3"));
        assert_eq!(kpi.panel_counts["L2"], 0);
    }

    #[test]
    fn test_kpi_weighted() {
        let kpi = ScheduleKpi {
            span: 2,
            imbalance: 1,
            lunch_assessments: 3,
            panel_counts: BTreeMap::new(),
        };
        assert_eq!(kpi.weighted(&Weights::default()), 2 + 10 + 3 * 3);
        assert_eq!(kpi.weighted(&Weights::zero()), 0);
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = ScheduleKpi::calculate(&Schedule::new(), &sample_config());
        assert_eq!(kpi.span, 0);
        assert_eq!(kpi.imbalance, 0);
        assert_eq!(kpi.lunch_assessments, 0);
    }
}
