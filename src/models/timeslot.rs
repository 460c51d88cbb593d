//! Timeslot model.
//!
//! A timeslot is one assessment period, e.g. `2026-03-10 09:00-09:30`.
//! Its `ordinal` is the canonical chronological rank: schedules are ordered
//! by ordinal, never by comparing identifiers (`"TS10"` sorts before `"TS9"`
//! lexically but may well come later in the day).

use serde::{Deserialize, Serialize};

/// An assessment timeslot.
///
/// Timeslots are immutable value objects. The ordinal is fixed when the slot
/// is created; `Config::add_timeslot` assigns the next free ordinal so that
/// definition order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSlot {
    id: String,
    ordinal: u32,
    #[serde(alias = "date")]
    day: String,
    start: String,
    end: String,
    #[serde(default)]
    is_lunch: bool,
    #[serde(default)]
    label: String,
}

impl TimeSlot {
    /// Creates a timeslot at the given ordinal position.
    ///
    /// `day` is a date (`YYYY-MM-DD`), `start`/`end` are wall-clock times
    /// (`HH:MM`). They are descriptive only; ordering uses `ordinal`.
    pub fn new(
        id: impl Into<String>,
        ordinal: u32,
        day: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ordinal,
            day: day.into(),
            start: start.into(),
            end: end.into(),
            is_lunch: false,
            label: String::new(),
        }
    }

    /// Marks the slot as falling over lunch.
    pub fn with_lunch(mut self, is_lunch: bool) -> Self {
        self.is_lunch = is_lunch;
        self
    }

    /// Sets a display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Slot identifier.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Chronological position.
    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Calendar day this slot belongs to.
    #[inline]
    pub fn day(&self) -> &str {
        &self.day
    }

    #[inline]
    pub fn start(&self) -> &str {
        &self.start
    }

    #[inline]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Whether the slot itself is flagged as a lunch slot.
    #[inline]
    pub fn is_lunch(&self) -> bool {
        self.is_lunch
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Human-readable time range, e.g. `2026-03-10 09:00-09:30`.
    pub fn display_range(&self) -> String {
        format!("{} {}-{}", self.day, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeslot_builder() {
        let slot = TimeSlot::new("TS1", 0, "2026-03-10", "12:00", "12:30")
            .with_lunch(true)
            .with_label("Lunch block");

        assert_eq!(slot.id(), "TS1");
        assert_eq!(slot.ordinal(), 0);
        assert_eq!(slot.day(), "2026-03-10");
        assert!(slot.is_lunch());
        assert_eq!(slot.label(), "Lunch block");
        assert_eq!(slot.display_range(), "2026-03-10 12:00-12:30");
    }

    #[test]
    fn test_timeslot_serde_defaults() {
        let json = r#"{"id":"TS1","ordinal":3,"day":"2026-03-10","start":"09:00","end":"09:30"}"#;
        let slot: TimeSlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot.ordinal(), 3);
        assert!(!slot.is_lunch());
        assert!(slot.label().is_empty());
    }
}
