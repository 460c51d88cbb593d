//! Project model.
//!
//! A project is the unit being scheduled: one assessment occupying one
//! (timeslot, room) pair with a panel of lecturers. Students and the
//! supervisor are referenced by ID, never embedded.

use serde::{Deserialize, Deserializer, Serialize};

/// A project to be assessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    /// Unique project identifier.
    pub id: String,
    /// Project title.
    #[serde(default)]
    pub title: String,
    /// Presenting students, in order. IDs must be unique within the project.
    #[serde(default)]
    pub student_ids: Vec<String>,
    /// Supervising lecturer. An empty string in a file means none.
    #[serde(
        default,
        alias = "supervisor_lecturer_id",
        deserialize_with = "empty_as_none"
    )]
    pub supervisor_id: Option<String>,
    /// Panel size for this project. `None` = use `Constraints::panel_size`.
    ///
    /// When the supervisor-inclusion rule is enabled the supervisor is one of
    /// these panel members.
    #[serde(default)]
    pub required_panel_size: Option<u32>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|id| !id.is_empty()))
}

impl Project {
    /// Creates a project with no students and no supervisor.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            student_ids: Vec::new(),
            supervisor_id: None,
            required_panel_size: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Appends a presenting student.
    pub fn with_student(mut self, student_id: impl Into<String>) -> Self {
        self.student_ids.push(student_id.into());
        self
    }

    /// Sets the supervising lecturer.
    pub fn with_supervisor(mut self, lecturer_id: impl Into<String>) -> Self {
        self.supervisor_id = Some(lecturer_id.into());
        self
    }

    /// Overrides the panel size for this project.
    pub fn with_panel_size(mut self, size: u32) -> Self {
        self.required_panel_size = Some(size);
        self
    }

    /// Effective panel size given the configuration default.
    #[inline]
    pub fn panel_size_or(&self, default: u32) -> u32 {
        self.required_panel_size.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_builder() {
        let p = Project::new("P1")
            .with_title("Robot arm")
            .with_student("S1")
            .with_student("S2")
            .with_supervisor("L1");

        assert_eq!(p.id, "P1");
        assert_eq!(p.student_ids, vec!["S1".to_string(), "S2".to_string()]);
        assert_eq!(p.supervisor_id.as_deref(), Some("L1"));
        assert_eq!(p.panel_size_or(2), 2);
        assert_eq!(p.with_panel_size(3).panel_size_or(2), 3);
    }
}
