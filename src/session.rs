//! Configuration session.
//!
//! A [`Session`] owns the single editable [`Config`] of an interactive
//! front end. Operations that need a configuration fail with
//! [`SessionError::NotLoaded`] until one is loaded.

use std::path::Path;

use tracing::{debug, info};

use crate::cp::Tier;
use crate::error::SessionError;
use crate::models::Config;
use crate::precheck::{self, Diagnostic};
use crate::scheduler::{SolveOrchestrator, SolveReport, SolveRequest};

/// Loaded-or-not holder of the working configuration.
#[derive(Debug, Clone, Default)]
pub enum Session {
    #[default]
    Unloaded,
    Loaded(Config),
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Session::Loaded(_))
    }

    /// Replaces the current configuration, returning the previous one.
    pub fn load(&mut self, config: Config) -> Option<Config> {
        info!(
            event = "config_loaded",
            timeslots = config.timeslots.len(),
            lecturers = config.lecturers.len(),
            students = config.students.len(),
            projects = config.projects.len()
        );
        match std::mem::replace(self, Session::Loaded(config)) {
            Session::Loaded(previous) => Some(previous),
            Session::Unloaded => None,
        }
    }

    /// Parses and loads a JSON configuration.
    ///
    /// On error the session keeps whatever it held before.
    pub fn load_json(&mut self, json: &str) -> Result<(), SessionError> {
        let config = Config::from_json_str(json)?;
        self.load(config);
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let config = Config::from_json_file(path)?;
        self.load(config);
        Ok(())
    }

    /// Drops the configuration, returning it if one was loaded.
    pub fn unload(&mut self) -> Option<Config> {
        debug!(event = "config_unloaded", was_loaded = self.is_loaded());
        match std::mem::take(self) {
            Session::Loaded(config) => Some(config),
            Session::Unloaded => None,
        }
    }

    pub fn config(&self) -> Result<&Config, SessionError> {
        match self {
            Session::Loaded(config) => Ok(config),
            Session::Unloaded => Err(SessionError::NotLoaded),
        }
    }

    pub fn config_mut(&mut self) -> Result<&mut Config, SessionError> {
        match self {
            Session::Loaded(config) => Ok(config),
            Session::Unloaded => Err(SessionError::NotLoaded),
        }
    }

    /// Serializes the loaded configuration.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(self.config()?.to_json_string()?)
    }

    /// Runs the feasibility precheck on the loaded configuration.
    pub fn precheck(&self) -> Result<Vec<Diagnostic>, SessionError> {
        Ok(precheck::precheck(self.config()?))
    }

    /// Solves `tier` with the configuration's own solver parameters.
    pub fn solve(&self, tier: Tier) -> Result<SolveReport, SessionError> {
        let config = self.config()?;
        let request = SolveRequest::from_params(tier, &config.constraints.solver);
        Ok(SolveOrchestrator::new(config, request).run())
    }

    /// Solves with an explicit request.
    pub fn solve_with(&self, request: SolveRequest) -> Result<SolveReport, SessionError> {
        Ok(SolveOrchestrator::new(self.config()?, request).run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lecturer;
    use crate::scheduler::SolveStatus;

    const SAMPLE: &str = r#"{
        "timeslots": [
            {"id": "TS1", "ordinal": 0, "day": "2026-03-10", "start": "09:00", "end": "09:30"},
            {"id": "TS2", "ordinal": 1, "day": "2026-03-10", "start": "09:30", "end": "10:00"}
        ],
        "lecturers": [{"id": "L1", "name": "Dr One"}],
        "students": [{"id": "S1", "name": "Ann"}],
        "projects": [{"id": "P1", "student_ids": ["S1"], "supervisor_id": "L1"}],
        "constraints": {"panel_size": 1}
    }"#;

    #[test]
    fn test_unloaded_operations_fail() {
        let mut session = Session::new();
        assert!(!session.is_loaded());
        assert!(matches!(session.config(), Err(SessionError::NotLoaded)));
        assert!(matches!(session.config_mut(), Err(SessionError::NotLoaded)));
        assert!(matches!(session.solve(Tier::Weighted), Err(SessionError::NotLoaded)));
        assert!(matches!(session.precheck(), Err(SessionError::NotLoaded)));
        assert!(session.unload().is_none());
    }

    #[test]
    fn test_load_edit_solve() {
        let mut session = Session::new();
        session.load_json(SAMPLE).unwrap();
        assert!(session.is_loaded());

        session
            .config_mut()
            .unwrap()
            .upsert_lecturer(Lecturer::new("L2", "Dr Two"));
        assert_eq!(session.config().unwrap().lecturers.len(), 2);
        assert!(session.precheck().unwrap().is_empty());

        let report = session.solve(Tier::Weighted).unwrap();
        assert_eq!(report.status(), SolveStatus::Optimal);
        assert_eq!(report.schedule().map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let mut session = Session::new();
        session.load_json(SAMPLE).unwrap();
        let err = session.load_json("{ not json").unwrap_err();
        assert!(matches!(err, SessionError::Load(_)));
        assert_eq!(session.config().unwrap().projects.len(), 1);
    }

    #[test]
    fn test_unload_returns_config() {
        let mut session = Session::new();
        assert!(session.load(Config::new()).is_none());
        assert!(session.load(Config::new()).is_some());
        assert!(session.unload().is_some());
        assert!(!session.is_loaded());
    }

    #[test]
    fn test_json_round_trip_through_session() {
        let mut session = Session::new();
        session.load_json(SAMPLE).unwrap();
        let json = session.to_json().unwrap();
        let mut other = Session::new();
        other.load_json(&json).unwrap();
        assert_eq!(other.config().unwrap(), session.config().unwrap());
    }
}
