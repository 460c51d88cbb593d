//! Search monitors.
//!
//! A monitor is consulted once per search node and may ask the worker to
//! stop. Monitors never influence which branch is taken, only whether the
//! search goes on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// What a monitor wants the search to do next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchCommand {
    #[default]
    Continue,
    Terminate(String),
}

impl std::fmt::Display for SearchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchCommand::Continue => write!(f, "Continue"),
            SearchCommand::Terminate(reason) => write!(f, "Terminate: {}", reason),
        }
    }
}

pub trait SearchMonitor: Send {
    fn name(&self) -> &str;

    /// Called before each node is expanded. `nodes` counts nodes expanded
    /// so far by the calling worker.
    fn on_node(&mut self, nodes: u64) -> SearchCommand;
}

impl std::fmt::Debug for dyn SearchMonitor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SearchMonitor({})", self.name())
    }
}

/// Stops once a wall-clock budget measured from `start` is spent.
///
/// The clock is read only when `nodes & mask == 0`, which includes the very
/// first node, so a zero budget stops before any work.
#[derive(Debug, Clone)]
pub struct TimeLimitMonitor {
    start: Instant,
    limit: Duration,
    mask: u64,
}

impl TimeLimitMonitor {
    pub fn new(start: Instant, limit: Duration) -> Self {
        Self {
            start,
            limit,
            mask: 0xFF,
        }
    }

    /// Reads the clock every `2^bits` nodes.
    pub fn with_check_interval_bits(mut self, bits: u32) -> Self {
        self.mask = (1u64 << bits.min(32)) - 1;
        self
    }
}

impl SearchMonitor for TimeLimitMonitor {
    fn name(&self) -> &str {
        "TimeLimitMonitor"
    }

    fn on_node(&mut self, nodes: u64) -> SearchCommand {
        if (nodes & self.mask) == 0 && self.start.elapsed() >= self.limit {
            return SearchCommand::Terminate(format!(
                "time limit of {:.3}s reached",
                self.limit.as_secs_f64()
            ));
        }
        SearchCommand::Continue
    }
}

/// Stops when a shared flag is raised, typically by another worker.
#[derive(Debug, Clone, Copy)]
pub struct InterruptMonitor<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InterruptMonitor<'a> {
    pub fn new(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }
}

impl SearchMonitor for InterruptMonitor<'_> {
    fn name(&self) -> &str {
        "InterruptMonitor"
    }

    fn on_node(&mut self, _nodes: u64) -> SearchCommand {
        if self.flag.load(Ordering::Relaxed) {
            SearchCommand::Terminate("interrupted".to_string())
        } else {
            SearchCommand::Continue
        }
    }
}

/// Runs several monitors; the first termination request wins.
#[derive(Debug, Default)]
pub struct CompositeMonitor<'a> {
    monitors: Vec<Box<dyn SearchMonitor + 'a>>,
}

impl<'a> CompositeMonitor<'a> {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    pub fn with(mut self, monitor: impl SearchMonitor + 'a) -> Self {
        self.monitors.push(Box::new(monitor));
        self
    }
}

impl SearchMonitor for CompositeMonitor<'_> {
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_node(&mut self, nodes: u64) -> SearchCommand {
        for monitor in &mut self.monitors {
            let command = monitor.on_node(nodes);
            if command != SearchCommand::Continue {
                return command;
            }
        }
        SearchCommand::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_time_limit_stops_immediately() {
        let mut m = TimeLimitMonitor::new(Instant::now(), Duration::ZERO);
        assert!(matches!(m.on_node(0), SearchCommand::Terminate(_)));
    }

    #[test]
    fn test_time_limit_checks_on_mask() {
        let mut m = TimeLimitMonitor::new(Instant::now(), Duration::ZERO).with_check_interval_bits(4);
        assert_eq!(m.on_node(3), SearchCommand::Continue);
        assert!(matches!(m.on_node(16), SearchCommand::Terminate(_)));
    }

    #[test]
    fn test_generous_time_limit_continues() {
        let mut m = TimeLimitMonitor::new(Instant::now(), Duration::from_secs(3600));
        assert_eq!(m.on_node(0), SearchCommand::Continue);

        let mut unbounded = TimeLimitMonitor::new(Instant::now(), Duration::MAX);
        assert_eq!(unbounded.on_node(0), SearchCommand::Continue);
    }

    #[test]
    fn test_composite_with_interrupt() {
        let flag = AtomicBool::new(false);
        let mut m = CompositeMonitor::new()
            .with(TimeLimitMonitor::new(Instant::now(), Duration::from_secs(3600)))
            .with(InterruptMonitor::new(&flag));
        assert_eq!(m.on_node(0), SearchCommand::Continue);

        flag.store(true, Ordering::Relaxed);
        assert_eq!(
            m.on_node(1),
            SearchCommand::Terminate("interrupted".to_string())
        );
    }
}
