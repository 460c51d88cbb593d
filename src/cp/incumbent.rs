//! Best solution shared between search workers.
//!
//! Solutions are ranked by `(objective, region)`: a lower objective wins,
//! and among equal objectives the solution from the earlier search region
//! wins. Regions are numbered in depth-first order, so once every region has
//! been explored the installed solution is the first optimal one a
//! sequential search would meet, whatever the number of workers.
//!
//! The objective is mirrored in an atomic so the common pruning test does
//! not take the lock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::model::Assignment;

/// An installed solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incumbent {
    pub objective: i64,
    pub region: usize,
    pub assignment: Assignment,
}

#[derive(Debug)]
pub struct SharedIncumbent {
    upper_bound: AtomicI64,
    best: Mutex<Option<Incumbent>>,
}

impl Default for SharedIncumbent {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedIncumbent {
    /// Creates an empty incumbent with bound `i64::MAX`.
    pub fn new() -> Self {
        Self {
            upper_bound: AtomicI64::new(i64::MAX),
            best: Mutex::new(None),
        }
    }

    /// Objective of the current incumbent, `i64::MAX` if none.
    #[inline]
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Incumbent>> {
        self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether no solution of objective `>= lower_bound` found in `region`
    /// could replace the incumbent.
    pub fn dominates(&self, lower_bound: i64, region: usize) -> bool {
        let bound = self.upper_bound();
        if lower_bound != bound {
            return lower_bound > bound;
        }
        match self.lock().as_ref() {
            Some(best) => (lower_bound, region) >= (best.objective, best.region),
            None => false,
        }
    }

    /// Installs the candidate if it ranks strictly before the incumbent.
    pub fn try_install(&self, objective: i64, region: usize, assignment: &Assignment) -> bool {
        if objective > self.upper_bound() {
            return false;
        }
        let mut guard = self.lock();
        if let Some(best) = guard.as_ref() {
            if (objective, region) >= (best.objective, best.region) {
                return false;
            }
        }
        *guard = Some(Incumbent {
            objective,
            region,
            assignment: assignment.clone(),
        });
        self.upper_bound.store(objective, Ordering::Release);
        true
    }

    pub fn snapshot(&self) -> Option<Incumbent> {
        self.lock().clone()
    }

    pub fn into_inner(self) -> Option<Incumbent> {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn assignment(bits: &[bool]) -> Assignment {
        Assignment::new(bits.to_vec())
    }

    #[test]
    fn test_initial_state() {
        let inc = SharedIncumbent::new();
        assert_eq!(inc.upper_bound(), i64::MAX);
        assert!(inc.snapshot().is_none());
        assert!(!inc.dominates(0, 0));
    }

    #[test]
    fn test_lower_objective_wins() {
        let inc = SharedIncumbent::new();
        assert!(inc.try_install(10, 3, &assignment(&[true])));
        assert!(inc.try_install(7, 5, &assignment(&[false])));
        assert!(!inc.try_install(9, 0, &assignment(&[true])));
        assert_eq!(inc.upper_bound(), 7);
        assert_eq!(inc.snapshot().map(|b| b.region), Some(5));
    }

    #[test]
    fn test_earlier_region_breaks_ties() {
        let inc = SharedIncumbent::new();
        assert!(inc.try_install(4, 6, &assignment(&[true])));
        assert!(!inc.try_install(4, 6, &assignment(&[false])));
        assert!(!inc.try_install(4, 8, &assignment(&[false])));
        assert!(inc.try_install(4, 2, &assignment(&[false])));

        let best = inc.into_inner().unwrap();
        assert_eq!(best.region, 2);
        assert_eq!(best.assignment, assignment(&[false]));
    }

    #[test]
    fn test_dominates() {
        let inc = SharedIncumbent::new();
        inc.try_install(5, 3, &assignment(&[]));
        assert!(inc.dominates(6, 0));
        assert!(!inc.dominates(4, 9));
        // Equal objective: only earlier regions can still win.
        assert!(!inc.dominates(5, 2));
        assert!(inc.dominates(5, 3));
        assert!(inc.dominates(5, 4));
    }

    #[test]
    fn test_concurrent_installs_keep_minimum() {
        let inc = Arc::new(SharedIncumbent::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let inc = Arc::clone(&inc);
                thread::spawn(move || {
                    for obj in (0..50).rev() {
                        inc.try_install(obj + i, i as usize, &assignment(&[]));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let best = inc.snapshot().unwrap();
        assert_eq!((best.objective, best.region), (0, 0));
    }
}
