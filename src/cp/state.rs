//! Search state: partial assignment, bounds propagation and trail.
//!
//! Each linear constraint keeps the minimum and maximum activity reachable
//! from the current partial assignment. Fixing a variable updates those
//! incrementally; a constraint is revisited only when its slack is smaller
//! than its largest coefficient, i.e. when some free variable may be forced.
//!
//! Undo is trail-based: every fixed variable is pushed on the trail and
//! [`SearchState::backtrack`] pops back to a recorded length, reversing the
//! activity updates.

use super::model::{Assignment, BoolVar, BranchBlock, Comparison, Model, ObjectiveTerm};

const UNSET: u8 = 2;

/// Returned when propagation empties a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict;

/// Per-model data shared read-only by every worker.
#[derive(Debug)]
pub struct CompiledModel<'m> {
    model: &'m Model,
    /// For each variable: (constraint index, coefficient).
    occurs: Vec<Vec<(usize, i64)>>,
    /// For each constraint: largest absolute coefficient.
    max_coef: Vec<i64>,
    /// For each variable: the load group it counts towards.
    load_group: Vec<Option<usize>>,
}

impl<'m> CompiledModel<'m> {
    pub fn new(model: &'m Model) -> Self {
        let mut occurs = vec![Vec::new(); model.num_vars()];
        let mut max_coef = Vec::with_capacity(model.constraints().len());
        for (c, constraint) in model.constraints().iter().enumerate() {
            let mut widest = 0;
            for (var, coef) in &constraint.terms {
                occurs[var.index()].push((c, *coef));
                widest = widest.max(coef.abs());
            }
            max_coef.push(widest);
        }
        let mut load_group = vec![None; model.num_vars()];
        for (g, vars) in model.load_groups().iter().enumerate() {
            for var in vars {
                load_group[var.index()] = Some(g);
            }
        }
        Self {
            model,
            occurs,
            max_coef,
            load_group,
        }
    }
}

/// A partial assignment with propagation and undo.
#[derive(Debug, Clone)]
pub struct SearchState<'c, 'm> {
    compiled: &'c CompiledModel<'m>,
    values: Vec<u8>,
    min_act: Vec<i64>,
    max_act: Vec<i64>,
    /// Variables set to `true` per load group.
    load: Vec<i64>,
    trail: Vec<BoolVar>,
    queue: Vec<usize>,
    queued: Vec<bool>,
}

impl<'c, 'm> SearchState<'c, 'm> {
    /// Creates the root state and propagates every constraint once.
    pub fn root(compiled: &'c CompiledModel<'m>) -> Result<Self, Conflict> {
        let constraints = compiled.model.constraints();
        let mut min_act = Vec::with_capacity(constraints.len());
        let mut max_act = Vec::with_capacity(constraints.len());
        for constraint in constraints {
            let (lo, hi) = constraint
                .terms
                .iter()
                .fold((0, 0), |(lo, hi), &(_, coef)| (lo + coef.min(0), hi + coef.max(0)));
            min_act.push(lo);
            max_act.push(hi);
        }
        let mut state = Self {
            compiled,
            values: vec![UNSET; compiled.model.num_vars()],
            min_act,
            max_act,
            load: vec![0; compiled.model.load_groups().len()],
            trail: Vec::new(),
            queue: (0..constraints.len()).collect(),
            queued: vec![true; constraints.len()],
        };
        state.propagate()?;
        Ok(state)
    }

    #[inline]
    pub fn value(&self, var: BoolVar) -> Option<bool> {
        match self.values[var.index()] {
            UNSET => None,
            v => Some(v == 1),
        }
    }

    #[inline]
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_complete(&self) -> bool {
        self.trail.len() == self.values.len()
    }

    /// Fixes `var` and propagates to a fixpoint.
    pub fn decide(&mut self, var: BoolVar, value: bool) -> Result<(), Conflict> {
        match self.value(var) {
            Some(current) if current == value => Ok(()),
            Some(_) => Err(Conflict),
            None => {
                self.fix(var, value);
                self.propagate()
            }
        }
    }

    /// Undoes every fixing made after the trail had length `len`.
    pub fn backtrack(&mut self, len: usize) {
        self.clear_queue();
        while self.trail.len() > len {
            let Some(var) = self.trail.pop() else { break };
            let value = i64::from(self.values[var.index()] == 1);
            let compiled = self.compiled;
            for &(c, coef) in &compiled.occurs[var.index()] {
                self.min_act[c] -= coef * value - coef.min(0);
                self.max_act[c] -= coef * value - coef.max(0);
            }
            if let Some(g) = compiled.load_group[var.index()] {
                self.load[g] -= value;
            }
            self.values[var.index()] = UNSET;
        }
    }

    /// Next variable to branch on: the first branch block with a free
    /// variable decides, otherwise the first free variable of the model.
    pub fn next_branch_var(&self) -> Option<BoolVar> {
        for block in self.compiled.model.branch_blocks() {
            let mut free = block
                .vars()
                .iter()
                .copied()
                .filter(|v| self.value(*v).is_none());
            let choice = match block {
                BranchBlock::InOrder(_) => free.next(),
                BranchBlock::LeastLoaded(_) => free.min_by_key(|v| self.load_of(*v)),
            };
            if choice.is_some() {
                return choice;
            }
        }
        self.values
            .iter()
            .position(|v| *v == UNSET)
            .map(BoolVar::from_index)
    }

    /// Variables set to `true` in `var`'s load group.
    pub fn load_of(&self, var: BoolVar) -> i64 {
        self.compiled.load_group[var.index()].map_or(0, |g| self.load[g])
    }

    /// Lower bound of the objective over all completions of this state.
    ///
    /// Exact once the state is complete.
    pub fn objective_lower_bound(&self) -> i64 {
        self.compiled
            .model
            .objective()
            .iter()
            .map(|term| term.weight() * self.term_lower_bound(term))
            .sum()
    }

    fn term_lower_bound(&self, term: &ObjectiveTerm) -> i64 {
        let tally = |vars: &[BoolVar]| {
            vars.iter().fold((0i64, 0i64), |(on, free), v| match self.value(*v) {
                Some(true) => (on + 1, free),
                Some(false) => (on, free),
                None => (on, free + 1),
            })
        };
        match term {
            ObjectiveTerm::Sum { vars, .. } => tally(vars).0,
            ObjectiveTerm::Span {
                positions, min_used, ..
            } => {
                let mut first = None;
                let mut last = None;
                for (i, vars) in positions.iter().enumerate() {
                    if tally(vars).0 > 0 {
                        first.get_or_insert(i);
                        last = Some(i);
                    }
                }
                let seen = match (first, last) {
                    (Some(first), Some(last)) => last - first,
                    _ => 0,
                };
                seen.max(min_used.saturating_sub(1)) as i64
            }
            ObjectiveTerm::Spread { groups, total, .. } => {
                if groups.is_empty() {
                    return 0;
                }
                let mut max_on = i64::MIN;
                let mut min_reach = i64::MAX;
                for group in groups {
                    let (on, free) = tally(group);
                    max_on = max_on.max(on);
                    min_reach = min_reach.min(on + free);
                }
                // Some group holds at least the average, some at most.
                if let Some(total) = *total {
                    let n = groups.len() as i64;
                    let floor = total.div_euclid(n);
                    let ceil = floor + i64::from(total.rem_euclid(n) != 0);
                    max_on = max_on.max(ceil);
                    min_reach = min_reach.min(floor);
                }
                (max_on - min_reach).max(0)
            }
        }
    }

    /// Snapshot of a complete state. Free variables read as `false`.
    pub fn to_assignment(&self) -> Assignment {
        Assignment::new(self.values.iter().map(|v| *v == 1).collect())
    }

    fn fix(&mut self, var: BoolVar, value: bool) {
        let v = i64::from(value);
        self.values[var.index()] = v as u8;
        self.trail.push(var);
        let compiled = self.compiled;
        for &(c, coef) in &compiled.occurs[var.index()] {
            self.min_act[c] += coef * v - coef.min(0);
            self.max_act[c] += coef * v - coef.max(0);
            if !self.queued[c] {
                self.queued[c] = true;
                self.queue.push(c);
            }
        }
        if let Some(g) = compiled.load_group[var.index()] {
            self.load[g] += v;
        }
    }

    fn clear_queue(&mut self) {
        for c in self.queue.drain(..) {
            self.queued[c] = false;
        }
    }

    fn propagate(&mut self) -> Result<(), Conflict> {
        while let Some(c) = self.queue.pop() {
            self.queued[c] = false;
            if let Err(conflict) = self.propagate_constraint(c) {
                self.clear_queue();
                return Err(conflict);
            }
        }
        Ok(())
    }

    fn propagate_constraint(&mut self, c: usize) -> Result<(), Conflict> {
        let model = self.compiled.model;
        let constraint = &model.constraints()[c];
        let rhs = constraint.rhs;
        let (check_upper, check_lower) = match constraint.cmp {
            Comparison::Le => (true, false),
            Comparison::Ge => (false, true),
            Comparison::Eq => (true, true),
        };
        if (check_upper && self.min_act[c] > rhs) || (check_lower && self.max_act[c] < rhs) {
            return Err(Conflict);
        }

        let widest = self.compiled.max_coef[c];
        let upper_tight = check_upper && self.min_act[c] + widest > rhs;
        let lower_tight = check_lower && self.max_act[c] - widest < rhs;
        if !upper_tight && !lower_tight {
            return Ok(());
        }

        let mut forced = Vec::new();
        for (var, coef) in &constraint.terms {
            if self.values[var.index()] != UNSET {
                continue;
            }
            let width = coef.abs();
            if upper_tight && self.min_act[c] + width > rhs {
                // Take the value that keeps the activity at its minimum.
                forced.push((*var, *coef < 0));
            } else if lower_tight && self.max_act[c] - width < rhs {
                forced.push((*var, *coef > 0));
            }
        }
        for (var, value) in forced {
            match self.value(var) {
                Some(current) if current != value => return Err(Conflict),
                Some(_) => {}
                None => self.fix(var, value),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_model() -> (Model, BoolVar, BoolVar, BoolVar) {
        let mut m = Model::new();
        let a = m.new_var();
        let b = m.new_var();
        let c = m.new_var();
        m.add_exactly_one([a, b, c]);
        (m, a, b, c)
    }

    #[test]
    fn test_exactly_one_propagates() {
        let (m, a, b, c) = pair_model();
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        assert_eq!(state.value(a), None);

        state.decide(b, true).unwrap();
        assert_eq!(state.value(a), Some(false));
        assert_eq!(state.value(c), Some(false));
        assert!(state.is_complete());
    }

    #[test]
    fn test_last_candidate_is_forced() {
        let (m, a, b, c) = pair_model();
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        state.decide(a, false).unwrap();
        state.decide(b, false).unwrap();
        assert_eq!(state.value(c), Some(true));
    }

    #[test]
    fn test_backtrack_restores() {
        let (m, a, b, _) = pair_model();
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        let mark = state.trail_len();
        state.decide(a, true).unwrap();
        state.backtrack(mark);
        assert_eq!(state.value(a), None);
        assert_eq!(state.value(b), None);
        // Activities were restored, so the opposite branch still works.
        state.decide(b, true).unwrap();
        assert_eq!(state.value(a), Some(false));
    }

    #[test]
    fn test_conflict_detected() {
        let (m, a, b, _) = pair_model();
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        state.decide(a, true).unwrap();
        assert_eq!(state.decide(b, true), Err(Conflict));
    }

    #[test]
    fn test_root_infeasible() {
        let mut m = Model::new();
        let a = m.new_var();
        m.add_ge(vec![(a, 1)], 2);
        let compiled = CompiledModel::new(&m);
        assert!(SearchState::root(&compiled).is_err());

        // Empty equality with a positive right-hand side.
        let mut m = Model::new();
        m.add_eq(Vec::new(), 1);
        let compiled = CompiledModel::new(&m);
        assert!(SearchState::root(&compiled).is_err());
    }

    #[test]
    fn test_negative_coefficients() {
        // a - b = 0
        let mut m = Model::new();
        let a = m.new_var();
        let b = m.new_var();
        m.add_eq(vec![(a, 1), (b, -1)], 0);
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        state.decide(a, true).unwrap();
        assert_eq!(state.value(b), Some(true));

        let mut state = SearchState::root(&compiled).unwrap();
        state.decide(b, false).unwrap();
        assert_eq!(state.value(a), Some(false));
    }

    #[test]
    fn test_spread_lower_bound() {
        let mut m = Model::new();
        let v: Vec<BoolVar> = (0..4).map(|_| m.new_var()).collect();
        m.minimize(ObjectiveTerm::Spread {
            weight: 1,
            groups: vec![vec![v[0], v[1]], vec![v[2], v[3]]],
            total: None,
        });
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        assert_eq!(state.objective_lower_bound(), 0);

        state.decide(v[0], true).unwrap();
        state.decide(v[1], true).unwrap();
        state.decide(v[2], false).unwrap();
        // Group 2 can reach at most 1, group 1 already has 2.
        assert_eq!(state.objective_lower_bound(), 1);
    }

    #[test]
    fn test_spread_bound_uses_known_total() {
        // Three groups sharing 4 seats: some group ends with 2, another with 1.
        let mut m = Model::new();
        let v: Vec<BoolVar> = (0..6).map(|_| m.new_var()).collect();
        m.minimize(ObjectiveTerm::Spread {
            weight: 1,
            groups: vec![vec![v[0], v[1]], vec![v[2], v[3]], vec![v[4], v[5]]],
            total: Some(4),
        });
        let compiled = CompiledModel::new(&m);
        let state = SearchState::root(&compiled).unwrap();
        assert_eq!(state.objective_lower_bound(), 1);
    }

    #[test]
    fn test_span_bound_uses_min_used() {
        let mut m = Model::new();
        let v: Vec<BoolVar> = (0..4).map(|_| m.new_var()).collect();
        m.minimize(ObjectiveTerm::Span {
            weight: 2,
            positions: v.iter().map(|var| vec![*var]).collect(),
            min_used: 3,
        });
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();
        assert_eq!(state.objective_lower_bound(), 4);

        state.decide(v[0], true).unwrap();
        state.decide(v[3], true).unwrap();
        assert_eq!(state.objective_lower_bound(), 6);
    }

    #[test]
    fn test_least_loaded_branching() {
        // Two lecturers; the first already carries one assignment.
        let mut m = Model::new();
        let busy = m.new_var();
        let first = m.new_var();
        let second = m.new_var();
        m.add_load_group(vec![busy, first]);
        m.add_load_group(vec![second]);
        m.add_branch_block(BranchBlock::InOrder(vec![busy]));
        m.add_branch_block(BranchBlock::LeastLoaded(vec![first, second]));
        let compiled = CompiledModel::new(&m);
        let mut state = SearchState::root(&compiled).unwrap();

        assert_eq!(state.next_branch_var(), Some(busy));
        let mark = state.trail_len();
        state.decide(busy, true).unwrap();
        assert_eq!(state.load_of(first), 1);
        assert_eq!(state.next_branch_var(), Some(second));

        state.backtrack(mark);
        assert_eq!(state.load_of(first), 0);
        state.decide(busy, false).unwrap();
        // Equal loads fall back to block order.
        assert_eq!(state.next_branch_var(), Some(first));
    }
}
