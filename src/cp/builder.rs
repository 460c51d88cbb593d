//! Assessment model builder.
//!
//! Translates a [`Config`] into a boolean [`Model`] at one of three tiers.
//! The tiers are layers over one shared base, each adding to the previous
//! one without touching what is already there:
//!
//! | Tier | Variables added | Adds |
//! |------|-----------------|------|
//! | 1 | `x[p,t,r]` | one (slot, room) per project, one project per (slot, room), student unavailability |
//! | 2 | `y[p,l]`, `a[p,t]`, `z[p,l,t]` | panel size, supervisor on panel, lecturer unavailability, no double booking, per-day and total caps |
//! | 3 | none | weighted objective: span, workload imbalance, lunch usage |
//!
//! Variables are created in the same order at every tier, so an assignment
//! produced at a higher tier can be checked directly against a lower tier's
//! model. Slot positions `t` are chronological ranks (sorted by ordinal),
//! never configuration order. Only `min(room_count, projects)` rooms are
//! modelled; extra rooms can never be used at once.
//!
//! Search branches project by project: first its place, non-lunch
//! positions before lunch ones, then its panel, least-loaded lecturer first.
//!
//! # Reference
//! - Carter & Laporte (1996), "Recent Developments in Practical Examination Timetabling"
//! - Glover & Woolsey (1974), "Converting the 0-1 Polynomial Programming Problem to a 0-1 Linear Program"

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{Assignment, BoolVar, BranchBlock, Model, ObjectiveTerm};
use crate::error::ParseTierError;
use crate::models::Config;

/// Model richness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Slot and room assignment only.
    SlotRoom,
    /// Adds panels and lecturer availability.
    Panel,
    /// Adds the weighted objective.
    #[default]
    Weighted,
}

impl Tier {
    /// `1`, `2` or `3`.
    pub fn level(self) -> u8 {
        match self {
            Tier::SlotRoom => 1,
            Tier::Panel => 2,
            Tier::Weighted => 3,
        }
    }

    pub fn has_panels(self) -> bool {
        self >= Tier::Panel
    }

    pub fn has_objective(self) -> bool {
        self == Tier::Weighted
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.level())
    }
}

impl FromStr for Tier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "slice1" | "tier1" => Ok(Tier::SlotRoom),
            "2" | "slice2" | "tier2" => Ok(Tier::Panel),
            "3" | "slice3" | "tier3" | "full" => Ok(Tier::Weighted),
            _ => Err(ParseTierError(s.to_string())),
        }
    }
}

/// Panel layer variables, present from tier 2.
#[derive(Debug, Clone)]
struct PanelVars {
    /// `y[p][l]`: lecturer `l` sits on project `p`'s panel.
    y: Vec<Vec<BoolVar>>,
    /// `a[p][t]`: project `p` is held at position `t`.
    a: Vec<Vec<BoolVar>>,
}

/// A built model together with the variable layout needed to read
/// solutions back.
#[derive(Debug, Clone)]
pub struct TierModel {
    tier: Tier,
    model: Model,
    /// Position → index in `Config::timeslots`.
    slot_order: Vec<usize>,
    /// `x[p][t][r]`.
    x: Vec<Vec<Vec<BoolVar>>>,
    panel: Option<PanelVars>,
}

impl TierModel {
    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn num_projects(&self) -> usize {
        self.x.len()
    }

    /// Whether every hard constraint of this tier holds.
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        self.model.is_satisfied_by(assignment)
    }

    pub fn objective_value(&self, assignment: &Assignment) -> i64 {
        self.model.objective_value(assignment)
    }

    /// Index into `Config::timeslots` of chronological position `t`.
    pub fn slot_at(&self, position: usize) -> Option<usize> {
        self.slot_order.get(position).copied()
    }

    /// `(position, room)` of project `p`, if the assignment places it.
    pub fn placement(&self, project: usize, assignment: &Assignment) -> Option<(usize, usize)> {
        let by_slot = self.x.get(project)?;
        by_slot.iter().enumerate().find_map(|(t, by_room)| {
            by_room
                .iter()
                .position(|var| assignment.value(*var))
                .map(|r| (t, r))
        })
    }

    /// Lecturer indices on project `p`'s panel. Empty below tier 2.
    pub fn panel(&self, project: usize, assignment: &Assignment) -> Vec<usize> {
        self.panel
            .as_ref()
            .and_then(|panel| panel.y.get(project))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, var)| assignment.value(**var))
                    .map(|(l, _)| l)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builds a [`TierModel`] from a configuration.
///
/// # Example
/// ```
/// use u_assess::cp::{AssessmentModelBuilder, Tier};
/// use u_assess::models::{Config, Project};
///
/// let mut config = Config::new().with_project(Project::new("P1"));
/// config.add_timeslot("TS1", "2026-03-10", "09:00", "09:30");
///
/// let built = AssessmentModelBuilder::new(&config)
///     .with_tier(Tier::SlotRoom)
///     .build();
/// assert_eq!(built.num_projects(), 1);
/// ```
pub struct AssessmentModelBuilder<'a> {
    config: &'a Config,
    tier: Tier,
}

impl<'a> AssessmentModelBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            tier: Tier::default(),
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Builds the model. Unresolved references are skipped; structural
    /// validation reports them.
    pub fn build(&self) -> TierModel {
        let cfg = self.config;
        let mut model = Model::new();

        let mut slot_order: Vec<usize> = (0..cfg.timeslots.len()).collect();
        slot_order.sort_by_key(|&i| (cfg.timeslots[i].ordinal(), i));
        let position_of: HashMap<&str, usize> = slot_order
            .iter()
            .enumerate()
            .map(|(t, &i)| (cfg.timeslots[i].id(), t))
            .collect();

        let lunch: Vec<bool> = slot_order
            .iter()
            .map(|&i| cfg.is_lunch_slot(&cfg.timeslots[i]))
            .collect();

        let rooms = (cfg.constraints.room_count as usize).min(cfg.projects.len());
        let x = self.add_slot_room_layer(&mut model, &slot_order, &position_of, rooms);

        let panel = if self.tier.has_panels() {
            Some(self.add_panel_layer(&mut model, &slot_order, &position_of, &x))
        } else {
            None
        };

        let weighted = self.tier.has_objective() && !cfg.constraints.weights.is_zero();
        if let Some(panel) = panel.as_ref().filter(|_| weighted) {
            self.add_objective(&mut model, &lunch, rooms, panel);
        }

        let mut by_lunch: Vec<usize> = (0..slot_order.len()).collect();
        by_lunch.sort_by_key(|&t| lunch[t]);
        if let Some(panel) = &panel {
            for l in 0..cfg.lecturers.len() {
                model.add_load_group(panel.y.iter().map(|row| row[l]).collect());
            }
        }
        for (p, by_slot) in x.iter().enumerate() {
            let place = by_lunch.iter().flat_map(|&t| by_slot[t].iter().copied());
            model.add_branch_block(BranchBlock::InOrder(place.collect()));
            if let Some(panel) = &panel {
                model.add_branch_block(BranchBlock::LeastLoaded(panel.y[p].clone()));
            }
        }

        TierModel {
            tier: self.tier,
            model,
            slot_order,
            x,
            panel,
        }
    }

    fn add_slot_room_layer(
        &self,
        model: &mut Model,
        slot_order: &[usize],
        position_of: &HashMap<&str, usize>,
        rooms: usize,
    ) -> Vec<Vec<Vec<BoolVar>>> {
        let cfg = self.config;
        let positions = slot_order.len();
        let x: Vec<Vec<Vec<BoolVar>>> = cfg
            .projects
            .iter()
            .map(|_| {
                (0..positions)
                    .map(|_| (0..rooms).map(|_| model.new_var()).collect())
                    .collect()
            })
            .collect();

        for by_slot in &x {
            model.add_exactly_one(by_slot.iter().flatten().copied());
        }
        for t in 0..positions {
            for r in 0..rooms {
                model.add_at_most_one(x.iter().map(|by_slot| by_slot[t][r]));
            }
            // Rooms are interchangeable: fill them in index order.
            for r in 1..rooms {
                let this: Vec<BoolVar> = x.iter().map(|by_slot| by_slot[t][r]).collect();
                let prev: Vec<BoolVar> = x.iter().map(|by_slot| by_slot[t][r - 1]).collect();
                model.add_symmetry_le(&this, &prev);
            }
        }

        for (p, project) in cfg.projects.iter().enumerate() {
            let blocked = project
                .student_ids
                .iter()
                .filter_map(|sid| cfg.student(sid))
                .flat_map(|student| student.unavailable_slot_ids.iter())
                .filter_map(|slot_id| position_of.get(slot_id.as_str()));
            for &t in blocked {
                for &var in &x[p][t] {
                    model.fix(var, false);
                }
            }
        }
        x
    }

    fn add_panel_layer(
        &self,
        model: &mut Model,
        slot_order: &[usize],
        position_of: &HashMap<&str, usize>,
        x: &[Vec<Vec<BoolVar>>],
    ) -> PanelVars {
        let cfg = self.config;
        let positions = slot_order.len();
        let lecturers = cfg.lecturers.len();

        let y: Vec<Vec<BoolVar>> = x
            .iter()
            .map(|_| (0..lecturers).map(|_| model.new_var()).collect())
            .collect();
        let a: Vec<Vec<BoolVar>> = x
            .iter()
            .map(|_| (0..positions).map(|_| model.new_var()).collect())
            .collect();
        // z[p][l][t] = a[p][t] AND y[p][l]
        let z: Vec<Vec<Vec<BoolVar>>> = x
            .iter()
            .map(|_| {
                (0..lecturers)
                    .map(|_| (0..positions).map(|_| model.new_var()).collect())
                    .collect()
            })
            .collect();

        for (p, by_slot) in x.iter().enumerate() {
            for (t, by_room) in by_slot.iter().enumerate() {
                let mut terms = vec![(a[p][t], 1)];
                terms.extend(by_room.iter().map(|v| (*v, -1)));
                model.add_eq(terms, 0);
            }
            for l in 0..lecturers {
                for t in 0..positions {
                    let (zv, av, yv) = (z[p][l][t], a[p][t], y[p][l]);
                    model.add_le(vec![(zv, 1), (av, -1)], 0);
                    model.add_le(vec![(zv, 1), (yv, -1)], 0);
                    model.add_le(vec![(av, 1), (yv, 1), (zv, -1)], 1);
                }
            }
        }

        for (p, project) in cfg.projects.iter().enumerate() {
            let size = i64::from(cfg.panel_size_for(project));
            model.add_eq(y[p].iter().map(|v| (*v, 1)).collect(), size);

            if cfg.constraints.supervisor_must_attend {
                let supervisor = project
                    .supervisor_id
                    .as_deref()
                    .and_then(|id| cfg.lecturers.iter().position(|l| l.id == id));
                if let Some(l) = supervisor {
                    model.fix(y[p][l], true);
                }
            }
        }

        let mut positions_by_day: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (t, &i) in slot_order.iter().enumerate() {
            positions_by_day
                .entry(cfg.timeslots[i].day())
                .or_default()
                .push(t);
        }

        for (l, lecturer) in cfg.lecturers.iter().enumerate() {
            for slot_id in &lecturer.unavailable_slot_ids {
                let Some(&t) = position_of.get(slot_id.as_str()) else {
                    continue;
                };
                for p in 0..x.len() {
                    model.add_le(vec![(y[p][l], 1), (a[p][t], 1)], 1);
                }
            }

            for t in 0..positions {
                model.add_at_most_one((0..x.len()).map(|p| z[p][l][t]));
            }

            if let Some(cap) = lecturer.max_per_day {
                for day_positions in positions_by_day.values() {
                    let terms = (0..x.len())
                        .flat_map(|p| day_positions.iter().map(move |&t| (p, t)))
                        .map(|(p, t)| (z[p][l][t], 1))
                        .collect();
                    model.add_le(terms, i64::from(cap));
                }
            }

            if let Some(cap) = lecturer.max_total {
                model.add_le(y.iter().map(|row| (row[l], 1)).collect(), i64::from(cap));
            }
        }

        PanelVars { y, a }
    }

    fn add_objective(&self, model: &mut Model, lunch: &[bool], rooms: usize, panel: &PanelVars) {
        let cfg = self.config;
        let weights = cfg.constraints.weights;

        let positions = (0..lunch.len())
            .map(|t| panel.a.iter().map(|row| row[t]).collect())
            .collect();
        model.minimize(ObjectiveTerm::Span {
            weight: i64::from(weights.compactness),
            positions,
            min_used: if rooms == 0 { 0 } else { cfg.projects.len().div_ceil(rooms) },
        });

        let groups = cfg
            .lecturers
            .iter()
            .enumerate()
            .filter(|(_, lecturer)| {
                cfg.timeslots
                    .iter()
                    .any(|slot| lecturer.is_available_at(slot.id()))
            })
            .map(|(l, _)| panel.y.iter().map(|row| row[l]).collect())
            .collect();
        // Lecturers never available sit on no panel, so the groups share
        // every seat.
        let seats = cfg
            .projects
            .iter()
            .map(|project| i64::from(cfg.panel_size_for(project)))
            .sum();
        model.minimize(ObjectiveTerm::Spread {
            weight: i64::from(weights.workload_balance),
            groups,
            total: Some(seats),
        });

        let lunch_vars = panel
            .a
            .iter()
            .flat_map(|row| {
                row.iter()
                    .zip(lunch)
                    .filter(|(_, is_lunch)| **is_lunch)
                    .map(|(var, _)| *var)
            })
            .collect();
        model.minimize(ObjectiveTerm::Sum {
            weight: i64::from(weights.lunch_penalty),
            vars: lunch_vars,
        });
    }
}
