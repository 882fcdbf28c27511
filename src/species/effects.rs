//! Cross-species ecological effects: exclusion, damage, state assignment.
use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::warn;

use crate::grid::Grid;
use crate::rng::rand01;
use crate::rules::species::{Effect, SpeciesDef, SpeciesId, StateLevel, TargetIndex};

/// Accumulated damage influence plus the state-transition table that applies.
#[derive(Clone, Debug)]
pub struct DamageAccum {
    pub field: Grid<f32>,
    pub levels: Vec<StateLevel>,
}

/// Running effect state across the placement pass.
///
/// Species are finalized in placement order; effects only flow from finalized
/// sources to not-yet-finalized targets, so earlier categories act on later
/// ones and never the other way around.
#[derive(Debug, Default)]
pub struct EffectAccum {
    keep: BTreeMap<SpeciesId, Grid<f32>>,
    damage: BTreeMap<SpeciesId, DamageAccum>,
    finalized: BTreeSet<SpeciesId>,
}

impl EffectAccum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_finalized(&mut self, id: &SpeciesId) {
        self.finalized.insert(id.clone());
    }

    pub fn damage_for(&self, id: &SpeciesId) -> Option<&DamageAccum> {
        self.damage.get(id)
    }

    /// Fold one source species' exclusion and damage effects into the
    /// accumulators for every targeted, not-yet-finalized species.
    pub fn accumulate_from(
        &mut self,
        source: &SpeciesDef,
        occurrences: &Grid<u8>,
        index: &TargetIndex,
    ) {
        for effect in &source.effects {
            match effect {
                Effect::Excludes {
                    target,
                    radius,
                    probability,
                } => {
                    let influence = influence_field(occurrences, *radius);
                    for id in index.resolve(target) {
                        if id == source.id {
                            continue;
                        }
                        if self.finalized.contains(&id) {
                            warn!(source = %source.id, target = %id,
                                "exclusion targets an already-placed species; ignored");
                            continue;
                        }
                        let keep = self.keep.entry(id).or_insert_with(|| {
                            Grid::new(occurrences.cols(), occurrences.rows(), 1.0)
                        });
                        for (x, y) in influence.coords() {
                            let inf = influence.get_or(x, y, 0.0);
                            if inf > 0.0 {
                                let kept = keep.get_or(x, y, 1.0) * (1.0 - probability * inf);
                                keep.set(x, y, kept);
                            }
                        }
                    }
                }
                Effect::Damages {
                    target,
                    radius,
                    probability,
                    levels,
                } => {
                    let influence = influence_field(occurrences, *radius);
                    for id in index.resolve(target) {
                        if id == source.id {
                            continue;
                        }
                        if self.finalized.contains(&id) {
                            warn!(source = %source.id, target = %id,
                                "damage targets an already-placed species; ignored");
                            continue;
                        }
                        let entry = self.damage.entry(id.clone());
                        let accum = match entry {
                            std::collections::btree_map::Entry::Vacant(v) => v.insert(DamageAccum {
                                field: Grid::new(occurrences.cols(), occurrences.rows(), 0.0),
                                levels: levels.clone(),
                            }),
                            std::collections::btree_map::Entry::Occupied(o) => {
                                // First transition table wins; overlapping
                                // damage takes the per-cell max.
                                o.into_mut()
                            }
                        };
                        for (x, y) in influence.coords() {
                            let scaled = probability * influence.get_or(x, y, 0.0);
                            if scaled > accum.field.get_or(x, y, 0.0) {
                                accum.field.set(x, y, scaled);
                            }
                        }
                    }
                }
                Effect::CreatesSign { .. } => {}
            }
        }
    }

    /// Re-roll each occurrence against its cell's keep probability.
    pub fn apply_keep(&self, id: &SpeciesId, occ: &mut Grid<u8>, rng: &mut dyn Rng) {
        let Some(keep) = self.keep.get(id) else {
            return;
        };
        for (x, y) in occ.coords() {
            if occ.get_or(x, y, 0) == 0 {
                continue;
            }
            let p = keep.get_or(x, y, 1.0).clamp(0.0, 1.0);
            if p < 1.0 && rand01(rng) >= p {
                occ.set(x, y, 0);
            }
        }
    }

    /// Assign state codes from accumulated damage influence.
    ///
    /// The first level whose threshold is at least the influence wins; a
    /// weighted draw over that level's states picks the code. Undamaged
    /// occurrences keep state 1.
    pub fn assign_states(&self, id: &SpeciesId, occ: &mut Grid<u8>, rng: &mut dyn Rng) {
        let Some(accum) = self.damage.get(id) else {
            return;
        };
        for (x, y) in occ.coords() {
            if occ.get_or(x, y, 0) == 0 {
                continue;
            }
            let influence = accum.field.get_or(x, y, 0.0);
            if influence <= 0.0 {
                continue;
            }
            let level = accum.levels.iter().find(|l| l.threshold >= influence);
            let Some(level) = level else {
                continue;
            };
            if let Some(code) = draw_state(level, rng) {
                occ.set(x, y, code);
            }
        }
    }
}

fn draw_state(level: &StateLevel, rng: &mut dyn Rng) -> Option<u8> {
    let total: f32 = level.states.iter().map(|s| s.weight.max(0.0)).sum();
    if total <= 0.0 {
        return level.states.first().map(|s| s.code);
    }
    let mut roll = rand01(rng) * total;
    for state in &level.states {
        roll -= state.weight.max(0.0);
        if roll < 0.0 {
            return Some(state.code);
        }
    }
    level.states.last().map(|s| s.code)
}

/// Radial influence field around every occurrence of a source species.
///
/// Linear falloff from 1 at the source cell to 0 at `radius`; overlapping
/// sources combine by per-cell max.
pub fn influence_field(occurrences: &Grid<u8>, radius: f32) -> Grid<f32> {
    let mut field = Grid::new(occurrences.cols(), occurrences.rows(), 0.0f32);
    if radius <= 0.0 {
        return field;
    }
    let r = radius.ceil() as i32;
    for (sx, sy) in occurrences.coords() {
        if occurrences.get_or(sx, sy, 0) == 0 {
            continue;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d > radius {
                    continue;
                }
                let inf = 1.0 - d / radius;
                let (x, y) = (sx + dx, sy + dy);
                if inf > field.get_or(x, y, f32::INFINITY) {
                    field.set(x, y, inf);
                }
            }
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::rules::species::test_fixtures::{animal_species, vegetation_species};
    use crate::rules::species::{Category, Clustering, StateChoice, TargetSelector};

    fn single_source(cols: usize, rows: usize, x: i32, y: i32) -> Grid<u8> {
        let mut occ = Grid::new(cols, rows, 0u8);
        occ.set(x, y, 1);
        occ
    }

    #[test]
    fn influence_is_one_at_source_and_fades_linearly() {
        let occ = single_source(9, 9, 4, 4);
        let field = influence_field(&occ, 4.0);
        assert_eq!(field.get_or(4, 4, 0.0), 1.0);
        assert!((field.get_or(6, 4, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(field.get_or(8, 8, 1.0), 0.0);
    }

    #[test]
    fn overlapping_sources_take_the_max() {
        let mut occ = Grid::new(9, 1, 0u8);
        occ.set(0, 0, 1);
        occ.set(4, 0, 1);
        let field = influence_field(&occ, 4.0);
        // Cell 2 is distance 2 from both sources; max of two 0.5 values.
        assert!((field.get_or(2, 0, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(field.get_or(4, 0, 0.0), 1.0);
    }

    #[test]
    fn full_probability_exclusion_clears_the_source_cell() {
        let mut wolf = animal_species("wolf", Category::Predator, "woodland", 1.0);
        wolf.effects.push(Effect::Excludes {
            target: TargetSelector::Category(Category::LargeHerbivore),
            radius: 3.0,
            probability: 1.0,
        });
        let deer = animal_species("deer", Category::LargeHerbivore, "woodland", 1.0);
        let index = TargetIndex::new(&[wolf.clone(), deer.clone()]);

        let mut accum = EffectAccum::new();
        accum.mark_finalized(&wolf.id);
        accum.accumulate_from(&wolf, &single_source(7, 7, 3, 3), &index);

        // Deer exactly on the wolf cell: keep probability 0, always dropped.
        let mut occ = single_source(7, 7, 3, 3);
        let mut rng = StdRng::seed_from_u64(2);
        accum.apply_keep(&deer.id, &mut occ, &mut rng);
        assert_eq!(occ.get_or(3, 3, 9), 0);
    }

    #[test]
    fn exclusion_monotonicity_in_probability() {
        let deer = animal_species("deer", Category::LargeHerbivore, "woodland", 1.0);
        let mut survivors = Vec::new();
        for probability in [0.2f32, 0.8] {
            let mut wolf = animal_species("wolf", Category::Predator, "woodland", 1.0);
            wolf.effects.push(Effect::Excludes {
                target: TargetSelector::Category(Category::LargeHerbivore),
                radius: 6.0,
                probability,
            });
            let index = TargetIndex::new(&[wolf.clone(), deer.clone()]);
            let mut accum = EffectAccum::new();
            accum.accumulate_from(&wolf, &single_source(13, 13, 6, 6), &index);

            let mut occ = Grid::new(13, 13, 1u8);
            let mut rng = StdRng::seed_from_u64(42);
            accum.apply_keep(&deer.id, &mut occ, &mut rng);
            survivors.push(occ.data().iter().filter(|v| **v > 0).count());
        }
        assert!(
            survivors[0] >= survivors[1],
            "higher probability should not increase survivors: {survivors:?}"
        );
    }

    #[test]
    fn damage_levels_assign_states_by_threshold() {
        let mut boar = animal_species("boar", Category::LargeHerbivore, "woodland", 1.0);
        boar.effects.push(Effect::Damages {
            target: TargetSelector::Category(Category::Plant),
            radius: 2.0,
            probability: 1.0,
            levels: vec![
                StateLevel {
                    threshold: 0.4,
                    states: vec![StateChoice {
                        name: "nibbled".into(),
                        code: 2,
                        weight: 1.0,
                    }],
                },
                StateLevel {
                    threshold: 1.0,
                    states: vec![StateChoice {
                        name: "trampled".into(),
                        code: 3,
                        weight: 1.0,
                    }],
                },
            ],
        });
        let reed = vegetation_species("reed", "marsh", 1.0, Clustering::Continuous);
        let index = TargetIndex::new(&[boar.clone(), reed.clone()]);

        let mut accum = EffectAccum::new();
        accum.accumulate_from(&boar, &single_source(9, 9, 4, 4), &index);

        let mut occ = Grid::new(9, 9, 1u8);
        let mut rng = StdRng::seed_from_u64(6);
        accum.assign_states(&reed.id, &mut occ, &mut rng);

        // On the source cell influence is 1.0: second level.
        assert_eq!(occ.get_or(4, 4, 0), 3);
        // Distance 1 of radius 2 gives influence 0.5: still the 1.0 level.
        assert_eq!(occ.get_or(5, 4, 0), 3);
        // Out of radius: untouched state 1.
        assert_eq!(occ.get_or(8, 8, 0), 1);
    }

    #[test]
    fn effects_never_reach_finalized_species() {
        let mut wolf = animal_species("wolf", Category::Predator, "woodland", 1.0);
        wolf.effects.push(Effect::Excludes {
            target: TargetSelector::Category(Category::LargeHerbivore),
            radius: 3.0,
            probability: 1.0,
        });
        let deer = animal_species("deer", Category::LargeHerbivore, "woodland", 1.0);
        let index = TargetIndex::new(&[wolf.clone(), deer.clone()]);

        let mut accum = EffectAccum::new();
        accum.mark_finalized(&deer.id);
        accum.accumulate_from(&wolf, &single_source(7, 7, 3, 3), &index);

        let mut occ = single_source(7, 7, 3, 3);
        let mut rng = StdRng::seed_from_u64(2);
        accum.apply_keep(&deer.id, &mut occ, &mut rng);
        assert_eq!(occ.get_or(3, 3, 9), 1);
    }
}
