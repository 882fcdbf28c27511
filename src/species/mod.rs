//! Species placement: suitability, stochastic realization, cross-species
//! effects, and sign scattering.
//!
//! Species are processed in placement-rank order (predators first, plants
//! last) so that a species' effects only act on species placed after it.
pub mod effects;
pub mod placement;
pub mod signs;
pub mod suitability;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::grid::Grid;
use crate::rng::rand01;
use crate::rules::species::{SpeciesId, SpeciesRules, TargetIndex};
use crate::rules::terrain::{ClassTable, TerrainRules};
use crate::species::effects::EffectAccum;
use crate::species::signs::Sign;
use crate::terrain::distance_to;

pub use crate::species::signs::scatter_signs;
pub use crate::species::suitability::suitability_field;

/// Result of a full placement pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlacementOutput {
    /// Occurrence grid per present species; cell values are state codes,
    /// 0 meaning absent.
    pub occurrences: BTreeMap<SpeciesId, Grid<u8>>,
    pub signs: Vec<Sign>,
    /// Outcome of the per-world appearance roll for every species.
    pub presence: BTreeMap<SpeciesId, bool>,
}

/// Place every species onto the terrain.
pub fn place_all(
    species_rules: &SpeciesRules,
    terrain_rules: &TerrainRules,
    terrain: &Grid<u8>,
    corridors: &BTreeMap<String, Grid<bool>>,
    classes: &ClassTable,
    rng: &mut dyn Rng,
) -> Result<PlacementOutput> {
    let mut order: Vec<_> = species_rules.species.iter().collect();
    order.sort_by(|a, b| {
        a.category
            .placement_rank()
            .cmp(&b.category.placement_rank())
            .then_with(|| a.id.cmp(&b.id))
    });

    // One appearance roll per species, in placement order.
    let mut presence = BTreeMap::new();
    for def in &order {
        let present = match def.appearance_probability {
            Some(p) => rand01(rng) < p,
            None => true,
        };
        presence.insert(def.id.clone(), present);
    }

    let water_distance = if order
        .iter()
        .any(|d| d.distribution.max_water_distance.is_some())
    {
        let water = classes.resolve_set(&terrain_rules.water_classes)?;
        Some(distance_to(terrain, &water))
    } else {
        None
    };

    let index = TargetIndex::new(&species_rules.species);
    let mut accum = EffectAccum::new();
    let mut out = PlacementOutput {
        presence,
        ..PlacementOutput::default()
    };

    for def in order {
        if !out.presence[&def.id] {
            debug!(species = %def.id, "absent this world; skipping placement");
            out.occurrences
                .insert(def.id.clone(), Grid::new(terrain.cols(), terrain.rows(), 0u8));
            continue;
        }
        let suitability = suitability_field(def, terrain, corridors, water_distance.as_ref(), classes)?;
        let mut occ = placement::realize(def, &suitability, terrain_rules.grid.cell_size_m, rng);

        accum.apply_keep(&def.id, &mut occ, rng);
        accum.assign_states(&def.id, &mut occ, rng);
        accum.mark_finalized(&def.id);
        accum.accumulate_from(def, &occ, &index);

        out.signs
            .extend(scatter_signs(def, &occ, terrain, classes, rng)?);

        debug!(
            species = %def.id,
            placed = occ.data().iter().filter(|v| **v > 0).count(),
            "species placed"
        );
        out.occurrences.insert(def.id.clone(), occ);
    }

    out.signs.sort();
    out.signs.dedup();
    info!(
        species = out.occurrences.len(),
        signs = out.signs.len(),
        "placement pass complete"
    );
    Ok(out)
}
