//! Per-cell suitability fields for species placement.
use std::collections::BTreeMap;

use crate::error::Result;
use crate::grid::Grid;
use crate::rules::species::SpeciesDef;
use crate::rules::terrain::ClassTable;

/// Build the suitability field for one species.
///
/// Terrain-class weights seed the field, corridor bonuses multiply member
/// cells, and a max-water-distance constraint zeroes everything beyond it.
pub fn suitability_field(
    def: &SpeciesDef,
    terrain: &Grid<u8>,
    corridors: &BTreeMap<String, Grid<bool>>,
    water_distance: Option<&Grid<f32>>,
    classes: &ClassTable,
) -> Result<Grid<f32>> {
    let mut weight_by_class = [0.0f32; 256];
    for (name, weight) in &def.distribution.terrain_weights {
        weight_by_class[classes.resolve(name)? as usize] = *weight;
    }

    let mut field = Grid::new(terrain.cols(), terrain.rows(), 0.0f32);
    for (x, y) in terrain.coords() {
        let mut score = weight_by_class[terrain.get_or(x, y, 0) as usize];
        if score <= 0.0 {
            continue;
        }
        for (corridor, bonus) in &def.distribution.corridor_bonus {
            if corridors
                .get(corridor)
                .is_some_and(|mask| mask.get_or(x, y, false))
            {
                score *= bonus;
            }
        }
        field.set(x, y, score);
    }

    if let (Some(max), Some(dist)) = (def.distribution.max_water_distance, water_distance) {
        for (x, y) in field.coords() {
            if dist.get_or(x, y, f32::INFINITY) > max {
                field.set(x, y, 0.0);
            }
        }
    }
    Ok(field)
}
