//! Stochastic realization of occurrences from a suitability field.
use rand::Rng;
use tracing::debug;

use crate::grid::Grid;
use crate::rng::{poisson_knuth, rand01, rand_index, rand_range_f32, rand_range_i32};
use crate::rules::species::{Clustering, PlacementMode, SpeciesDef};

/// Realize discrete occurrence cells for one species.
///
/// The returned grid holds 1 where an occurrence was placed; state codes are
/// assigned later by the effect pass. An empty eligible set places nothing.
pub fn realize(
    def: &SpeciesDef,
    suitability: &Grid<f32>,
    cell_size_m: f32,
    rng: &mut dyn Rng,
) -> Grid<u8> {
    let mut occ = Grid::new(suitability.cols(), suitability.rows(), 0u8);

    let eligible: Vec<(i32, i32)> = suitability
        .coords()
        .filter(|&(x, y)| suitability.get_or(x, y, 0.0) > 0.0)
        .collect();
    if eligible.is_empty() {
        debug!(species = %def.id, "no eligible cells; placing nothing");
        return occ;
    }

    match &def.distribution.placement {
        PlacementMode::Vegetation {
            base_density,
            clustering,
        } => place_vegetation(suitability, &eligible, *base_density, clustering, &mut occ, rng),
        PlacementMode::Animal {
            density_per_km2,
            group_size,
            group_spread,
        } => {
            let area_km2 = suitability.cols() as f32 * suitability.rows() as f32
                * (cell_size_m / 1000.0)
                * (cell_size_m / 1000.0);
            place_animals(
                suitability,
                &eligible,
                *density_per_km2 * area_km2,
                *group_size,
                *group_spread,
                &mut occ,
                rng,
            );
        }
    }
    occ
}

fn place_vegetation(
    suitability: &Grid<f32>,
    eligible: &[(i32, i32)],
    base_density: f32,
    clustering: &Clustering,
    occ: &mut Grid<u8>,
    rng: &mut dyn Rng,
) {
    match clustering {
        Clustering::Stand { radius, count } => {
            let mean_radius = (radius.0 + radius.1) * 0.5;
            let mean_area = (std::f32::consts::PI * mean_radius * mean_radius).max(1.0);
            let centers = (eligible.len() as f32 * base_density / mean_area).round() as usize;
            for _ in 0..centers {
                let (cx, cy) = eligible[rand_index(rng, eligible.len())];
                let r = rand_range_f32(rng, radius.0, radius.1);
                let n = rand_range_i32(rng, count.0 as i32, count.1 as i32);
                for _ in 0..n {
                    // Uniform in disk: sqrt keeps area density even.
                    let ru = r * rand01(rng).sqrt();
                    let theta = 2.0 * std::f32::consts::PI * rand01(rng);
                    let x = cx + (ru * theta.cos()).round() as i32;
                    let y = cy + (ru * theta.sin()).round() as i32;
                    if suitability.get_or(x, y, 0.0) > 0.0 {
                        occ.set(x, y, 1);
                    }
                }
            }
        }
        Clustering::Clump { count } => {
            // Clumps cover a 3x3 neighborhood; nine cells of mean area.
            let centers = (eligible.len() as f32 * base_density / 9.0).round() as usize;
            for _ in 0..centers {
                let (cx, cy) = eligible[rand_index(rng, eligible.len())];
                let n = rand_range_i32(rng, count.0 as i32, count.1 as i32);
                for _ in 0..n {
                    let x = cx + rand_range_i32(rng, -1, 1);
                    let y = cy + rand_range_i32(rng, -1, 1);
                    if suitability.get_or(x, y, 0.0) > 0.0 {
                        occ.set(x, y, 1);
                    }
                }
            }
        }
        Clustering::Continuous => {
            bernoulli_pass(suitability, eligible, base_density * 3.0, occ, rng);
        }
        Clustering::Uniform => {
            bernoulli_pass(suitability, eligible, base_density, occ, rng);
        }
    }
}

/// Independent per-cell draw at `suitability * factor`, clamped to [0, 1].
///
/// The clamp makes a saturated probability mean "always place", which keeps
/// the dense-reed-bed boundary case well-defined.
fn bernoulli_pass(
    suitability: &Grid<f32>,
    eligible: &[(i32, i32)],
    factor: f32,
    occ: &mut Grid<u8>,
    rng: &mut dyn Rng,
) {
    for &(x, y) in eligible {
        let p = (suitability.get_or(x, y, 0.0) * factor).clamp(0.0, 1.0);
        if p >= 1.0 || rand01(rng) < p {
            occ.set(x, y, 1);
        }
    }
}

fn place_animals(
    suitability: &Grid<f32>,
    eligible: &[(i32, i32)],
    population: f32,
    group_size: f32,
    spread: i32,
    occ: &mut Grid<u8>,
    rng: &mut dyn Rng,
) {
    if population <= 0.0 || group_size <= 0.0 {
        return;
    }
    let groups = (population / group_size).round() as usize;

    // Cumulative suitability for proportional anchor draws.
    let mut cumulative = Vec::with_capacity(eligible.len());
    let mut total = 0.0f32;
    for &(x, y) in eligible {
        total += suitability.get_or(x, y, 0.0);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return;
    }

    for _ in 0..groups {
        let roll = rand01(rng) * total;
        let idx = cumulative.partition_point(|&c| c <= roll).min(eligible.len() - 1);
        let (ax, ay) = eligible[idx];

        let members = poisson_knuth(group_size, rng);
        for _ in 0..members {
            // A handful of attempts per member; a crowded anchor just loses
            // the member rather than stalling generation.
            for _ in 0..8 {
                let x = ax + rand_range_i32(rng, -spread, spread);
                let y = ay + rand_range_i32(rng, -spread, spread);
                if suitability.get_or(x, y, 0.0) > 0.0 {
                    occ.set(x, y, 1);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::rules::species::test_fixtures::{animal_species, vegetation_species};
    use crate::rules::species::Category;

    fn flat_suitability(cols: usize, rows: usize, score: f32) -> Grid<f32> {
        Grid::new(cols, rows, score)
    }

    #[test]
    fn zero_density_animal_places_nothing() {
        let def = animal_species("deer", Category::LargeHerbivore, "woodland", 0.0);
        let suit = flat_suitability(10, 10, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let occ = realize(&def, &suit, 100.0, &mut rng);
        assert!(occ.data().iter().all(|v| *v == 0));
    }

    #[test]
    fn saturated_continuous_covers_every_eligible_cell() {
        // suitability 1.0, density 1.0, x3 factor saturates the clamp.
        let def = vegetation_species("reed", "marsh", 1.0, Clustering::Continuous);
        let suit = flat_suitability(10, 10, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let occ = realize(&def, &suit, 10.0, &mut rng);
        assert!(occ.data().iter().all(|v| *v == 1));
    }

    #[test]
    fn uniform_density_controls_expected_coverage() {
        let def = vegetation_species("moss", "marsh", 0.3, Clustering::Uniform);
        let suit = flat_suitability(50, 50, 1.0);
        let mut rng = StdRng::seed_from_u64(21);
        let occ = realize(&def, &suit, 10.0, &mut rng);
        let placed = occ.data().iter().filter(|v| **v > 0).count();
        // 2500 cells at p = 0.3: mean 750, generous tolerance.
        assert!((500..1000).contains(&placed), "placed {placed}");
    }

    #[test]
    fn stands_cluster_and_respect_suitability() {
        let def = vegetation_species(
            "birch",
            "woodland",
            0.8,
            Clustering::Stand {
                radius: (2.0, 4.0),
                count: (4, 8),
            },
        );
        let mut suit = flat_suitability(20, 20, 1.0);
        // Poison half the map.
        for y in 0..20 {
            for x in 10..20 {
                suit.set(x, y, 0.0);
            }
        }
        let mut rng = StdRng::seed_from_u64(8);
        let occ = realize(&def, &suit, 10.0, &mut rng);
        for (x, y) in occ.coords() {
            if occ.get_or(x, y, 0) > 0 {
                assert!(x < 10, "occurrence on zero-suitability cell at ({x}, {y})");
            }
        }
        assert!(occ.data().iter().any(|v| *v > 0));
    }

    #[test]
    fn animal_population_scales_with_map_area() {
        let def = animal_species("deer", Category::LargeHerbivore, "woodland", 50.0);
        let suit = flat_suitability(30, 30, 1.0);
        // 30x30 cells at 100 m: 9 km2, so around 450 animals.
        let mut rng = StdRng::seed_from_u64(13);
        let occ = realize(&def, &suit, 100.0, &mut rng);
        let placed = occ.data().iter().filter(|v| **v > 0).count();
        assert!(placed > 100, "placed {placed}");
    }

    #[test]
    fn same_seed_same_layout() {
        let def = animal_species("boar", Category::LargeHerbivore, "woodland", 20.0);
        let suit = flat_suitability(15, 15, 1.0);
        let mut rng_a = StdRng::seed_from_u64(77);
        let mut rng_b = StdRng::seed_from_u64(77);
        assert_eq!(
            realize(&def, &suit, 100.0, &mut rng_a),
            realize(&def, &suit, 100.0, &mut rng_b)
        );
    }
}
