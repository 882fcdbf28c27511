//! Terrain rasterization from radial lake zones plus ordered shape overlays.
use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::grid::Grid;
use crate::rng::{rand_range_f32, rand_range_i32};
use crate::rules::terrain::{ClassTable, ResolvedChoice, TerrainRules};

/// Rasterize terrain rules into a class grid.
///
/// Later stages unconditionally overwrite earlier ones: radial lake zones,
/// then override shapes in declaration order, then the platform stamp, then
/// random patches. All randomness comes from `rng`, so output is fully
/// deterministic for a given seed and rule set.
pub fn rasterize(
    rules: &TerrainRules,
    classes: &ClassTable,
    rng: &mut dyn Rng,
) -> Result<Grid<u8>> {
    let cols = rules.grid.cols;
    let rows = rules.grid.rows;

    // Resolve every class name up front; a bad rule set fails before any draw.
    let lakes: Vec<(usize, Vec<(f32, ResolvedChoice)>)> = rules
        .lakes
        .iter()
        .enumerate()
        .map(|(i, lake)| {
            let zones = lake
                .zones
                .iter()
                .map(|z| Ok((z.limit, classes.resolve_choice(&z.terrain)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok((i, zones))
        })
        .collect::<Result<Vec<_>>>()?;
    let default_choice = classes.resolve_choice(&rules.default)?;
    let overlays: Vec<(usize, u8)> = rules
        .overlays
        .iter()
        .enumerate()
        .map(|(i, zone)| Ok((i, classes.resolve(&zone.terrain)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut terrain = Grid::new(cols, rows, 0u8);

    // Radial base pass: first lake whose zone list covers the cell's noisy
    // normalized distance wins; beyond every lake the rule default applies.
    for y in 0..rows as i32 {
        for x in 0..cols as i32 {
            let mut class = None;
            for (lake_idx, zones) in &lakes {
                let lake = &rules.lakes[*lake_idx];
                let dx = (x as f32 - lake.center.x) / lake.radius.x.max(f32::MIN_POSITIVE);
                let dy = (y as f32 - lake.center.y) / lake.radius.y.max(f32::MIN_POSITIVE);
                let mut dist = (dx * dx + dy * dy).sqrt();
                if lake.noise > 0.0 {
                    dist += rand_range_f32(rng, -lake.noise, lake.noise);
                }
                if let Some((_, choice)) = zones.iter().find(|(limit, _)| dist < *limit) {
                    class = Some(choice.pick(rng));
                    break;
                }
            }
            let class = match class {
                Some(c) => c,
                None => default_choice.pick(rng),
            };
            terrain.set(x, y, class);
        }
    }

    // Override shapes, later shapes taking precedence.
    for (idx, class) in &overlays {
        let shape = &rules.overlays[*idx].shape;
        let (min_x, min_y, max_x, max_y) = shape.bounds();
        for y in min_y.max(0)..=max_y.min(rows as i32 - 1) {
            for x in min_x.max(0)..=max_x.min(cols as i32 - 1) {
                if shape.contains(x, y) {
                    terrain.set(x, y, *class);
                }
            }
        }
    }

    // Platform stamp centered at spawn.
    if let Some(platform) = &rules.platform {
        let class = classes.resolve(&platform.class)?;
        let half = platform.size as i32 / 2;
        let (sx, sy) = rules.spawn;
        for dy in -half..=half {
            for dx in -half..=half {
                terrain.set(sx + dx, sy + dy, class);
            }
        }
    }

    // Random circular patches, skipping protected classes.
    if let Some(patches) = &rules.patches {
        let class = classes.resolve(&patches.class)?;
        let protected = classes.resolve_set(&patches.protected)?;
        let (min_x, min_y, max_x, max_y) = patches.region;
        for _ in 0..patches.count {
            let cx = rand_range_i32(rng, min_x, max_x);
            let cy = rand_range_i32(rng, min_y, max_y);
            let radius = rand_range_i32(rng, patches.radius.0 as i32, patches.radius.1 as i32);
            debug!(cx, cy, radius, "stamping patch");
            for y in cy - radius..=cy + radius {
                for x in cx - radius..=cx + radius {
                    let dx = x - cx;
                    let dy = y - cy;
                    if dx * dx + dy * dy >= radius * radius {
                        continue;
                    }
                    if let Some(current) = terrain.get(x, y) {
                        if !protected.contains(current) {
                            terrain.set(x, y, class);
                        }
                    }
                }
            }
        }
    }

    Ok(terrain)
}
