//! Physical sign markers scattered around species occurrences.
use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::Grid;
use crate::rng::rand01;
use crate::rules::species::{Effect, SpeciesDef};
use crate::rules::terrain::ClassTable;

/// One placed sign marker.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sign {
    pub sign_type: String,
    pub x: i32,
    pub y: i32,
}

/// Scatter signs for every `CreatesSign` effect of one species.
///
/// Each occurrence seeds a disk of candidate cells; every cell at distance
/// `d <= radius` is rolled independently and accepted with probability
/// `p * (1 - d / (radius + 1))`, so signs thin out toward the rim while the
/// source cell is accepted with the full base probability. At most one sign
/// of a given type lands on a cell.
pub fn scatter_signs(
    def: &SpeciesDef,
    occurrences: &Grid<u8>,
    terrain: &Grid<u8>,
    classes: &ClassTable,
    rng: &mut dyn Rng,
) -> Result<Vec<Sign>> {
    let mut placed: BTreeSet<Sign> = BTreeSet::new();

    for effect in &def.effects {
        let Effect::CreatesSign {
            sign_type,
            radius,
            probability,
            terrain_filter,
        } = effect
        else {
            continue;
        };
        let allowed = match terrain_filter {
            Some(names) => Some(classes.resolve_set(names)?),
            None => None,
        };
        let r = radius.ceil().max(0.0) as i32;

        for (sx, sy) in occurrences.coords() {
            if occurrences.get_or(sx, sy, 0) == 0 {
                continue;
            }
            for dy in -r..=r {
                for dx in -r..=r {
                    let (x, y) = (sx + dx, sy + dy);
                    if !terrain.in_bounds(x, y) {
                        continue;
                    }
                    let d = ((dx * dx + dy * dy) as f32).sqrt();
                    if d > *radius {
                        continue;
                    }
                    if let Some(allowed) = &allowed {
                        if !allowed.contains(&terrain.get_or(x, y, 0)) {
                            continue;
                        }
                    }
                    let accept = probability * (1.0 - d / (radius + 1.0));
                    if rand01(rng) < accept {
                        placed.insert(Sign {
                            sign_type: sign_type.clone(),
                            x,
                            y,
                        });
                    }
                }
            }
        }
    }
    Ok(placed.into_iter().collect())
}
