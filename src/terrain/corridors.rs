//! Derived movement corridors: water-edge buffer, ecotone, game trails.
use std::collections::BTreeMap;
use std::collections::BinaryHeap;

use tracing::{debug, info};

use crate::error::Result;
use crate::grid::Grid;
use crate::rules::terrain::{ClassTable, TerrainRules};
use crate::terrain::cost::distance_to;

const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Compute all corridor masks for a terrain grid.
///
/// Masks may overlap each other and any terrain class; they are recomputed
/// together with terrain and never partially stale.
pub fn generate_corridors(
    terrain: &Grid<u8>,
    cost: &Grid<f32>,
    rules: &TerrainRules,
    classes: &ClassTable,
) -> Result<BTreeMap<String, Grid<bool>>> {
    let water = classes.resolve_set(&rules.water_classes)?;

    let mut masks = BTreeMap::new();
    masks.insert(
        "water_edge".to_owned(),
        water_edge(terrain, &water, rules.corridors.water_edge.width),
    );
    masks.insert(
        "ecotone".to_owned(),
        ecotone(terrain, rules.corridors.ecotone.width),
    );
    masks.insert("game_trail".to_owned(), game_trails(terrain, cost, rules, classes)?);

    for (name, mask) in &masks {
        info!(corridor = name.as_str(), cells = mask.count_set(), "corridor mask built");
    }
    Ok(masks)
}

/// Cells within `width` of water but not water themselves.
fn water_edge(terrain: &Grid<u8>, water: &[u8], width: f32) -> Grid<bool> {
    let dist = distance_to(terrain, water);
    let mut mask = Grid::new(terrain.cols(), terrain.rows(), false);
    for (x, y) in terrain.coords() {
        let d = dist.get_or(x, y, f32::INFINITY);
        mask.set(x, y, d > 0.0 && d <= width);
    }
    mask
}

/// Cells with a 4-neighbor in a different terrain class, optionally dilated.
fn ecotone(terrain: &Grid<u8>, width: u32) -> Grid<bool> {
    let mut edges = Grid::new(terrain.cols(), terrain.rows(), false);
    for (x, y) in terrain.coords() {
        let class = terrain.get_or(x, y, 0);
        let boundary = [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .iter()
            .any(|&(dx, dy)| {
                terrain
                    .get(x + dx, y + dy)
                    .is_some_and(|other| *other != class)
            });
        edges.set(x, y, boundary);
    }
    if width == 0 {
        return edges;
    }

    // Chebyshev (box) dilation.
    let r = width as i32;
    let mut dilated = Grid::new(terrain.cols(), terrain.rows(), false);
    for (x, y) in edges.coords() {
        if !edges.get_or(x, y, false) {
            continue;
        }
        for dy in -r..=r {
            for dx in -r..=r {
                dilated.set(x + dx, y + dy, true);
            }
        }
    }
    dilated
}

/// Union of up to `count` A* paths from the from-class set to the to-class set.
fn game_trails(
    terrain: &Grid<u8>,
    cost: &Grid<f32>,
    rules: &TerrainRules,
    classes: &ClassTable,
) -> Result<Grid<bool>> {
    let trail = &rules.corridors.game_trail;
    let mut mask = Grid::new(terrain.cols(), terrain.rows(), false);
    if trail.count == 0 {
        return Ok(mask);
    }
    let from = classes.resolve_set(&trail.from)?;
    let to = classes.resolve_set(&trail.to)?;

    let mut starts: Vec<(i32, i32)> = terrain
        .coords()
        .filter(|&(x, y)| from.contains(&terrain.get_or(x, y, 0)))
        .collect();
    let goals: Vec<(i32, i32)> = terrain
        .coords()
        .filter(|&(x, y)| to.contains(&terrain.get_or(x, y, 0)))
        .collect();
    if starts.is_empty() || goals.is_empty() {
        debug!("no trail endpoints available; skipping game trails");
        return Ok(mask);
    }

    // Down-sample overly dense start candidates with an even stride so the
    // mask depends only on terrain and rules, never the rng.
    if starts.len() > trail.count * 2 {
        starts = stride_sample(&starts, trail.count * 2);
    }
    let picked = stride_sample(&starts, trail.count);

    let mut found = 0usize;
    for start in picked {
        let goal = nearest(start, &goals);
        match astar(cost, start, goal) {
            Some(path) => {
                found += 1;
                for (x, y) in path {
                    mask.set(x, y, true);
                }
            }
            None => {
                // A blocked pair just omits that trail.
                debug!(?start, ?goal, "no path for trail pair; skipped");
            }
        }
    }
    info!(found, requested = trail.count, "game trail search finished");
    Ok(mask)
}

fn stride_sample(cells: &[(i32, i32)], limit: usize) -> Vec<(i32, i32)> {
    if cells.len() <= limit || limit == 0 {
        return cells.to_vec();
    }
    (0..limit)
        .map(|i| cells[i * cells.len() / limit])
        .collect()
}

fn nearest(from: (i32, i32), candidates: &[(i32, i32)]) -> (i32, i32) {
    let mut best = candidates[0];
    let mut best_d = i64::MAX;
    for &c in candidates {
        let dx = (c.0 - from.0) as i64;
        let dy = (c.1 - from.1) as i64;
        let d = dx * dx + dy * dy;
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// Open-set entry; min-ordered by f-score with insertion order as tie-break
/// so searches are deterministic for a fixed seed.
#[derive(Debug, PartialEq)]
struct OpenEntry {
    f: f32,
    seq: u64,
    cell: (i32, i32),
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest f first.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn euclid(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0) as f32;
    let dy = (a.1 - b.1) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// A* over the cost grid: 8-connected, diagonal steps cost sqrt(2) times the
/// per-cell cost, Euclidean heuristic.
fn astar(cost: &Grid<f32>, start: (i32, i32), goal: (i32, i32)) -> Option<Vec<(i32, i32)>> {
    const STEPS: [(i32, i32, f32); 8] = [
        (1, 0, 1.0),
        (-1, 0, 1.0),
        (0, 1, 1.0),
        (0, -1, 1.0),
        (1, 1, SQRT_2),
        (1, -1, SQRT_2),
        (-1, 1, SQRT_2),
        (-1, -1, SQRT_2),
    ];

    let mut g = Grid::new(cost.cols(), cost.rows(), f32::INFINITY);
    let mut parent: Grid<i64> = Grid::new(cost.cols(), cost.rows(), -1);
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    g.set(start.0, start.1, 0.0);
    open.push(OpenEntry {
        f: euclid(start, goal),
        seq,
        cell: start,
    });

    while let Some(OpenEntry { cell, .. }) = open.pop() {
        if cell == goal {
            return Some(walk_back(&parent, cost.cols(), start, goal));
        }
        let g_here = g.get_or(cell.0, cell.1, f32::INFINITY);

        for &(dx, dy, step) in &STEPS {
            let next = (cell.0 + dx, cell.1 + dy);
            let Some(&cell_cost) = cost.get(next.0, next.1) else {
                continue;
            };
            let tentative = g_here + cell_cost * step;
            if tentative < g.get_or(next.0, next.1, f32::INFINITY) {
                g.set(next.0, next.1, tentative);
                parent.set(
                    next.0,
                    next.1,
                    (cell.1 as i64) * cost.cols() as i64 + cell.0 as i64,
                );
                seq += 1;
                open.push(OpenEntry {
                    f: tentative + euclid(next, goal),
                    seq,
                    cell: next,
                });
            }
        }
    }
    None
}

fn walk_back(parent: &Grid<i64>, cols: usize, start: (i32, i32), goal: (i32, i32)) -> Vec<(i32, i32)> {
    let mut path = vec![goal];
    let mut cell = goal;
    while cell != start {
        let p = parent.get_or(cell.0, cell.1, -1);
        if p < 0 {
            break;
        }
        cell = ((p % cols as i64) as i32, (p / cols as i64) as i32);
        path.push(cell);
    }
    path.reverse();
    path
}
