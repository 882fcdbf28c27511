//! Traversal cost grids and the exact Euclidean distance transform.
//!
//! The distance transform uses the Felzenszwalb-Huttenlocher lower-envelope
//! algorithm: two separable 1D passes over squared distances, exact for any
//! binary mask.
use crate::error::Result;
use crate::grid::Grid;
use crate::rules::terrain::{ClassTable, TerrainRules};

/// Per-cell traversal cost from the rule cost table.
///
/// Classes missing from the table cost 1.0.
pub fn build_cost(
    terrain: &Grid<u8>,
    rules: &TerrainRules,
    classes: &ClassTable,
) -> Result<Grid<f32>> {
    let mut by_class = [1.0f32; 256];
    for (name, cost) in &rules.cost {
        by_class[classes.resolve(name)? as usize] = *cost;
    }

    let mut cost = Grid::new(terrain.cols(), terrain.rows(), 1.0f32);
    for (x, y) in terrain.coords() {
        cost.set(x, y, by_class[terrain.get_or(x, y, 0) as usize]);
    }
    Ok(cost)
}

/// Exact Euclidean distance from every cell to the nearest cell whose class is
/// in `class_set`; cells inside the set have distance 0.
pub fn distance_to(terrain: &Grid<u8>, class_set: &[u8]) -> Grid<f32> {
    let cols = terrain.cols();
    let rows = terrain.rows();

    // Squared-distance seed: 0 inside the set, effectively infinite outside.
    let far = (cols * cols + rows * rows) as f32;
    let mut field = vec![far; cols * rows];
    for (i, class) in terrain.data().iter().enumerate() {
        if class_set.contains(class) {
            field[i] = 0.0;
        }
    }

    // Row pass.
    let mut scratch = vec![0.0f32; cols];
    for y in 0..rows {
        let row = y * cols..(y + 1) * cols;
        lower_envelope_1d(&field[row.clone()], &mut scratch);
        field[row].copy_from_slice(&scratch);
    }

    // Column pass.
    let mut col_in = vec![0.0f32; rows];
    let mut col_out = vec![0.0f32; rows];
    for x in 0..cols {
        for y in 0..rows {
            col_in[y] = field[y * cols + x];
        }
        lower_envelope_1d(&col_in, &mut col_out);
        for y in 0..rows {
            field[y * cols + x] = col_out[y];
        }
    }

    for v in &mut field {
        *v = v.sqrt();
    }
    Grid::from_data(cols, rows, field).expect("field matches grid dimensions")
}

/// 1D squared-distance transform via the lower envelope of parabolas.
fn lower_envelope_1d(f: &[f32], out: &mut [f32]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    debug_assert_eq!(n, out.len());

    let mut hull = vec![0usize; n];
    let mut bounds = vec![0.0f32; n + 1];
    let mut k = 0;
    bounds[0] = f32::NEG_INFINITY;
    bounds[1] = f32::INFINITY;

    for q in 1..n {
        // Pop parabolas the new one dominates; bounds[0] = -inf terminates.
        let mut s = parabola_intersection(q, hull[k], f);
        while s <= bounds[k] {
            k -= 1;
            s = parabola_intersection(q, hull[k], f);
        }
        k += 1;
        hull[k] = q;
        bounds[k] = s;
        bounds[k + 1] = f32::INFINITY;
    }

    k = 0;
    for (q, dq) in out.iter_mut().enumerate() {
        while bounds[k + 1] < q as f32 {
            k += 1;
        }
        let dx = q as f32 - hull[k] as f32;
        *dq = dx * dx + f[hull[k]];
    }
}

/// Intersection abscissa of the parabolas rooted at `i` and `j`.
fn parabola_intersection(i: usize, j: usize, f: &[f32]) -> f32 {
    if i == j {
        return f32::INFINITY;
    }
    let fi = f[i];
    let fj = f[j];
    if !fi.is_finite() || !fj.is_finite() {
        return f32::INFINITY;
    }
    let num = (fi + (i * i) as f32) - (fj + (j * j) as f32);
    let den = 2.0 * (i as f32 - j as f32);
    if den.abs() < f32::EPSILON {
        return f32::INFINITY;
    }
    num / den
}
