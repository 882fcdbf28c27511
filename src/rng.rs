//! Seeded randomness helpers.
//!
//! Every stochastic draw in the engine goes through these helpers over
//! [`Rng`], so generation stays a pure function of the caller's seed.
use rand::Rng;

/// Generate a random float in the range [0, 1].
#[inline]
pub(crate) fn rand01(rng: &mut dyn Rng) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// Uniform float in `[lo, hi)`.
#[inline]
pub(crate) fn rand_range_f32(rng: &mut dyn Rng, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        return lo;
    }
    lo + rand01(rng) * (hi - lo)
}

/// Uniform integer in `[lo, hi]`.
#[inline]
pub(crate) fn rand_range_i32(rng: &mut dyn Rng, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        return lo;
    }
    let span = (hi - lo) as i64 + 1;
    lo + (rand01(rng) as f64 * span as f64) as i32
}

/// Uniform index in `[0, len)`; `len` must be non-zero.
#[inline]
pub(crate) fn rand_index(rng: &mut dyn Rng, len: usize) -> usize {
    debug_assert!(len > 0, "rand_index needs a non-empty range");
    ((rand01(rng) as f64 * len as f64) as usize).min(len - 1)
}

/// Poisson-distributed count with mean `lambda` (Knuth's algorithm).
pub(crate) fn poisson_knuth(lambda: f32, rng: &mut dyn Rng) -> u32 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 0;
    }

    let l = (-lambda).exp();
    let mut k: u32 = 0;
    let mut p: f32 = 1.0;

    loop {
        k += 1;
        p *= rand01(rng);
        if p <= l {
            return k - 1;
        }

        if k > 10_000_000 {
            return k - 1;
        }
    }
}
