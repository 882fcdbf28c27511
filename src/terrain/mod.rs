//! Terrain generation: rasterization, cost/distance fields, corridors.
pub mod corridors;
pub mod cost;
pub mod rasterize;

pub use corridors::generate_corridors;
pub use cost::{build_cost, distance_to};
pub use rasterize::rasterize;
