#![forbid(unsafe_code)]
//! paleoland: rule-based generation of a 2D ecological landscape with
//! radius-bounded observation queries.
//!
//! Modules:
//! - rules: parsed terrain and species rule structures with validation
//! - terrain: rasterization, cost/distance fields, corridor masks
//! - species: suitability, stochastic placement, cross-species effects, signs
//! - world: seeded generation and the immutable generated state
//! - observe: observation queries and the guard expression language
//! - snapshot / shared: persistence mirror and concurrent world handle
//!
//! For examples and docs, see README and docs.rs.
pub mod error;
pub mod geometry;
pub mod grid;
pub mod observe;
pub mod rules;
pub mod shared;
pub mod snapshot;
pub mod species;
pub mod terrain;
pub mod world;

mod rng;

/// Convenient re-exports for common types. Import with `use paleoland::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::geometry::Shape;
    pub use crate::grid::Grid;
    pub use crate::observe::{
        get_all_signs, get_corridors, observe, Condition, ObservationContext, ObservationResult,
        SpeciesObservation,
    };
    pub use crate::rules::{
        Category, ClassChoice, Clustering, Distribution, Effect, ObservationTemplate,
        PlacementMode, SpeciesDef, SpeciesId, SpeciesRules, TerrainClassDef, TerrainRules,
        WorldRules,
    };
    pub use crate::shared::SharedWorld;
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::species::signs::Sign;
    pub use crate::world::{generate, Season, TimeOfDay, WorldState};
}
