//! Observation queries: context building, guard expressions, and the
//! radius-bounded query entry points.
pub mod context;
pub mod expr;
pub mod query;

pub use context::{GuardScope, ObservationContext, DISTANCE_SENTINEL};
pub use expr::{CompareOp, Condition, Path, Resolve, Value};
pub use query::{
    get_all_signs, get_corridors, observe, CorridorView, ObservationResult, ObservationText,
    SignGroup, SignView, SpeciesObservation, TerrainView,
};
