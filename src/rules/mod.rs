//! Parsed rule structures consumed by generation.
//!
//! The engine does not read rule files; a surrounding layer parses whatever
//! format it likes into these types. [`WorldRules::validate`] fails fast on any
//! dangling cross-reference so generation never installs partial state.
use crate::error::Result;

pub mod species;
pub mod terrain;

pub use species::{
    Category, Clustering, ConditionalText, Distribution, Effect, ObservationField,
    ObservationTemplate, PlacementMode, SignSymbol, SpeciesDef, SpeciesId, SpeciesRules,
    StateChoice, StateLevel, TargetIndex, TargetSelector,
};
pub use terrain::{
    ClassChoice, ClassTable, CorridorRules, EcotoneRules, GameTrailRules, GridSpec, LakeModel,
    PatchRules, PlatformRules, RadialZone, ShapeZone, TerrainClassDef, TerrainRules,
    WaterEdgeRules, WeightedClass,
};

/// Complete rule set for one world: terrain plus species domains.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WorldRules {
    pub terrain: TerrainRules,
    pub species: SpeciesRules,
}

impl WorldRules {
    /// Check every terrain-class and species reference in the rule set.
    ///
    /// An unknown identifier anywhere is a fatal configuration error.
    pub fn validate(&self) -> Result<()> {
        let classes = self.terrain.class_table();
        self.terrain.validate(&classes)?;
        self.species.validate(&classes)?;
        Ok(())
    }
}
