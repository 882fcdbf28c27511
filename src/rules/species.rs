//! Species rule structures: identity, distribution, effects, observation text.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rules::terrain::ClassTable;

/// Opaque species identifier.
///
/// Rule sets key species by small integers in one mode and by string keys in
/// another; both funnel into this one type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(String);

impl SpeciesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpeciesId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<u32> for SpeciesId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

/// Ecological category of a species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tree,
    Shrub,
    Plant,
    LargeHerbivore,
    MediumHerbivore,
    Predator,
    Aquatic,
}

impl Category {
    /// Placement order: predators act on everything placed after them.
    pub fn placement_rank(self) -> usize {
        match self {
            Category::Predator => 0,
            Category::LargeHerbivore => 1,
            Category::MediumHerbivore => 2,
            Category::Aquatic => 3,
            Category::Tree => 4,
            Category::Shrub => 5,
            Category::Plant => 6,
        }
    }

    /// Observation listing order: vegetation, herbivores, predators, aquatic.
    pub fn observation_rank(self) -> usize {
        match self {
            Category::Tree => 0,
            Category::Shrub => 1,
            Category::Plant => 2,
            Category::LargeHerbivore => 3,
            Category::MediumHerbivore => 4,
            Category::Predator => 5,
            Category::Aquatic => 6,
        }
    }

    pub fn is_vegetation(self) -> bool {
        matches!(self, Category::Tree | Category::Shrub | Category::Plant)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tree => "tree",
            Category::Shrub => "shrub",
            Category::Plant => "plant",
            Category::LargeHerbivore => "large_herbivore",
            Category::MediumHerbivore => "medium_herbivore",
            Category::Predator => "predator",
            Category::Aquatic => "aquatic",
        }
    }
}

/// Clustering strategy for vegetation placement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Clustering {
    /// Cluster centers sized by mean stand area, individuals scattered in a
    /// random-radius disk per center.
    Stand {
        /// Inclusive stand radius range in cells.
        radius: (f32, f32),
        /// Inclusive individuals-per-stand range.
        count: (u32, u32),
    },
    /// Tight scatter in the 3x3 neighborhood of each center.
    Clump {
        /// Inclusive individuals-per-clump range.
        count: (u32, u32),
    },
    /// Independent per-cell Bernoulli draw at `suitability * density * 3`.
    Continuous,
    /// Independent per-cell Bernoulli draw at `suitability * density`.
    Uniform,
}

/// How discrete occurrences are realized from a suitability field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PlacementMode {
    Vegetation {
        base_density: f32,
        clustering: Clustering,
    },
    Animal {
        density_per_km2: f32,
        /// Mean group size; the member count per group is Poisson-distributed.
        group_size: f32,
        /// Members offset from the anchor uniformly in `[-spread, spread]^2`.
        group_spread: i32,
    },
}

/// Distribution specification: where a species can live and how it clusters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Distribution {
    /// Suitability weight per terrain class name.
    pub terrain_weights: BTreeMap<String, f32>,
    /// Multiplicative bonus for cells inside a named corridor.
    pub corridor_bonus: BTreeMap<String, f32>,
    /// Cells farther than this from water get zero suitability.
    pub max_water_distance: Option<f32>,
    pub placement: PlacementMode,
}

/// Which species an effect acts on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TargetSelector {
    Tag(String),
    Category(Category),
    Species(Vec<SpeciesId>),
}

/// A weighted final state within a damage level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateChoice {
    pub name: String,
    pub code: u8,
    pub weight: f32,
}

/// One damage threshold level; the first level whose `threshold` is >= the
/// accumulated influence wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateLevel {
    pub threshold: f32,
    pub states: Vec<StateChoice>,
}

/// Cross-species ecological effect or sign emission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Effect {
    /// Probabilistically removes target occurrences near the source.
    Excludes {
        target: TargetSelector,
        radius: f32,
        probability: f32,
    },
    /// Accumulates damage influence on targets for later state assignment.
    Damages {
        target: TargetSelector,
        radius: f32,
        probability: f32,
        levels: Vec<StateLevel>,
    },
    /// Scatters physical sign markers around source occurrences.
    CreatesSign {
        sign_type: String,
        radius: f32,
        probability: f32,
        /// Terrain classes signs may land on; `None` allows any.
        terrain_filter: Option<Vec<String>>,
    },
}

/// Field of the observation template a conditional fragment appends to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationField {
    Visual,
    Tactile,
    Smell,
    Sound,
    Habitat,
    SeasonNote,
    Uses,
}

/// A guarded text fragment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionalText {
    /// Guard expression; malformed guards evaluate to false.
    pub condition: String,
    /// Evaluate the guard at this radius instead of the query radius.
    pub radius: Option<i32>,
    pub append_to: ObservationField,
    pub text: String,
}

/// Fixed observation text plus conditional fragments.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObservationTemplate {
    pub visual: String,
    pub tactile: String,
    pub smell: String,
    pub sound: String,
    pub habitat: String,
    pub season_note: String,
    pub uses: String,
    pub conditional_texts: Vec<ConditionalText>,
}

/// One species definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesDef {
    pub id: SpeciesId,
    pub common_name: String,
    pub latin_name: String,
    pub category: Category,
    pub tags: Vec<String>,
    /// Presence roll probability; `None` means always present.
    pub appearance_probability: Option<f32>,
    pub distribution: Distribution,
    pub effects: Vec<Effect>,
    pub observation: ObservationTemplate,
}

/// Symbol used when rendering a sign type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignSymbol {
    pub glyph: String,
    pub color: String,
    pub description: String,
}

/// Species domain rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpeciesRules {
    pub species: Vec<SpeciesDef>,
    pub symbols: BTreeMap<String, SignSymbol>,
}

impl SpeciesRules {
    pub fn get(&self, id: &SpeciesId) -> Option<&SpeciesDef> {
        self.species.iter().find(|s| &s.id == id)
    }

    /// Resolve every terrain-class and species reference in the species rules.
    pub fn validate(&self, classes: &ClassTable) -> Result<()> {
        for def in &self.species {
            for name in def.distribution.terrain_weights.keys() {
                classes.resolve(name)?;
            }
            if let Some(p) = def.appearance_probability {
                if !(0.0..=1.0).contains(&p) {
                    return Err(Error::InvalidConfig(format!(
                        "species '{}': appearance probability {p} outside [0, 1]",
                        def.id
                    )));
                }
            }
            for effect in &def.effects {
                match effect {
                    Effect::Excludes { target, .. } | Effect::Damages { target, .. } => {
                        self.validate_target(target)?;
                    }
                    Effect::CreatesSign { terrain_filter, .. } => {
                        if let Some(filter) = terrain_filter {
                            for name in filter {
                                classes.resolve(name)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_target(&self, target: &TargetSelector) -> Result<()> {
        if let TargetSelector::Species(ids) = target {
            for id in ids {
                if self.get(id).is_none() {
                    return Err(Error::UnknownSpecies { id: id.to_string() });
                }
            }
        }
        Ok(())
    }
}

/// Precomputed effect target lookup: tag/category to species id list.
#[derive(Clone, Debug, Default)]
pub struct TargetIndex {
    by_tag: BTreeMap<String, Vec<SpeciesId>>,
    by_category: BTreeMap<usize, Vec<SpeciesId>>,
}

impl TargetIndex {
    pub fn new(species: &[SpeciesDef]) -> Self {
        let mut by_tag: BTreeMap<String, Vec<SpeciesId>> = BTreeMap::new();
        let mut by_category: BTreeMap<usize, Vec<SpeciesId>> = BTreeMap::new();
        for def in species {
            for tag in &def.tags {
                by_tag.entry(tag.clone()).or_default().push(def.id.clone());
            }
            by_category
                .entry(def.category.observation_rank())
                .or_default()
                .push(def.id.clone());
        }
        Self { by_tag, by_category }
    }

    /// Species ids an effect target resolves to; unknown tags resolve empty.
    pub fn resolve(&self, target: &TargetSelector) -> Vec<SpeciesId> {
        match target {
            TargetSelector::Tag(tag) => self.by_tag.get(tag).cloned().unwrap_or_default(),
            TargetSelector::Category(cat) => self
                .by_category
                .get(&cat.observation_rank())
                .cloned()
                .unwrap_or_default(),
            TargetSelector::Species(ids) => ids.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use crate::rules::terrain::test_fixtures::small_terrain_rules;

    #[test]
    fn species_id_unifies_integer_and_string_keys() {
        assert_eq!(SpeciesId::from(10), SpeciesId::from("10"));
        assert_eq!(SpeciesId::from(10).as_str(), "10");
    }

    #[test]
    fn category_orderings_disagree_on_purpose() {
        // Predators go first in placement, late in observation listings.
        assert_eq!(Category::Predator.placement_rank(), 0);
        assert!(Category::Predator.observation_rank() > Category::Tree.observation_rank());
        assert!(Category::Plant.placement_rank() > Category::Aquatic.placement_rank());
    }

    #[test]
    fn target_index_resolves_tags_and_categories() {
        let mut deer = animal_species("deer", Category::LargeHerbivore, "woodland", 5.0);
        deer.tags.push("ungulate".into());
        let reed = vegetation_species("reed", "marsh", 0.5, Clustering::Continuous);
        let index = TargetIndex::new(&[deer, reed]);

        assert_eq!(
            index.resolve(&TargetSelector::Tag("ungulate".into())),
            vec![SpeciesId::new("deer")]
        );
        assert_eq!(
            index.resolve(&TargetSelector::Category(Category::Plant)),
            vec![SpeciesId::new("reed")]
        );
        assert!(index
            .resolve(&TargetSelector::Tag("missing".into()))
            .is_empty());
    }

    #[test]
    fn validate_rejects_unknown_terrain_weight() {
        let classes = small_terrain_rules().class_table();
        let rules = SpeciesRules {
            species: vec![vegetation_species("x", "lava", 0.1, Clustering::Uniform)],
            symbols: BTreeMap::new(),
        };
        assert!(rules.validate(&classes).is_err());
    }

    #[test]
    fn validate_rejects_dangling_species_target() {
        let classes = small_terrain_rules().class_table();
        let mut wolf = animal_species("wolf", Category::Predator, "woodland", 0.5);
        wolf.effects.push(Effect::Excludes {
            target: TargetSelector::Species(vec![SpeciesId::new("ghost")]),
            radius: 3.0,
            probability: 0.5,
        });
        let rules = SpeciesRules {
            species: vec![wolf],
            symbols: BTreeMap::new(),
        };
        assert!(matches!(
            rules.validate(&classes),
            Err(Error::UnknownSpecies { .. })
        ));
    }

    #[test]
    fn validate_rejects_probability_outside_unit_interval() {
        let classes = small_terrain_rules().class_table();
        let mut wolf = animal_species("wolf", Category::Predator, "woodland", 0.5);
        wolf.appearance_probability = Some(1.5);
        let rules = SpeciesRules {
            species: vec![wolf],
            symbols: BTreeMap::new(),
        };
        assert!(rules.validate(&classes).is_err());
    }
}
