//! Terrain rule structures: classes, radial lake zones, overlays, corridors.
use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Shape;
use crate::rng::rand01;

/// Grid dimensions and physical cell size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: usize,
    pub rows: usize,
    /// Edge length of one cell in metres; used for km2 density math.
    pub cell_size_m: f32,
}

/// One terrain class definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainClassDef {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub description: String,
}

/// A weighted entry in a [`ClassChoice`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightedClass {
    pub class: String,
    pub weight: f32,
}

/// A terrain class, either fixed or drawn from a weighted set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ClassChoice {
    Single(String),
    Weighted(Vec<WeightedClass>),
}

/// One concentric zone of a radial lake model.
///
/// A cell belongs to the first zone whose `limit` exceeds its noisy normalized
/// distance from the lake center.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RadialZone {
    pub limit: f32,
    pub terrain: ClassChoice,
}

/// Radial lake model: elliptical distance plus per-cell uniform noise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LakeModel {
    pub center: Vec2,
    pub radius: Vec2,
    /// Uniform noise amplitude added to the normalized distance.
    pub noise: f32,
    pub zones: Vec<RadialZone>,
}

/// An ordered override shape; later shapes win over earlier ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeZone {
    pub shape: Shape,
    pub terrain: String,
}

/// Fixed block of one class stamped around the spawn point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformRules {
    pub class: String,
    /// Block side length in cells (3 = the classic 3x3 stamp).
    pub size: u32,
}

/// Random circular patches of one class scattered in a sub-region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchRules {
    pub count: u32,
    pub class: String,
    /// Inclusive region `(min_x, min_y, max_x, max_y)` for patch centers.
    pub region: (i32, i32, i32, i32),
    /// Inclusive patch radius range in cells.
    pub radius: (u32, u32),
    /// Classes a patch never overwrites.
    pub protected: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaterEdgeRules {
    /// Buffer width in cells from the nearest water cell.
    pub width: f32,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EcotoneRules {
    /// Chebyshev dilation radius; 0 keeps the raw discontinuity cells.
    pub width: u32,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameTrailRules {
    /// Maximum number of trails to search for.
    pub count: usize,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorridorRules {
    pub water_edge: WaterEdgeRules,
    pub ecotone: EcotoneRules,
    pub game_trail: GameTrailRules,
}

/// Terrain domain rules: rasterization model, costs, corridor parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainRules {
    pub grid: GridSpec,
    pub spawn: (i32, i32),
    pub visibility_radius: i32,
    pub classes: Vec<TerrainClassDef>,
    pub lakes: Vec<LakeModel>,
    /// Class for cells beyond every lake zone.
    pub default: ClassChoice,
    pub overlays: Vec<ShapeZone>,
    pub platform: Option<PlatformRules>,
    pub patches: Option<PatchRules>,
    /// Per-class traversal cost; classes not listed cost 1.0.
    pub cost: BTreeMap<String, f32>,
    pub water_classes: Vec<String>,
    pub corridors: CorridorRules,
}

impl TerrainRules {
    /// Build the name/id lookup for this rule set's classes.
    pub fn class_table(&self) -> ClassTable {
        ClassTable::new(&self.classes)
    }

    /// Resolve every class name the terrain rules mention.
    pub fn validate(&self, classes: &ClassTable) -> Result<()> {
        if self.grid.cols == 0 || self.grid.rows == 0 {
            return Err(Error::InvalidConfig("grid dimensions must be > 0".into()));
        }
        if self.grid.cell_size_m <= 0.0 {
            return Err(Error::InvalidConfig("cell_size_m must be > 0".into()));
        }
        for lake in &self.lakes {
            for zone in &lake.zones {
                classes.resolve_choice(&zone.terrain)?;
            }
        }
        classes.resolve_choice(&self.default)?;
        for overlay in &self.overlays {
            classes.resolve(&overlay.terrain)?;
        }
        if let Some(platform) = &self.platform {
            classes.resolve(&platform.class)?;
        }
        if let Some(patches) = &self.patches {
            classes.resolve(&patches.class)?;
            for name in &patches.protected {
                classes.resolve(name)?;
            }
        }
        for name in self.cost.keys() {
            classes.resolve(name)?;
        }
        for name in &self.water_classes {
            classes.resolve(name)?;
        }
        for name in self
            .corridors
            .game_trail
            .from
            .iter()
            .chain(self.corridors.game_trail.to.iter())
        {
            classes.resolve(name)?;
        }
        Ok(())
    }
}

/// Bidirectional terrain class lookup built from rule definitions.
#[derive(Clone, Debug, Default)]
pub struct ClassTable {
    by_name: BTreeMap<String, u8>,
    by_id: BTreeMap<u8, TerrainClassDef>,
}

impl ClassTable {
    pub fn new(defs: &[TerrainClassDef]) -> Self {
        let mut by_name = BTreeMap::new();
        let mut by_id = BTreeMap::new();
        for def in defs {
            by_name.insert(def.name.clone(), def.id);
            by_id.insert(def.id, def.clone());
        }
        Self { by_name, by_id }
    }

    /// Class id for `name`, or [`Error::UnknownTerrain`].
    pub fn resolve(&self, name: &str) -> Result<u8> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTerrain { name: name.into() })
    }

    /// Resolve a set of class names to ids.
    pub fn resolve_set(&self, names: &[String]) -> Result<Vec<u8>> {
        names.iter().map(|n| self.resolve(n)).collect()
    }

    /// Resolve a [`ClassChoice`] into drawable `(id, weight)` entries.
    pub fn resolve_choice(&self, choice: &ClassChoice) -> Result<ResolvedChoice> {
        let entries = match choice {
            ClassChoice::Single(name) => vec![(self.resolve(name)?, 1.0)],
            ClassChoice::Weighted(list) => {
                if list.is_empty() {
                    return Err(Error::InvalidConfig("weighted class choice is empty".into()));
                }
                list.iter()
                    .map(|w| Ok((self.resolve(&w.class)?, w.weight.max(0.0))))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(ResolvedChoice { entries })
    }

    pub fn def(&self, id: u8) -> Option<&TerrainClassDef> {
        self.by_id.get(&id)
    }

    /// Display name for a class id; unknown ids render as `?`.
    pub fn name(&self, id: u8) -> &str {
        self.by_id.get(&id).map(|d| d.name.as_str()).unwrap_or("?")
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.by_id.keys().copied()
    }

    pub fn contains_id(&self, id: u8) -> bool {
        self.by_id.contains_key(&id)
    }
}

/// A [`ClassChoice`] with names resolved, ready for seeded draws.
#[derive(Clone, Debug)]
pub struct ResolvedChoice {
    entries: Vec<(u8, f32)>,
}

impl ResolvedChoice {
    /// Draw a class id; single-entry choices never consume randomness.
    pub fn pick(&self, rng: &mut dyn Rng) -> u8 {
        if self.entries.len() == 1 {
            return self.entries[0].0;
        }
        let total: f32 = self.entries.iter().map(|(_, w)| *w).sum();
        if total <= 0.0 {
            return self.entries[0].0;
        }
        let mut roll = rand01(rng) * total;
        for (id, weight) in &self.entries {
            roll -= weight;
            if roll < 0.0 {
                return *id;
            }
        }
        self.entries[self.entries.len() - 1].0
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// Four-class 12x12 world with a centered lake, used across module tests.
    pub(crate) fn small_terrain_rules() -> TerrainRules {
        TerrainRules {
            grid: GridSpec {
                cols: 12,
                rows: 12,
                // 100 m cells make the 12x12 fixture 1.44 km2, enough area
                // for per-km2 animal densities to yield nonzero populations.
                cell_size_m: 100.0,
            },
            spawn: (2, 2),
            visibility_radius: 3,
            classes: vec![
                TerrainClassDef {
                    id: 0,
                    name: "water".into(),
                    color: "#1e3a8a".into(),
                    description: "Open water".into(),
                },
                TerrainClassDef {
                    id: 1,
                    name: "marsh".into(),
                    color: "#84cc16".into(),
                    description: "Marshy ground".into(),
                },
                TerrainClassDef {
                    id: 2,
                    name: "woodland".into(),
                    color: "#15803d".into(),
                    description: "Mixed woodland".into(),
                },
                TerrainClassDef {
                    id: 3,
                    name: "platform".into(),
                    color: "#92400e".into(),
                    description: "Occupation platform".into(),
                },
            ],
            lakes: vec![LakeModel {
                center: Vec2::new(6.0, 6.0),
                radius: Vec2::new(3.0, 3.0),
                noise: 0.0,
                zones: vec![
                    RadialZone {
                        limit: 1.0,
                        terrain: ClassChoice::Single("water".into()),
                    },
                    RadialZone {
                        limit: 1.5,
                        terrain: ClassChoice::Single("marsh".into()),
                    },
                ],
            }],
            default: ClassChoice::Single("woodland".into()),
            overlays: vec![],
            platform: Some(PlatformRules {
                class: "platform".into(),
                size: 3,
            }),
            patches: None,
            cost: BTreeMap::from([
                ("water".into(), 10.0),
                ("marsh".into(), 2.0),
                ("woodland".into(), 1.0),
                ("platform".into(), 1.0),
            ]),
            water_classes: vec!["water".into()],
            corridors: CorridorRules {
                water_edge: WaterEdgeRules {
                    width: 2.0,
                    color: "#38bdf8".into(),
                },
                ecotone: EcotoneRules {
                    width: 0,
                    color: "#facc15".into(),
                },
                game_trail: GameTrailRules {
                    count: 2,
                    from: vec!["woodland".into()],
                    to: vec!["marsh".into()],
                    color: "#a16207".into(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::test_fixtures::small_terrain_rules;
    use super::*;

    #[test]
    fn class_table_resolves_names_both_ways() {
        let rules = small_terrain_rules();
        let table = rules.class_table();
        assert_eq!(table.resolve("marsh").unwrap(), 1);
        assert_eq!(table.name(2), "woodland");
        assert_eq!(table.name(200), "?");
        assert!(matches!(
            table.resolve("lava"),
            Err(Error::UnknownTerrain { .. })
        ));
    }

    #[test]
    fn resolved_single_choice_never_consumes_randomness() {
        let rules = small_terrain_rules();
        let table = rules.class_table();
        let choice = table
            .resolve_choice(&ClassChoice::Single("water".into()))
            .unwrap();
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        assert_eq!(choice.pick(&mut rng_a), 0);
        // Stream untouched: both rngs still agree.
        assert_eq!(rng_a.next_u32(), rng_b.next_u32());
    }

    #[test]
    fn weighted_choice_respects_weights() {
        let rules = small_terrain_rules();
        let table = rules.class_table();
        let choice = table
            .resolve_choice(&ClassChoice::Weighted(vec![
                WeightedClass {
                    class: "water".into(),
                    weight: 0.0,
                },
                WeightedClass {
                    class: "marsh".into(),
                    weight: 1.0,
                },
            ]))
            .unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..50 {
            assert_eq!(choice.pick(&mut rng), 1);
        }
    }

    #[test]
    fn empty_weighted_choice_is_a_config_error() {
        let rules = small_terrain_rules();
        let table = rules.class_table();
        assert!(table
            .resolve_choice(&ClassChoice::Weighted(vec![]))
            .is_err());
    }

    #[test]
    fn validate_flags_unknown_overlay_class() {
        let mut rules = small_terrain_rules();
        rules.overlays.push(ShapeZone {
            shape: crate::geometry::Shape::Rect {
                min: (0, 0),
                max: (1, 1),
            },
            terrain: "lava".into(),
        });
        let table = rules.class_table();
        assert!(rules.validate(&table).is_err());
    }
}
