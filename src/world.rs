//! World generation and the immutable generated state.
use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::rules::terrain::ClassTable;
use crate::rules::{SpeciesId, WorldRules};
use crate::species::signs::Sign;
use crate::species::{place_all, PlacementOutput};
use crate::terrain::{build_cost, generate_corridors, rasterize};

/// Time of day an observation is made at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Midday,
    Afternoon,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dawn" => Some(Self::Dawn),
            "morning" => Some(Self::Morning),
            "midday" => Some(Self::Midday),
            "afternoon" => Some(Self::Afternoon),
            "dusk" => Some(Self::Dusk),
            "night" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Morning => "morning",
            Self::Midday => "midday",
            Self::Afternoon => "afternoon",
            Self::Dusk => "dusk",
            Self::Night => "night",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "autumn" => Some(Self::Autumn),
            "winter" => Some(Self::Winter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

/// One cell of a batched terrain read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionCell {
    pub x: i32,
    pub y: i32,
    pub class: u8,
    pub class_name: String,
}

/// A fully generated world.
///
/// All grids share the rule set's dimensions and are built in one pass from
/// one seed; nothing here mutates after generation except time and season.
#[derive(Clone, Debug)]
pub struct WorldState {
    rules: Arc<WorldRules>,
    classes: ClassTable,
    seed: u64,
    terrain: Grid<u8>,
    cost: Grid<f32>,
    corridors: BTreeMap<String, Grid<bool>>,
    placement: PlacementOutput,
    time: TimeOfDay,
    season: Season,
}

/// Generate a world from rules and a seed.
///
/// Fails fast on any dangling rule reference; no partial world is ever
/// returned.
pub fn generate(rules: WorldRules, seed: u64) -> Result<WorldState> {
    rules.validate()?;
    let classes = rules.terrain.class_table();
    let mut rng = StdRng::seed_from_u64(seed);

    let terrain = rasterize(&rules.terrain, &classes, &mut rng)?;
    info!(cols = terrain.cols(), rows = terrain.rows(), "terrain rasterized");

    let cost = build_cost(&terrain, &rules.terrain, &classes)?;
    let corridors = generate_corridors(&terrain, &cost, &rules.terrain, &classes)?;

    let placement = place_all(
        &rules.species,
        &rules.terrain,
        &terrain,
        &corridors,
        &classes,
        &mut rng,
    )?;
    info!(seed, "world generated");

    Ok(WorldState {
        rules: Arc::new(rules),
        classes,
        seed,
        terrain,
        cost,
        corridors,
        placement,
        time: TimeOfDay::Morning,
        season: Season::Summer,
    })
}

impl WorldState {
    pub fn rules(&self) -> &WorldRules {
        &self.rules
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn terrain(&self) -> &Grid<u8> {
        &self.terrain
    }

    pub fn cost(&self) -> &Grid<f32> {
        &self.cost
    }

    pub fn corridors(&self) -> &BTreeMap<String, Grid<bool>> {
        &self.corridors
    }

    pub fn occurrences(&self) -> &BTreeMap<SpeciesId, Grid<u8>> {
        &self.placement.occurrences
    }

    pub fn signs(&self) -> &[Sign] {
        &self.placement.signs
    }

    pub fn presence(&self) -> &BTreeMap<SpeciesId, bool> {
        &self.placement.presence
    }

    pub fn spawn(&self) -> (i32, i32) {
        self.rules.terrain.spawn
    }

    pub fn visibility_radius(&self) -> i32 {
        self.rules.terrain.visibility_radius
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn set_time(&mut self, time: TimeOfDay) {
        self.time = time;
    }

    pub fn set_season(&mut self, season: Season) {
        self.season = season;
    }

    /// Batched terrain read: a `w` by `h` rectangle anchored at `(x, y)`,
    /// clipped to the grid.
    pub fn terrain_region(&self, x: i32, y: i32, w: i32, h: i32) -> Result<Vec<RegionCell>> {
        if !self.terrain.in_bounds(x, y) {
            return Err(Error::OutOfBounds { x, y });
        }
        let mut cells = Vec::new();
        for cy in y..y + h.max(0) {
            for cx in x..x + w.max(0) {
                let Some(&class) = self.terrain.get(cx, cy) else {
                    continue;
                };
                cells.push(RegionCell {
                    x: cx,
                    y: cy,
                    class,
                    class_name: self.classes.name(class).to_owned(),
                });
            }
        }
        Ok(cells)
    }

    pub(crate) fn from_parts(
        rules: Arc<WorldRules>,
        classes: ClassTable,
        seed: u64,
        terrain: Grid<u8>,
        cost: Grid<f32>,
        corridors: BTreeMap<String, Grid<bool>>,
        placement: PlacementOutput,
        time: TimeOfDay,
        season: Season,
    ) -> Self {
        Self {
            rules,
            classes,
            seed,
            terrain,
            cost,
            corridors,
            placement,
            time,
            season,
        }
    }
}
