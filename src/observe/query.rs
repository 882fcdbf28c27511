//! Radius-bounded observation queries over a generated world.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::observe::context::{circle, GuardScope, ObservationContext};
use crate::observe::expr::Condition;
use crate::rules::species::{ObservationField, SpeciesDef};
use crate::world::WorldState;

/// One visible terrain class.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainView {
    pub id: u8,
    pub name: String,
    pub color: String,
}

/// Composed observation text for one species.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObservationText {
    pub visual: String,
    pub tactile: String,
    pub smell: String,
    pub sound: String,
    pub habitat: String,
    pub season_note: String,
    pub uses: String,
}

impl ObservationText {
    fn field_mut(&mut self, field: ObservationField) -> &mut String {
        match field {
            ObservationField::Visual => &mut self.visual,
            ObservationField::Tactile => &mut self.tactile,
            ObservationField::Smell => &mut self.smell,
            ObservationField::Sound => &mut self.sound,
            ObservationField::Habitat => &mut self.habitat,
            ObservationField::SeasonNote => &mut self.season_note,
            ObservationField::Uses => &mut self.uses,
        }
    }
}

/// One species visible from the viewpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesObservation {
    pub species_id: String,
    pub common_name: String,
    pub latin_name: String,
    pub category: String,
    pub count: usize,
    pub locations: Vec<(i32, i32)>,
    /// Maximum state code seen among in-range occurrences.
    pub state: u8,
    pub text: ObservationText,
}

/// One sign visible from the viewpoint, with its display symbol.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignView {
    pub sign_type: String,
    pub x: i32,
    pub y: i32,
    pub glyph: String,
    pub color: String,
    pub description: String,
}

/// Everything visible from one viewpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationResult {
    pub x: i32,
    pub y: i32,
    pub current_terrain: TerrainView,
    pub visible_terrains: Vec<TerrainView>,
    pub observations: Vec<SpeciesObservation>,
    pub signs: Vec<SignView>,
    /// Corridors containing the viewpoint cell itself.
    pub corridors: Vec<String>,
    pub time_of_day: String,
    pub season: String,
}

/// Observe the world from `(x, y)`.
///
/// `radius` defaults to the world's configured visibility radius. Fails with
/// [`Error::OutOfBounds`] when the viewpoint is off the grid.
pub fn observe(world: &WorldState, x: i32, y: i32, radius: Option<i32>) -> Result<ObservationResult> {
    if !world.terrain().in_bounds(x, y) {
        return Err(Error::OutOfBounds { x, y });
    }
    let radius = radius.unwrap_or_else(|| world.visibility_radius()).max(0);
    debug!(x, y, radius, "observation query");

    let terrain = world.terrain();
    let main_ctx = ObservationContext::build(world, x, y, radius);

    // Fragment radii rebuild the context once per distinct radius.
    let mut ctx_cache: BTreeMap<i32, ObservationContext> = BTreeMap::new();

    let mut visible_terrains = Vec::new();
    let mut seen = Vec::new();
    for (cx, cy) in circle(x, y, radius) {
        let Some(&class) = terrain.get(cx, cy) else {
            continue;
        };
        if seen.contains(&class) {
            continue;
        }
        seen.push(class);
        visible_terrains.push(terrain_view(world, class));
    }

    let mut observations = Vec::new();
    for (id, occ) in world.occurrences() {
        let mut locations = Vec::new();
        let mut max_state = 0u8;
        for (cx, cy) in circle(x, y, radius) {
            let state = occ.get_or(cx, cy, 0);
            if state > 0 {
                locations.push((cx, cy));
                max_state = max_state.max(state);
            }
        }
        if locations.is_empty() {
            continue;
        }
        let Some(def) = world.rules().species.get(id) else {
            continue;
        };

        let text = compose_text(world, def, &main_ctx, &mut ctx_cache, x, y, radius, max_state);
        observations.push(SpeciesObservation {
            species_id: id.to_string(),
            common_name: def.common_name.clone(),
            latin_name: def.latin_name.clone(),
            category: category_name(def),
            count: locations.len(),
            locations,
            state: max_state,
            text,
        });
    }
    observations.sort_by(|a, b| {
        let ra = rank_of(world, &a.species_id);
        let rb = rank_of(world, &b.species_id);
        ra.cmp(&rb).then_with(|| a.common_name.cmp(&b.common_name))
    });

    let r2 = i64::from(radius) * i64::from(radius);
    let symbols = &world.rules().species.symbols;
    let mut signs = Vec::new();
    for sign in world.signs() {
        let dx = i64::from(sign.x - x);
        let dy = i64::from(sign.y - y);
        if dx * dx + dy * dy > r2 {
            continue;
        }
        let symbol = symbols.get(&sign.sign_type);
        signs.push(SignView {
            sign_type: sign.sign_type.clone(),
            x: sign.x,
            y: sign.y,
            glyph: symbol.map(|s| s.glyph.clone()).unwrap_or_else(|| "?".into()),
            color: symbol.map(|s| s.color.clone()).unwrap_or_else(|| "#888".into()),
            description: symbol.map(|s| s.description.clone()).unwrap_or_default(),
        });
    }

    let corridors = world
        .corridors()
        .iter()
        .filter(|(_, mask)| mask.get_or(x, y, false))
        .map(|(name, _)| name.clone())
        .collect();

    Ok(ObservationResult {
        x,
        y,
        current_terrain: terrain_view(world, terrain.get_or(x, y, 0)),
        visible_terrains,
        observations,
        signs,
        corridors,
        time_of_day: world.time().as_str().to_owned(),
        season: world.season().as_str().to_owned(),
    })
}

/// Corridor masks rendered for a caller: member cells, color, count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorridorView {
    pub cells: Vec<(i32, i32)>,
    pub color: String,
    pub count: usize,
}

pub fn get_corridors(world: &WorldState) -> BTreeMap<String, CorridorView> {
    let rules = &world.rules().terrain.corridors;
    world
        .corridors()
        .iter()
        .map(|(name, mask)| {
            let color = match name.as_str() {
                "water_edge" => rules.water_edge.color.clone(),
                "ecotone" => rules.ecotone.color.clone(),
                "game_trail" => rules.game_trail.color.clone(),
                _ => "#888".to_owned(),
            };
            let cells = mask.set_coords();
            let count = cells.len();
            (name.clone(), CorridorView { cells, color, count })
        })
        .collect()
}

/// All signs in the world, grouped by type with their display symbol.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignGroup {
    pub glyph: String,
    pub color: String,
    pub description: String,
    pub locations: Vec<(i32, i32)>,
}

pub fn get_all_signs(world: &WorldState) -> BTreeMap<String, SignGroup> {
    let symbols = &world.rules().species.symbols;
    let mut groups: BTreeMap<String, SignGroup> = BTreeMap::new();
    for sign in world.signs() {
        let group = groups.entry(sign.sign_type.clone()).or_insert_with(|| {
            let symbol = symbols.get(&sign.sign_type);
            SignGroup {
                glyph: symbol.map(|s| s.glyph.clone()).unwrap_or_else(|| "?".into()),
                color: symbol.map(|s| s.color.clone()).unwrap_or_else(|| "#888".into()),
                description: symbol.map(|s| s.description.clone()).unwrap_or_default(),
                locations: Vec::new(),
            }
        });
        group.locations.push((sign.x, sign.y));
    }
    groups
}

fn terrain_view(world: &WorldState, class: u8) -> TerrainView {
    let def = world.classes().def(class);
    TerrainView {
        id: class,
        name: def.map(|d| d.name.clone()).unwrap_or_else(|| "?".into()),
        color: def.map(|d| d.color.clone()).unwrap_or_else(|| "#888".into()),
    }
}

fn category_name(def: &SpeciesDef) -> String {
    def.category.as_str().to_owned()
}

fn rank_of(world: &WorldState, id: &str) -> usize {
    world
        .rules()
        .species
        .get(&id.into())
        .map(|d| d.category.observation_rank())
        .unwrap_or(usize::MAX)
}

#[allow(clippy::too_many_arguments)]
fn compose_text(
    world: &WorldState,
    def: &SpeciesDef,
    main_ctx: &ObservationContext,
    ctx_cache: &mut BTreeMap<i32, ObservationContext>,
    x: i32,
    y: i32,
    radius: i32,
    self_state: u8,
) -> ObservationText {
    let tpl = &def.observation;
    let mut text = ObservationText {
        visual: tpl.visual.clone(),
        tactile: tpl.tactile.clone(),
        smell: tpl.smell.clone(),
        sound: tpl.sound.clone(),
        habitat: tpl.habitat.clone(),
        season_note: tpl.season_note.clone(),
        uses: tpl.uses.clone(),
    };

    for fragment in &tpl.conditional_texts {
        let guard_radius = fragment.radius.unwrap_or(radius);
        let ctx = if guard_radius == radius {
            main_ctx
        } else {
            &*ctx_cache
                .entry(guard_radius)
                .or_insert_with(|| ObservationContext::build(world, x, y, guard_radius))
        };
        let scope = GuardScope {
            ctx,
            self_state: i64::from(self_state),
        };
        if Condition::parse(&fragment.condition).eval(&scope) {
            let field = text.field_mut(fragment.append_to);
            field.push(' ');
            field.push_str(&fragment.text);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::species::{ConditionalText, SignSymbol, SpeciesId};
    use crate::world::generate;
    use crate::world::test_fixtures::fixture_rules;

    #[test]
    fn out_of_bounds_viewpoints_fail_and_in_bounds_succeed() {
        let world = generate(fixture_rules(), 8).unwrap();
        assert!(matches!(
            observe(&world, -1, 0, None),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            observe(&world, 0, 12, None),
            Err(Error::OutOfBounds { .. })
        ));
        for (x, y) in [(0, 0), (6, 6), (11, 11)] {
            assert!(observe(&world, x, y, None).is_ok());
        }
    }

    #[test]
    fn every_reported_location_is_within_the_radius() {
        let world = generate(fixture_rules(), 8).unwrap();
        let radius = 3;
        let result = observe(&world, 6, 6, Some(radius)).unwrap();
        for obs in &result.observations {
            for (lx, ly) in &obs.locations {
                let d2 = (lx - 6).pow(2) + (ly - 6).pow(2);
                assert!(d2 <= radius * radius, "({lx}, {ly}) beyond radius");
            }
        }
        for sign in &result.signs {
            let d2 = (sign.x - 6).pow(2) + (sign.y - 6).pow(2);
            assert!(d2 <= radius * radius);
        }
    }

    #[test]
    fn no_in_range_occurrence_is_omitted() {
        let world = generate(fixture_rules(), 8).unwrap();
        let radius = 4;
        let result = observe(&world, 6, 6, Some(radius)).unwrap();
        for (id, occ) in world.occurrences() {
            let expected: Vec<(i32, i32)> = circle(6, 6, radius)
                .filter(|&(cx, cy)| occ.get_or(cx, cy, 0) > 0)
                .collect();
            let reported = result
                .observations
                .iter()
                .find(|o| o.species_id == id.to_string());
            match reported {
                Some(obs) => assert_eq!(obs.locations, expected),
                None => assert!(expected.is_empty()),
            }
        }
    }

    #[test]
    fn species_are_ordered_vegetation_first_then_by_name() {
        let world = generate(fixture_rules(), 8).unwrap();
        let result = observe(&world, 6, 6, Some(6)).unwrap();
        let ranks: Vec<usize> = result
            .observations
            .iter()
            .map(|o| rank_of(&world, &o.species_id))
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn passing_guards_append_fragments_with_a_separator() {
        let mut rules = fixture_rules();
        let tpl = &mut rules.species.species[0].observation;
        tpl.visual = "Tall reeds.".into();
        tpl.conditional_texts.push(ConditionalText {
            condition: "species.reed.present".into(),
            radius: None,
            append_to: ObservationField::Visual,
            text: "They sway in the wind.".into(),
        });
        tpl.conditional_texts.push(ConditionalText {
            condition: "species.ghost.present".into(),
            radius: None,
            append_to: ObservationField::Visual,
            text: "Never appended.".into(),
        });
        let world = generate(rules, 8).unwrap();

        // Find a viewpoint that sees reeds.
        let reeds = &world.occurrences()[&SpeciesId::new("reed")];
        let (rx, ry) = reeds
            .coords()
            .find(|&(x, y)| reeds.get_or(x, y, 0) > 0)
            .unwrap();
        let result = observe(&world, rx, ry, Some(2)).unwrap();
        let obs = result
            .observations
            .iter()
            .find(|o| o.species_id == "reed")
            .unwrap();
        assert_eq!(obs.text.visual, "Tall reeds. They sway in the wind.");
    }

    #[test]
    fn fragment_radius_overrides_the_query_radius() {
        let mut rules = fixture_rules();
        let tpl = &mut rules.species.species[0].observation;
        // Guard checks deer presence far beyond the tiny query radius.
        tpl.conditional_texts.push(ConditionalText {
            condition: "species.deer.present".into(),
            radius: Some(20),
            append_to: ObservationField::Sound,
            text: "Distant hooves.".into(),
        });
        let world = generate(rules, 8).unwrap();
        let deer_exist = world.occurrences()[&SpeciesId::new("deer")]
            .data()
            .iter()
            .any(|v| *v > 0);

        let reeds = &world.occurrences()[&SpeciesId::new("reed")];
        let (rx, ry) = reeds
            .coords()
            .find(|&(x, y)| reeds.get_or(x, y, 0) > 0)
            .unwrap();
        let result = observe(&world, rx, ry, Some(1)).unwrap();
        if let Some(obs) = result.observations.iter().find(|o| o.species_id == "reed") {
            assert_eq!(obs.text.sound.contains("Distant hooves."), deer_exist);
        }
    }

    #[test]
    fn corridor_and_sign_summaries_cover_the_whole_world() {
        let mut rules = fixture_rules();
        rules.species.species[1]
            .effects
            .push(crate::rules::species::Effect::CreatesSign {
                sign_type: "tracks".into(),
                radius: 2.0,
                probability: 1.0,
                terrain_filter: None,
            });
        rules.species.symbols.insert(
            "tracks".into(),
            SignSymbol {
                glyph: "T".into(),
                color: "#630".into(),
                description: "Hoof prints".into(),
            },
        );
        let world = generate(rules, 17).unwrap();

        let corridors = get_corridors(&world);
        assert_eq!(corridors.len(), 3);
        for (name, view) in &corridors {
            assert_eq!(view.count, world.corridors()[name].count_set());
        }

        let signs = get_all_signs(&world);
        let total: usize = signs.values().map(|g| g.locations.len()).sum();
        assert_eq!(total, world.signs().len());
        if let Some(group) = signs.get("tracks") {
            assert_eq!(group.glyph, "T");
        }
    }
}
