//! Per-query evaluation context for guard expressions.
use std::collections::{BTreeMap, BTreeSet};

use crate::observe::expr::{Path, Resolve, Value};
use crate::world::WorldState;

/// Distance reported for species with no in-range occurrence.
pub const DISTANCE_SENTINEL: i64 = 999;

#[derive(Clone, Debug, Default)]
pub struct SpeciesCtx {
    pub present: bool,
    pub count: i64,
    /// Maximum state code among in-range occurrences.
    pub state: i64,
    /// Minimum integer Euclidean distance, or [`DISTANCE_SENTINEL`].
    pub distance: i64,
}

#[derive(Clone, Debug, Default)]
pub struct SignCtx {
    pub count: i64,
}

/// Everything a guard expression can see at one viewpoint and radius.
#[derive(Clone, Debug)]
pub struct ObservationContext {
    pub terrain_current: String,
    pub is_ecotone: bool,
    pub time_of_day: &'static str,
    pub season: &'static str,
    pub corridor_in: BTreeMap<String, bool>,
    pub species: BTreeMap<String, SpeciesCtx>,
    pub signs: BTreeMap<String, SignCtx>,
}

impl ObservationContext {
    /// Gather everything within the circular mask around `(x, y)`.
    ///
    /// The caller has already bounds-checked the viewpoint.
    pub fn build(world: &WorldState, x: i32, y: i32, radius: i32) -> Self {
        let terrain = world.terrain();
        let current = terrain.get_or(x, y, 0);

        let mut nearby: BTreeSet<u8> = BTreeSet::new();
        for (cx, cy) in circle(x, y, radius) {
            if let Some(&class) = terrain.get(cx, cy) {
                nearby.insert(class);
            }
        }

        let mut species = BTreeMap::new();
        for (id, occ) in world.occurrences() {
            let mut ctx = SpeciesCtx {
                distance: DISTANCE_SENTINEL,
                ..SpeciesCtx::default()
            };
            for (cx, cy) in circle(x, y, radius) {
                let state = occ.get_or(cx, cy, 0);
                if state == 0 {
                    continue;
                }
                ctx.count += 1;
                ctx.state = ctx.state.max(state as i64);
                let dx = (cx - x) as f64;
                let dy = (cy - y) as f64;
                ctx.distance = ctx.distance.min((dx * dx + dy * dy).sqrt() as i64);
            }
            ctx.present = ctx.count > 0;
            if !ctx.present {
                ctx.distance = DISTANCE_SENTINEL;
            }
            species.insert(id.to_string(), ctx);
        }

        let r2 = i64::from(radius) * i64::from(radius);
        let mut signs: BTreeMap<String, SignCtx> = BTreeMap::new();
        for sign in world.signs() {
            let dx = i64::from(sign.x - x);
            let dy = i64::from(sign.y - y);
            if dx * dx + dy * dy <= r2 {
                signs.entry(sign.sign_type.clone()).or_default().count += 1;
            }
        }

        let corridor_in = world
            .corridors()
            .iter()
            .map(|(name, mask)| (name.clone(), mask.get_or(x, y, false)))
            .collect();

        Self {
            terrain_current: world.classes().name(current).to_owned(),
            is_ecotone: nearby.len() > 1,
            time_of_day: world.time().as_str(),
            season: world.season().as_str(),
            corridor_in,
            species,
            signs,
        }
    }
}

/// A context paired with the observed species' own state for `self.*` paths.
pub struct GuardScope<'a> {
    pub ctx: &'a ObservationContext,
    pub self_state: i64,
}

impl Resolve for GuardScope<'_> {
    fn resolve(&self, path: &Path) -> Option<Value> {
        let segs = path.segments();
        match segs {
            [a, b] if a == "self" && b == "state" => Some(Value::Int(self.self_state)),
            [a, b] if a == "terrain" && b == "current" => {
                Some(Value::Str(self.ctx.terrain_current.clone()))
            }
            [a, b] if a == "terrain" && b == "is_ecotone" => {
                Some(Value::Bool(self.ctx.is_ecotone))
            }
            [a, b] if a == "time" && b == "of_day" => {
                Some(Value::Str(self.ctx.time_of_day.to_owned()))
            }
            [a, b] if a == "time" && b == "season" => {
                Some(Value::Str(self.ctx.season.to_owned()))
            }
            [a, name, b] if a == "corridor" && b == "in" => self
                .ctx
                .corridor_in
                .get(name)
                .map(|in_it| Value::Bool(*in_it)),
            [a, id, field] if a == "species" => {
                let sp = self.ctx.species.get(id)?;
                match field.as_str() {
                    "present" => Some(Value::Bool(sp.present)),
                    "count" => Some(Value::Int(sp.count)),
                    "state" => Some(Value::Int(sp.state)),
                    "distance" => Some(Value::Int(sp.distance)),
                    _ => None,
                }
            }
            [a, ty, field] if a == "sign" => {
                let sign = self.ctx.signs.get(ty);
                match field.as_str() {
                    "present" => Some(Value::Bool(sign.is_some())),
                    "count" => Some(Value::Int(sign.map_or(0, |s| s.count))),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Coordinates within Euclidean `radius` of `(x, y)`, unclipped.
pub(crate) fn circle(x: i32, y: i32, radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let r2 = i64::from(radius) * i64::from(radius);
    (-radius..=radius).flat_map(move |dy| {
        (-radius..=radius).filter_map(move |dx| {
            if i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy) <= r2 {
                Some((x + dx, y + dy))
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::expr::Condition;
    use crate::world::generate;
    use crate::world::test_fixtures::fixture_rules;

    #[test]
    fn circle_respects_the_euclidean_mask() {
        let cells: Vec<_> = circle(0, 0, 2).collect();
        assert!(cells.contains(&(2, 0)));
        assert!(cells.contains(&(1, 1)));
        assert!(!cells.contains(&(2, 2)));
    }

    #[test]
    fn species_presence_guard_tracks_in_range_occurrences() {
        let world = generate(fixture_rules(), 11).unwrap();
        let (sx, sy) = world.spawn();
        let ctx = ObservationContext::build(&world, sx, sy, world.visibility_radius());
        let scope = GuardScope {
            ctx: &ctx,
            self_state: 1,
        };

        for (id, sp) in &ctx.species {
            let guard = Condition::parse(&format!("species.{id}.present"));
            assert_eq!(guard.eval(&scope), sp.present);
        }
        // Unknown species id is falsy, not an error.
        assert!(!Condition::parse("species.ghost.present").eval(&scope));
    }

    #[test]
    fn absent_species_report_the_distance_sentinel() {
        let world = generate(fixture_rules(), 11).unwrap();
        let ctx = ObservationContext::build(&world, 0, 0, 1);
        for sp in ctx.species.values() {
            if !sp.present {
                assert_eq!(sp.distance, DISTANCE_SENTINEL);
            } else {
                assert!(sp.distance <= 1);
            }
        }
    }

    #[test]
    fn terrain_membership_matches_the_current_cell_only() {
        let world = generate(fixture_rules(), 11).unwrap();
        let ctx = ObservationContext::build(&world, 6, 6, 2);
        let scope = GuardScope {
            ctx: &ctx,
            self_state: 1,
        };
        let name = &ctx.terrain_current;
        assert!(Condition::parse(&format!("terrain.current in [\"{name}\", \"other\"]")).eval(&scope));
        assert!(!Condition::parse("terrain.current in [\"nothing\"]").eval(&scope));
    }

    #[test]
    fn self_state_resolves_from_the_scope() {
        let world = generate(fixture_rules(), 11).unwrap();
        let ctx = ObservationContext::build(&world, 6, 6, 2);
        let scope = GuardScope {
            ctx: &ctx,
            self_state: 3,
        };
        assert!(Condition::parse("self.state >= 3").eval(&scope));
        assert!(!Condition::parse("self.state > 3").eval(&scope));
    }
}
