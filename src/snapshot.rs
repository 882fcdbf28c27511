//! Serializable world snapshots for external storage.
//!
//! A snapshot captures everything generation produced plus the mutable
//! time and season; the traversal cost grid is derived from the rules and
//! recomputed on restore.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::rules::{SpeciesId, WorldRules};
use crate::species::signs::Sign;
use crate::species::PlacementOutput;
use crate::terrain::build_cost;
use crate::world::{Season, TimeOfDay, WorldState};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub seed: u64,
    pub cols: usize,
    pub rows: usize,
    pub terrain: Grid<u8>,
    pub corridors: BTreeMap<String, Grid<bool>>,
    pub occurrences: BTreeMap<SpeciesId, Grid<u8>>,
    pub signs: Vec<Sign>,
    pub presence: BTreeMap<SpeciesId, bool>,
    pub time: TimeOfDay,
    pub season: Season,
}

impl WorldState {
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            seed: self.seed(),
            cols: self.terrain().cols(),
            rows: self.terrain().rows(),
            terrain: self.terrain().clone(),
            corridors: self.corridors().clone(),
            occurrences: self.occurrences().clone(),
            signs: self.signs().to_vec(),
            presence: self.presence().clone(),
            time: self.time(),
            season: self.season(),
        }
    }

    /// Rebuild a world from a snapshot and the rule set it was generated
    /// under.
    ///
    /// Rejects snapshots whose dimensions or species ids disagree with the
    /// rules rather than installing inconsistent state.
    pub fn from_snapshot(rules: WorldRules, snap: WorldSnapshot) -> Result<Self> {
        rules.validate()?;
        let spec = rules.terrain.grid;
        if snap.cols != spec.cols || snap.rows != spec.rows {
            return Err(Error::SnapshotMismatch(format!(
                "snapshot is {}x{}, rules expect {}x{}",
                snap.cols, snap.rows, spec.cols, spec.rows
            )));
        }
        for grid in [&snap.terrain]
            .into_iter()
            .chain(snap.occurrences.values())
        {
            if grid.cols() != snap.cols || grid.rows() != snap.rows {
                return Err(Error::SnapshotMismatch(
                    "grid dimensions disagree with snapshot header".into(),
                ));
            }
        }
        for mask in snap.corridors.values() {
            if mask.cols() != snap.cols || mask.rows() != snap.rows {
                return Err(Error::SnapshotMismatch(
                    "corridor mask dimensions disagree with snapshot header".into(),
                ));
            }
        }
        for id in snap.occurrences.keys().chain(snap.presence.keys()) {
            if rules.species.get(id).is_none() {
                return Err(Error::SnapshotMismatch(format!(
                    "snapshot references unknown species '{id}'"
                )));
            }
        }

        let classes = rules.terrain.class_table();
        let cost = build_cost(&snap.terrain, &rules.terrain, &classes)?;
        info!(seed = snap.seed, "world restored from snapshot");
        Ok(WorldState::from_parts(
            Arc::new(rules),
            classes,
            snap.seed,
            snap.terrain,
            cost,
            snap.corridors,
            PlacementOutput {
                occurrences: snap.occurrences,
                signs: snap.signs,
                presence: snap.presence,
            },
            snap.time,
            snap.season,
        ))
    }
}
