//! Error types and result alias for the crate.
//!
//! Configuration errors are fatal and surface from [`crate::world::generate`]
//! before any world state exists. [`Error::OutOfBounds`] is recoverable and
//! returned by coordinate-taking queries.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown terrain class '{name}'")]
    UnknownTerrain { name: String },

    #[error("unknown species '{id}'")]
    UnknownSpecies { id: String },

    #[error("coordinate ({x}, {y}) is out of bounds")]
    OutOfBounds { x: i32, y: i32 },

    #[error("snapshot does not match rules: {0}")]
    SnapshotMismatch(String),
}

impl Error {
    /// True for errors that abort generation (as opposed to per-query errors).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::OutOfBounds { .. })
    }
}
