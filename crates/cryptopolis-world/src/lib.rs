//! Building catalog and placement grid for the Cryptopolis simulation.
//!
//! These are the collaborators the simulation core consults but does not
//! own: what each building type costs and earns, and whether a tile may be
//! built on.
//!
//! # Modules
//!
//! - [`catalog`] -- Static [`BuildingBlueprint`] table per [`BuildingType`].
//! - [`error`] -- [`PlacementError`] for rejected placement requests.
//! - [`grid`] -- The [`TileAuthority`] trait and the [`BoundedGrid`] map.
//!
//! [`BuildingType`]: cryptopolis_types::BuildingType

pub mod catalog;
pub mod error;
pub mod grid;

// Re-export primary types at crate root.
pub use catalog::{BuildingBlueprint, blueprint, cheapest_cost};
pub use error::PlacementError;
pub use grid::{BoundedGrid, TileAuthority};
