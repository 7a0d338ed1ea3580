//! Tile occupancy checks.
//!
//! The simulation asks a [`TileAuthority`] whether a tile may be built on
//! before it commits a placement. The authority does not store occupancy
//! itself; the simulation passes the set of occupied tiles derived from its
//! own building registry, so saves never have to reconcile two copies.

use std::collections::BTreeSet;

use cryptopolis_types::Tile;
use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// Decides whether a building may be placed on a tile.
pub trait TileAuthority {
    /// Check `tile` against the authority's rules and the `occupied` set.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::OutOfBounds`] or
    /// [`PlacementError::TileOccupied`] when the tile is not buildable.
    fn check(&self, tile: Tile, occupied: &BTreeSet<Tile>) -> Result<(), PlacementError>;
}

/// A rectangular map with origin at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedGrid {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl BoundedGrid {
    /// Create a grid of the given dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether `tile` lies inside the grid.
    pub fn contains(&self, tile: Tile) -> bool {
        let in_x = u32::try_from(tile.x).is_ok_and(|x| x < self.width);
        let in_y = u32::try_from(tile.y).is_ok_and(|y| y < self.height);
        in_x && in_y
    }
}

impl TileAuthority for BoundedGrid {
    fn check(&self, tile: Tile, occupied: &BTreeSet<Tile>) -> Result<(), PlacementError> {
        if !self.contains(tile) {
            return Err(PlacementError::OutOfBounds {
                tile,
                width: self.width,
                height: self.height,
            });
        }
        if occupied.contains(&tile) {
            return Err(PlacementError::TileOccupied(tile));
        }
        Ok(())
    }
}
