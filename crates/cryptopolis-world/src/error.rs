//! Error types for the `cryptopolis-world` crate.

use cryptopolis_types::{BuildingId, Tile};
use rust_decimal::Decimal;

/// Why a placement or demolition request was rejected.
///
/// Rejections are recoverable: the caller is told synchronously and the
/// simulation state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The treasury cannot cover the building's cost.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Cost of the building.
        required: Decimal,
        /// Treasury balance at the time of the request.
        available: Decimal,
    },

    /// Another building already stands on the tile.
    #[error("tile {0} is occupied")]
    TileOccupied(Tile),

    /// The tile lies outside the buildable grid.
    #[error("tile {tile} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// The requested tile.
        tile: Tile,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// No standing building has this identifier.
    #[error("building {0} not found")]
    UnknownBuilding(BuildingId),

    /// The session has ended; the city is frozen.
    #[error("session has ended")]
    SessionEnded,

    /// Building identifiers are exhausted or the ledger overflowed.
    #[error("arithmetic overflow while placing building")]
    ArithmeticOverflow,
}
