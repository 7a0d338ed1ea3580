//! Treasury ledger for the Cryptopolis simulation.
//!
//! Every movement of city funds -- starting deposit, building yield,
//! construction, salvage, disaster and rug-pull losses, milestone rewards --
//! is recorded as an append-only [`LedgerEntry`] in the [`TreasuryLedger`].
//! The ledger also owns the session's monotone peak trackers and the
//! cumulative yield counter used for end-of-game statistics.
//!
//! # Modules
//!
//! - [`treasury`] -- The [`TreasuryLedger`] struct: balance, entries, peaks.
//! - [`reconcile`] -- Recomputes the balance from the entry log to detect
//!   drift or tampering (used when restoring saves).
//!
//! # Insolvency
//!
//! Construction can never overdraw the balance. Penalties can: the balance
//! may drop below the insolvency floor for the remainder of a tick, which
//! raises the insolvency flag so the objective tracker can observe it. The
//! pipeline then calls [`TreasuryLedger::settle`], which raises the balance
//! back to the floor and clears the flag.
//!
//! [`LedgerEntry`]: cryptopolis_types::LedgerEntry

pub mod reconcile;
pub mod treasury;

pub use reconcile::{ReconcileResult, reconcile};
pub use treasury::TreasuryLedger;

use cryptopolis_types::LedgerEntryKind;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Amounts must be strictly positive.
    #[error("ledger amount must be non-zero")]
    ZeroAmount,

    /// Amounts must not be negative; direction comes from the entry kind.
    #[error("ledger amount must be positive, got {amount}")]
    NegativeAmount {
        /// The invalid amount.
        amount: Decimal,
    },

    /// A construction debit exceeded the available balance.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        required: Decimal,
        /// Balance at the time of the request.
        available: Decimal,
    },

    /// A credit kind was used for a debit or vice versa.
    #[error("entry kind {kind:?} cannot be used in this direction")]
    WrongDirection {
        /// The offending kind.
        kind: LedgerEntryKind,
    },

    /// Decimal arithmetic overflowed.
    #[error("arithmetic overflow in ledger calculation")]
    ArithmeticOverflow,
}
