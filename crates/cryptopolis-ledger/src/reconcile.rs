//! Balance reconciliation against the entry log.
//!
//! The balance and the cumulative yield are running totals; the entry log is
//! the record they were derived from. Replaying the log must reproduce both.
//! A mismatch means the ledger was corrupted or edited outside the recording
//! methods (typically a hand-modified save file).

use cryptopolis_types::LedgerEntryKind;
use rust_decimal::Decimal;

use crate::TreasuryLedger;

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Running totals match the entry log.
    Balanced,
    /// The running balance differs from the replayed balance.
    BalanceDrift {
        /// Balance replayed from entries.
        expected: Decimal,
        /// Balance stored in the ledger.
        actual: Decimal,
    },
    /// The cumulative yield differs from the sum of yield entries.
    YieldDrift {
        /// Yield replayed from entries.
        expected: Decimal,
        /// Yield stored in the ledger.
        actual: Decimal,
    },
    /// An entry carries a zero or negative amount.
    InvalidEntry {
        /// Position of the entry in the log.
        index: usize,
    },
    /// Replaying overflowed.
    Overflow,
}

/// Replay the entry log and compare it with the running totals.
pub fn reconcile(ledger: &TreasuryLedger) -> ReconcileResult {
    let mut balance = Decimal::ZERO;
    let mut total_yield = Decimal::ZERO;

    for (index, entry) in ledger.entries().iter().enumerate() {
        if entry.amount <= Decimal::ZERO {
            return ReconcileResult::InvalidEntry { index };
        }
        let next = if entry.kind.is_credit() {
            balance.checked_add(entry.amount)
        } else {
            balance.checked_sub(entry.amount)
        };
        let Some(next) = next else {
            return ReconcileResult::Overflow;
        };
        balance = next;

        if entry.kind == LedgerEntryKind::Yield {
            let Some(next_yield) = total_yield.checked_add(entry.amount) else {
                return ReconcileResult::Overflow;
            };
            total_yield = next_yield;
        }
    }

    if balance != ledger.balance() {
        return ReconcileResult::BalanceDrift {
            expected: balance,
            actual: ledger.balance(),
        };
    }
    if total_yield != ledger.total_yield_earned() {
        return ReconcileResult::YieldDrift {
            expected: total_yield,
            actual: ledger.total_yield_earned(),
        };
    }
    ReconcileResult::Balanced
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cryptopolis_types::BuildingId;

    use super::*;

    #[test]
    fn fresh_ledger_is_balanced() {
        let ledger = TreasuryLedger::open(Decimal::from(10_000), Decimal::ZERO).unwrap();
        assert_eq!(reconcile(&ledger), ReconcileResult::Balanced);
    }

    #[test]
    fn mixed_activity_is_balanced() {
        let mut ledger = TreasuryLedger::open(Decimal::from(10_000), Decimal::ZERO).unwrap();
        ledger.spend(1, Decimal::from(2_000), Some(BuildingId(1))).unwrap();
        ledger
            .credit(2, LedgerEntryKind::Yield, Decimal::new(4950, 2), Some(BuildingId(1)))
            .unwrap();
        ledger
            .charge(3, LedgerEntryKind::DisasterLoss, Decimal::from(9_000), None)
            .unwrap();
        ledger.settle(3);
        assert_eq!(reconcile(&ledger), ReconcileResult::Balanced);
    }

    #[test]
    fn tampered_balance_is_detected() {
        let ledger = TreasuryLedger::open(Decimal::from(100), Decimal::ZERO).unwrap();
        let mut json = serde_json::to_value(&ledger).unwrap();
        json["balance"] = serde_json::Value::String("999".to_owned());
        let tampered: TreasuryLedger = serde_json::from_value(json).unwrap();

        assert_eq!(
            reconcile(&tampered),
            ReconcileResult::BalanceDrift {
                expected: Decimal::from(100),
                actual: Decimal::from(999),
            }
        );
    }
}
