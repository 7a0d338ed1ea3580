//! The city treasury: balance, append-only entries, and peak trackers.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Directional kinds**: each [`LedgerEntryKind`] is either a credit or a
//!   debit; amounts are always strictly positive.
//! - **Monotone peaks**: peak TVL, population, and building count only move
//!   up.
//! - **Precision**: all amounts use [`Decimal`] -- no floating point.

use cryptopolis_types::{BuildingId, LedgerEntry, LedgerEntryKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LedgerError;

/// The treasury ledger for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryLedger {
    /// Current balance. Below `insolvency_floor` only within a tick.
    balance: Decimal,
    /// Lowest balance the treasury is allowed to settle at.
    insolvency_floor: Decimal,
    /// Set when a penalty pushes the balance below the floor; cleared by
    /// [`settle`](Self::settle).
    insolvent: bool,
    /// Highest total value locked ever observed.
    peak_tvl: Decimal,
    /// Highest population ever observed.
    peak_population: u64,
    /// Highest standing building count ever observed.
    peak_building_count: u64,
    /// Sum of all yield credits.
    total_yield_earned: Decimal,
    /// All entries, in insertion order.
    entries: Vec<LedgerEntry>,
}

impl TreasuryLedger {
    /// Open a ledger with a genesis deposit of `starting_balance` on day 0.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NegativeAmount`] if the starting balance is
    /// negative.
    pub fn open(starting_balance: Decimal, insolvency_floor: Decimal) -> Result<Self, LedgerError> {
        if starting_balance.is_sign_negative() && !starting_balance.is_zero() {
            return Err(LedgerError::NegativeAmount {
                amount: starting_balance,
            });
        }
        let mut ledger = Self {
            balance: Decimal::ZERO,
            insolvency_floor,
            insolvent: false,
            peak_tvl: Decimal::ZERO,
            peak_population: 0,
            peak_building_count: 0,
            total_yield_earned: Decimal::ZERO,
            entries: Vec::new(),
        };
        if !starting_balance.is_zero() {
            ledger.credit(0, LedgerEntryKind::Genesis, starting_balance, None)?;
        }
        Ok(ledger)
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record a credit and add it to the balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is not strictly positive, the
    /// kind is a debit kind, or the balance would overflow.
    pub fn credit(
        &mut self,
        day: u64,
        kind: LedgerEntryKind,
        amount: Decimal,
        building: Option<BuildingId>,
    ) -> Result<Decimal, LedgerError> {
        validate_amount(amount)?;
        if !kind.is_credit() {
            return Err(LedgerError::WrongDirection { kind });
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if kind == LedgerEntryKind::Yield {
            self.total_yield_earned = self
                .total_yield_earned
                .checked_add(amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }
        self.balance = balance;
        self.push(day, kind, amount, building);
        Ok(self.balance)
    }

    /// Debit a construction cost. Never overdraws.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if `amount` exceeds the
    /// balance; the ledger is unchanged in that case.
    pub fn spend(
        &mut self,
        day: u64,
        amount: Decimal,
        building: Option<BuildingId>,
    ) -> Result<Decimal, LedgerError> {
        validate_amount(amount)?;
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.push(day, LedgerEntryKind::Construction, amount, building);
        Ok(self.balance)
    }

    /// Debit a penalty. May push the balance below the insolvency floor, in
    /// which case the insolvency flag is raised until the next settle.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is not strictly positive or the
    /// kind is a credit kind.
    pub fn charge(
        &mut self,
        day: u64,
        kind: LedgerEntryKind,
        amount: Decimal,
        building: Option<BuildingId>,
    ) -> Result<Decimal, LedgerError> {
        validate_amount(amount)?;
        if kind.is_credit() || kind == LedgerEntryKind::Construction {
            return Err(LedgerError::WrongDirection { kind });
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        if self.balance < self.insolvency_floor {
            self.insolvent = true;
        }
        self.push(day, kind, amount, building);
        Ok(self.balance)
    }

    /// Raise the balance back to the insolvency floor and clear the flag.
    ///
    /// Returns the adjustment credited, if any.
    pub fn settle(&mut self, day: u64) -> Option<Decimal> {
        self.insolvent = false;
        let shortfall = self.insolvency_floor.checked_sub(self.balance)?;
        if shortfall <= Decimal::ZERO {
            return None;
        }
        debug!(day, %shortfall, "treasury raised to insolvency floor");
        self.credit(day, LedgerEntryKind::FloorAdjustment, shortfall, None)
            .ok()
            .map(|_| shortfall)
    }

    fn push(&mut self, day: u64, kind: LedgerEntryKind, amount: Decimal, building: Option<BuildingId>) {
        self.entries.push(LedgerEntry {
            day,
            kind,
            amount,
            building,
        });
    }

    // -----------------------------------------------------------------------
    // Peaks
    // -----------------------------------------------------------------------

    /// Fold the current aggregates into the peak trackers (monotone max).
    pub fn observe(&mut self, tvl: Decimal, population: u64, building_count: u64) {
        self.peak_tvl = self.peak_tvl.max(tvl);
        self.peak_population = self.peak_population.max(population);
        self.peak_building_count = self.peak_building_count.max(building_count);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current balance.
    pub const fn balance(&self) -> Decimal {
        self.balance
    }

    /// Configured insolvency floor.
    pub const fn insolvency_floor(&self) -> Decimal {
        self.insolvency_floor
    }

    /// Whether a penalty pushed the balance below the floor this tick.
    pub const fn is_insolvent(&self) -> bool {
        self.insolvent
    }

    /// Highest TVL ever observed.
    pub const fn peak_tvl(&self) -> Decimal {
        self.peak_tvl
    }

    /// Highest population ever observed.
    pub const fn peak_population(&self) -> u64 {
        self.peak_population
    }

    /// Highest standing building count ever observed.
    pub const fn peak_building_count(&self) -> u64 {
        self.peak_building_count
    }

    /// Cumulative yield credited.
    pub const fn total_yield_earned(&self) -> Decimal {
        self.total_yield_earned
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries recorded on `day`.
    pub fn entries_for_day(&self, day: u64) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(move |e| e.day == day)
    }
}

/// Reject zero and negative amounts.
fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    if amount.is_sign_negative() {
        return Err(LedgerError::NegativeAmount { amount });
    }
    Ok(())
}
