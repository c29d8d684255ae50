//! Diff engine for comparing a market snapshot against a desired state.
//!
//! The engine is partial: fields absent from the desired state never
//! appear in the diff, whatever their current value.

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, U256};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::DesiredState;
use crate::market::Snapshot;

/// A managed market field, in canonical order.
///
/// The derived ordering is the report order: price feed, then flags, then
/// risk parameters, then caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Oracle price source.
    PriceFeed,
    /// Active flag.
    Active,
    /// Frozen flag.
    Frozen,
    /// Borrowing flag.
    BorrowingEnabled,
    /// Flash-loan flag.
    FlashloanEnabled,
    /// Loan-to-value.
    Ltv,
    /// Liquidation threshold.
    LiquidationThreshold,
    /// Liquidation bonus.
    LiquidationBonus,
    /// Reserve factor.
    ReserveFactor,
    /// Liquidation protocol fee.
    LiquidationProtocolFee,
    /// Borrow cap.
    BorrowCap,
    /// Supply cap.
    SupplyCap,
    /// Debt ceiling.
    DebtCeiling,
}

impl Field {
    /// Returns the document name of the field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PriceFeed => "priceFeed",
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::BorrowingEnabled => "borrowingEnabled",
            Self::FlashloanEnabled => "flashloanEnabled",
            Self::Ltv => "ltv",
            Self::LiquidationThreshold => "liquidationThreshold",
            Self::LiquidationBonus => "liquidationBonus",
            Self::ReserveFactor => "reserveFactor",
            Self::LiquidationProtocolFee => "liquidationProtocolFee",
            Self::BorrowCap => "borrowCap",
            Self::SupplyCap => "supplyCap",
            Self::DebtCeiling => "debtCeiling",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// An address.
    Address(Address),
    /// A non-negative integer.
    Amount(U256),
    /// A flag.
    Flag(bool),
}

impl From<Address> for FieldValue {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<U256> for FieldValue {
    fn from(value: U256) -> Self {
        Self::Amount(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{address}"),
            Self::Amount(amount) => write!(f, "{amount}"),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Flag(flag) => serializer.serialize_bool(*flag),
            Self::Address(_) | Self::Amount(_) => serializer.collect_str(self),
        }
    }
}

/// Current and target value of one differing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Remote value.
    pub current: FieldValue,
    /// Desired value.
    pub target: FieldValue,
}

/// Fields where the desired state disagrees with the snapshot.
///
/// Every entry satisfies `current != target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    changes: BTreeMap<Field, FieldChange>,
}

impl Diff {
    /// Creates an empty diff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` when a target is set and differs from `current`.
    pub fn record<T>(&mut self, field: Field, current: T, target: Option<T>)
    where
        T: Into<FieldValue> + PartialEq,
    {
        if let Some(target) = target
            && target != current
        {
            self.changes.insert(
                field,
                FieldChange {
                    current: current.into(),
                    target: target.into(),
                },
            );
        }
    }

    /// Returns true if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of differing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if `field` differs.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.changes.contains_key(&field)
    }

    /// Returns the change recorded for `field`.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldChange> {
        self.changes.get(&field)
    }

    /// Iterates the changes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldChange)> {
        self.changes.iter().map(|(field, change)| (*field, change))
    }

    /// Returns the names of the differing fields, in canonical order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.changes.keys().map(|f| f.name().to_string()).collect()
    }

    /// Returns the target of an address field.
    #[must_use]
    pub fn target_address(&self, field: Field) -> Option<Address> {
        match self.get(field)?.target {
            FieldValue::Address(address) => Some(address),
            FieldValue::Amount(_) | FieldValue::Flag(_) => None,
        }
    }

    /// Returns the target of an integer field.
    #[must_use]
    pub fn target_amount(&self, field: Field) -> Option<U256> {
        match self.get(field)?.target {
            FieldValue::Amount(amount) => Some(amount),
            FieldValue::Address(_) | FieldValue::Flag(_) => None,
        }
    }

    /// Returns the target of a flag field.
    #[must_use]
    pub fn target_flag(&self, field: Field) -> Option<bool> {
        match self.get(field)?.target {
            FieldValue::Flag(flag) => Some(flag),
            FieldValue::Address(_) | FieldValue::Amount(_) => None,
        }
    }
}

impl Serialize for Diff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.changes.len()))?;
        for (field, change) in &self.changes {
            map.serialize_entry(field.name(), change)?;
        }
        map.end()
    }
}

/// Engine for computing diffs between a snapshot and a desired state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares every field present in `desired` against `current`.
    #[must_use]
    pub fn diff(&self, current: &Snapshot, desired: &DesiredState) -> Diff {
        let risk = &desired.risk;
        let mut diff = Diff::new();

        diff.record(Field::PriceFeed, current.price_feed, desired.price_feed);

        diff.record(Field::Active, current.is_active, risk.active);
        diff.record(Field::Frozen, current.is_frozen, risk.frozen);
        diff.record(Field::BorrowingEnabled, current.borrowing_enabled, risk.borrowing_enabled);
        diff.record(Field::FlashloanEnabled, current.flashloan_enabled, risk.flashloan_enabled);

        diff.record(Field::Ltv, current.ltv, risk.ltv);
        diff.record(
            Field::LiquidationThreshold,
            current.liquidation_threshold,
            risk.liquidation_threshold,
        );
        diff.record(Field::LiquidationBonus, current.liquidation_bonus, risk.liquidation_bonus);
        diff.record(Field::ReserveFactor, current.reserve_factor, risk.reserve_factor);
        diff.record(
            Field::LiquidationProtocolFee,
            current.liquidation_protocol_fee,
            risk.liquidation_protocol_fee,
        );

        diff.record(Field::BorrowCap, current.borrow_cap, risk.borrow_cap);
        diff.record(Field::SupplyCap, current.supply_cap, risk.supply_cap);
        diff.record(Field::DebtCeiling, current.debt_ceiling, risk.debt_ceiling);

        debug!(asset = %current.asset, changes = diff.len(), "Computed diff");
        diff
    }
}
