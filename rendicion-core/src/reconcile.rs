//! Reconciliation: how the spent total compares with the requested amount.
//!
//! Amounts are `Decimal`, so accumulation is exact and order independent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::item_store::ExpenseItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceStatus {
    /// Spent more than requested.
    Over,
    /// Still short of justifying the requested amount.
    Under,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Variances strictly below this (in absolute value) count as exact.
    pub epsilon: Decimal,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            epsilon: Decimal::new(5, 3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub requested: Decimal,
    pub total: Decimal,
    /// `total - requested`
    pub variance: Decimal,
    pub status: VarianceStatus,
}

pub fn total_of(items: &[ExpenseItem]) -> Decimal {
    items.iter().map(|i| i.amount).sum()
}

pub fn classify(variance: Decimal, config: &ReconcileConfig) -> VarianceStatus {
    if variance.abs() < config.epsilon {
        VarianceStatus::Exact
    } else if variance > Decimal::ZERO {
        VarianceStatus::Over
    } else {
        VarianceStatus::Under
    }
}

pub fn reconcile(
    items: &[ExpenseItem],
    requested: Decimal,
    config: &ReconcileConfig,
) -> Reconciliation {
    let total = total_of(items);
    let variance = total - requested;
    Reconciliation {
        requested,
        total,
        variance,
        status: classify(variance, config),
    }
}
