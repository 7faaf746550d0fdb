//! Shared-cost allocation shares and monthly production/overhead figures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Month;

/// A company-wide cost pool that is split across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AllocationCategory {
    /// Indirect overhead, the sum of the month's indirect amounts.
    #[serde(rename = "INDIRECTOS")]
    Indirect,
    /// Labor, the sum of active employees' compensation.
    #[serde(rename = "EMPLEADOS")]
    Labor,
}

impl AllocationCategory {
    /// The stored category code.
    pub fn code(&self) -> &'static str {
        match self {
            AllocationCategory::Indirect => "INDIRECTOS",
            AllocationCategory::Labor => "EMPLEADOS",
        }
    }
}

/// A line's share of a cost pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAllocation {
    /// The pool being split.
    pub category: AllocationCategory,
    /// The line receiving the share.
    pub line_id: String,
    /// The share as a fraction in [0, 1].
    pub percent: Decimal,
}

/// Units of a product produced in a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProduction {
    /// The product produced.
    pub product_id: String,
    /// The line the product was produced on.
    pub line_id: String,
    /// The month of production.
    pub month: Month,
    /// Units produced.
    pub quantity: Decimal,
}

/// One indirect (overhead) amount booked for a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyIndirect {
    /// The month the amount is booked in.
    pub month: Month,
    /// What the amount is for (rent, energy, ...).
    #[serde(default)]
    pub concept: String,
    /// The amount.
    pub amount: Decimal,
}
