//! Configuration types for the cost engine.
//!
//! This module contains the engine settings and the strongly-typed shapes
//! of the reference-data YAML files.

use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{
    CompEntry, Employee, GlobalAllocation, InputItem, Month, MonthlyIndirect, MonthlyProduction,
    PriceEntry, Product, Recipe,
};

/// Default bound on the number of products costed concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Runtime settings for recomputes, read from `engine.yaml`.
///
/// # Example
///
/// ```
/// use cost_engine::config::EngineSettings;
///
/// let settings: EngineSettings = serde_yaml::from_str("max_concurrency: 2").unwrap();
/// assert_eq!(settings.max_concurrency, 2);
/// assert!(settings.deadline().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum number of products costed at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Optional wall-clock budget for the compute phase, in seconds.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    /// Company a recompute is restricted to when the caller gives none.
    #[serde(default)]
    pub company_id: Option<String>,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline_secs: None,
            company_id: None,
        }
    }
}

impl EngineSettings {
    /// The compute deadline, if one is configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// The worker-pool bound, never less than one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

/// The full set of reference data a recompute reads.
///
/// Built by [`super::ConfigLoader`] from YAML or assembled directly by hosts
/// and tests, then handed to [`crate::store::InMemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    /// Input items with current prices.
    pub inputs: Vec<InputItem>,
    /// Dated price changes.
    pub price_history: Vec<PriceEntry>,
    /// Employees with current compensation.
    pub employees: Vec<Employee>,
    /// Dated compensation changes.
    pub comp_history: Vec<CompEntry>,
    /// Product and line recipes.
    pub recipes: Vec<Recipe>,
    /// Products.
    pub products: Vec<Product>,
    /// Cost-pool shares per line.
    pub allocations: Vec<GlobalAllocation>,
    /// Monthly production rows.
    pub production: Vec<MonthlyProduction>,
    /// Monthly indirect amounts.
    pub indirects: Vec<MonthlyIndirect>,
}

/// A dated price as written in `inputs.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceChange {
    /// When the price took effect.
    pub effective_from: NaiveDateTime,
    /// The price.
    pub price: Decimal,
}

/// An input item as written in `inputs.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputRecord {
    /// The item.
    #[serde(flatten)]
    pub item: InputItem,
    /// Its price changes.
    #[serde(default)]
    pub history: Vec<PriceChange>,
}

/// `inputs.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsFile {
    /// All input items.
    pub inputs: Vec<InputRecord>,
}

/// A dated compensation as written in `employees.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompChange {
    /// When the change took effect.
    pub effective_from: NaiveDateTime,
    /// Gross monthly salary.
    pub gross_salary: Decimal,
    /// Payroll taxes.
    pub payroll_taxes: Decimal,
}

/// An employee as written in `employees.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeRecord {
    /// The employee.
    #[serde(flatten)]
    pub employee: Employee,
    /// Compensation changes.
    #[serde(default)]
    pub history: Vec<CompChange>,
}

/// `employees.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeesFile {
    /// All employees.
    pub employees: Vec<EmployeeRecord>,
}

/// `recipes.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipesFile {
    /// All recipes.
    pub recipes: Vec<Recipe>,
}

/// `products.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsFile {
    /// All products.
    pub products: Vec<Product>,
}

/// `allocations.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationsFile {
    /// All allocation rows.
    pub allocations: Vec<GlobalAllocation>,
}

/// A production row inside a month file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductionRecord {
    /// The product produced.
    pub product_id: String,
    /// The line it was produced on.
    pub line_id: String,
    /// Units produced.
    pub quantity: Decimal,
}

/// An indirect amount inside a month file.
#[derive(Debug, Clone, Deserialize)]
pub struct IndirectRecord {
    /// What the amount is for.
    #[serde(default)]
    pub concept: String,
    /// The amount.
    pub amount: Decimal,
}

/// `months/YYYY-MM.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthFile {
    /// Production rows for the month.
    #[serde(default)]
    pub production: Vec<ProductionRecord>,
    /// Indirect amounts for the month.
    #[serde(default)]
    pub indirect: Vec<IndirectRecord>,
}

impl MonthFile {
    /// Appends this month's rows to a snapshot.
    pub(crate) fn extend_snapshot(self, month: Month, snapshot: &mut ReferenceSnapshot) {
        snapshot
            .production
            .extend(self.production.into_iter().map(|p| MonthlyProduction {
                product_id: p.product_id,
                line_id: p.line_id,
                month,
                quantity: p.quantity,
            }));
        snapshot
            .indirects
            .extend(self.indirect.into_iter().map(|i| MonthlyIndirect {
                month,
                concept: i.concept,
                amount: i.amount,
            }));
    }
}
