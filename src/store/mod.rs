//! Data-access interface consumed by the engine.
//!
//! The engine reads reference data and writes cost rows exclusively through
//! [`CostDataAccess`], so any persistence layer can host it. History reads
//! are batched by contract: callers pass every id they need and the
//! implementation answers in one round trip.

mod memory;

pub use memory::InMemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AllocationCategory, CompEntry, Employee, Month, MonthlyProduction, PriceEntry, Product,
    ProductCostHistory, Recipe, RecipeScope,
};

/// Read and write access to the data the engine works on.
#[async_trait]
pub trait CostDataAccess: Send + Sync {
    // ── Inputs ──

    /// Price history rows for the given inputs effective at or before `as_of`.
    async fn get_price_history(
        &self,
        input_ids: &[String],
        as_of: NaiveDateTime,
    ) -> EngineResult<Vec<PriceEntry>>;

    /// Current catalog prices for the given inputs.
    ///
    /// Inputs that do not exist are absent from the returned map.
    async fn get_current_prices(&self, input_ids: &[String])
    -> EngineResult<HashMap<String, Decimal>>;

    /// Current catalog price of one input.
    async fn get_current_price(&self, input_id: &str) -> EngineResult<Decimal> {
        let prices = self.get_current_prices(&[input_id.to_string()]).await?;
        prices
            .get(input_id)
            .copied()
            .ok_or_else(|| EngineError::not_found("input", input_id))
    }

    // ── Employees ──

    /// Compensation history rows for the given employees effective at or before `as_of`.
    async fn get_comp_history(
        &self,
        employee_ids: &[String],
        as_of: NaiveDateTime,
    ) -> EngineResult<Vec<CompEntry>>;

    /// The given employees with their current compensation.
    ///
    /// Employees that do not exist are absent from the result.
    async fn get_employees(&self, employee_ids: &[String]) -> EngineResult<Vec<Employee>>;

    /// Every active employee.
    async fn list_active_employees(&self) -> EngineResult<Vec<Employee>>;

    // ── Recipes ──

    /// A recipe with its items.
    async fn get_recipe(&self, recipe_id: &str) -> EngineResult<Option<Recipe>>;

    /// The active recipe of a product or line, if any.
    async fn get_active_recipe(
        &self,
        scope: RecipeScope,
        scope_id: &str,
    ) -> EngineResult<Option<Recipe>>;

    // ── Allocation pools ──

    /// A line's share of a cost pool, if configured.
    async fn get_allocation(
        &self,
        category: AllocationCategory,
        line_id: &str,
    ) -> EngineResult<Option<Decimal>>;

    /// Every production row for the month.
    async fn get_monthly_production(&self, month: Month) -> EngineResult<Vec<MonthlyProduction>>;

    /// The sum of the month's indirect amounts.
    async fn get_monthly_indirect_total(&self, month: Month) -> EngineResult<Decimal>;

    // ── Products ──

    /// One product by id.
    async fn get_product(&self, product_id: &str) -> EngineResult<Option<Product>>;

    /// Every active product, optionally restricted to one company.
    async fn list_active_products(&self, company_id: Option<&str>) -> EngineResult<Vec<Product>>;

    // ── Output ──

    /// Inserts or replaces the given rows keyed by (product, month).
    ///
    /// Implementations must apply all rows or none.
    async fn upsert_cost_history(&self, rows: &[ProductCostHistory]) -> EngineResult<()>;
}
