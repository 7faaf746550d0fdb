//! In-memory implementation of the data-access interface.
//!
//! Backs tests, benchmarks and hosts that load reference data from YAML.
//! Every interface call is counted so callers can check that history reads
//! stay batched.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::ReferenceSnapshot;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AllocationCategory, CompEntry, Employee, Month, MonthlyProduction, PriceEntry, Product,
    ProductCostHistory, Recipe, RecipeScope,
};

use super::CostDataAccess;

/// A [`CostDataAccess`] backed by a [`ReferenceSnapshot`] held in memory.
///
/// # Example
///
/// ```
/// use cost_engine::config::ReferenceSnapshot;
/// use cost_engine::store::InMemoryStore;
///
/// let store = InMemoryStore::new(ReferenceSnapshot::default());
/// assert_eq!(store.query_count("list_active_products"), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    reference: RwLock<ReferenceSnapshot>,
    history: RwLock<BTreeMap<(String, Month), ProductCostHistory>>,
    queries: Mutex<BTreeMap<&'static str, usize>>,
    fail_commits: AtomicBool,
}

impl InMemoryStore {
    /// Creates a store seeded with the given reference data.
    pub fn new(snapshot: ReferenceSnapshot) -> Self {
        Self {
            reference: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    /// Number of times the named interface method has been called.
    pub fn query_count(&self, method: &str) -> usize {
        self.queries
            .lock()
            .map(|q| q.get(method).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Clears all query counters.
    pub fn reset_query_counts(&self) {
        if let Ok(mut queries) = self.queries.lock() {
            queries.clear();
        }
    }

    /// Makes every subsequent commit fail (or succeed again).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Applies a change to the reference data.
    pub fn update_reference<F>(&self, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut ReferenceSnapshot),
    {
        let mut reference = self.reference.write().map_err(|_| poisoned())?;
        f(&mut reference);
        Ok(())
    }

    /// Writes a row directly, bypassing the engine (as a manual edit would).
    pub fn seed_cost_history(&self, row: ProductCostHistory) -> EngineResult<()> {
        let mut history = self.history.write().map_err(|_| poisoned())?;
        history.insert((row.product_id.clone(), row.month), row);
        Ok(())
    }

    /// The persisted row for a product and month, if any.
    pub fn cost_history(&self, product_id: &str, month: Month) -> Option<ProductCostHistory> {
        self.history
            .read()
            .ok()
            .and_then(|h| h.get(&(product_id.to_string(), month)).cloned())
    }

    /// Every persisted row for a month, ordered by product id.
    pub fn cost_history_for_month(&self, month: Month) -> Vec<ProductCostHistory> {
        self.history
            .read()
            .map(|h| {
                h.values()
                    .filter(|row| row.month == month)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record(&self, method: &'static str) {
        if let Ok(mut queries) = self.queries.lock() {
            *queries.entry(method).or_insert(0) += 1;
        }
    }

    fn read(&self, method: &'static str) -> EngineResult<RwLockReadGuard<'_, ReferenceSnapshot>> {
        self.record(method);
        self.reference.read().map_err(|_| poisoned())
    }
}

fn poisoned() -> EngineError {
    EngineError::DataAccess {
        message: "in-memory store lock poisoned".to_string(),
    }
}

#[async_trait]
impl CostDataAccess for InMemoryStore {
    async fn get_price_history(
        &self,
        input_ids: &[String],
        as_of: NaiveDateTime,
    ) -> EngineResult<Vec<PriceEntry>> {
        let reference = self.read("get_price_history")?;
        let wanted: HashSet<&str> = input_ids.iter().map(String::as_str).collect();
        Ok(reference
            .price_history
            .iter()
            .filter(|e| wanted.contains(e.input_id.as_str()) && e.effective_from <= as_of)
            .cloned()
            .collect())
    }

    async fn get_current_prices(
        &self,
        input_ids: &[String],
    ) -> EngineResult<HashMap<String, Decimal>> {
        let reference = self.read("get_current_prices")?;
        let wanted: HashSet<&str> = input_ids.iter().map(String::as_str).collect();
        Ok(reference
            .inputs
            .iter()
            .filter(|i| wanted.contains(i.id.as_str()))
            .map(|i| (i.id.clone(), i.current_price))
            .collect())
    }

    async fn get_comp_history(
        &self,
        employee_ids: &[String],
        as_of: NaiveDateTime,
    ) -> EngineResult<Vec<CompEntry>> {
        let reference = self.read("get_comp_history")?;
        let wanted: HashSet<&str> = employee_ids.iter().map(String::as_str).collect();
        Ok(reference
            .comp_history
            .iter()
            .filter(|e| wanted.contains(e.employee_id.as_str()) && e.effective_from <= as_of)
            .cloned()
            .collect())
    }

    async fn get_employees(&self, employee_ids: &[String]) -> EngineResult<Vec<Employee>> {
        let reference = self.read("get_employees")?;
        let wanted: HashSet<&str> = employee_ids.iter().map(String::as_str).collect();
        Ok(reference
            .employees
            .iter()
            .filter(|e| wanted.contains(e.id.as_str()))
            .cloned()
            .collect())
    }

    async fn list_active_employees(&self) -> EngineResult<Vec<Employee>> {
        let reference = self.read("list_active_employees")?;
        Ok(reference
            .employees
            .iter()
            .filter(|e| e.active)
            .cloned()
            .collect())
    }

    async fn get_recipe(&self, recipe_id: &str) -> EngineResult<Option<Recipe>> {
        let reference = self.read("get_recipe")?;
        Ok(reference.recipes.iter().find(|r| r.id == recipe_id).cloned())
    }

    async fn get_active_recipe(
        &self,
        scope: RecipeScope,
        scope_id: &str,
    ) -> EngineResult<Option<Recipe>> {
        let reference = self.read("get_active_recipe")?;
        Ok(reference
            .recipes
            .iter()
            .find(|r| r.active && r.scope == scope && r.scope_id == scope_id)
            .cloned())
    }

    async fn get_allocation(
        &self,
        category: AllocationCategory,
        line_id: &str,
    ) -> EngineResult<Option<Decimal>> {
        let reference = self.read("get_allocation")?;
        Ok(reference
            .allocations
            .iter()
            .find(|a| a.category == category && a.line_id == line_id)
            .map(|a| a.percent))
    }

    async fn get_monthly_production(&self, month: Month) -> EngineResult<Vec<MonthlyProduction>> {
        let reference = self.read("get_monthly_production")?;
        Ok(reference
            .production
            .iter()
            .filter(|p| p.month == month)
            .cloned()
            .collect())
    }

    async fn get_monthly_indirect_total(&self, month: Month) -> EngineResult<Decimal> {
        let reference = self.read("get_monthly_indirect_total")?;
        reference
            .indirects
            .iter()
            .filter(|i| i.month == month)
            .try_fold(Decimal::ZERO, |total, i| total.checked_add(i.amount))
            .ok_or_else(|| EngineError::DataAccess {
                message: format!("indirect total for {} overflows decimal range", month),
            })
    }

    async fn get_product(&self, product_id: &str) -> EngineResult<Option<Product>> {
        let reference = self.read("get_product")?;
        Ok(reference
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned())
    }

    async fn list_active_products(&self, company_id: Option<&str>) -> EngineResult<Vec<Product>> {
        let reference = self.read("list_active_products")?;
        Ok(reference
            .products
            .iter()
            .filter(|p| p.active)
            .filter(|p| company_id.is_none_or(|c| p.company_id.as_deref() == Some(c)))
            .cloned()
            .collect())
    }

    async fn upsert_cost_history(&self, rows: &[ProductCostHistory]) -> EngineResult<()> {
        self.record("upsert_cost_history");

        let mut keys = HashSet::with_capacity(rows.len());
        for row in rows {
            if !keys.insert((row.product_id.as_str(), row.month)) {
                return Err(EngineError::Transaction {
                    message: format!(
                        "duplicate row for product '{}' in {}",
                        row.product_id, row.month
                    ),
                });
            }
        }

        let mut history = self.history.write().map_err(|_| EngineError::Transaction {
            message: "cost history lock poisoned".to_string(),
        })?;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(EngineError::Transaction {
                message: "commit rejected by store".to_string(),
            });
        }
        for row in rows {
            history.insert((row.product_id.clone(), row.month), row.clone());
        }
        debug!(rows = rows.len(), "Committed cost history rows");
        Ok(())
    }
}
