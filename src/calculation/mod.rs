//! Calculation logic for the cost engine.
//!
//! This module contains the per-product cost pipeline: effective-dated price
//! and compensation resolution, recipe costing, direct cost per output for
//! each cost method, and allocation of shared indirect and labor pools
//! across production lines.

mod allocation;
mod checked;
mod direct_cost;
mod effective_dating;
mod recipe_cost;

#[cfg(test)]
pub(crate) mod test_support;

pub use allocation::{
    AllocationResult, MonthlyPools, ZERO_PRODUCTION, allocation_percent, indirect_per_output,
    labor_per_output, labor_pool, line_production, per_output_share,
};
pub use direct_cost::{
    DirectCostResult, VOLUMETRIC_PER_BATCH_RECIPE, compute_direct_cost, direct_cost_per_output,
    effective_outputs_per_batch, find_active_recipe,
};
pub use effective_dating::{
    EffectiveDated, compensations_in_force, latest_in_force, resolve_compensation,
    resolve_compensations, resolve_current_prices, resolve_price, resolve_prices,
};
pub use recipe_cost::{RecipeCostResult, cost_recipe, resolve_recipe_cost};
