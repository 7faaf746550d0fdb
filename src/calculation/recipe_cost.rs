//! Recipe cost resolution.
//!
//! This module sums a recipe's bill of materials at resolved unit prices.
//! No rounding happens here; callers divide and multiply the full-precision
//! figure further.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, Month, Recipe, RecipeBase, RecipeCost};
use crate::store::CostDataAccess;

use super::checked;
use super::effective_dating::{resolve_current_prices, resolve_prices};

/// The result of costing a recipe, including the cost and audit step.
#[derive(Debug, Clone)]
pub struct RecipeCostResult {
    /// The recipe that was costed.
    pub recipe_id: String,
    /// Cost per batch or per m3, according to the recipe base.
    pub cost: RecipeCost,
    /// The audit step recording the costing.
    pub audit_step: AuditStep,
}

/// Costs a recipe by id.
///
/// With a `month`, input prices are those in force at the end of the month;
/// without one, current catalog prices are used.
///
/// # Errors
///
/// - `NotFound` if the recipe or any of its inputs does not exist
/// - `Configuration` if the cost overflows the decimal range
pub async fn resolve_recipe_cost(
    source: &dyn CostDataAccess,
    recipe_id: &str,
    month: Option<Month>,
) -> EngineResult<RecipeCostResult> {
    let recipe = source
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| EngineError::not_found("recipe", recipe_id))?;
    cost_recipe(source, &recipe, month).await
}

/// Costs an already-loaded recipe.
///
/// Prices for every item are fetched in one batch.
pub async fn cost_recipe(
    source: &dyn CostDataAccess,
    recipe: &Recipe,
    month: Option<Month>,
) -> EngineResult<RecipeCostResult> {
    let input_ids: Vec<String> = recipe.items.iter().map(|i| i.input_id.clone()).collect();
    let prices: HashMap<String, Decimal> = match month {
        Some(month) => resolve_prices(source, &input_ids, month).await?,
        None => resolve_current_prices(source, &input_ids).await?,
    };

    let mut total = Decimal::ZERO;
    let mut lines = Vec::with_capacity(recipe.items.len());
    for item in &recipe.items {
        let price = prices
            .get(&item.input_id)
            .copied()
            .ok_or_else(|| EngineError::not_found("input", item.input_id.as_str()))?;
        let line_cost = checked::mul(item.quantity, price, "recipe line cost")?;
        total = checked::add(total, line_cost, "recipe cost")?;
        lines.push(serde_json::json!({
            "input_id": item.input_id,
            "quantity": item.quantity.to_string(),
            "unit_price": price.to_string(),
            "cost": line_cost.to_string(),
        }));
    }

    let cost = RecipeCost::new(recipe.base, total);
    let audit_step = AuditStep::new(
        "recipe_cost",
        "Recipe Cost",
        serde_json::json!({
            "recipe_id": recipe.id,
            "base": recipe.base,
            "month": month.map(|m| m.to_string()),
            "items": lines,
        }),
        serde_json::json!({
            "cost": total.to_string(),
        }),
        format!(
            "Recipe '{}' costs {} {} at {} prices",
            recipe.id,
            total,
            match recipe.base {
                RecipeBase::PerBatch => "per batch",
                RecipeBase::PerM3 => "per m3",
            },
            month.map_or_else(|| "current".to_string(), |m| m.to_string())
        ),
    );

    Ok(RecipeCostResult {
        recipe_id: recipe.id.clone(),
        cost,
        audit_step,
    })
}
