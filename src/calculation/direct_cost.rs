//! Direct (raw-material) cost per output unit.
//!
//! This module dispatches on a product's costing method:
//!
//! - **BATCH**: active recipe cost per batch divided by the net outputs of a
//!   batch after scrap, through one or two yield stages.
//! - **VOLUMETRIC**: active recipe cost per m3 times the volume of one output.
//! - **PER_UNIT_BOM**: per-output bill of materials at current prices.
//!
//! Missing configuration is always an error, never a zero cost.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, BomLine, Month, Product, ProductCosting, Recipe, RecipeCost,
    RecipeScope, VolumetricParam, YieldConfig, YieldModel,
};
use crate::store::CostDataAccess;

use super::checked;
use super::effective_dating::resolve_current_prices;
use super::recipe_cost::cost_recipe;

/// Warning code for a volumetric product costed from a per-batch recipe.
pub const VOLUMETRIC_PER_BATCH_RECIPE: &str = "VOLUMETRIC_PER_BATCH_RECIPE";

/// The result of computing a product's direct cost.
#[derive(Debug, Clone)]
pub struct DirectCostResult {
    /// Raw-material cost of one output unit.
    pub per_output: Decimal,
    /// Audit steps in the order they were taken.
    pub audit_steps: Vec<AuditStep>,
    /// Warnings raised along the way.
    pub warnings: Vec<AuditWarning>,
}

fn check_scrap(name: &str, scrap: Decimal) -> EngineResult<()> {
    if scrap < Decimal::ZERO || scrap >= Decimal::ONE {
        return Err(EngineError::configuration(format!(
            "{} must be in [0, 1), got {}",
            name, scrap
        )));
    }
    Ok(())
}

/// Net outputs of one batch after scrap.
///
/// - Direct: `outputs_per_batch * (1 - scrap_global)`
/// - Chained: `intermediates_per_batch * (1 - scrap_a) * outputs_per_intermediate * (1 - scrap_b)`
///
/// # Errors
///
/// `Configuration` if a scrap fraction is outside [0, 1), the result is
/// not positive, or it overflows the decimal range.
///
/// # Example
///
/// ```
/// use cost_engine::calculation::effective_outputs_per_batch;
/// use cost_engine::models::{YieldConfig, YieldModel};
/// use rust_decimal::Decimal;
///
/// let config = YieldConfig {
///     model: YieldModel::Direct {
///         outputs_per_batch: Decimal::new(100, 0),
///         scrap_global: Decimal::new(1, 1),
///     },
///     m3_per_batch: None,
/// };
/// assert_eq!(effective_outputs_per_batch(&config).unwrap(), Decimal::new(90, 0));
/// ```
pub fn effective_outputs_per_batch(config: &YieldConfig) -> EngineResult<Decimal> {
    let outputs = match &config.model {
        YieldModel::Direct {
            outputs_per_batch,
            scrap_global,
        } => {
            check_scrap("scrap_global", *scrap_global)?;
            checked::mul(
                *outputs_per_batch,
                Decimal::ONE - *scrap_global,
                "outputs per batch",
            )?
        }
        YieldModel::Chained {
            intermediates_per_batch,
            scrap_a,
            outputs_per_intermediate,
            scrap_b,
        } => {
            check_scrap("scrap_a", *scrap_a)?;
            check_scrap("scrap_b", *scrap_b)?;
            let intermediates = checked::mul(
                *intermediates_per_batch,
                Decimal::ONE - *scrap_a,
                "intermediates per batch",
            )?;
            let outputs = checked::mul(intermediates, *outputs_per_intermediate, "outputs per batch")?;
            checked::mul(outputs, Decimal::ONE - *scrap_b, "outputs per batch")?
        }
    };

    if outputs <= Decimal::ZERO {
        return Err(EngineError::configuration(format!(
            "yield configuration gives {} outputs per batch; must be positive",
            outputs
        )));
    }
    Ok(outputs)
}

/// The product's active recipe, preferring its own over its line's.
///
/// # Errors
///
/// `NotFound` if neither the product nor its line has an active recipe.
pub async fn find_active_recipe(
    source: &dyn CostDataAccess,
    product: &Product,
) -> EngineResult<Recipe> {
    if let Some(recipe) = source
        .get_active_recipe(RecipeScope::Product, &product.id)
        .await?
    {
        return Ok(recipe);
    }
    source
        .get_active_recipe(RecipeScope::Line, &product.line_id)
        .await?
        .ok_or_else(|| {
            EngineError::not_found(
                "active recipe",
                format!("product {} / line {}", product.id, product.line_id),
            )
        })
}

/// Direct cost per output of a product by id.
///
/// # Errors
///
/// - `NotFound` if the product, its recipe or an input does not exist
/// - `Configuration` if the product's costing configuration is unusable
pub async fn direct_cost_per_output(
    source: &dyn CostDataAccess,
    product_id: &str,
    month: Month,
) -> EngineResult<DirectCostResult> {
    let product = source
        .get_product(product_id)
        .await?
        .ok_or_else(|| EngineError::not_found("product", product_id))?;
    compute_direct_cost(source, &product, month).await
}

/// Direct cost per output of an already-loaded product.
pub async fn compute_direct_cost(
    source: &dyn CostDataAccess,
    product: &Product,
    month: Month,
) -> EngineResult<DirectCostResult> {
    let result = match product.costing()? {
        ProductCosting::Batch(config) => batch_cost(source, product, config, month).await,
        ProductCosting::Volumetric(param) => volumetric_cost(source, product, param, month).await,
        ProductCosting::PerUnitBom(lines) => bom_cost(source, lines).await,
    }
    .map_err(|e| e.for_product(&product.id))?;

    debug!(
        product_id = %product.id,
        method = ?product.cost_method,
        direct_per_output = %result.per_output,
        "Computed direct cost"
    );
    Ok(result)
}

async fn batch_cost(
    source: &dyn CostDataAccess,
    product: &Product,
    config: &YieldConfig,
    month: Month,
) -> EngineResult<DirectCostResult> {
    let recipe = find_active_recipe(source, product).await?;
    let recipe_cost = cost_recipe(source, &recipe, Some(month)).await?;

    let per_batch = match recipe_cost.cost {
        RecipeCost::PerBatch(cost) => cost,
        RecipeCost::PerM3(cost) => {
            let m3_per_batch = config.m3_per_batch.ok_or_else(|| {
                EngineError::configuration(format!(
                    "recipe '{}' is per m3 but the yield configuration has no m3_per_batch",
                    recipe.id
                ))
            })?;
            checked::mul(cost, m3_per_batch, "cost per batch")?
        }
    };

    let outputs = effective_outputs_per_batch(config)?;
    let per_output = checked::div(per_batch, outputs, "direct cost per output")?;

    let yield_step = AuditStep::new(
        "batch_yield",
        "Batch Yield",
        serde_json::json!({
            "recipe_id": recipe.id,
            "recipe_cost": recipe_cost.cost.amount().to_string(),
            "m3_per_batch": config.m3_per_batch.map(|v| v.to_string()),
            "model": config.model,
        }),
        serde_json::json!({
            "cost_per_batch": per_batch.to_string(),
            "outputs_per_batch": outputs.to_string(),
            "direct_per_output": per_output.to_string(),
        }),
        format!(
            "Batch cost {} over {} net outputs gives {} per output",
            per_batch, outputs, per_output
        ),
    );

    Ok(DirectCostResult {
        per_output,
        audit_steps: vec![recipe_cost.audit_step, yield_step],
        warnings: vec![],
    })
}

async fn volumetric_cost(
    source: &dyn CostDataAccess,
    product: &Product,
    param: VolumetricParam,
    month: Month,
) -> EngineResult<DirectCostResult> {
    if param.m3_per_output <= Decimal::ZERO {
        return Err(EngineError::configuration(format!(
            "m3_per_output must be positive, got {}",
            param.m3_per_output
        )));
    }

    let recipe = find_active_recipe(source, product).await?;
    let recipe_cost = cost_recipe(source, &recipe, Some(month)).await?;

    // A per-batch recipe is taken as a per-m3 cost.
    let mut warnings = Vec::new();
    if let RecipeCost::PerBatch(_) = recipe_cost.cost {
        warnings.push(AuditWarning::new(
            VOLUMETRIC_PER_BATCH_RECIPE,
            format!(
                "Recipe '{}' is per batch; its batch cost was used as a per-m3 cost",
                recipe.id
            ),
            "medium",
        ));
    }

    let per_m3 = recipe_cost.cost.amount();
    let per_output = checked::mul(per_m3, param.m3_per_output, "direct cost per output")?;

    let volume_step = AuditStep::new(
        "volumetric",
        "Volumetric Cost",
        serde_json::json!({
            "recipe_id": recipe.id,
            "cost_per_m3": per_m3.to_string(),
            "m3_per_output": param.m3_per_output.to_string(),
        }),
        serde_json::json!({
            "direct_per_output": per_output.to_string(),
        }),
        format!(
            "{} per m3 times {} m3 per output gives {}",
            per_m3, param.m3_per_output, per_output
        ),
    );

    Ok(DirectCostResult {
        per_output,
        audit_steps: vec![recipe_cost.audit_step, volume_step],
        warnings,
    })
}

// Per-unit BOMs are always costed at current prices.
async fn bom_cost(
    source: &dyn CostDataAccess,
    lines: &[BomLine],
) -> EngineResult<DirectCostResult> {
    let input_ids: Vec<String> = lines.iter().map(|l| l.input_id.clone()).collect();
    let prices = resolve_current_prices(source, &input_ids).await?;

    let mut per_output = Decimal::ZERO;
    for line in lines {
        let price = prices
            .get(&line.input_id)
            .copied()
            .ok_or_else(|| EngineError::not_found("input", line.input_id.as_str()))?;
        let line_cost = checked::mul(line.quantity_per_output, price, "BOM line cost")?;
        per_output = checked::add(per_output, line_cost, "direct cost per output")?;
    }

    let bom_step = AuditStep::new(
        "per_unit_bom",
        "Per-Unit Bill of Materials",
        serde_json::json!({
            "lines": lines
                .iter()
                .map(|l| serde_json::json!({
                    "input_id": l.input_id,
                    "quantity_per_output": l.quantity_per_output.to_string(),
                }))
                .collect::<Vec<_>>(),
        }),
        serde_json::json!({
            "direct_per_output": per_output.to_string(),
        }),
        format!(
            "{} BOM lines at current prices give {} per output",
            lines.len(),
            per_output
        ),
    );

    Ok(DirectCostResult {
        per_output,
        audit_steps: vec![bom_step],
        warnings: vec![],
    })
}
