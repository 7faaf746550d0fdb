//! Products and their costing configuration.
//!
//! A [`Product`] is stored the way administrative flows maintain it: a
//! method tag plus three optional payloads. [`Product::costing`] turns that
//! record into the validated [`ProductCosting`] union the calculator
//! dispatches on, so a product whose payload does not match its method is
//! rejected before any arithmetic happens.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The algorithm family used to compute a product's direct cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMethod {
    /// Recipe cost per batch divided by the net outputs of a batch.
    Batch,
    /// Recipe cost per cubic meter times the volume of one output.
    Volumetric,
    /// Sum of a per-unit bill of materials at current prices.
    PerUnitBom,
}

/// How many sellable outputs one batch yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YieldModel {
    /// One stage: outputs per batch net of a global scrap fraction.
    Direct {
        /// Gross outputs per batch.
        outputs_per_batch: Decimal,
        /// Fraction of outputs lost, in [0, 1).
        scrap_global: Decimal,
    },
    /// Two stages: a batch yields intermediates, each intermediate yields outputs.
    Chained {
        /// Gross intermediates per batch.
        intermediates_per_batch: Decimal,
        /// Fraction of intermediates lost, in [0, 1).
        scrap_a: Decimal,
        /// Gross outputs per intermediate.
        outputs_per_intermediate: Decimal,
        /// Fraction of outputs lost, in [0, 1).
        scrap_b: Decimal,
    },
}

/// Yield configuration for BATCH products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldConfig {
    /// The yield model.
    pub model: YieldModel,
    /// Cubic meters per batch; required when the recipe is per m3.
    #[serde(default)]
    pub m3_per_batch: Option<Decimal>,
}

/// Volume parameter for VOLUMETRIC products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumetricParam {
    /// Cubic meters of material in one output unit.
    pub m3_per_output: Decimal,
}

/// One line of a per-unit bill of materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    /// The input consumed.
    pub input_id: String,
    /// Quantity consumed per output unit.
    pub quantity_per_output: Decimal,
}

/// A manufactured product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier for the product.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning company, used to filter recomputes.
    #[serde(default)]
    pub company_id: Option<String>,
    /// The production line the product belongs to.
    pub line_id: String,
    /// Inactive products are skipped by recomputes.
    #[serde(default = "default_active")]
    pub active: bool,
    /// The costing method tag.
    pub cost_method: CostMethod,
    /// Present for BATCH products.
    #[serde(default)]
    pub yield_config: Option<YieldConfig>,
    /// Present for VOLUMETRIC products.
    #[serde(default)]
    pub volumetric: Option<VolumetricParam>,
    /// Non-empty for PER_UNIT_BOM products.
    #[serde(default)]
    pub bom: Vec<BomLine>,
}

fn default_active() -> bool {
    true
}

/// A product's validated costing configuration.
///
/// Each case carries only what its method needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProductCosting<'a> {
    /// BATCH method.
    Batch(&'a YieldConfig),
    /// VOLUMETRIC method.
    Volumetric(VolumetricParam),
    /// PER_UNIT_BOM method.
    PerUnitBom(&'a [BomLine]),
}

impl Product {
    /// Validates the method payload and returns the costing case.
    ///
    /// A payload belonging to another method, or a missing payload, is a
    /// configuration error for this product.
    ///
    /// # Example
    ///
    /// ```
    /// use cost_engine::models::{CostMethod, Product};
    ///
    /// let product = Product {
    ///     id: "prd_1".to_string(),
    ///     name: "Block".to_string(),
    ///     company_id: None,
    ///     line_id: "line_1".to_string(),
    ///     active: true,
    ///     cost_method: CostMethod::Batch,
    ///     yield_config: None,
    ///     volumetric: None,
    ///     bom: vec![],
    /// };
    /// assert!(product.costing().is_err());
    /// ```
    pub fn costing(&self) -> EngineResult<ProductCosting<'_>> {
        let extra = |name: &str| {
            EngineError::configuration(format!(
                "{} payload present on a {:?} product",
                name, self.cost_method
            ))
            .for_product(&self.id)
        };

        match self.cost_method {
            CostMethod::Batch => {
                if self.volumetric.is_some() {
                    return Err(extra("volumetric"));
                }
                if !self.bom.is_empty() {
                    return Err(extra("bom"));
                }
                self.yield_config
                    .as_ref()
                    .map(ProductCosting::Batch)
                    .ok_or_else(|| self.missing("yield_config"))
            }
            CostMethod::Volumetric => {
                if self.yield_config.is_some() {
                    return Err(extra("yield_config"));
                }
                if !self.bom.is_empty() {
                    return Err(extra("bom"));
                }
                self.volumetric
                    .map(ProductCosting::Volumetric)
                    .ok_or_else(|| self.missing("volumetric"))
            }
            CostMethod::PerUnitBom => {
                if self.yield_config.is_some() {
                    return Err(extra("yield_config"));
                }
                if self.volumetric.is_some() {
                    return Err(extra("volumetric"));
                }
                if self.bom.is_empty() {
                    return Err(self.missing("bom"));
                }
                Ok(ProductCosting::PerUnitBom(&self.bom))
            }
        }
    }

    fn missing(&self, name: &str) -> EngineError {
        EngineError::configuration(format!(
            "{:?} product has no {} configured",
            self.cost_method, name
        ))
        .for_product(&self.id)
    }
}
