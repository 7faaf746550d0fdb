//! Recipes (bills of materials per batch or per cubic meter).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a recipe is attached to.
///
/// A product-scoped recipe wins over the line-scoped recipe of the
/// product's line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeScope {
    /// The recipe belongs to a single product.
    Product,
    /// The recipe is the fallback for every product on a line.
    Line,
}

/// The unit a recipe's quantities are expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeBase {
    /// Quantities are per production batch.
    PerBatch,
    /// Quantities are per cubic meter of material.
    PerM3,
}

/// One line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeItem {
    /// The input consumed.
    pub input_id: String,
    /// Quantity per batch or per m3, depending on the recipe base.
    pub quantity: Decimal,
}

/// A bill of materials for a product or a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier for the recipe.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the recipe belongs to a product or a line.
    pub scope: RecipeScope,
    /// The product or line id, according to `scope`.
    pub scope_id: String,
    /// The unit quantities are expressed against.
    pub base: RecipeBase,
    /// Exactly one recipe is active per scope at a time.
    #[serde(default)]
    pub active: bool,
    /// The recipe lines.
    #[serde(default)]
    pub items: Vec<RecipeItem>,
}

/// A recipe's resolved material cost, in the unit of its base.
///
/// # Example
///
/// ```
/// use cost_engine::models::{RecipeBase, RecipeCost};
/// use rust_decimal::Decimal;
///
/// let cost = RecipeCost::new(RecipeBase::PerM3, Decimal::new(80, 0));
/// assert_eq!(cost, RecipeCost::PerM3(Decimal::new(80, 0)));
/// assert_eq!(cost.amount(), Decimal::new(80, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "base", content = "amount")]
pub enum RecipeCost {
    /// Cost of one production batch.
    PerBatch(Decimal),
    /// Cost of one cubic meter.
    PerM3(Decimal),
}

impl RecipeCost {
    /// Wraps an amount according to the recipe base.
    pub fn new(base: RecipeBase, amount: Decimal) -> Self {
        match base {
            RecipeBase::PerBatch => RecipeCost::PerBatch(amount),
            RecipeBase::PerM3 => RecipeCost::PerM3(amount),
        }
    }

    /// The cost amount regardless of base.
    pub fn amount(&self) -> Decimal {
        match self {
            RecipeCost::PerBatch(amount) | RecipeCost::PerM3(amount) => *amount,
        }
    }

    /// The base this cost is expressed in.
    pub fn base(&self) -> RecipeBase {
        match self {
            RecipeCost::PerBatch(_) => RecipeBase::PerBatch,
            RecipeCost::PerM3(_) => RecipeBase::PerM3,
        }
    }
}
