//! Core data models for the cost engine.
//!
//! Reference data (inputs, employees, recipes, products, allocations) is
//! read-only from the engine's point of view; [`ProductCostHistory`] is the
//! only thing the engine writes.

mod allocation;
mod catalog;
mod cost_result;
mod employee;
mod month;
mod product;
mod recipe;

pub use allocation::{AllocationCategory, GlobalAllocation, MonthlyIndirect, MonthlyProduction};
pub use catalog::{InputItem, PriceEntry};
pub use cost_result::{AuditStep, AuditTrace, AuditWarning, CostBreakdown, ProductCostHistory};
pub use employee::{CompEntry, Compensation, Employee};
pub use month::Month;
pub use product::{
    BomLine, CostMethod, Product, ProductCosting, VolumetricParam, YieldConfig, YieldModel,
};
pub use recipe::{Recipe, RecipeBase, RecipeCost, RecipeItem, RecipeScope};
