//! Configuration loading and management for the cost engine.
//!
//! This module provides functionality to load engine settings and the
//! reference data a recompute reads (inputs, employees, recipes, products,
//! allocations, monthly figures) from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use cost_engine::config::ConfigLoader;
//!
//! let (settings, store) = ConfigLoader::load("./fixtures/plant_a").unwrap().into_store();
//! println!("Worker pool: {}", settings.max_concurrency);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AllocationsFile, CompChange, DEFAULT_MAX_CONCURRENCY, EmployeeRecord, EmployeesFile,
    EngineSettings, IndirectRecord, InputRecord, InputsFile, MonthFile, PriceChange,
    ProductionRecord, ProductsFile, RecipesFile, ReferenceSnapshot,
};
