//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! settings and reference data from a directory of YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{CompEntry, Month, PriceEntry};
use crate::store::InMemoryStore;

use super::types::{
    AllocationsFile, EmployeesFile, EngineSettings, InputsFile, MonthFile, ProductsFile,
    RecipesFile, ReferenceSnapshot,
};

/// Loads engine settings and reference data.
///
/// # Directory Structure
///
/// ```text
/// fixtures/plant_a/
/// ├── engine.yaml        # Engine settings (optional)
/// ├── inputs.yaml        # Input items and price history
/// ├── employees.yaml     # Employees and compensation history
/// ├── recipes.yaml       # Product and line recipes
/// ├── products.yaml      # Products and costing configuration
/// ├── allocations.yaml   # Cost-pool shares per line
/// └── months/
///     └── 2025-03.yaml   # Production and indirect amounts for the month
/// ```
///
/// # Example
///
/// ```no_run
/// use cost_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./fixtures/plant_a").unwrap();
/// println!("Loaded {} products", loader.snapshot().products.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
    snapshot: ReferenceSnapshot,
}

impl ConfigLoader {
    /// Loads settings and reference data from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - Any required file is missing (`ConfigNotFound`)
    /// - Any file contains invalid YAML (`ConfigParseError`)
    /// - A month file is not named `YYYY-MM.yaml` (`ConfigParseError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings_path = path.join("engine.yaml");
        let settings = if settings_path.exists() {
            Self::load_yaml::<EngineSettings>(&settings_path)?
        } else {
            EngineSettings::default()
        };

        let mut snapshot = ReferenceSnapshot::default();

        let inputs = Self::load_yaml::<InputsFile>(&path.join("inputs.yaml"))?;
        for record in inputs.inputs {
            snapshot
                .price_history
                .extend(record.history.into_iter().map(|h| PriceEntry {
                    input_id: record.item.id.clone(),
                    price: h.price,
                    effective_from: h.effective_from,
                }));
            snapshot.inputs.push(record.item);
        }

        let employees = Self::load_yaml::<EmployeesFile>(&path.join("employees.yaml"))?;
        for record in employees.employees {
            snapshot
                .comp_history
                .extend(record.history.into_iter().map(|h| CompEntry {
                    employee_id: record.employee.id.clone(),
                    gross_salary: h.gross_salary,
                    payroll_taxes: h.payroll_taxes,
                    effective_from: h.effective_from,
                }));
            snapshot.employees.push(record.employee);
        }

        snapshot.recipes = Self::load_yaml::<RecipesFile>(&path.join("recipes.yaml"))?.recipes;
        snapshot.products = Self::load_yaml::<ProductsFile>(&path.join("products.yaml"))?.products;
        snapshot.allocations =
            Self::load_yaml::<AllocationsFile>(&path.join("allocations.yaml"))?.allocations;

        Self::load_months(&path.join("months"), &mut snapshot)?;

        debug!(
            path = %path.display(),
            inputs = snapshot.inputs.len(),
            employees = snapshot.employees.len(),
            products = snapshot.products.len(),
            "Loaded reference data"
        );

        Ok(Self { settings, snapshot })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every month file; a missing directory means no monthly data yet.
    fn load_months(months_dir: &Path, snapshot: &mut ReferenceSnapshot) -> EngineResult<()> {
        if !months_dir.exists() {
            return Ok(());
        }

        let months_dir_str = months_dir.display().to_string();
        let entries = fs::read_dir(months_dir).map_err(|_| EngineError::ConfigNotFound {
            path: months_dir_str.clone(),
        })?;

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: months_dir_str.clone(),
            })?;

            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "yaml") {
                continue;
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let month: Month = stem.parse().map_err(|_| EngineError::ConfigParseError {
                path: path.display().to_string(),
                message: format!("month files must be named YYYY-MM.yaml, got '{}'", stem),
            })?;

            Self::load_yaml::<MonthFile>(&path)?.extend_snapshot(month, snapshot);
        }

        Ok(())
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the loaded reference data.
    pub fn snapshot(&self) -> &ReferenceSnapshot {
        &self.snapshot
    }

    /// Splits the loader into settings and a store seeded with the reference data.
    pub fn into_store(self) -> (EngineSettings, InMemoryStore) {
        (self.settings, InMemoryStore::new(self.snapshot))
    }
}
