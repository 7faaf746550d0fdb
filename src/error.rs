//! Error types for the cost engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while computing unit costs.

use thiserror::Error;

/// The main error type for the cost engine.
///
/// Errors fall into three families: lookups that found nothing
/// ([`EngineError::NotFound`]), product configuration that cannot be costed
/// ([`EngineError::Configuration`]), and the final commit failing
/// ([`EngineError::Transaction`]). The orchestrator recovers from the first
/// two per product and surfaces the third to its caller.
///
/// # Example
///
/// ```
/// use cost_engine::error::EngineError;
///
/// let error = EngineError::NotFound {
///     entity: "recipe".to_string(),
///     id: "rcp_9".to_string(),
/// };
/// assert_eq!(error.to_string(), "recipe not found: rcp_9");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced entity (input, employee, recipe, product) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        entity: String,
        /// The identifier that was not found.
        id: String,
    },

    /// Method-specific configuration is absent or inconsistent.
    #[error("Configuration error{}: {message}", product_suffix(.product_id))]
    Configuration {
        /// The product being costed, when known.
        product_id: Option<String>,
        /// A description of what is wrong with the configuration.
        message: String,
    },

    /// The atomic commit of computed rows failed.
    #[error("Transaction failed: {message}")]
    Transaction {
        /// A description of the commit failure.
        message: String,
    },

    /// A read from the underlying data source failed.
    #[error("Data access error: {message}")]
    DataAccess {
        /// A description of the read failure.
        message: String,
    },

    /// A settings or reference-data file was not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// A settings or reference-data file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A month string was not in `YYYY-MM` form.
    #[error("Invalid month: {value}")]
    InvalidMonth {
        /// The rejected input.
        value: String,
    },

    /// The recompute deadline elapsed before the commit phase started.
    #[error("Recompute deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded {
        /// Milliseconds elapsed when the deadline fired.
        elapsed_ms: u128,
    },
}

fn product_suffix(product_id: &Option<String>) -> String {
    match product_id {
        Some(id) => format!(" for product '{}'", id),
        None => String::new(),
    }
}

impl EngineError {
    /// Builds a [`EngineError::NotFound`].
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// Builds a [`EngineError::Configuration`] not yet tied to a product.
    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration {
            product_id: None,
            message: message.into(),
        }
    }

    /// Attaches a product id to a configuration error that lacks one.
    ///
    /// Other variants are returned unchanged.
    pub fn for_product(self, id: &str) -> Self {
        match self {
            EngineError::Configuration {
                product_id: None,
                message,
            } => EngineError::Configuration {
                product_id: Some(id.to_string()),
                message,
            },
            other => other,
        }
    }

    /// Returns true if the error only invalidates the product being costed.
    ///
    /// The orchestrator logs and skips products failing with these errors;
    /// everything else aborts the recompute.
    pub fn is_product_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound { .. }
                | EngineError::Configuration { .. }
                | EngineError::DataAccess { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
