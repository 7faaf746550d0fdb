//! Cost breakdown results and the rows the engine persists.
//!
//! This module contains the [`CostBreakdown`] type that captures a product's
//! unit cost for a month together with an audit trace explaining every
//! figure, and the [`ProductCostHistory`] row written by recomputes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Month;

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

impl AuditStep {
    /// Creates an unnumbered step; [`AuditTrace::new`] assigns the number.
    pub fn new(
        rule_id: &str,
        rule_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: String,
    ) -> Self {
        Self {
            step_number: 0,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            input,
            output,
            reasoning,
        }
    }
}

/// A warning generated during calculation.
///
/// Warnings flag figures that are valid but deserve a second look, such as a
/// line with no production in the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl AuditWarning {
    /// Creates a warning.
    pub fn new(code: &str, message: String, severity: &str) -> Self {
        Self {
            code: code.to_string(),
            message,
            severity: severity.to_string(),
        }
    }
}

/// The complete audit trace for one product's breakdown.
///
/// # Example
///
/// ```
/// use cost_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// assert!(trace.steps.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

impl AuditTrace {
    /// Builds a trace, numbering the steps in the order given.
    pub fn new(steps: Vec<AuditStep>, warnings: Vec<AuditWarning>, duration_us: u64) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, mut step)| {
                step.step_number = i as u32 + 1;
                step
            })
            .collect();
        Self {
            steps,
            warnings,
            duration_us,
        }
    }
}

/// A product's unit cost for a month, split by component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// The product costed.
    pub product_id: String,
    /// The product's line, which keyed the shared-cost allocation.
    pub line_id: String,
    /// The month costed.
    pub month: Month,
    /// Raw-material cost per output unit.
    pub direct_per_output: Decimal,
    /// Overhead share per output unit.
    pub indirect_per_output: Decimal,
    /// Labor share per output unit.
    pub employees_per_output: Decimal,
    /// Sum of the three components.
    pub total_per_output: Decimal,
    /// How each figure was derived.
    pub audit_trace: AuditTrace,
}

impl CostBreakdown {
    /// Converts the breakdown into the row a recompute persists.
    ///
    /// Rows written by the engine are never flagged as manual overrides.
    pub fn to_history_row(&self, computed_at: DateTime<Utc>) -> ProductCostHistory {
        ProductCostHistory {
            product_id: self.product_id.clone(),
            month: self.month,
            direct_per_output: self.direct_per_output,
            indirect_per_output: self.indirect_per_output,
            employees_per_output: self.employees_per_output,
            total_per_output: self.total_per_output,
            manual_override: false,
            computed_at,
        }
    }
}

/// One persisted (product, month) unit-cost row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCostHistory {
    /// The product costed.
    pub product_id: String,
    /// The month costed.
    pub month: Month,
    /// Raw-material cost per output unit.
    pub direct_per_output: Decimal,
    /// Overhead share per output unit.
    pub indirect_per_output: Decimal,
    /// Labor share per output unit.
    pub employees_per_output: Decimal,
    /// Sum of the three components.
    pub total_per_output: Decimal,
    /// Set by manual edits outside the engine.
    pub manual_override: bool,
    /// When the row was computed.
    pub computed_at: DateTime<Utc>,
}
