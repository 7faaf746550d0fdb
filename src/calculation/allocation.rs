//! Shared-cost allocation across production lines.
//!
//! Company-wide pools (indirect overhead, labor) are split by each line's
//! configured share and spread over the line's production for the month:
//!
//! `per_output = pool * percent / line_production`
//!
//! A line that produced nothing bears no per-unit cost for the month.
//!
//! The pools and per-line production are the same for every product costed
//! in a month; [`MonthlyPools`] reads them once so a recompute does not
//! repeat those queries per product.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AllocationCategory, AuditStep, AuditWarning, Month};
use crate::store::CostDataAccess;

use super::checked;
use super::effective_dating::compensations_in_force;

/// Warning code for a line with no production in the month.
pub const ZERO_PRODUCTION: &str = "ZERO_PRODUCTION";

/// The result of allocating one cost pool to a line.
#[derive(Debug, Clone)]
pub struct AllocationResult {
    /// The pool that was split.
    pub category: AllocationCategory,
    /// The line's cost per output unit.
    pub per_output: Decimal,
    /// The company-wide pool for the month.
    pub pool: Decimal,
    /// The line's share of the pool.
    pub percent: Decimal,
    /// Units the line produced in the month.
    pub line_production: Decimal,
    /// The audit step recording the allocation.
    pub audit_step: AuditStep,
    /// Set when the line produced nothing.
    pub warning: Option<AuditWarning>,
}

/// Splits a pool and spreads it over a line's production.
///
/// Returns zero when `production` is not positive.
///
/// # Errors
///
/// `Configuration` if the share overflows the decimal range.
///
/// # Example
///
/// ```
/// use cost_engine::calculation::per_output_share;
/// use rust_decimal::Decimal;
///
/// let share = per_output_share(Decimal::new(40000, 0), Decimal::new(25, 2), Decimal::new(500, 0));
/// assert_eq!(share.unwrap(), Decimal::new(20, 0));
///
/// let idle = per_output_share(Decimal::new(40000, 0), Decimal::ONE, Decimal::ZERO);
/// assert_eq!(idle.unwrap(), Decimal::ZERO);
/// ```
pub fn per_output_share(
    pool: Decimal,
    percent: Decimal,
    production: Decimal,
) -> EngineResult<Decimal> {
    if production <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let share = checked::mul(pool, percent, "allocated pool")?;
    checked::div(share, production, "allocated cost per output")
}

/// The line's share of a pool.
///
/// # Errors
///
/// `Configuration` if no allocation row exists or the share is outside [0, 1].
pub async fn allocation_percent(
    source: &dyn CostDataAccess,
    category: AllocationCategory,
    line_id: &str,
) -> EngineResult<Decimal> {
    let percent = source
        .get_allocation(category, line_id)
        .await?
        .ok_or_else(|| {
            EngineError::configuration(format!(
                "line '{}' has no {} allocation",
                line_id,
                category.code()
            ))
        })?;

    if percent < Decimal::ZERO || percent > Decimal::ONE {
        return Err(EngineError::configuration(format!(
            "{} allocation for line '{}' must be in [0, 1], got {}",
            category.code(),
            line_id,
            percent
        )));
    }
    Ok(percent)
}

/// Total units produced on a line in a month.
pub async fn line_production(
    source: &dyn CostDataAccess,
    line_id: &str,
    month: Month,
) -> EngineResult<Decimal> {
    let rows = source.get_monthly_production(month).await?;
    checked::sum(
        rows.iter()
            .filter(|p| p.line_id == line_id)
            .map(|p| p.quantity),
        "line production",
    )
}

/// Company-wide labor cost for a month.
///
/// Sums salary and payroll taxes in force for every active employee, with
/// one history query covering all of them.
pub async fn labor_pool(source: &dyn CostDataAccess, month: Month) -> EngineResult<Decimal> {
    let employees = source.list_active_employees().await?;
    let compensations = compensations_in_force(source, &employees, month).await?;
    checked::sum(
        compensations
            .values()
            .flat_map(|c| [c.gross_salary, c.payroll_taxes]),
        "labor pool",
    )
}

/// Company-wide figures for one month, shared by every product costed in it.
#[derive(Debug, Clone)]
pub struct MonthlyPools {
    /// The month the figures belong to.
    pub month: Month,
    /// Sum of the month's indirect amounts.
    pub indirect_total: Decimal,
    /// Salary plus payroll taxes of every active employee.
    pub labor_total: Decimal,
    /// Units produced per line.
    pub production_by_line: HashMap<String, Decimal>,
}

impl MonthlyPools {
    /// Reads the month's pools and production in three concurrent queries.
    ///
    /// # Errors
    ///
    /// `DataAccess` if a read fails; `Configuration` if a total overflows.
    pub async fn load(source: &dyn CostDataAccess, month: Month) -> EngineResult<Self> {
        let (indirect_total, labor_total, production) = tokio::try_join!(
            source.get_monthly_indirect_total(month),
            labor_pool(source, month),
            source.get_monthly_production(month),
        )?;

        let mut production_by_line: HashMap<String, Decimal> = HashMap::new();
        for row in production {
            let units = production_by_line
                .entry(row.line_id)
                .or_insert(Decimal::ZERO);
            *units = checked::add(*units, row.quantity, "line production")?;
        }

        Ok(Self {
            month,
            indirect_total,
            labor_total,
            production_by_line,
        })
    }

    /// Units a line produced in the month; zero if it has no rows.
    pub fn line_production(&self, line_id: &str) -> Decimal {
        self.production_by_line
            .get(line_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Indirect overhead per output unit for a line.
    ///
    /// Only the line's allocation row is read from `source`.
    pub async fn indirect_per_output(
        &self,
        source: &dyn CostDataAccess,
        line_id: &str,
    ) -> EngineResult<AllocationResult> {
        let percent = allocation_percent(source, AllocationCategory::Indirect, line_id).await?;
        allocate(
            AllocationCategory::Indirect,
            line_id,
            self.month,
            self.indirect_total,
            percent,
            self.line_production(line_id),
        )
    }

    /// Labor cost per output unit for a line.
    ///
    /// Only the line's allocation row is read from `source`.
    pub async fn labor_per_output(
        &self,
        source: &dyn CostDataAccess,
        line_id: &str,
    ) -> EngineResult<AllocationResult> {
        let percent = allocation_percent(source, AllocationCategory::Labor, line_id).await?;
        allocate(
            AllocationCategory::Labor,
            line_id,
            self.month,
            self.labor_total,
            percent,
            self.line_production(line_id),
        )
    }
}

/// Indirect overhead per output unit for a line.
///
/// # Errors
///
/// `Configuration` if the line has no usable INDIRECTOS allocation.
pub async fn indirect_per_output(
    source: &dyn CostDataAccess,
    line_id: &str,
    month: Month,
) -> EngineResult<AllocationResult> {
    let (pool, percent, production) = tokio::try_join!(
        source.get_monthly_indirect_total(month),
        allocation_percent(source, AllocationCategory::Indirect, line_id),
        line_production(source, line_id, month),
    )?;
    allocate(
        AllocationCategory::Indirect,
        line_id,
        month,
        pool,
        percent,
        production,
    )
}

/// Labor cost per output unit for a line.
///
/// # Errors
///
/// `Configuration` if the line has no usable EMPLEADOS allocation.
pub async fn labor_per_output(
    source: &dyn CostDataAccess,
    line_id: &str,
    month: Month,
) -> EngineResult<AllocationResult> {
    let (pool, percent, production) = tokio::try_join!(
        labor_pool(source, month),
        allocation_percent(source, AllocationCategory::Labor, line_id),
        line_production(source, line_id, month),
    )?;
    allocate(
        AllocationCategory::Labor,
        line_id,
        month,
        pool,
        percent,
        production,
    )
}

fn allocate(
    category: AllocationCategory,
    line_id: &str,
    month: Month,
    pool: Decimal,
    percent: Decimal,
    production: Decimal,
) -> EngineResult<AllocationResult> {
    let per_output = per_output_share(pool, percent, production)?;

    let warning = (production <= Decimal::ZERO).then(|| {
        AuditWarning::new(
            ZERO_PRODUCTION,
            format!(
                "Line '{}' produced nothing in {}; {} per output is zero",
                line_id,
                month,
                category.code()
            ),
            "low",
        )
    });

    let (rule_id, rule_name) = match category {
        AllocationCategory::Indirect => ("indirect_allocation", "Indirect Cost Allocation"),
        AllocationCategory::Labor => ("labor_allocation", "Labor Cost Allocation"),
    };
    let audit_step = AuditStep::new(
        rule_id,
        rule_name,
        serde_json::json!({
            "line_id": line_id,
            "month": month.to_string(),
            "pool": pool.to_string(),
            "percent": percent.to_string(),
            "line_production": production.to_string(),
        }),
        serde_json::json!({
            "per_output": per_output.to_string(),
        }),
        format!(
            "{} pool {} x {} over {} units gives {} per output",
            category.code(),
            pool,
            percent,
            production,
            per_output
        ),
    );

    Ok(AllocationResult {
        category,
        per_output,
        pool,
        percent,
        line_production: production,
        audit_step,
        warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::test_support::{
        allocation, dec, month, plant_snapshot, produced, store_with,
    };
    use crate::config::ReferenceSnapshot;
    use crate::models::MonthlyIndirect;
    use proptest::prelude::*;

    fn march() -> Month {
        month(2025, 3)
    }

    #[tokio::test]
    async fn test_indirect_per_output_scenario() {
        let store = store_with(plant_snapshot());
        let result = indirect_per_output(&store, "line_blocks", march())
            .await
            .unwrap();

        // (40000 * 0.25) / 500
        assert_eq!(result.pool, dec("40000"));
        assert_eq!(result.line_production, dec("500"));
        assert_eq!(result.per_output, dec("20"));
        assert!(result.warning.is_none());
    }

    #[tokio::test]
    async fn test_labor_per_output_uses_month_compensation() {
        let store = store_with(plant_snapshot());
        let result = labor_per_output(&store, "line_blocks", march())
            .await
            .unwrap();

        // active employees: 3250 (history) + 2600 (current) = 5850; * 0.4 / 500
        assert_eq!(result.pool, dec("5850"));
        assert_eq!(result.per_output, dec("4.68"));
    }

    #[tokio::test]
    async fn test_labor_pool_is_one_history_query() {
        let store = store_with(plant_snapshot());
        labor_per_output(&store, "line_precast", march())
            .await
            .unwrap();
        assert_eq!(store.query_count("get_comp_history"), 1);
        assert_eq!(store.query_count("list_active_employees"), 1);
    }

    #[tokio::test]
    async fn test_zero_production_gives_zero_not_error() {
        let store = store_with(plant_snapshot());
        let april = month(2025, 4);

        let indirect = indirect_per_output(&store, "line_blocks", april)
            .await
            .unwrap();
        let labor = labor_per_output(&store, "line_blocks", april)
            .await
            .unwrap();

        assert_eq!(indirect.per_output, Decimal::ZERO);
        assert_eq!(labor.per_output, Decimal::ZERO);
        assert_eq!(labor.warning.unwrap().code, ZERO_PRODUCTION);
    }

    #[tokio::test]
    async fn test_missing_allocation_row_is_configuration_error() {
        let mut snapshot = plant_snapshot();
        snapshot
            .allocations
            .retain(|a| !(a.line_id == "line_precast" && a.category == AllocationCategory::Labor));
        let store = store_with(snapshot);

        match labor_per_output(&store, "line_precast", march()).await {
            Err(EngineError::Configuration { message, .. }) => {
                assert!(message.contains("EMPLEADOS"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_allocation_errors_even_without_production() {
        let store = store_with(plant_snapshot());
        let result = indirect_per_output(&store, "line_unknown", march()).await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_allocation_above_one_rejected() {
        let mut snapshot = plant_snapshot();
        snapshot.allocations[0].percent = dec("1.5");
        let store = store_with(snapshot);

        let result = indirect_per_output(&store, "line_blocks", march()).await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_monthly_pools_match_per_line_queries() {
        let store = store_with(plant_snapshot());
        let pools = MonthlyPools::load(&store, march()).await.unwrap();

        assert_eq!(pools.indirect_total, dec("40000"));
        assert_eq!(pools.labor_total, dec("5850"));
        assert_eq!(pools.line_production("line_blocks"), dec("500"));
        assert_eq!(pools.line_production("line_precast"), dec("250"));
        assert_eq!(pools.line_production("line_idle"), Decimal::ZERO);

        for line in ["line_blocks", "line_precast"] {
            let pooled = pools.labor_per_output(&store, line).await.unwrap();
            let direct = labor_per_output(&store, line, march()).await.unwrap();
            assert_eq!(pooled.per_output, direct.per_output);

            let pooled = pools.indirect_per_output(&store, line).await.unwrap();
            let direct = indirect_per_output(&store, line, march()).await.unwrap();
            assert_eq!(pooled.per_output, direct.per_output);
        }
    }

    #[tokio::test]
    async fn test_monthly_pools_read_shared_figures_once() {
        let store = store_with(plant_snapshot());
        let pools = MonthlyPools::load(&store, march()).await.unwrap();
        for _ in 0..5 {
            pools.indirect_per_output(&store, "line_blocks").await.unwrap();
            pools.labor_per_output(&store, "line_blocks").await.unwrap();
        }

        assert_eq!(store.query_count("get_monthly_indirect_total"), 1);
        assert_eq!(store.query_count("get_monthly_production"), 1);
        assert_eq!(store.query_count("list_active_employees"), 1);
        assert_eq!(store.query_count("get_comp_history"), 1);
        assert_eq!(store.query_count("get_allocation"), 10);
    }

    #[tokio::test]
    async fn test_monthly_pools_missing_allocation_still_errors() {
        let store = store_with(plant_snapshot());
        let pools = MonthlyPools::load(&store, march()).await.unwrap();
        let result = pools.indirect_per_output(&store, "line_unknown").await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_tiny_production_overflow_is_configuration_error() {
        let mut snapshot = plant_snapshot();
        snapshot.indirects[0].amount = dec("70000000000000000000000000000");
        snapshot.indirects.truncate(1);
        snapshot.production = vec![produced(
            "prd_block",
            "line_blocks",
            march(),
            "0.0000000001",
        )];
        let store = store_with(snapshot);

        let result = indirect_per_output(&store, "line_blocks", march()).await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_labor_pool_overflow_is_configuration_error() {
        let mut snapshot = plant_snapshot();
        snapshot.comp_history.clear();
        snapshot.employees[0].gross_salary = dec("70000000000000000000000000000");
        snapshot.employees[1].gross_salary = dec("70000000000000000000000000000");
        let store = store_with(snapshot);

        let result = labor_pool(&store, march()).await;
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    proptest! {
        #[test]
        fn prop_indirect_allocation_conserves_pool(
            pool in 1u32..1_000_000,
            weights in proptest::collection::vec(1u32..100, 1..6),
            production in proptest::collection::vec(1u32..10_000, 6),
        ) {
            let m = march();
            let total_weight: u32 = weights.iter().sum();
            let lines: Vec<String> = (0..weights.len()).map(|i| format!("line_{}", i)).collect();

            // Shares that sum to exactly one: the last line takes the remainder.
            let mut percents: Vec<Decimal> = weights
                .iter()
                .map(|w| (Decimal::from(*w) / Decimal::from(total_weight)).round_dp(6))
                .collect();
            let assigned: Decimal = percents[..percents.len() - 1].iter().copied().sum();
            if let Some(last) = percents.last_mut() {
                *last = Decimal::ONE - assigned;
            }

            let snapshot = ReferenceSnapshot {
                allocations: lines
                    .iter()
                    .zip(&percents)
                    .map(|(line, p)| allocation(AllocationCategory::Indirect, line, &p.to_string()))
                    .collect(),
                production: lines
                    .iter()
                    .zip(&production)
                    .map(|(line, q)| produced(&format!("prd_{}", line), line, m, &q.to_string()))
                    .collect(),
                indirects: vec![MonthlyIndirect {
                    month: m,
                    concept: "overhead".to_string(),
                    amount: Decimal::from(pool),
                }],
                ..ReferenceSnapshot::default()
            };
            let store = store_with(snapshot);

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let allocated: Decimal = rt.block_on(async {
                let mut allocated = Decimal::ZERO;
                for line in &lines {
                    let result = indirect_per_output(&store, line, m).await.unwrap();
                    allocated += result.per_output * result.line_production;
                }
                allocated
            });

            let tolerance = Decimal::new(1, 6);
            prop_assert!((allocated - Decimal::from(pool)).abs() < tolerance,
                "allocated {} vs pool {}", allocated, pool);
        }
    }
}
