//! Monthly recompute orchestration.
//!
//! A recompute loads every active product and the month's shared pools, costs
//! each product independently on a bounded worker pool, and commits all
//! successful breakdowns for the month in one atomic upsert. Products that fail are logged and reported, and
//! their existing rows are left untouched.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{StreamExt, stream};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::{MonthlyPools, compute_direct_cost};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, AuditTrace, CostBreakdown, Month, Product};
use crate::store::CostDataAccess;

/// A product that could not be costed in a recompute.
#[derive(Debug)]
pub struct ProductFailure {
    /// The product that was skipped.
    pub product_id: String,
    /// Why it was skipped.
    pub error: EngineError,
}

/// The outcome of one recompute.
#[derive(Debug)]
pub struct RecomputeReport {
    /// Correlation id carried by every log line of the run.
    pub run_id: Uuid,
    /// The month recomputed.
    pub month: Month,
    /// The company filter applied, if any.
    pub company_id: Option<String>,
    /// Breakdowns written, ordered by product id.
    pub committed: Vec<CostBreakdown>,
    /// Products skipped, ordered by product id.
    pub failures: Vec<ProductFailure>,
    /// Wall-clock duration of the run in microseconds.
    pub duration_us: u64,
}

/// Runs monthly recomputes against a data source.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use cost_engine::config::ConfigLoader;
/// use cost_engine::orchestrator::Orchestrator;
///
/// # async fn run() -> cost_engine::error::EngineResult<()> {
/// let (settings, store) = ConfigLoader::load("./fixtures/plant_a")?.into_store();
/// let orchestrator = Orchestrator::new(Arc::new(store), settings);
/// let report = orchestrator.recompute(None, "2025-03".parse()?).await?;
/// println!("{} products costed", report.committed.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn CostDataAccess>,
    settings: EngineSettings,
}

impl Orchestrator {
    /// Creates an orchestrator over a data source.
    pub fn new(source: Arc<dyn CostDataAccess>, settings: EngineSettings) -> Self {
        Self { source, settings }
    }

    /// Returns the settings in effect.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Recomputes unit costs for every active product in `month`.
    ///
    /// `company_id` falls back to the configured default company. Products
    /// failing with a product-scoped error are skipped and reported.
    ///
    /// # Errors
    ///
    /// - `Transaction` if the final commit fails; nothing is written
    /// - `DeadlineExceeded` if the configured deadline elapses while costing
    /// - `DataAccess` or `Configuration` if the month's shared pools cannot
    ///   be read; no product can be costed without them
    pub async fn recompute(
        &self,
        company_id: Option<&str>,
        month: Month,
    ) -> EngineResult<RecomputeReport> {
        let run_id = Uuid::new_v4();
        let start_time = Instant::now();
        let company_id = company_id.or(self.settings.company_id.as_deref());

        let products = self.source.list_active_products(company_id).await?;
        info!(
            run_id = %run_id,
            month = %month,
            company_id = ?company_id,
            products = products.len(),
            "Starting recompute"
        );

        let costing = async {
            let pools = MonthlyPools::load(self.source.as_ref(), month).await?;
            debug!(
                run_id = %run_id,
                indirect_total = %pools.indirect_total,
                labor_total = %pools.labor_total,
                lines = pools.production_by_line.len(),
                "Loaded monthly pools"
            );
            Ok::<_, EngineError>(self.cost_all(&products, &pools).await)
        };
        let outcomes = match self.settings.deadline() {
            Some(limit) => tokio::time::timeout(limit, costing).await.map_err(|_| {
                EngineError::DeadlineExceeded {
                    elapsed_ms: start_time.elapsed().as_millis(),
                }
            })??,
            None => costing.await?,
        };

        let (mut committed, mut failures) = partition(run_id, outcomes)?;
        committed.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        failures.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        if committed.is_empty() {
            info!(run_id = %run_id, month = %month, "No products costed; nothing to commit");
        } else {
            let computed_at = Utc::now();
            let rows: Vec<_> = committed
                .iter()
                .map(|breakdown| breakdown.to_history_row(computed_at))
                .collect();
            self.source
                .upsert_cost_history(&rows)
                .await
                .map_err(|e| match e {
                    EngineError::Transaction { .. } => e,
                    other => EngineError::Transaction {
                        message: other.to_string(),
                    },
                })?;
        }

        let duration_us = start_time.elapsed().as_micros() as u64;
        info!(
            run_id = %run_id,
            month = %month,
            committed = committed.len(),
            failed = failures.len(),
            duration_us = duration_us,
            "Recompute committed"
        );

        Ok(RecomputeReport {
            run_id,
            month,
            company_id: company_id.map(str::to_string),
            committed,
            failures,
            duration_us,
        })
    }

    /// Computes one product's breakdown without writing anything.
    pub async fn preview_product_cost(
        &self,
        product_id: &str,
        month: Month,
    ) -> EngineResult<CostBreakdown> {
        preview_product_cost(self.source.as_ref(), product_id, month).await
    }

    async fn cost_all(
        &self,
        products: &[Product],
        pools: &MonthlyPools,
    ) -> Vec<(String, EngineResult<CostBreakdown>)> {
        let source = self.source.as_ref();
        stream::iter(products)
            .map(|product| async move {
                let outcome = compute_breakdown_with(source, product, pools).await;
                (product.id.clone(), outcome)
            })
            .buffer_unordered(self.settings.concurrency())
            .collect()
            .await
    }
}

// Failures are data until one turns out not to be product-scoped.
fn partition(
    run_id: Uuid,
    outcomes: Vec<(String, EngineResult<CostBreakdown>)>,
) -> EngineResult<(Vec<CostBreakdown>, Vec<ProductFailure>)> {
    outcomes.into_iter().try_fold(
        (Vec::new(), Vec::new()),
        |(mut committed, mut failures), (product_id, outcome)| {
            match outcome {
                Ok(breakdown) => committed.push(breakdown),
                Err(error) if error.is_product_scoped() => {
                    warn!(
                        run_id = %run_id,
                        product_id = %product_id,
                        error = %error,
                        "Skipping product"
                    );
                    failures.push(ProductFailure { product_id, error });
                }
                Err(error) => return Err(error),
            }
            Ok((committed, failures))
        },
    )
}

/// Computes one product's breakdown by id without writing anything.
///
/// # Errors
///
/// `NotFound` if the product does not exist, plus anything
/// [`compute_breakdown`] returns.
pub async fn preview_product_cost(
    source: &dyn CostDataAccess,
    product_id: &str,
    month: Month,
) -> EngineResult<CostBreakdown> {
    let product = source
        .get_product(product_id)
        .await?
        .ok_or_else(|| EngineError::not_found("product", product_id))?;
    compute_breakdown(source, &product, month).await
}

/// Computes direct, indirect and labor cost per output for one product.
///
/// The month's shared pools are read for this product alone; use
/// [`compute_breakdown_with`] to cost many products against one read.
pub async fn compute_breakdown(
    source: &dyn CostDataAccess,
    product: &Product,
    month: Month,
) -> EngineResult<CostBreakdown> {
    let pools = MonthlyPools::load(source, month)
        .await
        .map_err(|e| e.for_product(&product.id))?;
    compute_breakdown_with(source, product, &pools).await
}

/// Computes one product's breakdown against already-loaded monthly pools.
///
/// The three components are computed concurrently; indirect and labor are
/// keyed by the product's line.
pub async fn compute_breakdown_with(
    source: &dyn CostDataAccess,
    product: &Product,
    pools: &MonthlyPools,
) -> EngineResult<CostBreakdown> {
    let start_time = Instant::now();
    let month = pools.month;

    let (direct, indirect, labor) = tokio::try_join!(
        compute_direct_cost(source, product, month),
        pools.indirect_per_output(source, &product.line_id),
        pools.labor_per_output(source, &product.line_id),
    )
    .map_err(|e| e.for_product(&product.id))?;

    let total: Decimal = direct
        .per_output
        .checked_add(indirect.per_output)
        .and_then(|sum| sum.checked_add(labor.per_output))
        .ok_or_else(|| {
            EngineError::configuration(format!(
                "total cost per output overflows decimal range: {} + {} + {}",
                direct.per_output, indirect.per_output, labor.per_output
            ))
            .for_product(&product.id)
        })?;

    let total_step = AuditStep::new(
        "total_cost",
        "Total Cost Per Output",
        serde_json::json!({
            "direct_per_output": direct.per_output.to_string(),
            "indirect_per_output": indirect.per_output.to_string(),
            "employees_per_output": labor.per_output.to_string(),
        }),
        serde_json::json!({
            "total_per_output": total.to_string(),
        }),
        format!(
            "Direct {} + indirect {} + labor {} = {}",
            direct.per_output, indirect.per_output, labor.per_output, total
        ),
    );

    let mut steps = direct.audit_steps;
    steps.push(indirect.audit_step);
    steps.push(labor.audit_step);
    steps.push(total_step);

    let mut warnings = direct.warnings;
    warnings.extend(indirect.warning);
    warnings.extend(labor.warning);

    let duration_us = start_time.elapsed().as_micros() as u64;
    debug!(
        product_id = %product.id,
        month = %month,
        total_per_output = %total,
        duration_us = duration_us,
        "Computed product cost"
    );

    Ok(CostBreakdown {
        product_id: product.id.clone(),
        line_id: product.line_id.clone(),
        month,
        direct_per_output: direct.per_output,
        indirect_per_output: indirect.per_output,
        employees_per_output: labor.per_output,
        total_per_output: total,
        audit_trace: AuditTrace::new(steps, warnings, duration_us),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::test_support::{dec, input, month, plant_snapshot, product, recipe};
    use crate::calculation::{VOLUMETRIC_PER_BATCH_RECIPE, ZERO_PRODUCTION};
    use crate::models::{CostMethod, RecipeBase, RecipeScope};
    use crate::store::InMemoryStore;

    fn march() -> Month {
        month(2025, 3)
    }

    fn orchestrator_with(store: Arc<InMemoryStore>, max_concurrency: usize) -> Orchestrator {
        let settings = EngineSettings {
            max_concurrency,
            ..EngineSettings::default()
        };
        Orchestrator::new(store, settings)
    }

    #[tokio::test]
    async fn test_breakdown_sums_components() {
        let store = InMemoryStore::new(plant_snapshot());
        let breakdown = preview_product_cost(&store, "prd_block", march())
            .await
            .unwrap();

        assert_eq!(breakdown.direct_per_output.round_dp(3), dec("11.111"));
        assert_eq!(breakdown.indirect_per_output, dec("20"));
        assert_eq!(breakdown.employees_per_output, dec("4.68"));
        assert_eq!(
            breakdown.total_per_output,
            breakdown.direct_per_output + dec("24.68")
        );
    }

    #[tokio::test]
    async fn test_breakdown_audit_trace_is_numbered() {
        let store = InMemoryStore::new(plant_snapshot());
        let breakdown = preview_product_cost(&store, "prd_paver", march())
            .await
            .unwrap();

        let rule_ids: Vec<&str> = breakdown
            .audit_trace
            .steps
            .iter()
            .map(|s| s.rule_id.as_str())
            .collect();
        assert_eq!(
            rule_ids,
            vec![
                "recipe_cost",
                "batch_yield",
                "indirect_allocation",
                "labor_allocation",
                "total_cost"
            ]
        );
        let numbers: Vec<u32> = breakdown
            .audit_trace
            .steps
            .iter()
            .map(|s| s.step_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let store = InMemoryStore::new(plant_snapshot());
        preview_product_cost(&store, "prd_slab", march())
            .await
            .unwrap();
        assert!(store.cost_history_for_month(march()).is_empty());
        assert_eq!(store.query_count("upsert_cost_history"), 0);
    }

    #[tokio::test]
    async fn test_preview_unknown_product_is_not_found() {
        let store = InMemoryStore::new(plant_snapshot());
        let result = preview_product_cost(&store, "prd_missing", march()).await;
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_volumetric_quirk_surfaces_as_warning() {
        let mut snapshot = plant_snapshot();
        snapshot.recipes[2].base = RecipeBase::PerBatch;
        let store = InMemoryStore::new(snapshot);

        let breakdown = preview_product_cost(&store, "prd_slab", march())
            .await
            .unwrap();
        assert!(
            breakdown
                .audit_trace
                .warnings
                .iter()
                .any(|w| w.code == VOLUMETRIC_PER_BATCH_RECIPE)
        );
    }

    #[tokio::test]
    async fn test_recompute_commits_all_products_once() {
        let store = Arc::new(InMemoryStore::new(plant_snapshot()));
        let orchestrator = orchestrator_with(store.clone(), 4);

        let report = orchestrator.recompute(None, march()).await.unwrap();

        assert_eq!(report.committed.len(), 4);
        assert!(report.failures.is_empty());
        assert_eq!(store.query_count("upsert_cost_history"), 1);
        assert_eq!(store.cost_history_for_month(march()).len(), 4);

        let ids: Vec<&str> = report
            .committed
            .iter()
            .map(|b| b.product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["prd_block", "prd_kit", "prd_paver", "prd_slab"]);
    }

    #[tokio::test]
    async fn test_recompute_skips_failing_product() {
        let mut snapshot = plant_snapshot();
        snapshot.products.push(product("prd_broken", "line_blocks", CostMethod::Batch));
        let store = Arc::new(InMemoryStore::new(snapshot));
        let orchestrator = orchestrator_with(store.clone(), 2);

        let report = orchestrator.recompute(None, march()).await.unwrap();

        assert_eq!(report.committed.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id, "prd_broken");
        assert!(matches!(
            report.failures[0].error,
            EngineError::Configuration { .. }
        ));
        assert!(store.cost_history("prd_broken", march()).is_none());
    }

    #[tokio::test]
    async fn test_recompute_skips_product_whose_cost_overflows() {
        let mut snapshot = plant_snapshot();
        snapshot.inputs.push(input("pigment", "100000000000"));
        snapshot.recipes[0] = recipe(
            "rcp_block",
            RecipeScope::Product,
            "prd_block",
            RecipeBase::PerBatch,
            &[("cement", "5000"), ("pigment", "10000000000000000000")],
        );
        let store = Arc::new(InMemoryStore::new(snapshot));
        let orchestrator = orchestrator_with(store.clone(), 4);

        let report = orchestrator.recompute(None, march()).await.unwrap();

        assert_eq!(report.committed.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id, "prd_block");
        match &report.failures[0].error {
            EngineError::Configuration {
                product_id,
                message,
            } => {
                assert_eq!(product_id.as_deref(), Some("prd_block"));
                assert!(message.contains("overflows"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
        assert_eq!(store.cost_history_for_month(march()).len(), 3);
        assert!(store.cost_history("prd_block", march()).is_none());
    }

    #[tokio::test]
    async fn test_recompute_reads_shared_pools_once() {
        let store = Arc::new(InMemoryStore::new(plant_snapshot()));
        let orchestrator = orchestrator_with(store.clone(), 4);

        orchestrator.recompute(None, march()).await.unwrap();

        assert_eq!(store.query_count("get_monthly_indirect_total"), 1);
        assert_eq!(store.query_count("get_monthly_production"), 1);
        assert_eq!(store.query_count("list_active_employees"), 1);
        assert_eq!(store.query_count("get_comp_history"), 1);
    }

    #[tokio::test]
    async fn test_recompute_fails_when_pools_cannot_be_read() {
        let mut snapshot = plant_snapshot();
        for indirect in &mut snapshot.indirects {
            indirect.amount = Decimal::MAX;
        }
        let store = Arc::new(InMemoryStore::new(snapshot));
        let orchestrator = orchestrator_with(store.clone(), 4);

        let result = orchestrator.recompute(None, march()).await;

        assert!(matches!(result, Err(EngineError::DataAccess { .. })));
        assert_eq!(store.query_count("upsert_cost_history"), 0);
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_results() {
        let serial = Arc::new(InMemoryStore::new(plant_snapshot()));
        let parallel = Arc::new(InMemoryStore::new(plant_snapshot()));

        let a = orchestrator_with(serial, 1)
            .recompute(None, march())
            .await
            .unwrap();
        let b = orchestrator_with(parallel, 16)
            .recompute(None, march())
            .await
            .unwrap();

        let totals = |r: &RecomputeReport| -> Vec<(String, Decimal)> {
            r.committed
                .iter()
                .map(|c| (c.product_id.clone(), c.total_per_output))
                .collect()
        };
        assert_eq!(totals(&a), totals(&b));
    }

    #[tokio::test]
    async fn test_commit_failure_is_transaction_error() {
        let store = Arc::new(InMemoryStore::new(plant_snapshot()));
        store.set_fail_commits(true);
        let orchestrator = orchestrator_with(store.clone(), 4);

        let result = orchestrator.recompute(None, march()).await;

        assert!(matches!(result, Err(EngineError::Transaction { .. })));
        assert!(store.cost_history_for_month(march()).is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_commit_skips_upsert() {
        let store = Arc::new(InMemoryStore::new(plant_snapshot()));
        let orchestrator = orchestrator_with(store.clone(), 4);

        let report = orchestrator
            .recompute(Some("nobody"), march())
            .await
            .unwrap();

        assert!(report.committed.is_empty());
        assert_eq!(report.company_id.as_deref(), Some("nobody"));
        assert_eq!(store.query_count("upsert_cost_history"), 0);
    }

    #[tokio::test]
    async fn test_zero_production_month_warns() {
        let mut snapshot = plant_snapshot();
        snapshot.production.retain(|p| p.line_id != "line_blocks");
        let store = InMemoryStore::new(snapshot);

        let breakdown = preview_product_cost(&store, "prd_block", march())
            .await
            .unwrap();
        assert_eq!(breakdown.indirect_per_output, Decimal::ZERO);
        assert_eq!(breakdown.employees_per_output, Decimal::ZERO);
        assert_eq!(breakdown.total_per_output, breakdown.direct_per_output);
        assert_eq!(
            breakdown
                .audit_trace
                .warnings
                .iter()
                .filter(|w| w.code == ZERO_PRODUCTION)
                .count(),
            2
        );
    }
}
