//! Effective-dating resolution for prices and compensation.
//!
//! A value "in force" for a month is the history entry with the greatest
//! `effective_from` at or before the month's end-of-month instant, falling
//! back to the entity's current value when no entry qualifies.
//!
//! The batched resolvers are the primary API: they fetch every candidate
//! history row for all requested entities in one query and pick per entity
//! client-side. The single-entity functions are conveniences over them.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{CompEntry, Compensation, Employee, Month, PriceEntry};
use crate::store::CostDataAccess;

/// A history row that belongs to one entity and takes effect at an instant.
pub trait EffectiveDated {
    /// The id of the entity the row belongs to.
    fn owner_id(&self) -> &str;
    /// The instant the row took effect.
    fn effective_from(&self) -> NaiveDateTime;
}

impl EffectiveDated for PriceEntry {
    fn owner_id(&self) -> &str {
        &self.input_id
    }

    fn effective_from(&self) -> NaiveDateTime {
        self.effective_from
    }
}

impl EffectiveDated for CompEntry {
    fn owner_id(&self) -> &str {
        &self.employee_id
    }

    fn effective_from(&self) -> NaiveDateTime {
        self.effective_from
    }
}

/// Picks, per entity, the most recent row effective at or before `as_of`.
///
/// Rows after `as_of` are ignored. When two rows share an instant, the
/// later one in `rows` wins.
///
/// # Example
///
/// ```
/// use cost_engine::calculation::latest_in_force;
/// use cost_engine::models::PriceEntry;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let rows = vec![
///     PriceEntry { input_id: "cement".into(), price: Decimal::new(12, 2), effective_from: day(1) },
///     PriceEntry { input_id: "cement".into(), price: Decimal::new(14, 2), effective_from: day(15) },
/// ];
/// let picked = latest_in_force(&rows, day(10));
/// assert_eq!(picked["cement"].price, Decimal::new(12, 2));
/// ```
pub fn latest_in_force<T: EffectiveDated>(rows: &[T], as_of: NaiveDateTime) -> HashMap<&str, &T> {
    let mut picked: HashMap<&str, &T> = HashMap::new();
    for row in rows.iter().filter(|r| r.effective_from() <= as_of) {
        let newer = picked
            .get(row.owner_id())
            .is_none_or(|current| current.effective_from() <= row.effective_from());
        if newer {
            picked.insert(row.owner_id(), row);
        }
    }
    picked
}

fn distinct(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Current catalog prices for the given inputs, failing on unknown inputs.
pub async fn resolve_current_prices(
    source: &dyn CostDataAccess,
    input_ids: &[String],
) -> EngineResult<HashMap<String, Decimal>> {
    let ids = distinct(input_ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let current = source.get_current_prices(&ids).await?;
    if let Some(missing) = ids.iter().find(|id| !current.contains_key(id.as_str())) {
        return Err(EngineError::not_found("input", missing.as_str()));
    }
    Ok(current)
}

/// Unit prices in force at the end of `month` for every given input.
///
/// Issues one current-price query and one history query regardless of how
/// many inputs are requested.
///
/// # Errors
///
/// `NotFound` if any input does not exist.
pub async fn resolve_prices(
    source: &dyn CostDataAccess,
    input_ids: &[String],
    month: Month,
) -> EngineResult<HashMap<String, Decimal>> {
    let mut prices = resolve_current_prices(source, input_ids).await?;
    if prices.is_empty() {
        return Ok(prices);
    }

    let ids: Vec<String> = prices.keys().cloned().collect();
    let as_of = month.end_of_month();
    let history = source.get_price_history(&ids, as_of).await?;
    for (input_id, entry) in latest_in_force(&history, as_of) {
        if let Some(price) = prices.get_mut(input_id) {
            *price = entry.price;
        }
    }
    Ok(prices)
}

/// Unit price of one input in force at the end of `month`.
pub async fn resolve_price(
    source: &dyn CostDataAccess,
    input_id: &str,
    month: Month,
) -> EngineResult<Decimal> {
    let prices = resolve_prices(source, &[input_id.to_string()], month).await?;
    prices
        .get(input_id)
        .copied()
        .ok_or_else(|| EngineError::not_found("input", input_id))
}

/// Compensation in force at the end of `month` for already-loaded employees.
///
/// One history query covers every employee.
pub async fn compensations_in_force(
    source: &dyn CostDataAccess,
    employees: &[Employee],
    month: Month,
) -> EngineResult<HashMap<String, Compensation>> {
    let mut resolved: HashMap<String, Compensation> = employees
        .iter()
        .map(|e| (e.id.clone(), e.current_compensation()))
        .collect();
    if resolved.is_empty() {
        return Ok(resolved);
    }

    let ids: Vec<String> = resolved.keys().cloned().collect();
    let as_of = month.end_of_month();
    let history = source.get_comp_history(&ids, as_of).await?;
    for (employee_id, entry) in latest_in_force(&history, as_of) {
        if let Some(comp) = resolved.get_mut(employee_id) {
            *comp = entry.compensation();
        }
    }
    Ok(resolved)
}

/// Compensation in force at the end of `month` for the given employees.
///
/// # Errors
///
/// `NotFound` if any employee does not exist.
pub async fn resolve_compensations(
    source: &dyn CostDataAccess,
    employee_ids: &[String],
    month: Month,
) -> EngineResult<HashMap<String, Compensation>> {
    let ids = distinct(employee_ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let employees = source.get_employees(&ids).await?;
    let known: HashSet<&str> = employees.iter().map(|e| e.id.as_str()).collect();
    if let Some(missing) = ids.iter().find(|id| !known.contains(id.as_str())) {
        return Err(EngineError::not_found("employee", missing.as_str()));
    }
    compensations_in_force(source, &employees, month).await
}

/// Compensation of one employee in force at the end of `month`.
pub async fn resolve_compensation(
    source: &dyn CostDataAccess,
    employee_id: &str,
    month: Month,
) -> EngineResult<Compensation> {
    let resolved = resolve_compensations(source, &[employee_id.to_string()], month).await?;
    resolved
        .get(employee_id)
        .copied()
        .ok_or_else(|| EngineError::not_found("employee", employee_id))
}
