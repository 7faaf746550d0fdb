//! Overflow-checked decimal arithmetic.
//!
//! Every figure in the cost pipeline comes from reference data, so an
//! overflow is a configuration problem of the product being costed and is
//! reported as [`EngineError::Configuration`] instead of a panic.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

fn overflow(what: &str, lhs: Decimal, op: &str, rhs: Decimal) -> EngineError {
    EngineError::configuration(format!(
        "{} overflows decimal range: {} {} {}",
        what, lhs, op, rhs
    ))
}

pub(crate) fn mul(lhs: Decimal, rhs: Decimal, what: &str) -> EngineResult<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| overflow(what, lhs, "*", rhs))
}

pub(crate) fn add(lhs: Decimal, rhs: Decimal, what: &str) -> EngineResult<Decimal> {
    lhs.checked_add(rhs).ok_or_else(|| overflow(what, lhs, "+", rhs))
}

pub(crate) fn div(lhs: Decimal, rhs: Decimal, what: &str) -> EngineResult<Decimal> {
    lhs.checked_div(rhs).ok_or_else(|| overflow(what, lhs, "/", rhs))
}

pub(crate) fn sum<I>(values: I, what: &str) -> EngineResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| add(acc, value, what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_overflow_is_configuration_error() {
        match mul(Decimal::MAX, Decimal::TWO, "recipe line cost") {
            Err(EngineError::Configuration { message, .. }) => {
                assert!(message.starts_with("recipe line cost overflows"));
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_sum_overflow_is_configuration_error() {
        let result = sum([Decimal::MAX, Decimal::ONE], "labor pool");
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn test_division_by_zero_is_configuration_error() {
        let result = div(Decimal::ONE, Decimal::ZERO, "cost per output");
        assert!(matches!(result, Err(EngineError::Configuration { .. })));
    }

    #[test]
    fn test_in_range_values_pass_through() {
        assert_eq!(
            sum([Decimal::new(15, 1), Decimal::new(25, 1)], "total").unwrap(),
            Decimal::new(4, 0)
        );
        assert_eq!(
            mul(Decimal::new(3, 0), Decimal::new(5, 1), "volume").unwrap(),
            Decimal::new(15, 1)
        );
    }
}
