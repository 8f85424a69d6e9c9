//! Overflow-checked Decimal arithmetic.
//!
//! Every helper names the quantity being computed so an overflow surfaces as
//! [`ProformaError::Overflow`] with a useful context instead of a panic.

use rust_decimal::Decimal;

use crate::error::ProformaError;
use crate::ProformaResult;

pub(crate) fn overflow(context: impl Into<String>) -> ProformaError {
    ProformaError::Overflow {
        context: context.into(),
    }
}

pub(crate) fn mul(lhs: Decimal, rhs: Decimal, context: &str) -> ProformaResult<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| overflow(context))
}

pub(crate) fn add(lhs: Decimal, rhs: Decimal, context: &str) -> ProformaResult<Decimal> {
    lhs.checked_add(rhs).ok_or_else(|| overflow(context))
}

pub(crate) fn sub(lhs: Decimal, rhs: Decimal, context: &str) -> ProformaResult<Decimal> {
    lhs.checked_sub(rhs).ok_or_else(|| overflow(context))
}

pub(crate) fn div(lhs: Decimal, rhs: Decimal, context: &str) -> ProformaResult<Decimal> {
    if rhs.is_zero() {
        return Err(ProformaError::DivisionByZero {
            context: context.to_string(),
        });
    }
    lhs.checked_div(rhs).ok_or_else(|| overflow(context))
}

pub(crate) fn sum(
    values: impl IntoIterator<Item = Decimal>,
    context: &str,
) -> ProformaResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add(acc, v, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_in_range_values_pass_through() {
        assert_eq!(mul(dec!(1.5), dec!(4), "x").unwrap(), dec!(6));
        assert_eq!(sub(dec!(1), dec!(4), "x").unwrap(), dec!(-3));
        assert_eq!(sum([dec!(1), dec!(2), dec!(3)], "x").unwrap(), dec!(6));
        assert_eq!(div(dec!(1), dec!(4), "x").unwrap(), dec!(0.25));
    }

    #[test]
    fn test_overflow_carries_context() {
        match mul(Decimal::MAX, dec!(2), "sale price") {
            Err(ProformaError::Overflow { context }) => assert_eq!(context, "sale price"),
            other => panic!("expected overflow, got {other:?}"),
        }
        assert!(matches!(
            sum([Decimal::MAX, Decimal::MAX], "total"),
            Err(ProformaError::Overflow { .. })
        ));
    }

    #[test]
    fn test_zero_divisor_is_reported() {
        assert!(matches!(
            div(dec!(1), Decimal::ZERO, "ratio"),
            Err(ProformaError::DivisionByZero { .. })
        ));
    }
}
