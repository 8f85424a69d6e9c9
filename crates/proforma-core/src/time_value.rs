use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::checked::overflow;
use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

/// Search bracket and stopping rule for the bisection IRR solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionSettings {
    pub lower: Rate,
    pub upper: Rate,
    pub max_iterations: u32,
    /// Absolute NPV below which a rate is accepted as the root
    pub tolerance: Decimal,
}

impl Default for BisectionSettings {
    fn default() -> Self {
        Self {
            lower: dec!(-0.99),
            upper: dec!(10.0),
            max_iterations: 100,
            tolerance: dec!(0.000001),
        }
    }
}

/// Why an IRR could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrFailure {
    /// Fewer than two cash flows
    InsufficientData,
    /// NPV has the same sign at both ends of the bracket
    NoSignChange,
    /// The iteration cap was reached before |NPV| fell below tolerance
    NotConverged,
}

/// Outcome of the bisection IRR solver. Never silently defaulted to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrSolution {
    Determined { rate: Rate, iterations: u32 },
    Undetermined { reason: IrrFailure },
}

impl IrrSolution {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrSolution::Determined { rate, .. } => Some(*rate),
            IrrSolution::Undetermined { .. } => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        matches!(self, IrrSolution::Determined { .. })
    }
}

/// Net Present Value of a series of cash flows, `cash_flows[0]` undiscounted.
///
/// Uses checked arithmetic: rates close to -100% blow the discount factor up
/// and are reported as `Overflow` rather than panicking.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProformaError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_div(one_plus_r)
                .ok_or_else(|| overflow(format!("NPV discount factor at period {t}")))?;
        }
        let term = cf
            .checked_mul(discount)
            .ok_or_else(|| overflow(format!("NPV term at period {t}")))?;
        result = result
            .checked_add(term)
            .ok_or_else(|| overflow("NPV accumulation".to_string()))?;
    }

    Ok(result)
}

/// Sign of NPV at `rate`.
///
/// Falls back to the terminal-value form `sum CF_t (1+r)^(N-t)`, which has
/// the same sign as NPV and stays bounded when `1 + r < 1`.
fn npv_sign(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Ordering> {
    match npv(rate, cash_flows) {
        Ok(value) => Ok(value.cmp(&Decimal::ZERO)),
        Err(ProformaError::Overflow { .. }) => {
            let one_plus_r = Decimal::ONE + rate;
            let mut acc = Decimal::ZERO;
            for cf in cash_flows {
                acc = acc
                    .checked_mul(one_plus_r)
                    .and_then(|v| v.checked_add(*cf))
                    .ok_or_else(|| overflow("terminal value of cash flows".to_string()))?;
            }
            Ok(acc.cmp(&Decimal::ZERO))
        }
        Err(e) => Err(e),
    }
}

/// Internal Rate of Return by bisection over a fixed bracket.
///
/// The bracket must enclose a sign change of NPV; otherwise the result is
/// `Undetermined` without iterating. Deterministic: identical inputs always
/// take the same path through at most `max_iterations` midpoints.
pub fn irr_bisection(
    cash_flows: &[Money],
    settings: &BisectionSettings,
) -> ProformaResult<IrrSolution> {
    if cash_flows.len() < 2 {
        return Ok(IrrSolution::Undetermined {
            reason: IrrFailure::InsufficientData,
        });
    }
    if settings.lower <= dec!(-1) || settings.lower >= settings.upper {
        return Err(ProformaError::InvalidInput {
            field: "irr_bracket".into(),
            reason: "IRR bracket must satisfy -1 < lower < upper".into(),
        });
    }

    let mut low = settings.lower;
    let mut high = settings.upper;
    let low_sign = npv_sign(low, cash_flows)?;
    let high_sign = npv_sign(high, cash_flows)?;

    if low_sign == Ordering::Equal {
        return Ok(IrrSolution::Determined { rate: low, iterations: 0 });
    }
    if high_sign == Ordering::Equal {
        return Ok(IrrSolution::Determined { rate: high, iterations: 0 });
    }
    if low_sign == high_sign {
        return Ok(IrrSolution::Undetermined {
            reason: IrrFailure::NoSignChange,
        });
    }

    for i in 0..settings.max_iterations {
        let mid = (low + high) / dec!(2);
        let value = npv(mid, cash_flows).ok();

        if let Some(v) = value {
            if v.abs() < settings.tolerance {
                return Ok(IrrSolution::Determined {
                    rate: mid,
                    iterations: i + 1,
                });
            }
        }

        let mid_sign = match value {
            Some(v) => v.cmp(&Decimal::ZERO),
            None => npv_sign(mid, cash_flows)?,
        };

        if mid_sign == low_sign {
            low = mid;
        } else {
            high = mid;
        }
    }

    Ok(IrrSolution::Undetermined {
        reason: IrrFailure::NotConverged,
    })
}

/// Level payment of a fully amortising loan: `P r (1+r)^n / ((1+r)^n - 1)`.
///
/// Falls back to straight-line `P / n` at a zero rate.
pub fn annuity_payment(principal: Money, periodic_rate: Rate, periods: u32) -> ProformaResult<Money> {
    if periods == 0 {
        return Err(ProformaError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if periodic_rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let compound = compound(Decimal::ONE, periodic_rate, periods)?;
    let denominator = compound - Decimal::ONE;

    if denominator.is_zero() {
        return Err(ProformaError::DivisionByZero {
            context: "annuity payment denominator".into(),
        });
    }

    let numerator = principal
        .checked_mul(periodic_rate)
        .and_then(|v| v.checked_mul(compound))
        .ok_or_else(|| overflow("annuity payment numerator".to_string()))?;

    Ok(numerator / denominator)
}

/// `value * (1 + rate)^periods` via iterative multiplication.
pub fn compound(value: Money, rate: Rate, periods: u32) -> ProformaResult<Money> {
    let growth = Decimal::ONE + rate;
    let mut result = value;
    for _ in 0..periods {
        result = result
            .checked_mul(growth)
            .ok_or_else(|| overflow(format!("compounding over {periods} periods")))?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-1), dec!(2)]).is_err());
    }

    #[test]
    fn test_irr_single_period() {
        let solution = irr_bisection(&[dec!(-1000), dec!(1100)], &BisectionSettings::default()).unwrap();
        let rate = solution.rate().expect("IRR should be determined");
        assert!((rate - dec!(0.10)).abs() < dec!(0.0001), "got {rate}");
    }

    #[test]
    fn test_irr_multi_period() {
        // Invest 1000, receive 300/year for 5 years => IRR ~15.24%
        let cfs = vec![
            dec!(-1000),
            dec!(300),
            dec!(300),
            dec!(300),
            dec!(300),
            dec!(300),
        ];
        let rate = irr_bisection(&cfs, &BisectionSettings::default())
            .unwrap()
            .rate()
            .unwrap();
        assert!(rate > dec!(0.150) && rate < dec!(0.155), "got {rate}");
    }

    #[test]
    fn test_irr_no_sign_change_is_undetermined() {
        let solution =
            irr_bisection(&[dec!(-1000), dec!(-50), dec!(-50)], &BisectionSettings::default()).unwrap();
        assert_eq!(
            solution,
            IrrSolution::Undetermined {
                reason: IrrFailure::NoSignChange
            }
        );
    }

    #[test]
    fn test_irr_single_flow_is_undetermined() {
        let solution = irr_bisection(&[dec!(-1000)], &BisectionSettings::default()).unwrap();
        assert_eq!(
            solution,
            IrrSolution::Undetermined {
                reason: IrrFailure::InsufficientData
            }
        );
    }

    #[test]
    fn test_irr_long_horizon_near_lower_bound_does_not_panic() {
        // Deeply negative return over 30 years drives the midpoint toward -99%
        let mut cfs = vec![dec!(-50000000)];
        cfs.extend(std::iter::repeat(dec!(1)).take(30));
        let solution = irr_bisection(&cfs, &BisectionSettings::default()).unwrap();
        let rate = solution.rate().expect("root lies inside the bracket");
        assert!(rate < Decimal::ZERO, "got {rate}");
    }

    #[test]
    fn test_irr_iteration_cap_reports_not_converged() {
        let settings = BisectionSettings {
            max_iterations: 3,
            ..BisectionSettings::default()
        };
        let solution = irr_bisection(&[dec!(-1000), dec!(1100)], &settings).unwrap();
        assert_eq!(
            solution,
            IrrSolution::Undetermined {
                reason: IrrFailure::NotConverged
            }
        );
    }

    #[test]
    fn test_irr_solution_serializes_with_status_tag() {
        let json = serde_json::to_value(IrrSolution::Undetermined {
            reason: IrrFailure::NoSignChange,
        })
        .unwrap();
        assert_eq!(json["status"], "undetermined");
        assert_eq!(json["reason"], "no_sign_change");
    }

    #[test]
    fn test_annuity_payment_sanity() {
        // 750k at 6.5% over 30 years, expected ~4,740/mo
        let payment = annuity_payment(dec!(750000), dec!(0.065) / dec!(12), 360).unwrap();
        assert!(payment > dec!(4700) && payment < dec!(4800), "got {payment}");
    }

    #[test]
    fn test_annuity_payment_zero_rate() {
        let payment = annuity_payment(dec!(360000), Decimal::ZERO, 360).unwrap();
        assert_eq!(payment, dec!(1000));
    }

    #[test]
    fn test_annuity_payment_zero_periods_error() {
        assert!(annuity_payment(dec!(1000), dec!(0.01), 0).is_err());
    }

    #[test]
    fn test_compound() {
        assert_eq!(compound(dec!(100), dec!(0.10), 2).unwrap(), dec!(121));
        assert_eq!(compound(dec!(100), dec!(0.10), 0).unwrap(), dec!(100));
    }
}
