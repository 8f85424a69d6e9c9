use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::{HealthThresholds, ProformaAssumptions, Threshold};
use super::financing::FinancingPlan;
use super::input::ProformaInput;
use super::projection::Projection;
use super::revenue::RevenueProfile;
use crate::checked;
use crate::time_value::{irr_bisection, IrrSolution};
use crate::types::{Money, Ratio};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A coverage ratio; `Unbounded` when there is no debt service to cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Coverage {
    Finite { value: Ratio },
    Unbounded,
}

impl Coverage {
    fn of(numerator: Money, denominator: Money) -> ProformaResult<Self> {
        if denominator > Decimal::ZERO {
            Ok(Coverage::Finite {
                value: checked::div(numerator, denominator, "coverage ratio")?,
            })
        } else {
            Ok(Coverage::Unbounded)
        }
    }

    pub fn value(&self) -> Option<Ratio> {
        match self {
            Coverage::Finite { value } => Some(*value),
            Coverage::Unbounded => None,
        }
    }
}

/// Return-side KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub irr: IrrSolution,
    /// Percent of total initial investment
    pub cash_on_cash_return: Decimal,
    /// Years, interpolated within the crossing year; `None` if never recovered
    pub payback_period: Option<Decimal>,
}

/// Leverage and coverage KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageMetrics {
    pub dcr: Coverage,
    pub dscr: Coverage,
    /// Percent of property price
    pub ltv: Decimal,
    /// Total borrowed per unit of owner's cash
    pub leverage_ratio: Ratio,
    /// Percent; equal to cash-on-cash return
    pub leveraged_roe: Decimal,
    pub annual_noi: Money,
    pub annual_debt_service: Money,
    pub health: HealthAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthRating {
    Excellent,
    Good,
    Warning,
    Danger,
}

impl HealthRating {
    pub fn rationale(self) -> &'static str {
        match self {
            HealthRating::Excellent => "All key metrics are comfortably within safe ranges",
            HealthRating::Good => "Overall sound, with minor room for improvement",
            HealthRating::Warning => "Some metrics need attention; consider restructuring the deal",
            HealthRating::Danger => "Several key metrics fall below safe levels; risk is high",
        }
    }
}

impl std::fmt::Display for HealthRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthRating::Excellent => "excellent",
            HealthRating::Good => "good",
            HealthRating::Warning => "warning",
            HealthRating::Danger => "danger",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthMetric {
    Dcr,
    Dscr,
    Ltv,
    CashOnCash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachLevel {
    Warning,
    Danger,
}

/// One metric outside its safe range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breach {
    pub metric: HealthMetric,
    pub level: BreachLevel,
    pub value: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub rating: HealthRating,
    pub rationale: String,
    pub breaches: Vec<Breach>,
}

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

/// Net cash flow of the stabilized year: year 2, else year 1, else zero.
pub fn stabilized_cash_flow(projection: &Projection) -> Money {
    projection
        .net_cash_flow(2)
        .or_else(|| projection.net_cash_flow(1))
        .unwrap_or(Decimal::ZERO)
}

pub fn cash_on_cash_return(
    stabilized: Money,
    total_initial_investment: Money,
) -> ProformaResult<Decimal> {
    if total_initial_investment <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let ratio = checked::div(stabilized, total_initial_investment, "cash-on-cash return")?;
    checked::mul(ratio, dec!(100), "cash-on-cash return")
}

/// Years until cumulative post-acquisition cash flow recovers the initial
/// investment, interpolated linearly inside the crossing year.
pub fn payback_period(
    cash_flows: &[Money],
    total_initial_investment: Money,
) -> ProformaResult<Option<Decimal>> {
    if total_initial_investment <= Decimal::ZERO {
        return Ok(None);
    }

    let mut cumulative = Decimal::ZERO;
    for (year, cf) in cash_flows.iter().enumerate().skip(1) {
        let before = cumulative;
        cumulative = checked::add(cumulative, *cf, "cumulative cash flow")?;
        if cumulative >= total_initial_investment {
            let fraction = checked::div(
                total_initial_investment - before,
                *cf,
                "payback interpolation",
            )?;
            return Ok(Some(Decimal::from(year as u64 - 1) + fraction));
        }
    }
    Ok(None)
}

pub fn return_metrics(
    projection: &Projection,
    financing: &FinancingPlan,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<ReturnMetrics> {
    let flows = projection.net_cash_flows();
    let irr = irr_bisection(&flows, &assumptions.irr)?;
    let tii = financing.total_initial_investment;

    Ok(ReturnMetrics {
        irr,
        cash_on_cash_return: cash_on_cash_return(stabilized_cash_flow(projection), tii)?,
        payback_period: payback_period(&flows, tii)?,
    })
}

// ---------------------------------------------------------------------------
// Leverage
// ---------------------------------------------------------------------------

/// Stabilized net operating income: revenue less operating expenses,
/// management, property tax and insurance. Excludes financing, depreciation,
/// income tax and accounting fees.
pub fn annual_noi(revenue: &RevenueProfile, projection: &Projection) -> ProformaResult<Money> {
    let costs = &projection.recurring_costs;
    let deductions = checked::sum(
        [
            revenue.annual_operating_expenses()?,
            costs.management_fee,
            costs.property_tax,
            costs.insurance,
        ],
        "NOI deductions",
    )?;
    checked::sub(revenue.annual_gross_revenue()?, deductions, "NOI")
}

pub fn leverage_metrics(
    input: &ProformaInput,
    revenue: &RevenueProfile,
    financing: &FinancingPlan,
    projection: &Projection,
    returns: &ReturnMetrics,
    thresholds: &HealthThresholds,
) -> ProformaResult<LeverageMetrics> {
    let annual_debt_service = financing.annual_debt_service()?;
    let annual_noi = annual_noi(revenue, projection)?;
    let stabilized_ebitda = checked::sub(
        revenue.annual_gross_revenue()?,
        revenue.annual_operating_expenses()?,
        "stabilized EBITDA",
    )?;

    let dcr = Coverage::of(annual_noi, annual_debt_service)?;
    let dscr = Coverage::of(stabilized_ebitda, annual_debt_service)?;

    let total_borrowed = financing.total_borrowed()?;
    let ltv = if input.property_price > Decimal::ZERO {
        checked::div(total_borrowed, input.property_price, "LTV")? * dec!(100)
    } else {
        Decimal::ZERO
    };
    let leverage_ratio = if financing.total_initial_investment > Decimal::ZERO {
        checked::div(
            total_borrowed,
            financing.total_initial_investment,
            "leverage ratio",
        )?
    } else {
        Decimal::ZERO
    };

    let health = assess_health(dcr, dscr, ltv, returns.cash_on_cash_return, thresholds);

    Ok(LeverageMetrics {
        dcr,
        dscr,
        ltv,
        leverage_ratio,
        leveraged_roe: returns.cash_on_cash_return,
        annual_noi,
        annual_debt_service,
        health,
    })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

fn floor_breach(metric: HealthMetric, value: Decimal, t: &Threshold) -> Option<Breach> {
    let (level, threshold) = if value < t.danger {
        (BreachLevel::Danger, t.danger)
    } else if value < t.warning {
        (BreachLevel::Warning, t.warning)
    } else {
        return None;
    };
    Some(Breach {
        metric,
        level,
        value,
        threshold,
    })
}

fn ceiling_breach(metric: HealthMetric, value: Decimal, t: &Threshold) -> Option<Breach> {
    let (level, threshold) = if value > t.danger {
        (BreachLevel::Danger, t.danger)
    } else if value > t.warning {
        (BreachLevel::Warning, t.warning)
    } else {
        return None;
    };
    Some(Breach {
        metric,
        level,
        value,
        threshold,
    })
}

/// Grade the deal from its coverage, leverage and cash yield.
///
/// Unbounded coverage (no debt) never breaches.
pub fn assess_health(
    dcr: Coverage,
    dscr: Coverage,
    ltv: Decimal,
    cash_on_cash: Decimal,
    thresholds: &HealthThresholds,
) -> HealthAssessment {
    let breaches: Vec<Breach> = [
        dcr.value()
            .and_then(|v| floor_breach(HealthMetric::Dcr, v, &thresholds.dcr)),
        dscr.value()
            .and_then(|v| floor_breach(HealthMetric::Dscr, v, &thresholds.dscr)),
        ceiling_breach(HealthMetric::Ltv, ltv, &thresholds.ltv_pct),
        floor_breach(
            HealthMetric::CashOnCash,
            cash_on_cash,
            &thresholds.cash_on_cash_pct,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let dangers = breaches
        .iter()
        .filter(|b| b.level == BreachLevel::Danger)
        .count();
    let warnings = breaches.len() - dangers;

    let rating = if dangers >= 2 {
        HealthRating::Danger
    } else if dangers >= 1 || warnings >= 3 {
        HealthRating::Warning
    } else if warnings >= 1 {
        HealthRating::Good
    } else {
        HealthRating::Excellent
    };

    HealthAssessment {
        rating,
        rationale: rating.rationale().to_string(),
        breaches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn finite(value: Decimal) -> Coverage {
        Coverage::Finite { value }
    }

    fn grade(dcr: Decimal, dscr: Decimal, ltv: Decimal, coc: Decimal) -> HealthAssessment {
        assess_health(
            finite(dcr),
            finite(dscr),
            ltv,
            coc,
            &HealthThresholds::default(),
        )
    }

    #[test]
    fn test_excellent_when_nothing_breaches() {
        let health = grade(dec!(1.5), dec!(1.6), dec!(60), dec!(8));
        assert_eq!(health.rating, HealthRating::Excellent);
        assert!(health.breaches.is_empty());
    }

    #[test]
    fn test_single_warning_is_good() {
        let health = grade(dec!(1.20), dec!(1.6), dec!(60), dec!(8));
        assert_eq!(health.rating, HealthRating::Good);
        assert_eq!(health.breaches.len(), 1);
        assert_eq!(health.breaches[0].metric, HealthMetric::Dcr);
        assert_eq!(health.breaches[0].level, BreachLevel::Warning);
    }

    #[test]
    fn test_low_dcr_is_at_least_warning() {
        let health = grade(dec!(1.05), dec!(1.6), dec!(60), dec!(8));
        assert!(health.rating >= HealthRating::Warning);
    }

    #[test]
    fn test_three_warnings_is_warning() {
        let health = grade(dec!(1.20), dec!(1.20), dec!(80), dec!(8));
        assert_eq!(health.rating, HealthRating::Warning);
    }

    #[test]
    fn test_two_dangers_is_danger() {
        let health = grade(dec!(1.0), dec!(1.6), dec!(90), dec!(8));
        assert_eq!(health.rating, HealthRating::Danger);
        assert_eq!(health.rationale, HealthRating::Danger.rationale());
    }

    #[test]
    fn test_threshold_edges() {
        // Exactly on the warning floor / ceiling is not a breach
        let health = grade(dec!(1.25), dec!(1.30), dec!(75), dec!(5));
        assert_eq!(health.rating, HealthRating::Excellent);
    }

    #[test]
    fn test_unbounded_coverage_never_breaches() {
        let health = assess_health(
            Coverage::Unbounded,
            Coverage::Unbounded,
            Decimal::ZERO,
            dec!(6),
            &HealthThresholds::default(),
        );
        assert_eq!(health.rating, HealthRating::Excellent);
    }

    #[test]
    fn test_coverage_zero_debt_service() {
        assert_eq!(Coverage::of(dec!(100), Decimal::ZERO).unwrap(), Coverage::Unbounded);
        assert_eq!(Coverage::of(dec!(150), dec!(100)).unwrap().value(), Some(dec!(1.5)));
    }

    #[test]
    fn test_cash_on_cash_zero_investment() {
        assert_eq!(cash_on_cash_return(dec!(100), Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert_eq!(cash_on_cash_return(dec!(50), dec!(1000)).unwrap(), dec!(5));
    }

    #[test]
    fn test_payback_interpolates() {
        let flows = [dec!(-1000), dec!(400), dec!(400), dec!(400)];
        assert_eq!(payback_period(&flows, dec!(1000)).unwrap(), Some(dec!(2.5)));
    }

    #[test]
    fn test_payback_exact_year() {
        let flows = [dec!(-1000), dec!(500), dec!(500)];
        assert_eq!(payback_period(&flows, dec!(1000)).unwrap(), Some(dec!(2)));
    }

    #[test]
    fn test_payback_never_reached() {
        let flows = [dec!(-1000), dec!(100), dec!(100)];
        assert_eq!(payback_period(&flows, dec!(1000)).unwrap(), None);
        assert_eq!(payback_period(&flows, Decimal::ZERO).unwrap(), None);
    }

    #[test]
    fn test_tiny_debt_service_overflows_instead_of_panicking() {
        assert!(matches!(
            Coverage::of(Decimal::MAX, dec!(0.0000000001)),
            Err(crate::ProformaError::Overflow { .. })
        ));
        assert!(matches!(
            payback_period(&[dec!(-1), Decimal::MAX, Decimal::MAX], dec!(1)),
            Ok(Some(_))
        ));
        assert!(matches!(
            payback_period(&[dec!(-1), dec!(-1), Decimal::MIN, dec!(-1)], dec!(1)),
            Err(crate::ProformaError::Overflow { .. })
        ));
    }

    #[test]
    fn test_health_rating_serializes_snake_case() {
        let json = serde_json::to_string(&HealthRating::Excellent).unwrap();
        assert_eq!(json, "\"excellent\"");
        let coverage = serde_json::to_value(Coverage::Unbounded).unwrap();
        assert_eq!(coverage["status"], "unbounded");
    }
}
