//! Model constants that a caller may override per request.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::time_value::BisectionSettings;
use crate::types::{Money, Rate, Ratio};

/// Two-level thresholds for one health metric.
///
/// For floor metrics (coverage, returns) a value *below* the threshold is a
/// breach; for ceiling metrics (LTV) a value *above* it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub danger: Ratio,
    pub warning: Ratio,
}

/// Thresholds used to grade a deal's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Debt coverage ratio floor (x)
    pub dcr: Threshold,
    /// Debt service coverage ratio floor (x)
    pub dscr: Threshold,
    /// Loan-to-value ceiling (percent)
    pub ltv_pct: Threshold,
    /// Cash-on-cash return floor (percent)
    pub cash_on_cash_pct: Threshold,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            dcr: Threshold {
                danger: dec!(1.10),
                warning: dec!(1.25),
            },
            dscr: Threshold {
                danger: dec!(1.15),
                warning: dec!(1.30),
            },
            ltv_pct: Threshold {
                danger: dec!(85),
                warning: dec!(75),
            },
            cash_on_cash_pct: Threshold {
                danger: dec!(3),
                warning: dec!(5),
            },
        }
    }
}

/// Market and tax conventions behind the proforma.
///
/// Defaults reflect Japanese residential investment: prices quoted in
/// man-yen (10,000 yen), 3% brokerage on exit, and the two-band individual
/// capital-gains regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProformaAssumptions {
    /// Base units per quoted "man" unit for large monetary inputs
    pub unit_multiplier: Money,
    /// Brokerage and closing costs on sale, share of sale price
    pub selling_cost_rate: Rate,
    /// Individual capital-gains rate when held below `long_term_holding_years`
    pub individual_short_term_cgt: Rate,
    /// Individual capital-gains rate at or above `long_term_holding_years`
    pub individual_long_term_cgt: Rate,
    pub long_term_holding_years: u32,
    pub wood_useful_life_years: u32,
    pub concrete_useful_life_years: u32,
    /// Fixed term of the secondary (bridge) loan covering a down-payment shortfall
    pub secondary_loan_term_months: u32,
    /// Months per year the peak-season markup applies to short-term rentals
    pub peak_season_months: u32,
    /// Calendar cap on bookable nights per year
    pub max_operating_days: u32,
    pub irr: BisectionSettings,
    pub health: HealthThresholds,
}

impl Default for ProformaAssumptions {
    fn default() -> Self {
        Self {
            unit_multiplier: dec!(10000),
            selling_cost_rate: dec!(0.03),
            individual_short_term_cgt: dec!(0.3963),
            individual_long_term_cgt: dec!(0.20315),
            long_term_holding_years: 5,
            wood_useful_life_years: 22,
            concrete_useful_life_years: 47,
            secondary_loan_term_months: 60,
            peak_season_months: 3,
            max_operating_days: 365,
            irr: BisectionSettings::default(),
            health: HealthThresholds::default(),
        }
    }
}

impl ProformaAssumptions {
    /// Check internal consistency; every violation is collected.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.unit_multiplier <= Decimal::ZERO {
            errors.push("assumptions.unit_multiplier must be positive");
        }
        for (name, rate) in [
            ("selling_cost_rate", self.selling_cost_rate),
            ("individual_short_term_cgt", self.individual_short_term_cgt),
            ("individual_long_term_cgt", self.individual_long_term_cgt),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                errors.push(format!("assumptions.{name} must be between 0 and 1"));
            }
        }
        if self.wood_useful_life_years == 0 || self.concrete_useful_life_years == 0 {
            errors.push("assumptions useful lives must be at least 1 year");
        }
        if self.secondary_loan_term_months == 0 {
            errors.push("assumptions.secondary_loan_term_months must be at least 1");
        }
        if self.peak_season_months > 12 {
            errors.push("assumptions.peak_season_months cannot exceed 12");
        }
        if self.irr.lower <= dec!(-1) || self.irr.lower >= self.irr.upper {
            errors.push("assumptions.irr bracket must satisfy -1 < lower < upper");
        }
        if self.irr.tolerance <= Decimal::ZERO {
            errors.push("assumptions.irr.tolerance must be positive");
        }

        errors
    }
}
