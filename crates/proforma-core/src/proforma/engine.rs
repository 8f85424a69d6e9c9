use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::assumptions::ProformaAssumptions;
use super::financing::{plan_financing, FinancingPlan};
use super::input::{MonetizationModel, ProformaInput, PurchaseType};
use super::metrics::{leverage_metrics, return_metrics, LeverageMetrics, ReturnMetrics};
use super::projection::{project, Projection, SaleEvent, YearlyCashFlow};
use super::revenue::{model_revenue, BookingMetrics, RevenueProfile};
use super::schema::{normalize, ProformaParams};
use crate::error::ProformaError;
use crate::types::{with_metadata, ComputationOutput, CurrencyPair, DualAmount};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Where the owner's initial cash goes, and what is borrowed alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialInvestment {
    pub total_investment: DualAmount,
    pub acquisition_costs: DualAmount,
    /// Furnishing plus corporate setup
    pub initial_setup_costs: DualAmount,
    pub down_payment_own_capital: DualAmount,
    pub down_payment_credit_loan: DualAmount,
    pub loan_amount: DualAmount,
}

/// Steady-state monthly and annual operating figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingSummary {
    pub monthly_gross_revenue: DualAmount,
    pub monthly_operating_expenses: DualAmount,
    pub one_time_initial_income: DualAmount,
    pub annual_renewal_fee: DualAmount,
    pub annual_noi: DualAmount,
    pub annual_debt_service: DualAmount,
    pub monthly_primary_payment: DualAmount,
    pub monthly_secondary_payment: DualAmount,
    pub annual_depreciation: DualAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<BookingMetrics>,
}

/// One year of the annual projection in both currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub year: u32,
    pub net_cash_flow: DualAmount,
    pub property_value: DualAmount,
    pub loan_balance: DualAmount,
    pub net_equity: DualAmount,
}

/// Full result of one proforma computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProformaReport {
    pub monetization_model: MonetizationModel,
    pub purchase_type: PurchaseType,
    pub currency: CurrencyPair,
    pub kpi: ReturnMetrics,
    pub leverage: LeverageMetrics,
    pub initial_investment: InitialInvestment,
    pub operating_summary: OperatingSummary,
    /// Net cash flow per year, year 0 first
    pub net_cash_flows: Vec<DualAmount>,
    /// Line items behind each net cash flow, in base units
    pub cash_flows: Vec<YearlyCashFlow>,
    pub annual_projections: Vec<ProjectedYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_sale: Option<SaleEvent>,
}

impl ProformaReport {
    /// Net cash flows in base units, year 0 first.
    pub fn cash_flow_sequence(&self) -> Vec<crate::types::Money> {
        self.cash_flows.iter().map(|cf| cf.net_cash_flow).collect()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run a proforma from a raw parameter bag.
///
/// Model constants come from `params.assumptions` when present. Every
/// validation problem is reported together as [`ProformaError::Validation`].
pub fn compute_proforma(
    params: &ProformaParams,
) -> ProformaResult<ComputationOutput<ProformaReport>> {
    let start = Instant::now();

    let normalized = match normalize(params) {
        Ok(n) => n,
        Err(errors) => {
            tracing::warn!(count = errors.len(), %errors, "proforma input rejected");
            return Err(ProformaError::Validation(errors));
        }
    };

    let report = run_proforma(&normalized.input, &normalized.assumptions)?;

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Real Estate Investment Proforma (annual projection, bisection IRR)",
        &normalized.assumptions,
        normalized.warnings,
        elapsed,
        report,
    ))
}

/// Run a proforma from already-normalized input.
pub fn run_proforma(
    input: &ProformaInput,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<ProformaReport> {
    let revenue = model_revenue(&input.revenue, assumptions)?;
    tracing::debug!(
        model = ?revenue.model,
        monthly_gross = %revenue.monthly_gross_revenue,
        monthly_opex = %revenue.monthly_operating_expenses,
        "revenue modelled"
    );

    let financing = plan_financing(input, assumptions)?;
    let projection = project(input, &revenue, &financing, assumptions)?;

    let returns = return_metrics(&projection, &financing, assumptions)?;
    let leverage = leverage_metrics(
        input,
        &revenue,
        &financing,
        &projection,
        &returns,
        &assumptions.health,
    )?;
    tracing::debug!(
        irr = ?returns.irr,
        cash_on_cash = %returns.cash_on_cash_return,
        health = %leverage.health.rating,
        "metrics aggregated"
    );

    build_report(input, &revenue, &financing, projection, returns, leverage)
}

fn build_report(
    input: &ProformaInput,
    revenue: &RevenueProfile,
    financing: &FinancingPlan,
    projection: Projection,
    kpi: ReturnMetrics,
    leverage: LeverageMetrics,
) -> ProformaResult<ProformaReport> {
    let fx = &input.currency;

    let initial_investment = InitialInvestment {
        total_investment: fx.amount(financing.total_initial_investment)?,
        acquisition_costs: fx.amount(financing.acquisition_costs)?,
        initial_setup_costs: fx.amount(financing.setup_costs)?,
        down_payment_own_capital: fx.amount(financing.own_capital_for_down_payment)?,
        down_payment_credit_loan: fx.amount(financing.secondary_loan_principal)?,
        loan_amount: fx.amount(financing.primary_loan_principal)?,
    };

    let operating_summary = OperatingSummary {
        monthly_gross_revenue: fx.amount(revenue.monthly_gross_revenue)?,
        monthly_operating_expenses: fx.amount(revenue.monthly_operating_expenses)?,
        one_time_initial_income: fx.amount(revenue.one_time_initial_income)?,
        annual_renewal_fee: fx.amount(revenue.annual_renewal_fee)?,
        annual_noi: fx.amount(leverage.annual_noi)?,
        annual_debt_service: fx.amount(leverage.annual_debt_service)?,
        monthly_primary_payment: fx.amount(financing.primary_monthly_payment)?,
        monthly_secondary_payment: fx.amount(financing.secondary_monthly_payment)?,
        annual_depreciation: fx.amount(projection.annual_depreciation)?,
        bookings: revenue.bookings.clone(),
    };

    let annual_projections = projection
        .annual_projections
        .iter()
        .map(|p| {
            Ok(ProjectedYear {
                year: p.year,
                net_cash_flow: fx.amount(p.net_cash_flow)?,
                property_value: fx.amount(p.property_value)?,
                loan_balance: fx.amount(p.loan_balance)?,
                net_equity: fx.amount(p.net_equity)?,
            })
        })
        .collect::<ProformaResult<Vec<_>>>()?;

    let net_cash_flows = projection
        .cash_flows
        .iter()
        .map(|cf| fx.amount(cf.net_cash_flow))
        .collect::<ProformaResult<Vec<_>>>()?;
    let terminal_sale = projection.terminal_sale().cloned();

    Ok(ProformaReport {
        monetization_model: revenue.model,
        purchase_type: input.purchase_type,
        currency: fx.clone(),
        kpi,
        leverage,
        initial_investment,
        operating_summary,
        net_cash_flows,
        cash_flows: projection.cash_flows,
        annual_projections,
        terminal_sale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn lease_params() -> ProformaParams {
        ProformaParams::from_value(json!({
            "monetizationModel": "personal_lease",
            "purchaseType": "individual",
            "propertyPrice": 5000,
            "downPaymentRatio": 20,
            "acquisitionCostRatio": 7,
            "exchangeRate": 0.21,
            "domesticLoanInterestRate": 1.5,
            "domesticLoanTerm": 35,
            "monthlyRent": 18,
            "vacancyRate": 5,
            "investmentPeriod": 10
        }))
        .unwrap()
    }

    #[test]
    fn test_compute_wraps_report_in_envelope() {
        let output = compute_proforma(&lease_params()).unwrap();
        assert_eq!(output.result.cash_flows.len(), 11);
        assert_eq!(output.result.net_cash_flows.len(), 11);
        assert!(output.methodology.contains("Proforma"));
        assert_eq!(output.assumptions["unit_multiplier"], json!("10000"));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let params = ProformaParams::default();
        match compute_proforma(&params) {
            Err(ProformaError::Validation(errors)) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_dual_amounts_use_exchange_rate() {
        let report = compute_proforma(&lease_params()).unwrap().result;
        let total = report.initial_investment.total_investment;
        assert_eq!(total.display, total.base * dec!(0.21));
        assert_eq!(report.net_cash_flows[0].base, -total.base);
    }

    #[test]
    fn test_request_assumptions_override_defaults() {
        let mut params = lease_params();
        params.assumptions = Some(json!({ "selling_cost_rate": "0.05" }));
        let report = compute_proforma(&params).unwrap().result;
        let sale = report.terminal_sale.unwrap();
        assert_eq!(sale.selling_costs, sale.sale_price * dec!(0.05));
    }

    #[test]
    fn test_runaway_appreciation_reports_overflow() {
        let mut value = serde_json::to_value(lease_params()).unwrap();
        value["annualAppreciation"] = json!(100);
        value["investmentPeriod"] = json!(70);
        value["exchangeRate"] = json!(4.7);
        let params = ProformaParams::from_value(value).unwrap();
        match compute_proforma(&params) {
            Err(ProformaError::Overflow { .. }) => {}
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_price_reports_validation_error() {
        let mut value = serde_json::to_value(lease_params()).unwrap();
        value["propertyPrice"] = json!("10000000000000000000000000");
        let params = ProformaParams::from_value(value).unwrap();
        match compute_proforma(&params) {
            Err(ProformaError::Validation(errors)) => {
                assert!(errors.messages().iter().any(|m| m.contains("propertyPrice")))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_and_current_keys_together_compute() {
        let mut value = serde_json::to_value(lease_params()).unwrap();
        value["japanLoanTerm"] = json!(35);
        let params = ProformaParams::from_value(value).unwrap();
        assert!(compute_proforma(&params).is_ok());
    }
}
