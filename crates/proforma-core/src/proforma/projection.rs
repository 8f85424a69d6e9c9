use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::ProformaAssumptions;
use super::financing::FinancingPlan;
use super::input::{BuildingStructure, ProformaInput, PurchaseType};
use super::revenue::RevenueProfile;
use super::schema::MAX_YEARS;
use crate::checked;
use crate::error::ProformaError;
use crate::time_value::compound;
use crate::types::{Money, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Annual holding costs that do not depend on financing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringCosts {
    /// Management and repairs, a share of gross revenue
    pub management_fee: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub accountant_fee: Money,
}

impl RecurringCosts {
    pub fn new(input: &ProformaInput, revenue: &RevenueProfile) -> ProformaResult<Self> {
        let management_fee = checked::mul(
            revenue.annual_gross_revenue()?,
            input.management_fee_ratio,
            "management fee",
        )?;
        Ok(Self {
            management_fee,
            property_tax: checked::mul(input.property_price, input.property_tax_rate, "property tax")?,
            insurance: input.annual_insurance_cost,
            accountant_fee: input.annual_tax_accountant_fee,
        })
    }

    pub fn total(&self) -> ProformaResult<Money> {
        checked::sum(
            [
                self.management_fee,
                self.property_tax,
                self.insurance,
                self.accountant_fee,
            ],
            "recurring costs",
        )
    }
}

/// Exit at the end of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub sale_price: Money,
    pub selling_costs: Money,
    /// Remaining primary mortgage balance settled from the proceeds
    pub loan_payoff: Money,
    /// Book value (corporate) or purchase cost (individual)
    pub tax_basis: Money,
    pub capital_gain: Money,
    pub capital_gains_rate: Rate,
    pub capital_gains_tax: Money,
    pub net_sale_proceeds: Money,
}

/// One year of the projection. Year 0 carries only the initial outflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyCashFlow {
    pub year: u32,
    pub gross_income: Money,
    pub operating_expenses: Money,
    pub ebitda: Money,
    pub interest_paid: Money,
    pub recurring_costs: Money,
    pub pre_tax_cash_flow: Money,
    /// Corporate owners only
    pub depreciation: Money,
    /// Corporate owners only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable_income: Option<Money>,
    pub tax_due: Money,
    pub net_cash_flow: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<SaleEvent>,
}

impl YearlyCashFlow {
    fn initial(total_initial_investment: Money) -> Self {
        Self {
            year: 0,
            gross_income: Decimal::ZERO,
            operating_expenses: Decimal::ZERO,
            ebitda: Decimal::ZERO,
            interest_paid: Decimal::ZERO,
            recurring_costs: Decimal::ZERO,
            pre_tax_cash_flow: Decimal::ZERO,
            depreciation: Decimal::ZERO,
            taxable_income: None,
            tax_due: Decimal::ZERO,
            net_cash_flow: -total_initial_investment,
            sale: None,
        }
    }
}

/// Year-end balance sheet view of the investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualProjection {
    pub year: u32,
    pub net_cash_flow: Money,
    pub property_value: Money,
    pub loan_balance: Money,
    pub net_equity: Money,
}

/// Output of the year-by-year walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Years 0..=N
    pub cash_flows: Vec<YearlyCashFlow>,
    /// Years 1..=N
    pub annual_projections: Vec<AnnualProjection>,
    pub recurring_costs: RecurringCosts,
    /// Full-year straight-line depreciation of the building
    pub annual_depreciation: Money,
}

impl Projection {
    pub fn net_cash_flows(&self) -> Vec<Money> {
        self.cash_flows.iter().map(|cf| cf.net_cash_flow).collect()
    }

    /// Net cash flow of `year`, if the horizon reaches it.
    pub fn net_cash_flow(&self, year: usize) -> Option<Money> {
        self.cash_flows.get(year).map(|cf| cf.net_cash_flow)
    }

    pub fn terminal_sale(&self) -> Option<&SaleEvent> {
        self.cash_flows.last().and_then(|cf| cf.sale.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Depreciation
// ---------------------------------------------------------------------------

/// Straight-line building depreciation with a useful life set by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepreciationSchedule {
    building_value: Money,
    annual: Money,
    life: u32,
}

impl DepreciationSchedule {
    pub fn new(input: &ProformaInput, assumptions: &ProformaAssumptions) -> ProformaResult<Self> {
        let building_value =
            checked::mul(input.property_price, input.building_ratio, "building value")?;
        let life = match input.building_structure {
            BuildingStructure::Wood => assumptions.wood_useful_life_years,
            BuildingStructure::Concrete => assumptions.concrete_useful_life_years,
        }
        .max(1);
        Ok(Self {
            building_value,
            annual: building_value / Decimal::from(life),
            life,
        })
    }

    pub fn annual(&self) -> Money {
        self.annual
    }

    /// Accumulated depreciation after `years` full years. Exactly the building
    /// value from the end of the useful life onwards.
    pub fn accumulated(&self, years: u32) -> Money {
        if years >= self.life {
            return self.building_value;
        }
        (self.annual * Decimal::from(years)).min(self.building_value)
    }

    /// Charge for one year, zero once the building is fully depreciated.
    pub fn charge_for_year(&self, year: u32) -> Money {
        if year == 0 {
            return Decimal::ZERO;
        }
        self.accumulated(year) - self.accumulated(year - 1)
    }

    pub fn book_value(&self, years: u32) -> Money {
        self.building_value - self.accumulated(years)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Walk the investment horizon one year at a time.
pub fn project(
    input: &ProformaInput,
    revenue: &RevenueProfile,
    financing: &FinancingPlan,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<Projection> {
    let horizon = input.investment_period_years;
    if horizon > MAX_YEARS {
        return Err(ProformaError::InvalidInput {
            field: "investment_period_years".into(),
            reason: format!("Horizon must not exceed {MAX_YEARS} years"),
        });
    }
    let corporate = input.purchase_type == PurchaseType::Corporate;
    let recurring_costs = RecurringCosts::new(input, revenue)?;
    let recurring_total = recurring_costs.total()?;
    let depreciation = DepreciationSchedule::new(input, assumptions)?;
    let operating_expenses = revenue.annual_operating_expenses()?;

    let mut cash_flows = Vec::with_capacity(horizon as usize + 1);
    let mut annual_projections = Vec::with_capacity(horizon as usize);
    cash_flows.push(YearlyCashFlow::initial(financing.total_initial_investment));

    let mut loan = financing.primary_amortization();

    for year in 1..=horizon {
        let gross_income = revenue.gross_income_for_year(year)?;
        let ebitda = checked::sub(gross_income, operating_expenses, "EBITDA")?;
        let amortized = loan.advance_year();
        let interest_paid = amortized.interest_paid;

        let pre_tax_cash_flow = checked::sub(ebitda, interest_paid, "pre-tax cash flow")
            .and_then(|v| checked::sub(v, recurring_total, "pre-tax cash flow"))?;

        let (year_depreciation, taxable_income, tax_due) = if corporate {
            let charge = depreciation.charge_for_year(year);
            let taxable = checked::sub(pre_tax_cash_flow, charge, "taxable income")?;
            let tax = if taxable > Decimal::ZERO {
                checked::mul(taxable, input.corporate_tax_rate, "corporate tax")?
            } else {
                Decimal::ZERO
            };
            (charge, Some(taxable), tax)
        } else {
            (Decimal::ZERO, None, Decimal::ZERO)
        };

        let mut net_cash_flow = pre_tax_cash_flow - tax_due;

        let sale = if year == horizon {
            let sale = terminal_sale(input, financing, &depreciation, assumptions)?;
            net_cash_flow = checked::add(net_cash_flow, sale.net_sale_proceeds, "net cash flow")?;
            Some(sale)
        } else {
            None
        };

        let property_value = compound(input.property_price, input.annual_appreciation, year)?;
        annual_projections.push(AnnualProjection {
            year,
            net_cash_flow,
            property_value,
            loan_balance: amortized.closing_balance,
            net_equity: checked::sub(property_value, amortized.closing_balance, "net equity")?,
        });

        tracing::debug!(
            year,
            %gross_income,
            %interest_paid,
            %tax_due,
            %net_cash_flow,
            "projected year"
        );

        cash_flows.push(YearlyCashFlow {
            year,
            gross_income,
            operating_expenses,
            ebitda,
            interest_paid,
            recurring_costs: recurring_total,
            pre_tax_cash_flow,
            depreciation: year_depreciation,
            taxable_income,
            tax_due,
            net_cash_flow,
            sale,
        });
    }

    Ok(Projection {
        cash_flows,
        annual_projections,
        recurring_costs,
        annual_depreciation: depreciation.annual(),
    })
}

/// Sale at the end of the horizon, with the mortgage payoff re-simulated
/// from month one so it cannot drift from the scheduled balance.
fn terminal_sale(
    input: &ProformaInput,
    financing: &FinancingPlan,
    depreciation: &DepreciationSchedule,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<SaleEvent> {
    let horizon = input.investment_period_years;
    let price = input.property_price;

    let sale_price = compound(price, input.annual_appreciation, horizon)?;
    let selling_costs = checked::mul(sale_price, assumptions.selling_cost_rate, "selling costs")?;

    let mut payoff = financing.primary_amortization();
    for _ in 0..horizon {
        if !payoff.is_active() {
            break;
        }
        payoff.advance_year();
    }
    let loan_payoff = payoff.balance();

    let (tax_basis, capital_gains_rate) = match input.purchase_type {
        PurchaseType::Corporate => {
            let land_value = checked::mul(price, Decimal::ONE - input.building_ratio, "land value")?;
            (
                checked::add(depreciation.book_value(horizon), land_value, "tax basis")?,
                input.corporate_tax_rate,
            )
        }
        PurchaseType::Individual => {
            let rate = if horizon >= assumptions.long_term_holding_years {
                assumptions.individual_long_term_cgt
            } else {
                assumptions.individual_short_term_cgt
            };
            (
                checked::add(price, financing.acquisition_costs, "tax basis")?,
                rate,
            )
        }
    };

    let net_of_costs = checked::sub(sale_price, selling_costs, "capital gain")?;
    let capital_gain = checked::sub(net_of_costs, tax_basis, "capital gain")?;
    let capital_gains_tax = if capital_gain > Decimal::ZERO {
        checked::mul(capital_gain, capital_gains_rate, "capital gains tax")?
    } else {
        Decimal::ZERO
    };

    let net_sale_proceeds = checked::sub(net_of_costs, loan_payoff, "net sale proceeds")
        .and_then(|v| checked::sub(v, capital_gains_tax, "net sale proceeds"))?;

    Ok(SaleEvent {
        sale_price,
        selling_costs,
        loan_payoff,
        tax_basis,
        capital_gain,
        capital_gains_rate,
        capital_gains_tax,
        net_sale_proceeds,
    })
}
