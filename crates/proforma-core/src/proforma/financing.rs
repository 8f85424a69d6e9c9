use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::ProformaAssumptions;
use super::input::{LoanOrigin, ProformaInput};
use super::schema::MAX_YEARS;
use crate::checked;
use crate::error::ProformaError;
use crate::time_value::annuity_payment;
use crate::types::{Money, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

/// One month of a loan's amortization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Interest and principal paid over one projection year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearAmortization {
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub closing_balance: Money,
}

/// Running state of a fixed-payment loan.
///
/// The balance never increases and never drops below zero. On the final
/// scheduled period the remaining balance is settled in full, so a loan run
/// to term always closes at exactly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationState {
    balance: Money,
    payment: Money,
    monthly_rate: Rate,
    periods_remaining: u32,
    period: u32,
}

impl AmortizationState {
    pub fn new(principal: Money, payment: Money, monthly_rate: Rate, term_months: u32) -> Self {
        Self {
            balance: principal.max(Decimal::ZERO),
            payment,
            monthly_rate,
            periods_remaining: term_months,
            period: 0,
        }
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    /// A loan with no scheduled payment neither accrues nor amortizes.
    pub fn is_active(&self) -> bool {
        self.balance > Decimal::ZERO && self.payment > Decimal::ZERO
    }

    /// Advance one month. Returns `None` once the loan is settled.
    pub fn step(&mut self) -> Option<AmortizationRow> {
        if !self.is_active() {
            return None;
        }

        self.period += 1;
        let opening_balance = self.balance;
        let interest = opening_balance * self.monthly_rate;

        let final_period = self.periods_remaining <= 1;
        let principal = if final_period {
            opening_balance
        } else {
            (self.payment - interest).max(Decimal::ZERO).min(opening_balance)
        };

        self.balance = (opening_balance - principal).max(Decimal::ZERO);
        self.periods_remaining = self.periods_remaining.saturating_sub(1);

        Some(AmortizationRow {
            period: self.period,
            opening_balance,
            payment: interest + principal,
            interest,
            principal,
            closing_balance: self.balance,
        })
    }

    /// Advance twelve months, stopping early once the balance reaches zero.
    pub fn advance_year(&mut self) -> YearAmortization {
        let mut interest_paid = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;

        for _ in 0..12 {
            match self.step() {
                Some(row) => {
                    interest_paid += row.interest;
                    principal_paid += row.principal;
                }
                None => break,
            }
        }

        YearAmortization {
            interest_paid,
            principal_paid,
            closing_balance: self.balance,
        }
    }
}

/// Month-by-month schedule for a fully amortizing loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_paid: Money,
    pub rows: Vec<AmortizationRow>,
}

/// Build the full amortization schedule for a fixed-rate loan.
pub fn amortization_schedule(
    principal: Money,
    annual_rate: Rate,
    term_months: u32,
) -> ProformaResult<AmortizationSchedule> {
    if principal < Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be non-negative".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Interest rate must be non-negative".into(),
        });
    }
    if term_months > MAX_YEARS * 12 {
        return Err(ProformaError::InvalidInput {
            field: "term_months".into(),
            reason: format!("Loan term must not exceed {MAX_YEARS} years"),
        });
    }

    let monthly_rate = annual_rate / dec!(12);
    let monthly_payment = annuity_payment(principal, monthly_rate, term_months)?;

    let mut state = AmortizationState::new(principal, monthly_payment, monthly_rate, term_months);
    let mut rows = Vec::with_capacity(term_months as usize);
    while let Some(row) = state.step() {
        rows.push(row);
    }

    let total_interest: Money = rows.iter().map(|r| r.interest).sum();
    let total_paid: Money = rows.iter().map(|r| r.payment).sum();

    Ok(AmortizationSchedule {
        principal,
        annual_rate,
        term_months,
        monthly_payment,
        total_interest,
        total_paid,
        rows,
    })
}

// ---------------------------------------------------------------------------
// Financing plan
// ---------------------------------------------------------------------------

/// Capital structure of the acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingPlan {
    /// Brokerage, registration and other purchase costs
    pub acquisition_costs: Money,
    pub total_project_cost: Money,
    pub down_payment: Money,
    pub own_capital_for_down_payment: Money,
    /// Bridge / credit loan covering the down-payment shortfall
    pub secondary_loan_principal: Money,
    pub primary_loan_principal: Money,
    pub primary_monthly_rate: Rate,
    pub primary_term_months: u32,
    pub primary_monthly_payment: Money,
    pub secondary_monthly_rate: Rate,
    pub secondary_term_months: u32,
    pub secondary_monthly_payment: Money,
    /// Furnishing plus corporate setup
    pub setup_costs: Money,
    pub total_initial_investment: Money,
}

impl FinancingPlan {
    /// Fresh amortization state for the primary mortgage, positioned at month 0.
    pub fn primary_amortization(&self) -> AmortizationState {
        AmortizationState::new(
            self.primary_loan_principal,
            self.primary_monthly_payment,
            self.primary_monthly_rate,
            self.primary_term_months,
        )
    }

    pub fn annual_debt_service(&self) -> ProformaResult<Money> {
        let monthly = checked::add(
            self.primary_monthly_payment,
            self.secondary_monthly_payment,
            "annual debt service",
        )?;
        checked::mul(monthly, dec!(12), "annual debt service")
    }

    pub fn total_borrowed(&self) -> ProformaResult<Money> {
        checked::add(
            self.primary_loan_principal,
            self.secondary_loan_principal,
            "total borrowed",
        )
    }
}

/// Split the purchase into owner's cash and debt and price both loans.
pub fn plan_financing(
    input: &ProformaInput,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<FinancingPlan> {
    let price = input.property_price;
    let acquisition_costs = checked::mul(price, input.acquisition_cost_ratio, "acquisition costs")?;
    let total_project_cost = checked::add(price, acquisition_costs, "total project cost")?;
    let down_payment = checked::mul(price, input.down_payment_ratio, "down payment")?;
    let primary_loan_principal = price - down_payment;

    let (own_capital_for_down_payment, secondary_loan_principal) = match input.loan_origin {
        LoanOrigin::Mixed => {
            let own = input.own_capital_amount.min(down_payment);
            (own, down_payment - own)
        }
        LoanOrigin::Domestic | LoanOrigin::Foreign => (down_payment, Decimal::ZERO),
    };

    let primary_monthly_rate = input.loan.annual_rate / dec!(12);
    if input.loan.term_years > MAX_YEARS {
        return Err(ProformaError::InvalidInput {
            field: "loan.term_years".into(),
            reason: format!("Loan term must not exceed {MAX_YEARS} years"),
        });
    }
    let primary_term_months = input.loan.term_years * 12;
    let primary_monthly_payment =
        if primary_loan_principal > Decimal::ZERO && primary_term_months > 0 {
            annuity_payment(primary_loan_principal, primary_monthly_rate, primary_term_months)?
        } else {
            Decimal::ZERO
        };

    let secondary_monthly_rate = input.credit_loan_rate / dec!(12);
    let secondary_term_months = assumptions.secondary_loan_term_months;
    let secondary_monthly_payment = if secondary_loan_principal > Decimal::ZERO {
        annuity_payment(
            secondary_loan_principal,
            secondary_monthly_rate,
            secondary_term_months,
        )?
    } else {
        Decimal::ZERO
    };

    let setup_costs = checked::add(
        input.initial_furnishing_cost,
        input.corporate_setup_cost,
        "setup costs",
    )?;
    let total_initial_investment = checked::sum(
        [own_capital_for_down_payment, acquisition_costs, setup_costs],
        "total initial investment",
    )?;

    tracing::debug!(
        %down_payment,
        %primary_loan_principal,
        %secondary_loan_principal,
        %primary_monthly_payment,
        %total_initial_investment,
        "financing planned"
    );

    Ok(FinancingPlan {
        acquisition_costs,
        total_project_cost,
        down_payment,
        own_capital_for_down_payment,
        secondary_loan_principal,
        primary_loan_principal,
        primary_monthly_rate,
        primary_term_months,
        primary_monthly_payment,
        secondary_monthly_rate,
        secondary_term_months,
        secondary_monthly_payment,
        setup_costs,
        total_initial_investment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proforma::input::{
        BuildingStructure, LeaseInputs, LoanTerms, PurchaseType, RevenueInputs,
    };
    use crate::types::{Currency, CurrencyPair};
    use rust_decimal_macros::dec;

    fn sample_input() -> ProformaInput {
        ProformaInput {
            revenue: RevenueInputs::PersonalLease(LeaseInputs {
                monthly_rent: dec!(180000),
                vacancy_rate: dec!(0.05),
                initial_cost_multiplier: Decimal::ZERO,
                monthly_utilities: Decimal::ZERO,
                renewal_frequency_years: dec!(2),
                renewal_fee_months: Decimal::ZERO,
            }),
            purchase_type: PurchaseType::Individual,
            property_price: dec!(50000000),
            down_payment_ratio: dec!(0.20),
            acquisition_cost_ratio: dec!(0.07),
            currency: CurrencyPair {
                base: Currency::JPY,
                display: Currency::TWD,
                exchange_rate: dec!(0.21),
            },
            loan_origin: LoanOrigin::Domestic,
            loan: LoanTerms {
                annual_rate: dec!(0.015),
                term_years: 35,
            },
            credit_loan_rate: dec!(0.06),
            own_capital_amount: Decimal::ZERO,
            initial_furnishing_cost: dec!(500000),
            management_fee_ratio: dec!(0.05),
            property_tax_rate: dec!(0.014),
            annual_appreciation: dec!(0.01),
            investment_period_years: 10,
            building_structure: BuildingStructure::Concrete,
            building_ratio: dec!(0.60),
            corporate_tax_rate: dec!(0.30),
            annual_insurance_cost: dec!(30000),
            corporate_setup_cost: Decimal::ZERO,
            annual_tax_accountant_fee: Decimal::ZERO,
        }
    }

    #[test]
    fn test_domestic_plan() {
        let plan = plan_financing(&sample_input(), &ProformaAssumptions::default()).unwrap();
        assert_eq!(plan.acquisition_costs, dec!(3500000));
        assert_eq!(plan.total_project_cost, dec!(53500000));
        assert_eq!(plan.down_payment, dec!(10000000));
        assert_eq!(plan.primary_loan_principal, dec!(40000000));
        assert_eq!(plan.own_capital_for_down_payment, dec!(10000000));
        assert_eq!(plan.secondary_loan_principal, Decimal::ZERO);
        assert_eq!(plan.secondary_monthly_payment, Decimal::ZERO);
        // 10,000,000 + 3,500,000 + 500,000
        assert_eq!(plan.total_initial_investment, dec!(14000000));
        assert_eq!(plan.primary_term_months, 420);
        // 40M at 1.5% over 35 years is roughly 122,473 per month
        assert!(
            (plan.primary_monthly_payment - dec!(122473)).abs() < dec!(5),
            "payment {}",
            plan.primary_monthly_payment
        );
    }

    #[test]
    fn test_mixed_origin_splits_down_payment() {
        let mut input = sample_input();
        input.loan_origin = LoanOrigin::Mixed;
        input.own_capital_amount = dec!(4000000);
        let plan = plan_financing(&input, &ProformaAssumptions::default()).unwrap();

        assert_eq!(plan.own_capital_for_down_payment, dec!(4000000));
        assert_eq!(plan.secondary_loan_principal, dec!(6000000));
        assert_eq!(plan.secondary_term_months, 60);
        assert!(plan.secondary_monthly_payment > dec!(100000));
        assert_eq!(plan.total_borrowed().unwrap(), dec!(46000000));
        assert_eq!(plan.total_initial_investment, dec!(8000000));
    }

    #[test]
    fn test_own_capital_capped_at_down_payment() {
        let mut input = sample_input();
        input.loan_origin = LoanOrigin::Mixed;
        input.own_capital_amount = dec!(99000000);
        let plan = plan_financing(&input, &ProformaAssumptions::default()).unwrap();
        assert_eq!(plan.own_capital_for_down_payment, dec!(10000000));
        assert_eq!(plan.secondary_loan_principal, Decimal::ZERO);
    }

    #[test]
    fn test_zero_credit_rate_secondary_loan_is_straight_line() {
        let mut input = sample_input();
        input.loan_origin = LoanOrigin::Mixed;
        input.credit_loan_rate = Decimal::ZERO;
        let plan = plan_financing(&input, &ProformaAssumptions::default()).unwrap();
        assert_eq!(plan.secondary_monthly_payment, dec!(10000000) / dec!(60));
    }

    #[test]
    fn test_zero_rate_primary_payment() {
        let mut input = sample_input();
        input.loan.annual_rate = Decimal::ZERO;
        let plan = plan_financing(&input, &ProformaAssumptions::default()).unwrap();
        assert_eq!(plan.primary_monthly_payment, dec!(40000000) / dec!(420));
    }

    #[test]
    fn test_zero_term_has_no_payment() {
        let mut input = sample_input();
        input.loan.term_years = 0;
        let plan = plan_financing(&input, &ProformaAssumptions::default()).unwrap();
        assert_eq!(plan.primary_monthly_payment, Decimal::ZERO);
        let mut state = plan.primary_amortization();
        let year = state.advance_year();
        assert_eq!(year.interest_paid, Decimal::ZERO);
        assert_eq!(year.closing_balance, dec!(40000000));
    }

    #[test]
    fn test_schedule_closes_at_zero() {
        let schedule = amortization_schedule(dec!(1000000), dec!(0.05), 120).unwrap();
        assert_eq!(schedule.rows.len(), 120);
        let last = schedule.rows.last().unwrap();
        assert_eq!(last.closing_balance, Decimal::ZERO);

        let principal_sum: Decimal = schedule.rows.iter().map(|r| r.principal).sum();
        assert!((principal_sum - dec!(1000000)).abs() < dec!(0.000001));
        assert!(
            (schedule.total_paid - schedule.total_interest - dec!(1000000)).abs() < dec!(0.000001)
        );
    }

    #[test]
    fn test_schedule_balance_never_increases() {
        let schedule = amortization_schedule(dec!(250000), dec!(0.08), 36).unwrap();
        for row in &schedule.rows {
            assert!(row.closing_balance <= row.opening_balance);
            assert!(row.closing_balance >= Decimal::ZERO);
            assert_eq!(row.interest, row.opening_balance * (dec!(0.08) / dec!(12)));
        }
    }

    #[test]
    fn test_schedule_zero_rate() {
        let schedule = amortization_schedule(dec!(120000), Decimal::ZERO, 12).unwrap();
        assert_eq!(schedule.monthly_payment, dec!(10000));
        assert_eq!(schedule.total_interest, Decimal::ZERO);
        assert!(schedule.rows.iter().all(|r| r.principal == dec!(10000)));
    }

    #[test]
    fn test_schedule_rejects_negative_principal() {
        assert!(amortization_schedule(dec!(-1), dec!(0.05), 12).is_err());
    }

    #[test]
    fn test_schedule_rejects_term_beyond_horizon_cap() {
        assert!(amortization_schedule(dec!(1000), dec!(0.05), MAX_YEARS * 12).is_ok());
        match amortization_schedule(dec!(1000), dec!(0.05), u32::MAX) {
            Err(ProformaError::InvalidInput { field, .. }) => assert_eq!(field, "term_months"),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_rejects_term_beyond_horizon_cap() {
        let mut input = sample_input();
        input.loan.term_years = u32::MAX / 6;
        assert!(matches!(
            plan_financing(&input, &ProformaAssumptions::default()),
            Err(ProformaError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_oversized_price_is_an_overflow() {
        let mut input = sample_input();
        input.property_price = Decimal::MAX;
        assert!(matches!(
            plan_financing(&input, &ProformaAssumptions::default()),
            Err(ProformaError::Overflow { .. })
        ));
    }

    #[test]
    fn test_advance_year_stops_at_zero_balance() {
        let mut state = AmortizationState::new(dec!(12000), dec!(1000), Decimal::ZERO, 12);
        let first = state.advance_year();
        assert_eq!(first.principal_paid, dec!(12000));
        assert_eq!(first.closing_balance, Decimal::ZERO);
        let second = state.advance_year();
        assert_eq!(second.interest_paid, Decimal::ZERO);
        assert_eq!(second.principal_paid, Decimal::ZERO);
    }
}
