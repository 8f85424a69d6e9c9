use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::ProformaAssumptions;
use super::input::{LeaseInputs, MonetizationModel, RevenueInputs, ShortTermRentalInputs};
use crate::checked;
use crate::types::Money;
use crate::ProformaResult;

/// Booking statistics behind a short-term rental revenue figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingMetrics {
    pub annual_booked_nights: Decimal,
    pub monthly_booked_nights: Decimal,
    /// Nightly rate after peak-season weighting and extra-guest surcharge
    pub effective_daily_rate: Money,
    pub turnovers_per_month: Decimal,
}

/// Steady-state monthly economics of the selected monetization model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueProfile {
    pub model: MonetizationModel,
    pub monthly_gross_revenue: Money,
    pub monthly_operating_expenses: Money,
    /// Received once, in year 1
    pub one_time_initial_income: Money,
    /// Renewal fee spread over its cycle; charged in full every `renewal_frequency_years`
    pub annual_renewal_fee: Money,
    pub renewal_frequency_years: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<BookingMetrics>,
}

impl RevenueProfile {
    pub fn annual_gross_revenue(&self) -> ProformaResult<Money> {
        checked::mul(self.monthly_gross_revenue, dec!(12), "annual gross revenue")
    }

    pub fn annual_operating_expenses(&self) -> ProformaResult<Money> {
        checked::mul(
            self.monthly_operating_expenses,
            dec!(12),
            "annual operating expenses",
        )
    }

    /// Renewal fee collected in `year`: the whole cycle's fee in years that are
    /// exact multiples of the renewal frequency, zero otherwise.
    pub fn renewal_fee_for_year(&self, year: u32) -> ProformaResult<Money> {
        if self.annual_renewal_fee <= Decimal::ZERO || self.renewal_frequency_years <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        if year > 0 && (Decimal::from(year) % self.renewal_frequency_years).is_zero() {
            checked::mul(
                self.annual_renewal_fee,
                self.renewal_frequency_years,
                "renewal fee",
            )
        } else {
            Ok(Decimal::ZERO)
        }
    }

    /// Gross income for one projection year including one-off items.
    pub fn gross_income_for_year(&self, year: u32) -> ProformaResult<Money> {
        let one_time = if year == 1 {
            self.one_time_initial_income
        } else {
            Decimal::ZERO
        };
        checked::sum(
            [
                self.annual_gross_revenue()?,
                one_time,
                self.renewal_fee_for_year(year)?,
            ],
            "gross income",
        )
    }
}

/// Compute monthly revenue and operating expenses for the selected model.
pub fn model_revenue(
    inputs: &RevenueInputs,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<RevenueProfile> {
    match inputs {
        RevenueInputs::ShortTermRental(str_inputs) => short_term_rental(str_inputs, assumptions),
        RevenueInputs::PersonalLease(lease) => lease_revenue(MonetizationModel::PersonalLease, lease),
        RevenueInputs::CommercialLease(lease) => {
            lease_revenue(MonetizationModel::CommercialLease, lease)
        }
    }
}

fn short_term_rental(
    inputs: &ShortTermRentalInputs,
    assumptions: &ProformaAssumptions,
) -> ProformaResult<RevenueProfile> {
    let max_nights = inputs
        .operating_days_cap
        .min(Decimal::from(assumptions.max_operating_days));
    let annual_booked_nights = checked::mul(max_nights, inputs.occupancy_rate, "booked nights")?;
    let monthly_booked_nights = annual_booked_nights / dec!(12);

    let peak_weight = Decimal::from(assumptions.peak_season_months) / dec!(12);
    let extra_guests = (inputs.avg_guests - inputs.base_occupancy_for_fee).max(Decimal::ZERO);
    let peak_factor = checked::add(
        Decimal::ONE,
        checked::mul(inputs.peak_season_markup, peak_weight, "peak season markup")?,
        "peak season markup",
    )?;
    let effective_daily_rate = checked::add(
        checked::mul(inputs.daily_rate, peak_factor, "effective daily rate")?,
        checked::mul(extra_guests, inputs.extra_guest_fee, "extra guest fee")?,
        "effective daily rate",
    )?;

    let monthly_gross_revenue = checked::mul(
        monthly_booked_nights,
        effective_daily_rate,
        "monthly gross revenue",
    )?;

    let turnovers_per_month = if inputs.avg_stay_nights > Decimal::ZERO {
        checked::div(monthly_booked_nights, inputs.avg_stay_nights, "turnovers per month")?
    } else {
        Decimal::ZERO
    };

    let monthly_operating_expenses = checked::sum(
        [
            checked::mul(monthly_gross_revenue, inputs.platform_fee_rate, "platform fees")?,
            checked::mul(turnovers_per_month, inputs.cleaning_fee, "cleaning fees")?,
            inputs.monthly_utilities,
        ],
        "monthly operating expenses",
    )?;

    Ok(RevenueProfile {
        model: MonetizationModel::ShortTermRental,
        monthly_gross_revenue,
        monthly_operating_expenses,
        one_time_initial_income: Decimal::ZERO,
        annual_renewal_fee: Decimal::ZERO,
        renewal_frequency_years: Decimal::ZERO,
        bookings: Some(BookingMetrics {
            annual_booked_nights,
            monthly_booked_nights,
            effective_daily_rate,
            turnovers_per_month,
        }),
    })
}

fn lease_revenue(model: MonetizationModel, lease: &LeaseInputs) -> ProformaResult<RevenueProfile> {
    let monthly_gross_revenue = checked::mul(
        lease.monthly_rent,
        Decimal::ONE - lease.vacancy_rate,
        "monthly gross revenue",
    )?;
    let one_time_initial_income = checked::mul(
        lease.monthly_rent,
        lease.initial_cost_multiplier,
        "initial lease income",
    )?;

    let annual_renewal_fee = if lease.renewal_frequency_years > Decimal::ZERO
        && lease.renewal_fee_months > Decimal::ZERO
    {
        let cycle_fee = checked::mul(lease.monthly_rent, lease.renewal_fee_months, "renewal fee")?;
        checked::div(cycle_fee, lease.renewal_frequency_years, "renewal fee")?
    } else {
        Decimal::ZERO
    };

    Ok(RevenueProfile {
        model,
        monthly_gross_revenue,
        monthly_operating_expenses: lease.monthly_utilities,
        one_time_initial_income,
        annual_renewal_fee,
        renewal_frequency_years: lease.renewal_frequency_years,
        bookings: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_str() -> ShortTermRentalInputs {
        ShortTermRentalInputs {
            operating_days_cap: dec!(180),
            occupancy_rate: dec!(0.80),
            daily_rate: dec!(15000),
            platform_fee_rate: dec!(0.15),
            cleaning_fee: dec!(6000),
            avg_stay_nights: dec!(3),
            avg_guests: dec!(4),
            base_occupancy_for_fee: dec!(2),
            extra_guest_fee: dec!(1000),
            peak_season_markup: dec!(0.40),
            monthly_utilities: dec!(20000),
        }
    }

    fn sample_lease() -> LeaseInputs {
        LeaseInputs {
            monthly_rent: dec!(100000),
            vacancy_rate: dec!(0.05),
            initial_cost_multiplier: dec!(2),
            monthly_utilities: dec!(5000),
            renewal_frequency_years: dec!(2),
            renewal_fee_months: dec!(1),
        }
    }

    #[test]
    fn test_short_term_rental_revenue() {
        let profile = model_revenue(
            &RevenueInputs::ShortTermRental(sample_str()),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        let bookings = profile.bookings.as_ref().unwrap();

        // 180 nights * 80% = 144 booked nights, 12 per month
        assert_eq!(bookings.annual_booked_nights, dec!(144));
        assert_eq!(bookings.monthly_booked_nights, dec!(12));
        // 15000 * (1 + 0.40 * 3/12) + 2 * 1000 = 16500 + 2000
        assert_eq!(bookings.effective_daily_rate, dec!(18500));
        assert_eq!(profile.monthly_gross_revenue, dec!(222000));
        assert_eq!(bookings.turnovers_per_month, dec!(4));
        // 222000 * 15% + 4 * 6000 + 20000 = 33300 + 24000 + 20000
        assert_eq!(profile.monthly_operating_expenses, dec!(77300));
    }

    #[test]
    fn test_operating_days_capped_at_calendar_year() {
        let mut inputs = sample_str();
        inputs.operating_days_cap = dec!(400);
        inputs.occupancy_rate = Decimal::ONE;
        let profile = model_revenue(
            &RevenueInputs::ShortTermRental(inputs),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.bookings.unwrap().annual_booked_nights, dec!(365));
    }

    #[test]
    fn test_zero_stay_length_means_no_turnovers() {
        let mut inputs = sample_str();
        inputs.avg_stay_nights = Decimal::ZERO;
        let profile = model_revenue(
            &RevenueInputs::ShortTermRental(inputs),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.bookings.unwrap().turnovers_per_month, Decimal::ZERO);
        assert_eq!(profile.monthly_operating_expenses, dec!(222000) * dec!(0.15) + dec!(20000));
    }

    #[test]
    fn test_fewer_guests_than_threshold_has_no_surcharge() {
        let mut inputs = sample_str();
        inputs.avg_guests = dec!(1);
        let profile = model_revenue(
            &RevenueInputs::ShortTermRental(inputs),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.bookings.unwrap().effective_daily_rate, dec!(16500));
    }

    #[test]
    fn test_personal_lease_revenue() {
        let profile = model_revenue(
            &RevenueInputs::PersonalLease(sample_lease()),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.monthly_gross_revenue, dec!(95000));
        assert_eq!(profile.monthly_operating_expenses, dec!(5000));
        assert_eq!(profile.one_time_initial_income, dec!(200000));
        assert_eq!(profile.annual_renewal_fee, dec!(50000));
        assert!(profile.bookings.is_none());
    }

    #[test]
    fn test_renewal_fee_only_in_multiples_of_frequency() {
        let profile = model_revenue(
            &RevenueInputs::PersonalLease(sample_lease()),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.renewal_fee_for_year(1).unwrap(), Decimal::ZERO);
        assert_eq!(profile.renewal_fee_for_year(2).unwrap(), dec!(100000));
        assert_eq!(profile.renewal_fee_for_year(3).unwrap(), Decimal::ZERO);
        assert_eq!(profile.renewal_fee_for_year(4).unwrap(), dec!(100000));
    }

    #[test]
    fn test_gross_income_includes_one_off_items() {
        let profile = model_revenue(
            &RevenueInputs::PersonalLease(sample_lease()),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        // 95000 * 12 = 1,140,000
        assert_eq!(profile.gross_income_for_year(1).unwrap(), dec!(1340000));
        assert_eq!(profile.gross_income_for_year(2).unwrap(), dec!(1240000));
        assert_eq!(profile.gross_income_for_year(3).unwrap(), dec!(1140000));
    }

    #[test]
    fn test_commercial_lease_revenue() {
        let lease = LeaseInputs {
            monthly_utilities: Decimal::ZERO,
            renewal_frequency_years: Decimal::ZERO,
            renewal_fee_months: Decimal::ZERO,
            ..sample_lease()
        };
        let profile = model_revenue(
            &RevenueInputs::CommercialLease(lease),
            &ProformaAssumptions::default(),
        )
        .unwrap();
        assert_eq!(profile.model, MonetizationModel::CommercialLease);
        assert_eq!(profile.monthly_gross_revenue, dec!(95000));
        assert_eq!(profile.monthly_operating_expenses, Decimal::ZERO);
        assert_eq!(profile.annual_renewal_fee, Decimal::ZERO);
        assert_eq!(profile.renewal_fee_for_year(2).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_oversized_rent_is_an_overflow() {
        let lease = LeaseInputs {
            monthly_rent: Decimal::MAX,
            initial_cost_multiplier: dec!(2),
            ..sample_lease()
        };
        assert!(matches!(
            model_revenue(
                &RevenueInputs::PersonalLease(lease),
                &ProformaAssumptions::default(),
            ),
            Err(crate::ProformaError::Overflow { .. })
        ));
    }
}
