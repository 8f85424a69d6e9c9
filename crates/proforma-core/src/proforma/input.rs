//! Typed, normalised inputs. All percentages are fractions and all money is
//! in base units by the time a value reaches one of these structs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyPair, Money, Rate};

/// How the property earns revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonetizationModel {
    ShortTermRental,
    PersonalLease,
    CommercialLease,
}

impl MonetizationModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short_term_rental" | "shortTermRental" | "airbnb" => Some(Self::ShortTermRental),
            "personal_lease" | "personalLease" => Some(Self::PersonalLease),
            "commercial_lease" | "commercialLease" => Some(Self::CommercialLease),
            _ => None,
        }
    }
}

/// Legal owner of the property, which selects the tax regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    Individual,
    Corporate,
}

impl PurchaseType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" | "personal" => Some(Self::Individual),
            "corporate" => Some(Self::Corporate),
            _ => None,
        }
    }

    pub fn is_corporate(self) -> bool {
        self == Self::Corporate
    }
}

/// Where the primary mortgage is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanOrigin {
    Domestic,
    Foreign,
    /// Domestic mortgage plus a secondary loan covering part of the down payment
    Mixed,
}

impl LoanOrigin {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "domestic" | "japan" => Some(Self::Domestic),
            "foreign" | "taiwan" => Some(Self::Foreign),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Building construction, which fixes the statutory depreciation life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingStructure {
    Wood,
    Concrete,
}

impl BuildingStructure {
    /// Anything that is not wood depreciates as concrete.
    pub fn parse(value: &str) -> Self {
        if value == "wood" {
            Self::Wood
        } else {
            Self::Concrete
        }
    }
}

/// Primary mortgage pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub annual_rate: Rate,
    pub term_years: u32,
}

/// Short-term rental (nightly booking) assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermRentalInputs {
    /// Nights per year the property may legally operate
    pub operating_days_cap: Decimal,
    pub occupancy_rate: Rate,
    /// Average daily rate before markups, base units
    pub daily_rate: Money,
    pub platform_fee_rate: Rate,
    /// Cleaning cost per turnover
    pub cleaning_fee: Money,
    pub avg_stay_nights: Decimal,
    pub avg_guests: Decimal,
    /// Guests included in the nightly rate
    pub base_occupancy_for_fee: Decimal,
    /// Surcharge per extra guest per night
    pub extra_guest_fee: Money,
    pub peak_season_markup: Rate,
    pub monthly_utilities: Money,
}

/// Lease assumptions, shared by personal and commercial tenancies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseInputs {
    pub monthly_rent: Money,
    pub vacancy_rate: Rate,
    /// Months of rent collected once at signing (key money, deposit capture)
    pub initial_cost_multiplier: Decimal,
    pub monthly_utilities: Money,
    /// Years between renewals; zero disables renewal fees
    pub renewal_frequency_years: Decimal,
    /// Months of rent charged at each renewal
    pub renewal_fee_months: Decimal,
}

/// Revenue assumptions for the selected monetization model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RevenueInputs {
    ShortTermRental(ShortTermRentalInputs),
    PersonalLease(LeaseInputs),
    CommercialLease(LeaseInputs),
}

/// One fully normalised proforma request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProformaInput {
    pub revenue: RevenueInputs,
    pub purchase_type: PurchaseType,
    pub property_price: Money,
    pub down_payment_ratio: Rate,
    pub acquisition_cost_ratio: Rate,
    pub currency: CurrencyPair,
    pub loan_origin: LoanOrigin,
    pub loan: LoanTerms,
    pub credit_loan_rate: Rate,
    /// Cash the owner can put toward the down payment (mixed origin only)
    pub own_capital_amount: Money,
    pub initial_furnishing_cost: Money,
    pub management_fee_ratio: Rate,
    pub property_tax_rate: Rate,
    pub annual_appreciation: Rate,
    pub investment_period_years: u32,
    pub building_structure: BuildingStructure,
    pub building_ratio: Rate,
    pub corporate_tax_rate: Rate,
    pub annual_insurance_cost: Money,
    /// Zero for individual buyers
    pub corporate_setup_cost: Money,
    /// Zero for individual buyers
    pub annual_tax_accountant_fee: Money,
}
