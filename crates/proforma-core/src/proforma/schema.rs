//! Raw parameter bag and the normaliser that turns it into [`ProformaInput`].
//!
//! Every field of the bag is optional at the transport level. Parsing never
//! fails: unparseable optional values fall back to their default (and leave
//! a warning), while problems with required fields or out-of-range values
//! are collected into a single [`ValidationErrors`] list.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::assumptions::ProformaAssumptions;
use super::input::{
    BuildingStructure, LeaseInputs, LoanOrigin, LoanTerms, MonetizationModel, ProformaInput,
    PurchaseType, RevenueInputs, ShortTermRentalInputs,
};
use crate::error::ValidationErrors;
use crate::types::{Currency, CurrencyPair};

/// Upper bound for any year count (horizon, mortgage term).
pub const MAX_YEARS: u32 = 100;

/// The request body as sent by a form or API client.
///
/// Keys are camelCase. Values may be numbers, numeric strings, empty strings
/// or absent. Legacy key names are accepted as aliases; when a request carries
/// both, the current name wins. Any JSON object deserializes, so every
/// problem is left for [`normalize`] to report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Map<String, Value>")]
pub struct ProformaParams {
    pub monetization_model: Option<Value>,
    pub purchase_type: Option<Value>,
    /// Man-units
    pub property_price: Option<Value>,
    pub down_payment_ratio: Option<Value>,
    pub acquisition_cost_ratio: Option<Value>,
    /// Display units per base unit
    pub exchange_rate: Option<Value>,
    pub base_currency: Option<Value>,
    pub display_currency: Option<Value>,

    pub loan_origin: Option<Value>,
    /// Legacy key `japanLoanInterestRate`
    pub domestic_loan_interest_rate: Option<Value>,
    /// Legacy key `japanLoanTerm`
    pub domestic_loan_term: Option<Value>,
    /// Legacy key `taiwanLoanInterestRate`
    pub foreign_loan_interest_rate: Option<Value>,
    /// Legacy key `taiwanLoanTerm`
    pub foreign_loan_term: Option<Value>,
    pub credit_loan_rate: Option<Value>,
    pub own_capital_amount: Option<Value>,

    pub initial_furnishing_cost: Option<Value>,
    pub management_fee_ratio: Option<Value>,
    pub property_tax_rate: Option<Value>,
    pub annual_appreciation: Option<Value>,
    pub investment_period: Option<Value>,
    pub building_structure: Option<Value>,
    pub building_ratio: Option<Value>,
    pub corporate_tax_rate: Option<Value>,
    pub annual_insurance_cost: Option<Value>,
    pub corporate_setup_cost: Option<Value>,
    pub annual_tax_accountant_fee: Option<Value>,

    // Short-term rental
    pub operating_days_cap: Option<Value>,
    pub occupancy_rate: Option<Value>,
    pub daily_rate: Option<Value>,
    pub platform_fee_rate: Option<Value>,
    pub cleaning_fee: Option<Value>,
    pub avg_stay_duration: Option<Value>,
    pub avg_guests: Option<Value>,
    pub base_occupancy_for_fee: Option<Value>,
    pub extra_guest_fee: Option<Value>,
    pub peak_season_markup: Option<Value>,
    pub monthly_utilities: Option<Value>,

    // Personal lease
    pub monthly_rent: Option<Value>,
    pub vacancy_rate: Option<Value>,
    pub initial_lease_costs_ratio: Option<Value>,
    pub lease_utilities: Option<Value>,
    pub lease_renewal_fee_frequency: Option<Value>,
    pub lease_renewal_fee_amount: Option<Value>,

    // Commercial lease
    pub monthly_rent_commercial: Option<Value>,
    pub vacancy_rate_commercial: Option<Value>,
    pub initial_lease_costs_ratio_commercial: Option<Value>,

    /// Per-request overrides of the model constants, keyed like
    /// [`ProformaAssumptions`]. Read key by key during normalisation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Value>,
}

impl ProformaParams {
    /// Build the bag from any JSON object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<Map<String, Value>> for ProformaParams {
    fn from(mut map: Map<String, Value>) -> Self {
        let mut take = |key: &str| map.remove(key);
        let mut params = Self {
            monetization_model: take("monetizationModel"),
            purchase_type: take("purchaseType"),
            property_price: take("propertyPrice"),
            down_payment_ratio: take("downPaymentRatio"),
            acquisition_cost_ratio: take("acquisitionCostRatio"),
            exchange_rate: take("exchangeRate"),
            base_currency: take("baseCurrency"),
            display_currency: take("displayCurrency"),
            loan_origin: take("loanOrigin"),
            domestic_loan_interest_rate: None,
            domestic_loan_term: None,
            foreign_loan_interest_rate: None,
            foreign_loan_term: None,
            credit_loan_rate: take("creditLoanRate"),
            own_capital_amount: take("ownCapitalAmount"),
            initial_furnishing_cost: take("initialFurnishingCost"),
            management_fee_ratio: take("managementFeeRatio"),
            property_tax_rate: take("propertyTaxRate"),
            annual_appreciation: take("annualAppreciation"),
            investment_period: take("investmentPeriod"),
            building_structure: take("buildingStructure"),
            building_ratio: take("buildingRatio"),
            corporate_tax_rate: take("corporateTaxRate"),
            annual_insurance_cost: take("annualInsuranceCost"),
            corporate_setup_cost: take("corporateSetupCost"),
            annual_tax_accountant_fee: take("annualTaxAccountantFee"),
            operating_days_cap: take("operatingDaysCap"),
            occupancy_rate: take("occupancyRate"),
            daily_rate: take("dailyRate"),
            platform_fee_rate: take("platformFeeRate"),
            cleaning_fee: take("cleaningFee"),
            avg_stay_duration: take("avgStayDuration"),
            avg_guests: take("avgGuests"),
            base_occupancy_for_fee: take("baseOccupancyForFee"),
            extra_guest_fee: take("extraGuestFee"),
            peak_season_markup: take("peakSeasonMarkup"),
            monthly_utilities: take("monthlyUtilities"),
            monthly_rent: take("monthlyRent"),
            vacancy_rate: take("vacancyRate"),
            initial_lease_costs_ratio: take("initialLeaseCostsRatio"),
            lease_utilities: take("leaseUtilities"),
            lease_renewal_fee_frequency: take("leaseRenewalFeeFrequency"),
            lease_renewal_fee_amount: take("leaseRenewalFeeAmount"),
            monthly_rent_commercial: take("monthlyRentCommercial"),
            vacancy_rate_commercial: take("vacancyRateCommercial"),
            initial_lease_costs_ratio_commercial: take("initialLeaseCostsRatioCommercial"),
            assumptions: take("assumptions"),
        };

        params.domestic_loan_interest_rate =
            aliased(&mut map, "domesticLoanInterestRate", "japanLoanInterestRate");
        params.domestic_loan_term = aliased(&mut map, "domesticLoanTerm", "japanLoanTerm");
        params.foreign_loan_interest_rate =
            aliased(&mut map, "foreignLoanInterestRate", "taiwanLoanInterestRate");
        params.foreign_loan_term = aliased(&mut map, "foreignLoanTerm", "taiwanLoanTerm");
        params
    }
}

/// Value under `key`, falling back to `legacy` when `key` is absent or null.
fn aliased(map: &mut Map<String, Value>, key: &str, legacy: &str) -> Option<Value> {
    let current = map.remove(key);
    let old = map.remove(legacy);
    match current {
        Some(value) if !value.is_null() => Some(value),
        _ => old.or(current),
    }
}

/// Overlay request-level overrides on the default assumptions one key at a
/// time, so a single bad entry is reported without discarding the others.
fn read_assumptions(
    overrides: Option<&Value>,
    errors: &mut ValidationErrors,
    warnings: &mut Vec<String>,
) -> ProformaAssumptions {
    let defaults = ProformaAssumptions::default();
    let overrides = match overrides {
        None | Some(Value::Null) => return defaults,
        Some(Value::Object(map)) => map,
        Some(other) => {
            errors.push(format!("assumptions must be an object (got {other})"));
            return defaults;
        }
    };

    let mut merged = match serde_json::to_value(&defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults,
    };

    for (key, value) in overrides {
        if !merged.contains_key(key) {
            warnings.push(format!("assumptions.{key} is not a known assumption, ignored"));
            continue;
        }
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value.clone());
        match serde_json::from_value::<ProformaAssumptions>(Value::Object(candidate)) {
            Ok(_) => {
                merged.insert(key.clone(), value.clone());
            }
            Err(e) => errors.push(format!("assumptions.{key} is invalid: {e}")),
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or(defaults)
}

/// Output of a successful normalisation.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub input: ProformaInput,
    /// Model constants in effect: defaults overlaid with the request's overrides
    pub assumptions: ProformaAssumptions,
    /// Optional fields that could not be parsed and were defaulted
    pub warnings: Vec<String>,
}

/// How a numeric field is range-checked and converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// 0..=100 on input, divided by 100
    Percent,
    /// 0..=100 on input, kept as-is
    BoundedRate,
    /// >= 0, multiplied by the unit multiplier
    ManUnits,
    /// >= 0, kept as-is
    Amount,
}

/// A raw JSON value classified for parsing.
enum Raw<'a> {
    Missing,
    Number(Decimal),
    Text(&'a str),
    Invalid(String),
}

fn classify(value: Option<&Value>) -> Raw<'_> {
    match value {
        None | Some(Value::Null) => Raw::Missing,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Raw::Missing
            } else {
                match parse_decimal(trimmed) {
                    Some(d) => Raw::Number(d),
                    None => Raw::Text(trimmed),
                }
            }
        }
        Some(Value::Number(n)) => match parse_decimal(&n.to_string()) {
            Some(d) => Raw::Number(d),
            None => Raw::Invalid(n.to_string()),
        },
        Some(other) => Raw::Invalid(other.to_string()),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Accumulates errors and warnings while fields are read.
struct FieldReader {
    unit_multiplier: Decimal,
    errors: ValidationErrors,
    warnings: Vec<String>,
}

impl FieldReader {
    fn new(unit_multiplier: Decimal) -> Self {
        Self {
            unit_multiplier,
            errors: ValidationErrors::new(),
            warnings: Vec::new(),
        }
    }

    fn number(
        &mut self,
        name: &str,
        value: Option<&Value>,
        kind: FieldKind,
        required: bool,
        default: Decimal,
    ) -> Decimal {
        let raw = match classify(value) {
            Raw::Number(v) => v,
            Raw::Missing => {
                if required {
                    self.errors.push(format!("{name} is required"));
                }
                return self.convert(name, kind, default);
            }
            Raw::Text(text) => {
                self.reject_non_numeric(name, text, required, default);
                return self.convert(name, kind, default);
            }
            Raw::Invalid(text) => {
                self.reject_non_numeric(name, &text, required, default);
                return self.convert(name, kind, default);
            }
        };

        let in_range = match kind {
            FieldKind::Percent | FieldKind::BoundedRate => {
                if raw < Decimal::ZERO || raw > dec!(100) {
                    self.errors
                        .push(format!("{name} must be between 0 and 100 (got {raw})"));
                    false
                } else {
                    true
                }
            }
            FieldKind::ManUnits | FieldKind::Amount => {
                if raw < Decimal::ZERO {
                    self.errors.push(format!(
                        "{name} must be greater than or equal to 0 (got {raw})"
                    ));
                    false
                } else {
                    true
                }
            }
        };

        if in_range {
            self.convert(name, kind, raw)
        } else {
            self.convert(name, kind, default)
        }
    }

    fn reject_non_numeric(&mut self, name: &str, text: &str, required: bool, default: Decimal) {
        if required {
            self.errors.push(format!("{name} must be a valid number"));
        } else {
            self.warnings.push(format!(
                "{name}: '{text}' is not a number, using default {default}"
            ));
        }
    }

    fn convert(&mut self, name: &str, kind: FieldKind, value: Decimal) -> Decimal {
        match kind {
            FieldKind::Percent => value / dec!(100),
            FieldKind::ManUnits => match value.checked_mul(self.unit_multiplier) {
                Some(converted) => converted,
                None => {
                    self.errors.push(format!("{name} is too large (got {value})"));
                    Decimal::ZERO
                }
            },
            FieldKind::BoundedRate | FieldKind::Amount => value,
        }
    }

    fn percent(&mut self, name: &str, value: Option<&Value>) -> Decimal {
        self.number(name, value, FieldKind::Percent, false, Decimal::ZERO)
    }

    fn man_units(&mut self, name: &str, value: Option<&Value>) -> Decimal {
        self.number(name, value, FieldKind::ManUnits, false, Decimal::ZERO)
    }

    fn amount(&mut self, name: &str, value: Option<&Value>) -> Decimal {
        self.number(name, value, FieldKind::Amount, false, Decimal::ZERO)
    }

    /// Whole years, truncated, capped at [`MAX_YEARS`].
    fn years(&mut self, name: &str, value: Option<&Value>) -> u32 {
        let v = self.number(name, value, FieldKind::Amount, false, Decimal::ZERO);
        match v.trunc().to_u32() {
            Some(years) if years <= MAX_YEARS => years,
            _ => {
                self.errors
                    .push(format!("{name} must not exceed {MAX_YEARS} years (got {v})"));
                0
            }
        }
    }

    /// Read an enum selector. Returns `None` when absent (reported if required)
    /// or unrecognised (always reported).
    fn selector<T>(
        &mut self,
        name: &str,
        value: Option<&Value>,
        required: bool,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let text = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(other) => Some(other.to_string()),
        };

        match text {
            None => {
                if required {
                    self.errors.push(format!("{name} is required"));
                }
                None
            }
            Some(s) if s.is_empty() => {
                if required {
                    self.errors.push(format!("{name} must not be empty"));
                }
                None
            }
            Some(s) => {
                let parsed = parse(&s);
                if parsed.is_none() {
                    self.errors
                        .push(format!("{name} has unrecognised value '{s}'"));
                }
                parsed
            }
        }
    }

}

fn text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Validate a parameter bag and return every message, empty when valid.
pub fn validate_params(params: &ProformaParams) -> ValidationErrors {
    match normalize(params) {
        Ok(_) => ValidationErrors::new(),
        Err(errors) => errors,
    }
}

/// Normalise a raw bag into a typed [`ProformaInput`], reporting all problems
/// in one pass.
pub fn normalize(params: &ProformaParams) -> Result<Normalized, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut warnings = Vec::new();
    let assumptions = read_assumptions(params.assumptions.as_ref(), &mut errors, &mut warnings);
    errors.extend(assumptions.validate());

    let mut r = FieldReader::new(assumptions.unit_multiplier);
    r.errors = errors;
    r.warnings = warnings;

    let model = r.selector(
        "monetizationModel",
        params.monetization_model.as_ref(),
        true,
        MonetizationModel::parse,
    );
    let purchase_type = r.selector(
        "purchaseType",
        params.purchase_type.as_ref(),
        true,
        PurchaseType::parse,
    );
    let property_price = r.number(
        "propertyPrice",
        params.property_price.as_ref(),
        FieldKind::ManUnits,
        true,
        Decimal::ZERO,
    );
    let down_payment_ratio = r.percent("downPaymentRatio", params.down_payment_ratio.as_ref());
    let acquisition_cost_ratio =
        r.percent("acquisitionCostRatio", params.acquisition_cost_ratio.as_ref());
    let exchange_rate = r.number(
        "exchangeRate",
        params.exchange_rate.as_ref(),
        FieldKind::BoundedRate,
        true,
        Decimal::ZERO,
    );

    let currency = CurrencyPair {
        base: text(params.base_currency.as_ref())
            .map(|c| Currency::from_code(&c))
            .unwrap_or(Currency::JPY),
        display: text(params.display_currency.as_ref())
            .map(|c| Currency::from_code(&c))
            .unwrap_or(Currency::TWD),
        exchange_rate,
    };

    let loan_origin = r
        .selector("loanOrigin", params.loan_origin.as_ref(), false, LoanOrigin::parse)
        .unwrap_or(LoanOrigin::Domestic);
    let loan = match loan_origin {
        LoanOrigin::Domestic | LoanOrigin::Mixed => LoanTerms {
            annual_rate: r.percent(
                "domesticLoanInterestRate",
                params.domestic_loan_interest_rate.as_ref(),
            ),
            term_years: r.years("domesticLoanTerm", params.domestic_loan_term.as_ref()),
        },
        LoanOrigin::Foreign => LoanTerms {
            annual_rate: r.percent(
                "foreignLoanInterestRate",
                params.foreign_loan_interest_rate.as_ref(),
            ),
            term_years: r.years("foreignLoanTerm", params.foreign_loan_term.as_ref()),
        },
    };
    let credit_loan_rate = r.percent("creditLoanRate", params.credit_loan_rate.as_ref());
    let own_capital_amount = if loan_origin == LoanOrigin::Mixed {
        r.man_units("ownCapitalAmount", params.own_capital_amount.as_ref())
    } else {
        Decimal::ZERO
    };

    let initial_furnishing_cost =
        r.man_units("initialFurnishingCost", params.initial_furnishing_cost.as_ref());
    let management_fee_ratio = r.percent("managementFeeRatio", params.management_fee_ratio.as_ref());
    let property_tax_rate = r.percent("propertyTaxRate", params.property_tax_rate.as_ref());
    let annual_appreciation = r.percent("annualAppreciation", params.annual_appreciation.as_ref());
    let investment_period_years = r.years("investmentPeriod", params.investment_period.as_ref());
    let building_structure = text(params.building_structure.as_ref())
        .map(|s| BuildingStructure::parse(&s))
        .unwrap_or(BuildingStructure::Concrete);
    let building_ratio = r.percent("buildingRatio", params.building_ratio.as_ref());
    let corporate_tax_rate = r.percent("corporateTaxRate", params.corporate_tax_rate.as_ref());
    let annual_insurance_cost =
        r.man_units("annualInsuranceCost", params.annual_insurance_cost.as_ref());

    let corporate = purchase_type.is_some_and(PurchaseType::is_corporate);
    let (corporate_setup_cost, annual_tax_accountant_fee) = if corporate {
        (
            r.man_units("corporateSetupCost", params.corporate_setup_cost.as_ref()),
            r.man_units(
                "annualTaxAccountantFee",
                params.annual_tax_accountant_fee.as_ref(),
            ),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let revenue = model.map(|m| read_revenue(&mut r, params, m));

    match (revenue, purchase_type) {
        (Some(revenue), Some(purchase_type)) if r.errors.is_empty() => Ok(Normalized {
            input: ProformaInput {
                revenue,
                purchase_type,
                property_price,
                down_payment_ratio,
                acquisition_cost_ratio,
                currency,
                loan_origin,
                loan,
                credit_loan_rate,
                own_capital_amount,
                initial_furnishing_cost,
                management_fee_ratio,
                property_tax_rate,
                annual_appreciation,
                investment_period_years,
                building_structure,
                building_ratio,
                corporate_tax_rate,
                annual_insurance_cost,
                corporate_setup_cost,
                annual_tax_accountant_fee,
            },
            assumptions,
            warnings: r.warnings,
        }),
        _ => Err(r.errors),
    }
}

fn read_revenue(
    r: &mut FieldReader,
    params: &ProformaParams,
    model: MonetizationModel,
) -> RevenueInputs {
    match model {
        MonetizationModel::ShortTermRental => {
            RevenueInputs::ShortTermRental(ShortTermRentalInputs {
                operating_days_cap: r.amount("operatingDaysCap", params.operating_days_cap.as_ref()),
                occupancy_rate: r.percent("occupancyRate", params.occupancy_rate.as_ref()),
                daily_rate: r.amount("dailyRate", params.daily_rate.as_ref()),
                platform_fee_rate: r.percent("platformFeeRate", params.platform_fee_rate.as_ref()),
                cleaning_fee: r.man_units("cleaningFee", params.cleaning_fee.as_ref()),
                avg_stay_nights: r.amount("avgStayDuration", params.avg_stay_duration.as_ref()),
                avg_guests: r.amount("avgGuests", params.avg_guests.as_ref()),
                base_occupancy_for_fee: r
                    .amount("baseOccupancyForFee", params.base_occupancy_for_fee.as_ref()),
                extra_guest_fee: r.man_units("extraGuestFee", params.extra_guest_fee.as_ref()),
                peak_season_markup: r
                    .percent("peakSeasonMarkup", params.peak_season_markup.as_ref()),
                monthly_utilities: r.man_units("monthlyUtilities", params.monthly_utilities.as_ref()),
            })
        }
        MonetizationModel::PersonalLease => RevenueInputs::PersonalLease(LeaseInputs {
            monthly_rent: r.man_units("monthlyRent", params.monthly_rent.as_ref()),
            vacancy_rate: r.percent("vacancyRate", params.vacancy_rate.as_ref()),
            initial_cost_multiplier: r
                .amount("initialLeaseCostsRatio", params.initial_lease_costs_ratio.as_ref()),
            monthly_utilities: r.man_units("leaseUtilities", params.lease_utilities.as_ref()),
            renewal_frequency_years: r.number(
                "leaseRenewalFeeFrequency",
                params.lease_renewal_fee_frequency.as_ref(),
                FieldKind::Amount,
                false,
                dec!(2),
            ),
            renewal_fee_months: r
                .amount("leaseRenewalFeeAmount", params.lease_renewal_fee_amount.as_ref()),
        }),
        MonetizationModel::CommercialLease => RevenueInputs::CommercialLease(LeaseInputs {
            monthly_rent: r.man_units("monthlyRentCommercial", params.monthly_rent_commercial.as_ref()),
            vacancy_rate: r.percent("vacancyRateCommercial", params.vacancy_rate_commercial.as_ref()),
            initial_cost_multiplier: r.amount(
                "initialLeaseCostsRatioCommercial",
                params.initial_lease_costs_ratio_commercial.as_ref(),
            ),
            monthly_utilities: Decimal::ZERO,
            renewal_frequency_years: Decimal::ZERO,
            renewal_fee_months: Decimal::ZERO,
        }),
    }
}
