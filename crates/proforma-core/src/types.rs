use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ProformaResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Ratios and percentages reported to investors (e.g. LTV of 80 = 80%).
pub type Ratio = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    JPY,
    TWD,
    USD,
    EUR,
    GBP,
    HKD,
    SGD,
    #[serde(untagged)]
    Other(String),
}

impl Currency {
    /// Parse an ISO-style code, case-insensitive. Unknown codes are kept verbatim.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "JPY" => Currency::JPY,
            "TWD" => Currency::TWD,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "GBP" => Currency::GBP,
            "HKD" => Currency::HKD,
            "SGD" => Currency::SGD,
            other => Currency::Other(other.to_string()),
        }
    }
}

/// Base and display currency for one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub display: Currency,
    /// Display units per one base unit
    pub exchange_rate: Decimal,
}

impl CurrencyPair {
    /// Convert a base amount to the display currency, keeping both.
    pub fn amount(&self, base: Money) -> ProformaResult<DualAmount> {
        let display = base
            .checked_mul(self.exchange_rate)
            .ok_or_else(|| crate::checked::overflow("display currency conversion"))?;
        Ok(DualAmount { base, display })
    }
}

/// A monetary figure in the base currency and converted to the display currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualAmount {
    pub base: Money,
    pub display: Money,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
