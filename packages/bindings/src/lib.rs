use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use proforma_core::proforma::{
    amortization_schedule as build_schedule, compute_proforma, ProformaParams, MAX_YEARS,
};
use proforma_core::time_value::{irr_bisection, BisectionSettings};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmortizationRequest {
    principal: Decimal,
    /// Decimal fraction, e.g. 0.015
    annual_rate: Decimal,
    term_years: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IrrRequest {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    settings: BisectionSettings,
}

// ---------------------------------------------------------------------------
// Proforma
// ---------------------------------------------------------------------------

/// Full proforma from the camelCase request bag. Validation failures are
/// thrown with every message joined by `; `.
#[napi(js_name = "computeProforma")]
pub fn compute_proforma_json(input_json: String) -> NapiResult<String> {
    let params: ProformaParams = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = compute_proforma(&params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let request: AmortizationRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if request.term_years == 0 {
        return Err(to_napi_error("termYears must be at least 1"));
    }
    if request.term_years > MAX_YEARS {
        return Err(to_napi_error(format!("termYears must not exceed {MAX_YEARS}")));
    }
    let schedule = build_schedule(request.principal, request.annual_rate, request.term_years * 12)
        .map_err(to_napi_error)?;
    serde_json::to_string(&schedule).map_err(to_napi_error)
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let request: IrrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let solution = irr_bisection(&request.cash_flows, &request.settings).map_err(to_napi_error)?;
    serde_json::to_string(&solution).map_err(to_napi_error)
}
