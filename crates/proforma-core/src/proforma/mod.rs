//! Real-estate investment proforma: normalise a request, model revenue and
//! financing, walk the holding period year by year, and grade the deal.

pub mod assumptions;
pub mod engine;
pub mod financing;
pub mod input;
pub mod metrics;
pub mod projection;
pub mod revenue;
pub mod schema;

pub use assumptions::{HealthThresholds, ProformaAssumptions, Threshold};
pub use engine::{compute_proforma, run_proforma, ProformaReport};
pub use financing::{amortization_schedule, AmortizationSchedule, AmortizationState};
pub use schema::{normalize, validate_params, ProformaParams, MAX_YEARS};
