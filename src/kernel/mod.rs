//! Shared financial kernel: pure functions, no I/O
//!
//! Everything here operates on plain `f64` cash flows and rates; calculators
//! compose these primitives into country-specific projections.

pub mod annuity;
pub mod irr;

pub use annuity::{compound_growth, escalating_annuity, future_value, monthly_annuity};
pub use irr::{irr, npv, payback_age, IrrError};
