//! Country-specific calculators
//!
//! Each module encodes one jurisdiction's contribution, tax, and benefit
//! rules behind the common `PensionCalculator` trait. Rule constants live in
//! per-country params structs built on `YearSeries`/`AgeBanded` tables.

pub mod china;
pub mod japan;
pub mod singapore;
pub mod tax;
pub mod taiwan;
pub mod uk;
pub mod usa;
