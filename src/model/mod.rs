//! Common data model shared by every country calculator

pub mod person;
pub mod result;

pub use person::{EconomicFactors, EmploymentType, Gender, Person, SalaryProfile};
pub use result::{ContributionLines, PensionResult, RetirementSchedule, YearLedgerEntry};
