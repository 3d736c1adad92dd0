//! Input descriptors: person, salary trajectory, macro-economic assumptions

use serde::{Deserialize, Serialize};

use crate::currency::is_supported_currency;
use crate::error::{PensionError, Result};

/// Gender of the member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Employment category; drives retirement ages in some jurisdictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    Employee,
    CivilServant,
    SelfEmployed,
    Farmer,
}

/// Immutable person descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Person {
    pub birth_year: i32,
    pub gender: Gender,
    pub employment_type: EmploymentType,
    pub start_work_year: i32,
}

impl Person {
    /// Create a person, enforcing start-work year >= birth year + 16.
    pub fn new(
        birth_year: i32,
        gender: Gender,
        employment_type: EmploymentType,
        start_work_year: i32,
    ) -> Result<Self> {
        if start_work_year < birth_year + 16 {
            return Err(PensionError::InvalidProfile(format!(
                "start work year {} is before age 16 (born {})",
                start_work_year, birth_year
            )));
        }
        Ok(Self {
            birth_year,
            gender,
            employment_type,
            start_work_year,
        })
    }

    /// Attained age in a given calendar year.
    pub fn age_in(&self, year: i32) -> u8 {
        (year - self.birth_year).max(0) as u8
    }

    /// Calendar year in which the person reaches `age`.
    pub fn year_at_age(&self, age: u8) -> i32 {
        self.birth_year + age as i32
    }
}

/// Salary trajectory: monthly salary at career start growing geometrically
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SalaryProfile {
    /// Monthly salary in the first contribution year (native currency).
    pub monthly_salary: f64,
    /// Annual nominal growth rate.
    pub annual_growth_rate: f64,
    /// Age at which contributions start. No default: the caller must decide.
    pub contribution_start_age: u8,
}

impl SalaryProfile {
    pub fn new(monthly_salary: f64, annual_growth_rate: f64, contribution_start_age: u8) -> Result<Self> {
        if monthly_salary < 0.0 || !monthly_salary.is_finite() {
            return Err(PensionError::InvalidProfile(format!(
                "monthly salary {} must be a non-negative number",
                monthly_salary
            )));
        }
        if !(-0.5..=1.0).contains(&annual_growth_rate) {
            return Err(PensionError::InvalidProfile(format!(
                "salary growth rate {} outside [-0.5, 1.0]",
                annual_growth_rate
            )));
        }
        Ok(Self {
            monthly_salary,
            annual_growth_rate,
            contribution_start_age,
        })
    }

    /// Monthly salary in working year `years_from_start` (0-indexed).
    pub fn monthly_salary_at(&self, years_from_start: u32) -> f64 {
        self.monthly_salary * (1.0 + self.annual_growth_rate).powi(years_from_start as i32)
    }

    /// Gross annual salary in working year `years_from_start`.
    pub fn annual_salary_at(&self, years_from_start: u32) -> f64 {
        self.monthly_salary_at(years_from_start) * 12.0
    }
}

/// Macro-economic assumptions and currency context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicFactors {
    pub inflation_rate: f64,
    pub investment_return_rate: f64,
    /// Notional interest credited on social-security individual accounts.
    pub social_security_return_rate: f64,
    /// Currency the salary input is denominated in.
    pub base_currency: String,
    /// Currency used for cross-jurisdiction display.
    pub display_currency: String,
}

impl EconomicFactors {
    pub fn new(
        inflation_rate: f64,
        investment_return_rate: f64,
        social_security_return_rate: f64,
        base_currency: &str,
        display_currency: &str,
    ) -> Result<Self> {
        for (name, rate) in [
            ("inflation rate", inflation_rate),
            ("investment return rate", investment_return_rate),
            ("social security return rate", social_security_return_rate),
        ] {
            if !(-0.5..=1.0).contains(&rate) {
                return Err(PensionError::InvalidProfile(format!(
                    "{} {} outside [-0.5, 1.0]",
                    name, rate
                )));
            }
        }
        for code in [base_currency, display_currency] {
            if !is_supported_currency(code) {
                return Err(PensionError::InvalidProfile(format!(
                    "unsupported currency code '{}'",
                    code
                )));
            }
        }
        Ok(Self {
            inflation_rate,
            investment_return_rate,
            social_security_return_rate,
            base_currency: base_currency.to_uppercase(),
            display_currency: display_currency.to_uppercase(),
        })
    }

    /// Defaults used by the CLI when no overrides are given: 2% inflation,
    /// 7% investment return, no notional crediting, CNY in and out.
    pub fn standard() -> Self {
        Self {
            inflation_rate: 0.02,
            investment_return_rate: 0.07,
            social_security_return_rate: 0.0,
            base_currency: "CNY".to_string(),
            display_currency: "CNY".to_string(),
        }
    }

    /// Same assumptions re-based into another currency pair.
    pub fn with_currencies(&self, base: &str, display: &str) -> Self {
        Self {
            base_currency: base.to_uppercase(),
            display_currency: display.to_uppercase(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_person() -> Person {
        Person::new(1994, Gender::Male, EmploymentType::Employee, 2024).unwrap()
    }

    #[test]
    fn test_person_age_math() {
        let p = test_person();
        assert_eq!(p.age_in(2024), 30);
        assert_eq!(p.year_at_age(60), 2054);
    }

    #[test]
    fn test_person_rejects_child_labor() {
        let r = Person::new(2010, Gender::Female, EmploymentType::Employee, 2024);
        assert!(r.is_err());
    }

    #[test]
    fn test_salary_growth() {
        let s = SalaryProfile::new(15_000.0, 0.02, 30).unwrap();
        assert_eq!(s.monthly_salary_at(0), 15_000.0);
        assert!((s.annual_salary_at(1) - 15_000.0 * 1.02 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_economic_factors_validation() {
        assert!(EconomicFactors::new(0.02, 0.07, 0.0, "CNY", "USD").is_ok());
        assert!(EconomicFactors::new(1.5, 0.07, 0.0, "CNY", "USD").is_err());
        assert!(EconomicFactors::new(0.02, 0.07, 0.0, "XXX", "USD").is_err());
    }
}
