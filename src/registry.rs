//! Calculator capability trait and the country-code plugin registry
//!
//! The registry is built once at startup and immutable afterwards; lookups
//! are case-insensitive on the two-letter country code.

use std::collections::BTreeMap;

use crate::error::{PensionError, Result};
use crate::model::{EconomicFactors, PensionResult, Person, SalaryProfile, YearLedgerEntry};

/// Capability set every country calculator implements.
pub trait PensionCalculator: Send + Sync {
    /// Two-letter country code ("CN", "US", ...).
    fn country_code(&self) -> &str;

    /// Human-readable country name.
    fn country_name(&self) -> &str;

    /// ISO code of the jurisdiction's native currency.
    fn currency_code(&self) -> &str;

    /// Statutory retirement age for this person.
    fn retirement_age(&self, person: &Person) -> u8;

    /// Full projection: ledger, schedule, and summary metrics.
    fn calculate(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        economic: &EconomicFactors,
    ) -> Result<PensionResult>;

    /// Year-by-year ledger only.
    fn annual_ledger(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        economic: &EconomicFactors,
    ) -> Result<Vec<YearLedgerEntry>> {
        Ok(self.calculate(person, salary, economic)?.ledger)
    }

    /// A copy of this calculator with the retirement age and/or the
    /// modeling terminal age overridden.
    fn with_ages(&self, retirement_age: Option<u8>, terminal_age: Option<u8>) -> Box<dyn PensionCalculator>;
}

/// Process-lifetime mapping from country code to calculator
pub struct CalculatorRegistry {
    calculators: BTreeMap<String, Box<dyn PensionCalculator>>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self {
            calculators: BTreeMap::new(),
        }
    }

    /// Registry with every built-in calculator under its own code.
    pub fn with_defaults() -> Self {
        use crate::countries;

        let mut registry = Self::new();
        let calculators: Vec<Box<dyn PensionCalculator>> = vec![
            Box::new(countries::china::ChinaCalculator::default()),
            Box::new(countries::usa::UsaCalculator::default()),
            Box::new(countries::singapore::SingaporeCalculator::default()),
            Box::new(countries::taiwan::TaiwanCalculator::default()),
            Box::new(countries::japan::JapanCalculator::default()),
            Box::new(countries::uk::UkCalculator::default()),
        ];
        for calc in calculators {
            let code = calc.country_code().to_string();
            registry
                .register(&code, calc)
                .expect("built-in calculators have unique codes");
        }
        registry
    }

    /// Register a calculator under `code`. Duplicate codes fail.
    pub fn register(&mut self, code: &str, calculator: Box<dyn PensionCalculator>) -> Result<()> {
        let key = code.to_uppercase();
        if self.calculators.contains_key(&key) {
            return Err(PensionError::DuplicateRegistration(key));
        }
        self.calculators.insert(key, calculator);
        Ok(())
    }

    /// Look up a calculator, case-insensitive.
    pub fn get(&self, code: &str) -> Result<&dyn PensionCalculator> {
        let key = code.to_uppercase();
        self.calculators
            .get(&key)
            .map(|c| c.as_ref())
            .ok_or_else(|| PensionError::UnknownCountry {
                code: key,
                available: self.list_codes(),
            })
    }

    /// Registered codes in sorted order.
    pub fn list_codes(&self) -> Vec<String> {
        self.calculators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_codes() {
        let registry = CalculatorRegistry::with_defaults();
        assert_eq!(
            registry.list_codes(),
            vec!["CN", "JP", "SG", "TW", "UK", "US"]
        );
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = CalculatorRegistry::with_defaults();
        assert_eq!(registry.get("cn").unwrap().country_code(), "CN");
        assert_eq!(registry.get("Sg").unwrap().currency_code(), "SGD");
    }

    #[test]
    fn test_unknown_country_lists_available() {
        let registry = CalculatorRegistry::with_defaults();
        match registry.get("XX") {
            Err(PensionError::UnknownCountry { code, available }) => {
                assert_eq!(code, "XX");
                assert_eq!(available.len(), 6);
            }
            other => panic!("expected UnknownCountry, got {:?}", other.map(|c| c.country_code().to_string())),
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = CalculatorRegistry::with_defaults();
        let dup = Box::new(crate::countries::china::ChinaCalculator::default());
        match registry.register("cn", dup) {
            Err(PensionError::DuplicateRegistration(code)) => assert_eq!(code, "CN"),
            other => panic!("expected DuplicateRegistration, got {:?}", other),
        }
    }
}
