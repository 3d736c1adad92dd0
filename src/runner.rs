//! Analysis runner: drives calculators with a common input and collects
//! single- or multi-country results
//!
//! The runner converts the salary input into each jurisdiction's native
//! currency, applies the request's overrides, fans the calculations out in
//! parallel, and (for multi-country comparison) restates the headline
//! numbers in one display currency.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyAmount, CurrencyConverter};
use crate::error::Result;
use crate::model::{EconomicFactors, PensionResult, Person, SalaryProfile};
use crate::registry::CalculatorRegistry;

/// One analysis request: the salary, the countries, and the overrides
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Monthly salary as parsed from the CLI.
    pub salary: CurrencyAmount,
    pub country_codes: Vec<String>,
    pub person: Person,
    pub contribution_start_age: u8,
    pub salary_growth_rate: f64,

    pub inflation_rate: f64,
    pub investment_return_rate: f64,
    pub social_security_return_rate: f64,
    pub retirement_age: Option<u8>,
    pub terminal_age: Option<u8>,

    /// Display currency for the comparison block.
    pub display_currency: String,
}

/// Headline numbers restated in the display currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedHeadline {
    pub currency: String,
    pub monthly_pension: f64,
    pub total_contributions: f64,
    pub total_benefit: f64,
}

/// Result for one country, with the conversion block in multi-country mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryAnalysis {
    pub country_code: String,
    pub country_name: String,
    pub result: PensionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<ConvertedHeadline>,
}

/// Runner over a registry and a currency converter
pub struct AnalysisRunner {
    registry: CalculatorRegistry,
    converter: CurrencyConverter,
}

impl AnalysisRunner {
    pub fn new(registry: CalculatorRegistry, converter: CurrencyConverter) -> Self {
        Self {
            registry,
            converter,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            CalculatorRegistry::with_defaults(),
            CurrencyConverter::with_defaults(),
        )
    }

    pub fn registry(&self) -> &CalculatorRegistry {
        &self.registry
    }

    /// Run the request for every country code, in request order.
    pub fn run(&self, request: &AnalysisRequest) -> Result<Vec<CountryAnalysis>> {
        // Resolve codes up front so an unknown country fails before any work
        for code in &request.country_codes {
            self.registry.get(code)?;
        }
        // Warm the rate cache once; the parallel phase then only reads
        let _ = self.converter.rate_table();

        let multi_country = request.country_codes.len() > 1;
        request
            .country_codes
            .par_iter()
            .map(|code| self.run_country(request, code, multi_country))
            .collect()
    }

    fn run_country(
        &self,
        request: &AnalysisRequest,
        code: &str,
        multi_country: bool,
    ) -> Result<CountryAnalysis> {
        let calculator = self.registry.get(code)?;
        let native = calculator.currency_code().to_string();

        let monthly_native = self
            .converter
            .convert(request.salary.amount, &request.salary.currency, &native)?;
        let salary = SalaryProfile::new(
            monthly_native,
            request.salary_growth_rate,
            request.contribution_start_age,
        )?;
        let economic = EconomicFactors::new(
            request.inflation_rate,
            request.investment_return_rate,
            request.social_security_return_rate,
            &native,
            &request.display_currency,
        )?;

        let result = if request.retirement_age.is_some() || request.terminal_age.is_some() {
            calculator
                .with_ages(request.retirement_age, request.terminal_age)
                .calculate(&request.person, &salary, &economic)
        } else {
            calculator.calculate(&request.person, &salary, &economic)
        }?;

        let converted = if multi_country {
            Some(ConvertedHeadline {
                currency: request.display_currency.clone(),
                monthly_pension: self.converter.convert(
                    result.monthly_pension,
                    &native,
                    &request.display_currency,
                )?,
                total_contributions: self.converter.convert(
                    result.total_contributions,
                    &native,
                    &request.display_currency,
                )?,
                total_benefit: self.converter.convert(
                    result.total_benefit,
                    &native,
                    &request.display_currency,
                )?,
            })
        } else {
            None
        };

        Ok(CountryAnalysis {
            country_code: calculator.country_code().to_string(),
            country_name: calculator.country_name().to_string(),
            result,
            converted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::rates::{default_rates, StaticFetcher};
    use crate::currency::{DailyRateCache, RateFetcher};
    use crate::error::PensionError;
    use crate::model::{EmploymentType, Gender};

    fn offline_runner(tag: &str) -> AnalysisRunner {
        // Offline fetcher chain: conversions run on the baked-in defaults
        let path = std::env::temp_dir().join(format!(
            "pension_runner_{}_{}.json",
            tag,
            std::process::id()
        ));
        let cache = DailyRateCache::new(
            path,
            "CNY",
            vec![Box::new(StaticFetcher::offline("dead")) as Box<dyn RateFetcher>],
        );
        let _ = cache.clear();
        AnalysisRunner::new(
            CalculatorRegistry::with_defaults(),
            CurrencyConverter::new(cache),
        )
    }

    fn request(codes: &[&str]) -> AnalysisRequest {
        AnalysisRequest {
            salary: CurrencyAmount::new(15_000.0, "CNY"),
            country_codes: codes.iter().map(|s| s.to_string()).collect(),
            person: Person::new(1994, Gender::Male, EmploymentType::Employee, 2024).unwrap(),
            contribution_start_age: 30,
            salary_growth_rate: 0.02,
            inflation_rate: 0.02,
            investment_return_rate: 0.07,
            social_security_return_rate: 0.0,
            retirement_age: None,
            terminal_age: None,
            display_currency: "CNY".to_string(),
        }
    }

    #[test]
    fn test_single_country_no_conversion_block() {
        let runner = offline_runner("single");
        let results = runner.run(&request(&["CN"])).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].country_code, "CN");
        assert!(results[0].converted.is_none());
        assert_eq!(results[0].result.currency, "CNY");
    }

    #[test]
    fn test_multi_country_converts_headlines() {
        let runner = offline_runner("multi");
        let results = runner.run(&request(&["CN", "US", "SG"])).unwrap();
        assert_eq!(results.len(), 3);

        for analysis in &results {
            let converted = analysis.converted.as_ref().unwrap();
            assert_eq!(converted.currency, "CNY");
            assert!(converted.monthly_pension > 0.0);
        }
        // The US salary input was converted at the default 0.14 rate
        let us = results.iter().find(|r| r.country_code == "US").unwrap();
        let expected_monthly = 15_000.0 * 0.14;
        assert!((us.result.ledger[0].gross_salary - expected_monthly * 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_country_fails_fast() {
        let runner = offline_runner("unknown");
        match runner.run(&request(&["CN", "XX"])) {
            Err(PensionError::UnknownCountry { code, .. }) => assert_eq!(code, "XX"),
            other => panic!("expected UnknownCountry, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_age_overrides_flow_through() {
        let runner = offline_runner("ages");
        let mut req = request(&["CN"]);
        req.retirement_age = Some(62);
        req.terminal_age = Some(85);
        let results = runner.run(&req).unwrap();
        let result = &results[0].result;
        assert_eq!(result.retirement_age, 62);
        assert_eq!(result.work_years, 32);
        assert_eq!(result.schedule.monthly.len(), (85 - 62) * 12);
    }

    #[test]
    fn test_results_keep_request_order() {
        let runner = offline_runner("order");
        let results = runner.run(&request(&["SG", "CN"])).unwrap();
        assert_eq!(results[0].country_code, "SG");
        assert_eq!(results[1].country_code, "CN");
    }
}
