//! Exchange-rate table, pluggable API fetchers, and the baked-in fallback

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{PensionError, Result};

/// Schema version written into the cache file.
pub const CACHE_VERSION: &str = "1.0";

/// Date stamped on the baked-in default table.
pub const DEFAULT_RATES_DATE: &str = "2024-06-30";

/// HTTP timeout for rate fetchers.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A dated rate table. Rates are units of each currency per one unit of the
/// base currency; the base currency itself maps to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateTable {
    pub date: NaiveDate,
    pub timestamp: String,
    pub api_source: String,
    pub base_currency: String,
    pub cache_version: String,
    pub expires_at: NaiveDate,
    pub rates: BTreeMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn new(
        date: NaiveDate,
        api_source: &str,
        base_currency: &str,
        rates: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            date,
            timestamp: chrono::Local::now().to_rfc3339(),
            api_source: api_source.to_string(),
            base_currency: base_currency.to_uppercase(),
            cache_version: CACHE_VERSION.to_string(),
            expires_at: date.succ_opt().unwrap_or(date),
            rates,
        }
    }

    /// Rate for a code, case-insensitive.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(&code.to_uppercase()).copied()
    }

    /// Base rate must be 1.0 and every rate positive.
    pub fn validate(&self) -> Result<()> {
        match self.rate(&self.base_currency) {
            Some(r) if (r - 1.0).abs() < 1e-9 => {}
            _ => {
                return Err(PensionError::FetchError(format!(
                    "base currency {} rate is not 1.0",
                    self.base_currency
                )))
            }
        }
        if let Some((code, rate)) = self.rates.iter().find(|(_, r)| **r <= 0.0) {
            return Err(PensionError::FetchError(format!(
                "non-positive rate {} for {}",
                rate, code
            )));
        }
        Ok(())
    }
}

/// A source of full rate maps keyed by the configured base currency.
pub trait RateFetcher: Send + Sync {
    /// Tag written into `api_source`.
    fn name(&self) -> &str;

    /// Full rate map for `base`, or `FetchError`.
    fn fetch(&self, base: &str) -> Result<BTreeMap<String, f64>>;
}

/// exchangerate-api.com `/v4/latest/<BASE>`
pub struct ExchangeRateApiFetcher;

#[derive(Deserialize)]
struct ExchangeRateApiResponse {
    rates: BTreeMap<String, f64>,
}

impl RateFetcher for ExchangeRateApiFetcher {
    fn name(&self) -> &str {
        "ExchangeRate-API"
    }

    fn fetch(&self, base: &str) -> Result<BTreeMap<String, f64>> {
        let url = format!("https://api.exchangerate-api.com/v4/latest/{}", base.to_uppercase());
        fetch_json::<ExchangeRateApiResponse>(&url).map(|r| r.rates)
    }
}

/// exchangeratesapi.io `/v1/latest?base=<BASE>`
pub struct ExchangeRatesApiFetcher;

#[derive(Deserialize)]
struct ExchangeRatesApiResponse {
    rates: BTreeMap<String, f64>,
}

impl RateFetcher for ExchangeRatesApiFetcher {
    fn name(&self) -> &str {
        "ExchangeRatesAPI"
    }

    fn fetch(&self, base: &str) -> Result<BTreeMap<String, f64>> {
        let symbols = crate::currency::supported_codes().join(",");
        let url = format!(
            "https://api.exchangeratesapi.io/v1/latest?base={}&symbols={}",
            base.to_uppercase(),
            symbols
        );
        fetch_json::<ExchangeRatesApiResponse>(&url).map(|r| r.rates)
    }
}

fn fetch_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| PensionError::FetchError(e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .map_err(|e| PensionError::FetchError(e.to_string()))?;
    if !response.status().is_success() {
        warn!("rate fetch from {} returned {}", url, response.status());
        return Err(PensionError::FetchError(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }
    response
        .json::<T>()
        .map_err(|e| PensionError::FetchError(e.to_string()))
}

/// Fixed-map fetcher for tests and `--test-plugins`. Configure with an empty
/// map to simulate a dead network.
pub struct StaticFetcher {
    name: String,
    rates: BTreeMap<String, f64>,
}

impl StaticFetcher {
    pub fn new(name: &str, rates: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            rates,
        }
    }

    /// A fetcher that always fails, for exercising the fallback chain.
    pub fn offline(name: &str) -> Self {
        Self::new(name, BTreeMap::new())
    }
}

impl RateFetcher for StaticFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, _base: &str) -> Result<BTreeMap<String, f64>> {
        if self.rates.is_empty() {
            return Err(PensionError::FetchError(format!("{}: offline", self.name)));
        }
        Ok(self.rates.clone())
    }
}

/// Baked-in CNY-based rates used when every fetcher fails.
pub fn default_rates() -> BTreeMap<String, f64> {
    [
        ("CNY", 1.0),
        ("USD", 0.14),
        ("EUR", 0.13),
        ("GBP", 0.11),
        ("JPY", 20.0),
        ("HKD", 1.1),
        ("SGD", 0.19),
        ("AUD", 0.21),
        ("CAD", 0.19),
        ("TWD", 4.3),
        ("NOK", 1.5),
        ("SEK", 1.4),
        ("DKK", 1.0),
        ("CHF", 0.12),
        ("INR", 11.5),
        ("KRW", 180.0),
        ("RUB", 12.5),
        ("BRL", 0.7),
    ]
    .iter()
    .map(|(c, r)| (c.to_string(), *r))
    .collect()
}

/// The dated default table, tagged `source = "default"`.
pub fn default_rate_table() -> ExchangeRateTable {
    let date = DEFAULT_RATES_DATE
        .parse()
        .expect("default rates date is a valid ISO date");
    ExchangeRateTable::new(date, "default", "CNY", default_rates())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_valid() {
        let table = default_rate_table();
        table.validate().unwrap();
        assert_eq!(table.api_source, "default");
        assert_eq!(table.rate("CNY"), Some(1.0));
        assert_eq!(table.rates.len(), 18);
    }

    #[test]
    fn test_rate_lookup_case_insensitive() {
        let table = default_rate_table();
        assert_eq!(table.rate("usd"), table.rate("USD"));
    }

    #[test]
    fn test_validate_rejects_bad_base() {
        let mut rates = default_rates();
        rates.insert("CNY".to_string(), 2.0);
        let table = ExchangeRateTable::new(
            "2024-06-30".parse().unwrap(),
            "mock",
            "CNY",
            rates,
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive() {
        let mut rates = default_rates();
        rates.insert("USD".to_string(), 0.0);
        let table = ExchangeRateTable::new(
            "2024-06-30".parse().unwrap(),
            "mock",
            "CNY",
            rates,
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_static_fetcher() {
        let f = StaticFetcher::new("mock", default_rates());
        assert_eq!(f.name(), "mock");
        assert!(f.fetch("CNY").is_ok());
        assert!(StaticFetcher::offline("dead").fetch("CNY").is_err());
    }
}
