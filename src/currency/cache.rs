//! Daily rate cache with strict one-day validity and atomic replace
//!
//! The cache file is the only shared mutable resource in the system. Writers
//! produce `exchange_rates.json.tmp` and rename it over the real file so
//! concurrent readers always see a complete table.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::Serialize;

use super::rates::{
    default_rate_table, ExchangeRateApiFetcher, ExchangeRateTable, ExchangeRatesApiFetcher,
    RateFetcher, CACHE_VERSION,
};

/// Default on-disk location of the cache file.
pub const DEFAULT_CACHE_PATH: &str = "cache/exchange_rates.json";

/// Summary of the cache file state, for CLI diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub exists: bool,
    pub path: String,
    pub date: Option<NaiveDate>,
    pub api_source: Option<String>,
    pub currency_count: usize,
    pub valid_today: bool,
}

/// Daily-cached rate source with a fetcher fallback chain
pub struct DailyRateCache {
    cache_path: PathBuf,
    base_currency: String,
    fetchers: Vec<Box<dyn RateFetcher>>,
}

impl DailyRateCache {
    pub fn new(cache_path: impl Into<PathBuf>, base_currency: &str, fetchers: Vec<Box<dyn RateFetcher>>) -> Self {
        Self {
            cache_path: cache_path.into(),
            base_currency: base_currency.to_uppercase(),
            fetchers,
        }
    }

    /// Default path, CNY base, and the two public API fetchers in order.
    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_CACHE_PATH,
            "CNY",
            vec![
                Box::new(ExchangeRateApiFetcher) as Box<dyn RateFetcher>,
                Box::new(ExchangeRatesApiFetcher) as Box<dyn RateFetcher>,
            ],
        )
    }

    /// The rate table in effect: today's cache if present, otherwise the
    /// first fetcher that succeeds (cached on the way out), otherwise the
    /// baked-in defaults tagged `source = "default"`.
    pub fn rates(&self) -> ExchangeRateTable {
        let today = Local::now().date_naive();

        if let Some(table) = self.load_valid_cache(today) {
            info!("using cached exchange rates dated {}", table.date);
            return table;
        }

        for fetcher in &self.fetchers {
            match fetcher.fetch(&self.base_currency) {
                Ok(rates) => {
                    let table = ExchangeRateTable::new(today, fetcher.name(), &self.base_currency, rates);
                    if let Err(e) = table.validate() {
                        warn!("{} returned an invalid table: {}", fetcher.name(), e);
                        continue;
                    }
                    info!("fetched {} rates from {}", table.rates.len(), fetcher.name());
                    if let Err(e) = self.save_atomic(&table) {
                        warn!("could not write rate cache: {}", e);
                    }
                    return table;
                }
                Err(e) => {
                    warn!("rate fetcher {} failed: {}", fetcher.name(), e);
                }
            }
        }

        warn!("all rate fetchers failed, falling back to default rates");
        default_rate_table()
    }

    /// Cached table if the file parses and its date is `today`.
    fn load_valid_cache(&self, today: NaiveDate) -> Option<ExchangeRateTable> {
        let content = fs::read_to_string(&self.cache_path).ok()?;
        let table: ExchangeRateTable = match serde_json::from_str(&content) {
            Ok(t) => t,
            Err(e) => {
                warn!("rate cache is corrupt, ignoring: {}", e);
                return None;
            }
        };
        if table.date != today {
            info!("rate cache dated {} is stale (today {})", table.date, today);
            return None;
        }
        if table.cache_version != CACHE_VERSION {
            warn!("rate cache version {} unsupported", table.cache_version);
            return None;
        }
        table.validate().ok()?;
        Some(table)
    }

    /// Write `<path>.tmp` then rename over the cache file.
    fn save_atomic(&self, table: &ExchangeRateTable) -> std::io::Result<()> {
        if let Some(dir) = self.cache_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.cache_path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(table).expect("rate table serializes");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.cache_path)?;
        info!("rate cache written to {}", self.cache_path.display());
        Ok(())
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// State of the cache file for diagnostics.
    pub fn cache_info(&self) -> CacheInfo {
        let today = Local::now().date_naive();
        let parsed = fs::read_to_string(&self.cache_path)
            .ok()
            .and_then(|c| serde_json::from_str::<ExchangeRateTable>(&c).ok());
        CacheInfo {
            exists: self.cache_path.exists(),
            path: self.cache_path.display().to_string(),
            date: parsed.as_ref().map(|t| t.date),
            api_source: parsed.as_ref().map(|t| t.api_source.clone()),
            currency_count: parsed.as_ref().map(|t| t.rates.len()).unwrap_or(0),
            valid_today: parsed.map(|t| t.date == today).unwrap_or(false),
        }
    }

    /// Remove the cache file (used by tests and `--test-plugins`).
    pub fn clear(&self) -> std::io::Result<()> {
        if self.cache_path.exists() {
            fs::remove_file(&self.cache_path)?;
        }
        Ok(())
    }
}
