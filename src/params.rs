//! Per-year constant tables with a documented extrapolation policy
//!
//! Jurisdiction rules change by calendar year (contribution limits, wage
//! bases, BHS/FRS schedules). Rather than hard-coding each year at the call
//! site, calculators hold `YearSeries` tables: known years are exact, later
//! years extrapolate at a configured growth rate (inflation-indexed for
//! amounts, zero growth for rates), and requests outside the horizon fail
//! with `ConfigError` naming the nearest year present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PensionError, Result};

/// Years past the last known entry that a series may be extrapolated.
pub const EXTRAPOLATION_HORIZON_YEARS: i32 = 80;

/// A calendar-year-keyed series of constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSeries {
    values: BTreeMap<i32, f64>,
    /// Annual growth applied past the last known year (0.0 for rates).
    growth_rate: f64,
}

impl YearSeries {
    /// Build from explicit (year, value) pairs and a forward growth rate.
    pub fn new(entries: &[(i32, f64)], growth_rate: f64) -> Self {
        Self {
            values: entries.iter().copied().collect(),
            growth_rate,
        }
    }

    /// A series that holds one value for every year (rates that do not move).
    pub fn constant(year: i32, value: f64) -> Self {
        Self::new(&[(year, value)], 0.0)
    }

    /// First year with a known entry.
    pub fn first_year(&self) -> Option<i32> {
        self.values.keys().next().copied()
    }

    /// Last year with a known entry.
    pub fn last_year(&self) -> Option<i32> {
        self.values.keys().next_back().copied()
    }

    /// Value for `year`: exact when known, extrapolated at the growth rate
    /// past the last known year, `ConfigError` outside the horizon or before
    /// the first known year.
    pub fn get(&self, year: i32) -> Result<f64> {
        if let Some(v) = self.values.get(&year) {
            return Ok(*v);
        }
        let first = self.first_year().ok_or(PensionError::ConfigError {
            year,
            nearest: 0,
        })?;
        let last = self.last_year().unwrap_or(first);

        if year < first {
            return Err(PensionError::ConfigError { year, nearest: first });
        }
        if year > last + EXTRAPOLATION_HORIZON_YEARS {
            return Err(PensionError::ConfigError { year, nearest: last });
        }
        if year > last {
            let base = self.values[&last];
            return Ok(base * (1.0 + self.growth_rate).powi(year - last));
        }
        // Gap between known years: carry the most recent known value forward.
        let prev = self
            .values
            .range(..=year)
            .next_back()
            .map(|(_, v)| *v)
            .expect("range is non-empty, first <= year");
        Ok(prev)
    }

    /// Growth rate used past the last known year.
    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Replace the forward growth rate (used when the simulation overrides
    /// inflation).
    pub fn set_growth_rate(&mut self, rate: f64) {
        self.growth_rate = rate;
    }
}

/// A value banded by age, e.g. contribution rates or allocation fractions.
/// Bands are `(min_age, max_age)` inclusive and must not overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeBanded<T: Clone> {
    bands: Vec<(u8, u8, T)>,
}

impl<T: Clone> AgeBanded<T> {
    pub fn new(bands: Vec<(u8, u8, T)>) -> Self {
        Self { bands }
    }

    /// Value for `age`; falls back to the last band when past every range.
    pub fn get(&self, age: u8) -> &T {
        for (lo, hi, v) in &self.bands {
            if age >= *lo && age <= *hi {
                return v;
            }
        }
        &self.bands.last().expect("at least one band").2
    }
}
