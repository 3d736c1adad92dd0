//! United Kingdom: National Insurance bands and the new State Pension
//!
//! Employee NI applies the main rate between the primary threshold and the
//! upper earnings limit and the reduced rate above it. The benefit is the
//! flat weekly State Pension scaled by qualifying years over 35.

use serde::{Deserialize, Serialize};

use crate::countries::tax::ProgressiveTax;
use crate::error::{PensionError, Result};
use crate::kernel;
use crate::model::{
    EconomicFactors, PensionResult, Person, RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::YearSeries;
use crate::registry::PensionCalculator;

/// Rule constants for the UK calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UkParams {
    /// NI primary threshold (annual) by year.
    pub ni_primary_threshold: YearSeries,
    /// NI upper earnings limit (annual) by year.
    pub ni_upper_limit: YearSeries,
    pub ni_main_rate: f64,
    pub ni_upper_rate: f64,
    /// Employer NI rate above the secondary threshold.
    pub ni_employer_rate: f64,
    pub ni_secondary_threshold: YearSeries,

    /// Full new State Pension, weekly, by year.
    pub state_pension_weekly: YearSeries,
    pub qualifying_years_full: u32,

    pub personal_allowance: YearSeries,
    pub tax_brackets: ProgressiveTax,

    pub retirement_age: u8,
    pub terminal_age: u8,
}

impl Default for UkParams {
    fn default() -> Self {
        Self {
            ni_primary_threshold: YearSeries::new(&[(2024, 12_570.0)], 0.02),
            ni_upper_limit: YearSeries::new(&[(2024, 50_270.0)], 0.02),
            ni_main_rate: 0.12,
            ni_upper_rate: 0.02,
            ni_employer_rate: 0.138,
            ni_secondary_threshold: YearSeries::new(&[(2024, 9_100.0)], 0.02),
            state_pension_weekly: YearSeries::new(&[(2024, 221.20)], 0.02),
            qualifying_years_full: 35,
            personal_allowance: YearSeries::new(&[(2024, 12_570.0)], 0.02),
            tax_brackets: ProgressiveTax::new(vec![
                (37_700.0, 0.20),
                (112_570.0, 0.40),
                (f64::INFINITY, 0.45),
            ]),
            retirement_age: 68,
            terminal_age: 90,
        }
    }
}

impl UkParams {
    /// Employee NI on annual earnings.
    pub fn employee_ni(&self, gross: f64, year: i32) -> Result<f64> {
        let lower = self.ni_primary_threshold.get(year)?;
        let upper = self.ni_upper_limit.get(year)?;
        let main_band = (gross.min(upper) - lower).max(0.0);
        let upper_band = (gross - upper).max(0.0);
        Ok(main_band * self.ni_main_rate + upper_band * self.ni_upper_rate)
    }

    /// Employer NI on annual earnings.
    pub fn employer_ni(&self, gross: f64, year: i32) -> Result<f64> {
        let threshold = self.ni_secondary_threshold.get(year)?;
        Ok((gross - threshold).max(0.0) * self.ni_employer_rate)
    }
}

/// UK calculator
pub struct UkCalculator {
    params: UkParams,
}

impl UkCalculator {
    pub fn new(params: UkParams) -> Self {
        Self { params }
    }
}

impl Default for UkCalculator {
    fn default() -> Self {
        Self::new(UkParams::default())
    }
}

impl PensionCalculator for UkCalculator {
    fn country_code(&self) -> &str {
        "UK"
    }

    fn country_name(&self) -> &str {
        "United Kingdom"
    }

    fn currency_code(&self) -> &str {
        "GBP"
    }

    fn retirement_age(&self, _person: &Person) -> u8 {
        self.params.retirement_age
    }

    fn with_ages(&self, retirement_age: Option<u8>, terminal_age: Option<u8>) -> Box<dyn PensionCalculator> {
        let mut params = self.params.clone();
        if let Some(r) = retirement_age {
            params.retirement_age = r;
        }
        if let Some(t) = terminal_age {
            params.terminal_age = t;
        }
        Box::new(Self::new(params))
    }

    fn calculate(
        &self,
        person: &Person,
        salary: &SalaryProfile,
        economic: &EconomicFactors,
    ) -> Result<PensionResult> {
        let p = &self.params;
        let retirement_age = self.retirement_age(person);
        let start_age = salary.contribution_start_age;
        if start_age >= retirement_age {
            return Err(PensionError::InvalidProfile(format!(
                "contribution start age {} is at or past retirement age {}",
                start_age, retirement_age
            )));
        }
        let work_years = (retirement_age - start_age) as u32;
        let start_year = person.year_at_age(start_age);

        let mut employee_total = 0.0;
        let mut employer_total = 0.0;
        let mut ledger = Vec::with_capacity(work_years as usize);
        let mut yearly_employee_outflow = Vec::with_capacity(work_years as usize);

        for offset in 0..work_years {
            let year = start_year + offset as i32;
            let age = start_age + offset as u8;
            let gross = salary.annual_salary_at(offset);
            let mut entry = YearLedgerEntry::new(year, age, gross);

            entry.contribution_base = gross.min(p.ni_upper_limit.get(year)?);
            entry.employee.pension = p.employee_ni(gross, year)?;
            entry.employer.pension = p.employer_ni(gross, year)?;

            entry.taxable_income = (gross - p.personal_allowance.get(year)?).max(0.0);
            entry.tax = p.tax_brackets.tax(entry.taxable_income);
            entry.net_income = gross - entry.employee.total() - entry.tax;

            employee_total += entry.employee.total();
            employer_total += entry.employer.total();
            yearly_employee_outflow.push(entry.employee.total());
            ledger.push(entry);
        }

        // Flat State Pension scaled by qualifying years; the weekly amount
        // extrapolates at the simulation's inflation rate
        let retirement_year = person.year_at_age(retirement_age);
        let mut pension_series = p.state_pension_weekly.clone();
        pension_series.set_growth_rate(economic.inflation_rate);
        let weekly = pension_series.get(retirement_year)?;
        let coverage = (work_years as f64 / p.qualifying_years_full as f64).min(1.0);
        let monthly_pension = weekly * 52.0 / 12.0 * coverage;

        let retirement_years = (p.terminal_age - retirement_age) as u32;
        let schedule = RetirementSchedule::level(
            retirement_age,
            monthly_pension,
            retirement_years as usize * 12,
        );
        let total_benefit = schedule.total();
        let annual_pension = monthly_pension * 12.0;

        let mut cash_flows = yearly_employee_outflow.iter().map(|c| -c).collect::<Vec<_>>();
        cash_flows.extend(std::iter::repeat(annual_pension).take(retirement_years as usize));
        let irr = kernel::irr(&cash_flows).ok();

        let points = retirement_years as usize + 1;
        let cumulative_contrib = vec![employee_total; points];
        let cumulative_benefit: Vec<f64> =
            (0..points).map(|i| annual_pension * i as f64).collect();
        let payback_age =
            kernel::payback_age(retirement_age, &cumulative_contrib, &cumulative_benefit);

        Ok(PensionResult {
            currency: self.currency_code().to_string(),
            retirement_age,
            work_years,
            monthly_pension,
            employee_contributions: employee_total,
            employer_contributions: employer_total,
            total_contributions: employee_total + employer_total,
            total_benefit,
            roi: PensionResult::compute_roi(total_benefit, employee_total),
            irr,
            payback_age,
            ledger,
            schedule,
        })
    }
}
