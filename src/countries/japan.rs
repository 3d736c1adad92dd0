//! Japan: national pension plus employees' pension insurance
//!
//! Contributions apply the 9.15% employee/employer split to the standard
//! monthly remuneration (clamped to the statutory band). The benefit is the
//! flat national-pension tier scaled by contribution years plus the
//! earnings-related accrual (average remuneration x years x 0.5481%).

use serde::{Deserialize, Serialize};

use crate::countries::tax::ProgressiveTax;
use crate::error::{PensionError, Result};
use crate::kernel;
use crate::model::{
    EconomicFactors, PensionResult, Person, RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::YearSeries;
use crate::registry::PensionCalculator;

/// Rule constants for the Japan calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JapanParams {
    pub ep_employee_rate: f64,
    pub ep_employer_rate: f64,
    /// Standard monthly remuneration band (floor, ceiling) by year.
    pub remuneration_floor: YearSeries,
    pub remuneration_ceiling: YearSeries,

    /// Flat national-pension monthly amount at full (40-year) coverage.
    pub national_pension_full: YearSeries,
    pub full_coverage_years: u32,
    /// Employees'-pension accrual per contribution year.
    pub ep_accrual_rate: f64,

    /// Basic deduction plus the employment-income deduction.
    pub deductions: f64,
    pub tax_brackets: ProgressiveTax,

    pub retirement_age: u8,
    pub terminal_age: u8,
}

impl Default for JapanParams {
    fn default() -> Self {
        Self {
            ep_employee_rate: 0.0915,
            ep_employer_rate: 0.0915,
            remuneration_floor: YearSeries::new(&[(2024, 98_000.0)], 0.02),
            remuneration_ceiling: YearSeries::new(&[(2024, 650_000.0)], 0.02),
            national_pension_full: YearSeries::new(&[(2024, 65_000.0)], 0.02),
            full_coverage_years: 40,
            ep_accrual_rate: 0.005481,
            deductions: 480_000.0 + 550_000.0,
            tax_brackets: ProgressiveTax::new(vec![
                (1_950_000.0, 0.05),
                (3_300_000.0, 0.10),
                (6_950_000.0, 0.20),
                (9_000_000.0, 0.23),
                (18_000_000.0, 0.33),
                (40_000_000.0, 0.40),
                (f64::INFINITY, 0.45),
            ]),
            retirement_age: 65,
            terminal_age: 90,
        }
    }
}

/// Japan calculator
pub struct JapanCalculator {
    params: JapanParams,
}

impl JapanCalculator {
    pub fn new(params: JapanParams) -> Self {
        Self { params }
    }
}

impl Default for JapanCalculator {
    fn default() -> Self {
        Self::new(JapanParams::default())
    }
}

impl PensionCalculator for JapanCalculator {
    fn country_code(&self) -> &str {
        "JP"
    }

    fn country_name(&self) -> &str {
        "Japan"
    }

    fn currency_code(&self) -> &str {
        "JPY"
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

        let mut remuneration_sum = 0.0;
        let mut employee_total = 0.0;
        let mut employer_total = 0.0;
        let mut ledger = Vec::with_capacity(work_years as usize);
        let mut yearly_employee_outflow = Vec::with_capacity(work_years as usize);

        for offset in 0..work_years {
            let year = start_year + offset as i32;
            let age = start_age + offset as u8;
            let monthly = salary.monthly_salary_at(offset);
            let gross = monthly * 12.0;
            let mut entry = YearLedgerEntry::new(year, age, gross);

            let remuneration = monthly.clamp(
                p.remuneration_floor.get(year)?,
                p.remuneration_ceiling.get(year)?,
            );
            entry.contribution_base = remuneration * 12.0;
            entry.employee.pension = remuneration * p.ep_employee_rate * 12.0;
            entry.employer.pension = remuneration * p.ep_employer_rate * 12.0;

            entry.taxable_income = (gross - entry.employee.pension - p.deductions).max(0.0);
            entry.tax = p.tax_brackets.tax(entry.taxable_income);
            entry.net_income = gross - entry.employee.total() - entry.tax;

            remuneration_sum += remuneration;
            employee_total += entry.employee.total();
            employer_total += entry.employer.total();
            yearly_employee_outflow.push(entry.employee.total());
            ledger.push(entry);
        }

        // Flat tier scaled by coverage, plus the earnings-related tier; the
        // flat amount extrapolates at the simulation's inflation rate
        let coverage = (work_years as f64 / p.full_coverage_years as f64).min(1.0);
        let mut national_series = p.national_pension_full.clone();
        national_series.set_growth_rate(economic.inflation_rate);
        let national = national_series.get(person.year_at_age(retirement_age))? * coverage;
        let avg_remuneration = remuneration_sum / work_years as f64;
        let earnings_related = avg_remuneration * work_years as f64 * p.ep_accrual_rate;
        let monthly_pension = national + earnings_related;

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
