//! Taiwan: labor insurance, the employer-funded labor pension account, and
//! progressive income tax
//!
//! The benefit combines the earnings-related labor-insurance annuity
//! (average insured salary x years x 1.55%) with a drawdown of the 6%
//! employer labor-pension account.

use serde::{Deserialize, Serialize};

use crate::countries::tax::ProgressiveTax;
use crate::error::{PensionError, Result};
use crate::kernel;
use crate::model::{
    EconomicFactors, PensionResult, Person, RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::YearSeries;
use crate::registry::PensionCalculator;

/// Rule constants for the Taiwan calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaiwanParams {
    /// Labor-insurance employee share of the premium.
    pub li_employee_rate: f64,
    /// Labor-insurance employer share.
    pub li_employer_rate: f64,
    /// Insured-salary monthly ceiling by year.
    pub li_salary_ceiling: YearSeries,
    /// Labor-insurance accrual per insured year.
    pub li_accrual_rate: f64,

    /// Employer labor-pension contribution (individual account).
    pub lp_employer_rate: f64,
    /// Labor-pension monthly wage ceiling by year.
    pub lp_salary_ceiling: YearSeries,

    /// Standard deduction plus personal exemption.
    pub deductions: f64,
    pub tax_brackets: ProgressiveTax,

    pub retirement_age: u8,
    pub terminal_age: u8,
}

impl Default for TaiwanParams {
    fn default() -> Self {
        Self {
            li_employee_rate: 0.02,
            li_employer_rate: 0.07,
            li_salary_ceiling: YearSeries::new(&[(2024, 45_800.0)], 0.02),
            li_accrual_rate: 0.0155,
            lp_employer_rate: 0.06,
            lp_salary_ceiling: YearSeries::new(&[(2024, 150_000.0)], 0.02),
            deductions: 216_000.0,
            tax_brackets: ProgressiveTax::new(vec![
                (560_000.0, 0.05),
                (1_260_000.0, 0.12),
                (2_520_000.0, 0.20),
                (4_720_000.0, 0.30),
                (f64::INFINITY, 0.40),
            ]),
            retirement_age: 65,
            terminal_age: 90,
        }
    }
}

/// Taiwan calculator
pub struct TaiwanCalculator {
    params: TaiwanParams,
}

impl TaiwanCalculator {
    pub fn new(params: TaiwanParams) -> Self {
        Self { params }
    }
}

impl Default for TaiwanCalculator {
    fn default() -> Self {
        Self::new(TaiwanParams::default())
    }
}

impl PensionCalculator for TaiwanCalculator {
    fn country_code(&self) -> &str {
        "TW"
    }

    fn country_name(&self) -> &str {
        "Taiwan"
    }

    fn currency_code(&self) -> &str {
        "TWD"
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

        let mut pension_account = 0.0;
        let mut insured_salary_sum = 0.0;
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

            let insured_monthly = monthly.min(p.li_salary_ceiling.get(year)?);
            entry.contribution_base = insured_monthly * 12.0;
            entry.employee.pension = insured_monthly * p.li_employee_rate * 12.0;
            entry.employer.pension = insured_monthly * p.li_employer_rate * 12.0;

            let lp_monthly = monthly.min(p.lp_salary_ceiling.get(year)?);
            entry.employer.savings = lp_monthly * p.lp_employer_rate * 12.0;
            pension_account = pension_account * (1.0 + economic.investment_return_rate)
                + entry.employer.savings;
            entry
                .balances
                .insert("labor_pension_account".to_string(), pension_account);

            entry.taxable_income = (gross - entry.employee.pension - p.deductions).max(0.0);
            entry.tax = p.tax_brackets.tax(entry.taxable_income);
            entry.net_income = gross - entry.employee.total() - entry.tax;

            insured_salary_sum += insured_monthly;
            employee_total += entry.employee.total();
            employer_total += entry.employer.total();
            yearly_employee_outflow.push(entry.employee.total());
            ledger.push(entry);
        }

        // Earnings-related labor-insurance annuity plus the account drawdown
        let avg_insured_salary = insured_salary_sum / work_years as f64;
        let li_monthly = avg_insured_salary * work_years as f64 * p.li_accrual_rate;
        let retirement_months = (p.terminal_age - retirement_age) as u32 * 12;
        let lp_monthly = kernel::monthly_annuity(
            pension_account,
            economic.investment_return_rate,
            retirement_months,
        );
        let monthly_pension = li_monthly + lp_monthly;

        let schedule =
            RetirementSchedule::level(retirement_age, monthly_pension, retirement_months as usize);
        let total_benefit = schedule.total();
        let annual_pension = monthly_pension * 12.0;

        let mut cash_flows = yearly_employee_outflow.iter().map(|c| -c).collect::<Vec<_>>();
        let retirement_years = (p.terminal_age - retirement_age) as u32;
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
