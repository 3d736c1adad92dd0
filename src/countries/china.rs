//! China: five-insurance payroll, housing fund, and the two-tier pension
//!
//! The yearly engine follows the statutory seven-step sequence: bases, social
//! insurance, housing fund, income tax (seven-bracket quick-deduction
//! method), take-home, account accumulation, and the retirement formula
//! (basic pension on the indexed average wage plus the individual account
//! divided by the age-indexed months divisor).

use serde::{Deserialize, Serialize};

use crate::error::{PensionError, Result};
use crate::kernel;
use crate::model::{
    EconomicFactors, EmploymentType, Gender, PensionResult, Person, RetirementSchedule,
    SalaryProfile, YearLedgerEntry,
};
use crate::params::YearSeries;
use crate::registry::PensionCalculator;

/// Rule constants for the China calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChinaParams {
    // Employee social-insurance rates
    pub emp_pension_rate: f64,
    pub emp_medical_rate: f64,
    pub emp_unemployment_rate: f64,

    // Employer social-insurance rates
    pub er_pension_rate: f64,
    pub er_medical_rate: f64,
    pub er_unemployment_rate: f64,
    pub er_injury_rate: f64,

    // Housing fund
    pub hf_rate: f64,
    pub hf_base_floor: f64,
    pub hf_base_ceiling: f64,

    // Income tax
    pub basic_deduction: f64,
    /// Annualized quick-deduction table: (upper bound, rate, deduction).
    pub tax_brackets: Vec<(f64, f64, f64)>,

    /// Local average monthly wage by calendar year; absent years extrapolate
    /// by the simulation's inflation rate.
    pub avg_wage: YearSeries,

    /// Individual-account months divisor by retirement age.
    pub months_divisor: Vec<(u8, u32)>,

    /// Fixed retirement age overriding the gender/employment table.
    pub retirement_age_override: Option<u8>,
    pub terminal_age: u8,
}

impl Default for ChinaParams {
    fn default() -> Self {
        Self {
            emp_pension_rate: 0.08,
            emp_medical_rate: 0.02,
            emp_unemployment_rate: 0.005,
            er_pension_rate: 0.16,
            er_medical_rate: 0.09,
            er_unemployment_rate: 0.005,
            er_injury_rate: 0.0016,
            hf_rate: 0.07,
            hf_base_floor: 2_690.0,
            hf_base_ceiling: 36_921.0,
            basic_deduction: 60_000.0,
            tax_brackets: vec![
                (36_000.0, 0.03, 0.0),
                (144_000.0, 0.10, 2_520.0),
                (300_000.0, 0.20, 16_920.0),
                (420_000.0, 0.25, 31_920.0),
                (660_000.0, 0.30, 52_920.0),
                (960_000.0, 0.35, 85_920.0),
                (f64::INFINITY, 0.45, 181_920.0),
            ],
            avg_wage: YearSeries::new(&[(2024, 12_434.0)], 0.02),
            months_divisor: vec![(50, 195), (55, 170), (60, 139)],
            retirement_age_override: None,
            terminal_age: 90,
        }
    }
}

impl ChinaParams {
    /// Quick-deduction method: find the bracket, multiply, subtract.
    pub fn income_tax(&self, taxable: f64) -> f64 {
        if taxable <= 0.0 {
            return 0.0;
        }
        for &(upper, rate, deduction) in &self.tax_brackets {
            if taxable <= upper {
                return taxable * rate - deduction;
            }
        }
        0.0
    }

    /// Months divisor for a retirement age; exact entry or the closest one.
    fn divisor_for_age(&self, age: u8) -> u32 {
        self.months_divisor
            .iter()
            .min_by_key(|(a, _)| (*a as i32 - age as i32).abs())
            .map(|(_, d)| *d)
            .unwrap_or(139)
    }
}

/// China calculator
pub struct ChinaCalculator {
    params: ChinaParams,
}

impl ChinaCalculator {
    pub fn new(params: ChinaParams) -> Self {
        Self { params }
    }

    /// One year of the seven-step sequence (steps 1-5 plus the per-year
    /// contribution amounts feeding step 6).
    fn project_year(&self, year: i32, age: u8, gross: f64, avg_wage: f64) -> YearLedgerEntry {
        let p = &self.params;
        let mut entry = YearLedgerEntry::new(year, age, gross);

        // Step 1: bases
        let monthly = gross / 12.0;
        let si_base = monthly.clamp(0.6 * avg_wage, 3.0 * avg_wage);
        let hf_base = monthly.clamp(p.hf_base_floor, p.hf_base_ceiling);
        entry.contribution_base = si_base * 12.0;

        // Step 2: social insurance
        entry.employee.pension = si_base * p.emp_pension_rate * 12.0;
        entry.employee.medical = si_base * p.emp_medical_rate * 12.0;
        entry.employee.unemployment = si_base * p.emp_unemployment_rate * 12.0;
        entry.employer.pension = si_base * p.er_pension_rate * 12.0;
        entry.employer.medical = si_base * p.er_medical_rate * 12.0;
        entry.employer.unemployment = si_base * p.er_unemployment_rate * 12.0;
        entry.employer.other = si_base * p.er_injury_rate * 12.0;

        // Step 3: housing fund, matched by the employer
        entry.employee.savings = hf_base * p.hf_rate * 12.0;
        entry.employer.savings = hf_base * p.hf_rate * 12.0;

        // Step 4: income tax
        let emp_si = entry.employee.pension + entry.employee.medical + entry.employee.unemployment;
        let emp_hf = entry.employee.savings;
        entry.taxable_income = (gross - p.basic_deduction - emp_si - emp_hf).max(0.0);
        entry.tax = p.income_tax(entry.taxable_income);

        // Step 5: take-home
        entry.net_income = gross - emp_si - emp_hf - entry.tax;
        debug_assert!(
            (entry.net_income + emp_si + emp_hf + entry.tax - gross).abs() < 1e-6,
            "take-home identity violated"
        );

        entry
    }
}

impl Default for ChinaCalculator {
    fn default() -> Self {
        Self::new(ChinaParams::default())
    }
}

impl PensionCalculator for ChinaCalculator {
    fn country_code(&self) -> &str {
        "CN"
    }

    fn country_name(&self) -> &str {
        "China"
    }

    fn currency_code(&self) -> &str {
        "CNY"
    }

    fn retirement_age(&self, person: &Person) -> u8 {
        if let Some(age) = self.params.retirement_age_override {
            return age;
        }
        match (person.gender, person.employment_type) {
            (Gender::Male, _) => 60,
            (Gender::Female, EmploymentType::CivilServant) => 60,
            (Gender::Female, _) => 55,
        }
    }

    fn with_ages(&self, retirement_age: Option<u8>, terminal_age: Option<u8>) -> Box<dyn PensionCalculator> {
        let mut params = self.params.clone();
        if retirement_age.is_some() {
            params.retirement_age_override = retirement_age;
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

        let mut avg_wage = self.params.avg_wage.clone();
        avg_wage.set_growth_rate(economic.inflation_rate);

        let ss_rate = economic.social_security_return_rate;
        let mut pension_account = 0.0;
        let mut housing_fund = 0.0;
        let mut index_sum = 0.0;
        let mut employee_total = 0.0;
        let mut employer_total = 0.0;
        let mut ledger = Vec::with_capacity(work_years as usize);
        let mut yearly_employee_outflow = Vec::with_capacity(work_years as usize);

        for offset in 0..work_years {
            let year = start_year + offset as i32;
            let age = start_age + offset as u8;
            let gross = salary.annual_salary_at(offset);
            let wage = avg_wage.get(year)?;

            let mut entry = self.project_year(year, age, gross, wage);

            // Step 6: accumulate accounts with notional crediting
            pension_account = pension_account * (1.0 + ss_rate) + entry.employee.pension;
            housing_fund =
                housing_fund * (1.0 + ss_rate) + entry.employee.savings + entry.employer.savings;
            entry
                .balances
                .insert("pension_account".to_string(), pension_account);
            entry.balances.insert("housing_fund".to_string(), housing_fund);

            index_sum += (entry.contribution_base / 12.0) / wage;
            employee_total += entry.employee.total();
            employer_total += entry.employer.total();
            yearly_employee_outflow.push(entry.employee.total());
            ledger.push(entry);
        }

        // Step 7: retirement
        let retirement_year = person.year_at_age(retirement_age);
        let wage_at_retirement = avg_wage.get(retirement_year)?;
        let indexed_avg_salary = wage_at_retirement * (index_sum / work_years as f64);
        let basic_pension =
            (wage_at_retirement + indexed_avg_salary) / 2.0 * work_years as f64 * 0.01;
        let account_pension =
            pension_account / self.params.divisor_for_age(retirement_age) as f64;
        let monthly_pension = basic_pension + account_pension;

        let retirement_years = (self.params.terminal_age - retirement_age) as u32;
        let schedule = RetirementSchedule::level(
            retirement_age,
            monthly_pension,
            retirement_years as usize * 12,
        );
        let annual_pension = monthly_pension * 12.0;
        // Housing fund is disbursed as a lump sum in the first retirement year
        let total_benefit = schedule.total() + housing_fund;

        // IRR on the signed yearly stream
        let mut cash_flows = yearly_employee_outflow.iter().map(|c| -c).collect::<Vec<_>>();
        for y in 0..retirement_years {
            let receipt = if y == 0 {
                annual_pension + housing_fund
            } else {
                annual_pension
            };
            cash_flows.push(receipt);
        }
        let irr = kernel::irr(&cash_flows).ok();

        // Payback on the pension stream alone; the housing-fund lump sum is
        // a return of the member's own savings account
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_person() -> Person {
        Person::new(1994, Gender::Male, EmploymentType::Employee, 2024).unwrap()
    }

    fn test_inputs() -> (SalaryProfile, EconomicFactors) {
        // 180,000 CNY/yr starting at age 30, 2% growth
        let salary = SalaryProfile::new(15_000.0, 0.02, 30).unwrap();
        let economic = EconomicFactors::new(0.02, 0.07, 0.0, "CNY", "CNY").unwrap();
        (salary, economic)
    }

    #[test]
    fn test_year_one_ledger() {
        let calc = ChinaCalculator::default();
        let entry = calc.project_year(2024, 30, 180_000.0, 12_434.0);

        let emp_si = entry.employee.pension + entry.employee.medical + entry.employee.unemployment;
        assert!((emp_si - 18_900.0).abs() < 1e-6, "employee SI {}", emp_si);
        assert!((entry.employee.savings - 12_600.0).abs() < 1e-6);
        assert!((entry.taxable_income - 88_500.0).abs() < 1e-6);
        assert!((entry.tax - 6_330.0).abs() < 1e-6);
        assert!((entry.net_income - 142_170.0).abs() < 1e-6);
    }

    #[test]
    fn test_quick_deduction_table() {
        let p = ChinaParams::default();
        assert_eq!(p.income_tax(0.0), 0.0);
        assert!((p.income_tax(36_000.0) - 1_080.0).abs() < 1e-9);
        assert!((p.income_tax(88_500.0) - 6_330.0).abs() < 1e-9);
        assert!((p.income_tax(1_000_000.0) - (450_000.0 - 181_920.0)).abs() < 1e-6);
    }

    #[test]
    fn test_tax_monotonicity() {
        let p = ChinaParams::default();
        let incomes = [0.0, 36_000.0, 36_001.0, 144_000.0, 500_000.0, 960_000.0, 2_000_000.0];
        for w in incomes.windows(2) {
            let (a, b) = (w[0], w[1]);
            assert!(p.income_tax(a) <= p.income_tax(b) + 1e-9);
            assert!(p.income_tax(b) - p.income_tax(a) <= b - a + 1e-9);
        }
    }

    #[test]
    fn test_si_base_clamping() {
        let calc = ChinaCalculator::default();
        // Low earner clamps to 60% of the average wage
        let low = calc.project_year(2024, 30, 48_000.0, 12_434.0);
        assert!((low.contribution_base - 0.6 * 12_434.0 * 12.0).abs() < 1e-6);
        // High earner clamps to 300%
        let high = calc.project_year(2024, 30, 2_000_000.0, 12_434.0);
        assert!((high.contribution_base - 3.0 * 12_434.0 * 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_lifetime_totals() {
        let calc = ChinaCalculator::default();
        let (salary, economic) = test_inputs();
        let result = calc.calculate(&test_person(), &salary, &economic).unwrap();

        assert_eq!(result.work_years, 30);
        assert_eq!(result.retirement_age, 60);
        // Sum of 31,500/yr growing 2% over 30 years
        assert!(
            (result.employee_contributions - 1_277_894.0).abs() < 100.0,
            "employee contributions {}",
            result.employee_contributions
        );
        // Housing fund: 25,200/yr growing 2% over 30 years, no interest
        let hf = result.ledger.last().unwrap().balance("housing_fund");
        assert!((hf - 1_022_316.0).abs() < 100.0, "housing fund {}", hf);
        // Basic pension on the indexed average + account/139
        assert!(
            (result.monthly_pension - 11_656.7).abs() < 5.0,
            "monthly pension {}",
            result.monthly_pension
        );
        assert!(result.roi > 2.0, "roi {}", result.roi);
        let payback = result.payback_age.unwrap();
        assert!((68.0..71.0).contains(&payback), "payback {}", payback);
        assert!(result.irr.unwrap() > 0.0);
    }

    #[test]
    fn test_ledger_invariants() {
        let calc = ChinaCalculator::default();
        let (salary, economic) = test_inputs();
        let ledger = calc.annual_ledger(&test_person(), &salary, &economic).unwrap();

        for entry in &ledger {
            let emp_si = entry.employee.pension + entry.employee.medical + entry.employee.unemployment;
            let identity = entry.gross_salary - emp_si - entry.employee.savings - entry.tax;
            assert!((entry.net_income - identity).abs() < 1e-6);
            assert!(entry.net_income <= entry.gross_salary);
            assert!(entry.tax >= 0.0);
            assert!(entry.employee.total() >= 0.0);
            assert!(entry.employer.total() >= 0.0);
        }
    }

    #[test]
    fn test_female_retirement_ages() {
        let calc = ChinaCalculator::default();
        let employee = Person::new(1994, Gender::Female, EmploymentType::Employee, 2024).unwrap();
        let civil = Person::new(1994, Gender::Female, EmploymentType::CivilServant, 2024).unwrap();
        assert_eq!(calc.retirement_age(&employee), 55);
        assert_eq!(calc.retirement_age(&civil), 60);
    }

    #[test]
    fn test_notional_interest_grows_account() {
        let calc = ChinaCalculator::default();
        let (salary, _) = test_inputs();
        let flat = EconomicFactors::new(0.02, 0.07, 0.0, "CNY", "CNY").unwrap();
        let credited = EconomicFactors::new(0.02, 0.07, 0.03, "CNY", "CNY").unwrap();

        let without = calc.calculate(&test_person(), &salary, &flat).unwrap();
        let with = calc.calculate(&test_person(), &salary, &credited).unwrap();
        assert!(
            with.ledger.last().unwrap().balance("pension_account")
                > without.ledger.last().unwrap().balance("pension_account")
        );
    }
}
