//! Singapore: CPF accounts, RA formation, and CPF LIFE
//!
//! The working phase runs the five-step yearly sequence over OA/SA/MA (and
//! RA from 55), forms the RA at 55 from SA then OA up to the member's
//! retirement-sum target, and at 65 hands the RA balance to one of the three
//! CPF LIFE plans. Every rule parameter lives in `SingaporeParams`.

pub mod accounts;
pub mod life;

use serde::{Deserialize, Serialize};

use crate::countries::tax::ProgressiveTax;
use crate::error::{PensionError, Result};
use crate::kernel;
use crate::model::{
    EconomicFactors, PensionResult, Person, RetirementSchedule, SalaryProfile, YearLedgerEntry,
};
use crate::params::{AgeBanded, YearSeries};
use crate::registry::PensionCalculator;

pub use accounts::{CpfAccounts, CpfYearOutcome, RaFormation};
pub use life::{CpfLifeOutcome, CpfLifePlan};

/// RA target tier chosen at 55
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaTarget {
    Brs,
    Frs,
    Ers,
}

impl RaTarget {
    pub fn amount(&self, frs: f64, ers_multiplier: f64, brs_multiplier: f64) -> f64 {
        match self {
            RaTarget::Brs => frs * brs_multiplier,
            RaTarget::Frs => frs,
            RaTarget::Ers => frs * ers_multiplier,
        }
    }
}

/// Every CPF rule parameter in one place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingaporeParams {
    /// (employee, employer) contribution rates by age band.
    pub contribution_rates: AgeBanded<(f64, f64)>,
    /// Allocation fractions of the total contribution (OA, SA-or-RA, MA);
    /// each band sums to 1.
    pub allocation: AgeBanded<(f64, f64, f64)>,
    /// Monthly ordinary-wage ceiling.
    pub ow_monthly_ceiling: f64,
    /// Annual cap on total (employee + employer) contributions.
    pub annual_limit: f64,

    // Account floor rates
    pub oa_rate: f64,
    pub sa_rate: f64,
    pub ma_rate: f64,
    pub ra_rate: f64,

    /// Basic Healthcare Sum schedule; cohort-locked at 65.
    pub bhs: YearSeries,
    /// Full Retirement Sum schedule; BRS/ERS are multiples.
    pub frs: YearSeries,
    pub ers_multiplier: f64,
    pub brs_multiplier: f64,
    pub ra_target: RaTarget,

    // CPF LIFE
    pub plan: CpfLifePlan,
    pub r_premium: f64,
    pub escalation: f64,
    pub basic_premium_fraction: f64,
    pub payout_start_age: u8,
    pub basic_phase_end_age: u8,
    pub horizon_age: u8,

    // Income tax
    pub tax_brackets: ProgressiveTax,
    pub earned_income_relief: f64,
}

impl Default for SingaporeParams {
    fn default() -> Self {
        Self {
            contribution_rates: AgeBanded::new(vec![
                (0, 55, (0.20, 0.17)),
                (56, 60, (0.125, 0.125)),
                (61, 65, (0.075, 0.075)),
                (66, 120, (0.05, 0.05)),
            ]),
            allocation: AgeBanded::new(vec![
                (0, 55, (23.0 / 37.0, 6.0 / 37.0, 8.0 / 37.0)),
                (56, 60, (0.21, 0.07, 0.72)),
                (61, 65, (0.12, 0.04, 0.84)),
                (66, 120, (0.01, 0.01, 0.98)),
            ]),
            ow_monthly_ceiling: 6_800.0,
            annual_limit: 37_740.0,
            oa_rate: 0.025,
            sa_rate: 0.04,
            ma_rate: 0.04,
            ra_rate: 0.04,
            bhs: YearSeries::new(
                &[
                    (2024, 71_500.0),
                    (2025, 73_500.0),
                    (2026, 75_500.0),
                    (2027, 77_500.0),
                    (2028, 79_500.0),
                    (2029, 81_500.0),
                    (2030, 83_500.0),
                ],
                0.03,
            ),
            frs: YearSeries::new(
                &[
                    (2024, 205_800.0),
                    (2025, 212_000.0),
                    (2026, 218_000.0),
                    (2027, 224_000.0),
                    (2028, 230_000.0),
                    (2029, 236_000.0),
                    (2030, 242_000.0),
                ],
                0.03,
            ),
            ers_multiplier: 2.0,
            brs_multiplier: 0.5,
            ra_target: RaTarget::Frs,
            plan: CpfLifePlan::Standard,
            r_premium: 0.04,
            escalation: 0.02,
            basic_premium_fraction: 0.15,
            payout_start_age: 65,
            basic_phase_end_age: 90,
            horizon_age: 100,
            tax_brackets: ProgressiveTax::new(vec![
                (20_000.0, 0.0),
                (30_000.0, 0.02),
                (40_000.0, 0.035),
                (80_000.0, 0.07),
                (120_000.0, 0.115),
                (160_000.0, 0.15),
                (200_000.0, 0.18),
                (240_000.0, 0.19),
                (280_000.0, 0.195),
                (320_000.0, 0.20),
                (f64::INFINITY, 0.22),
            ]),
            earned_income_relief: 1_000.0,
        }
    }
}

/// Singapore calculator
pub struct SingaporeCalculator {
    params: SingaporeParams,
}

impl SingaporeCalculator {
    pub fn new(params: SingaporeParams) -> Self {
        Self { params }
    }

    /// Same calculator with a different CPF LIFE plan.
    pub fn with_plan(mut self, plan: CpfLifePlan) -> Self {
        self.params.plan = plan;
        self
    }
}

impl Default for SingaporeCalculator {
    fn default() -> Self {
        Self::new(SingaporeParams::default())
    }
}

impl PensionCalculator for SingaporeCalculator {
    fn country_code(&self) -> &str {
        "SG"
    }

    fn country_name(&self) -> &str {
        "Singapore"
    }

    fn currency_code(&self) -> &str {
        "SGD"
    }

    fn retirement_age(&self, _person: &Person) -> u8 {
        self.params.payout_start_age
    }

    fn with_ages(&self, retirement_age: Option<u8>, terminal_age: Option<u8>) -> Box<dyn PensionCalculator> {
        let mut params = self.params.clone();
        if let Some(r) = retirement_age {
            params.payout_start_age = r;
        }
        if let Some(t) = terminal_age {
            params.horizon_age = t.max(params.payout_start_age + 1);
            params.basic_phase_end_age = params.basic_phase_end_age.min(params.horizon_age);
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
        let payout_age = p.payout_start_age;
        let start_age = salary.contribution_start_age;
        if start_age >= payout_age {
            return Err(PensionError::InvalidProfile(format!(
                "contribution start age {} is at or past the payout age {}",
                start_age, payout_age
            )));
        }
        let work_years = (payout_age - start_age) as u32;
        let start_year = person.year_at_age(start_age);
        let cohort_year_at_65 = person.year_at_age(65);

        let mut accounts = CpfAccounts::default();
        let mut employee_total = 0.0;
        let mut employer_total = 0.0;
        let mut ledger = Vec::with_capacity(work_years as usize);
        let mut yearly_employee_outflow = Vec::with_capacity(work_years as usize);

        for offset in 0..work_years {
            let year = start_year + offset as i32;
            let age = start_age + offset as u8;
            let gross = salary.annual_salary_at(offset);
            let wage_base = salary.monthly_salary_at(offset).min(p.ow_monthly_ceiling) * 12.0;

            let outcome = accounts::run_year(p, &mut accounts, age, year, wage_base, cohort_year_at_65)?;
            if age == 55 {
                accounts::establish_ra(p, &mut accounts, year)?;
            }

            let mut entry = YearLedgerEntry::new(year, age, gross);
            entry.contribution_base = outcome.contribution_base;
            entry.employee.savings = outcome.employee_contribution;
            entry.employer.savings = outcome.employer_contribution;
            entry.taxable_income =
                (gross - outcome.employee_contribution - p.earned_income_relief).max(0.0);
            entry.tax = p.tax_brackets.tax(entry.taxable_income);
            entry.net_income = gross - outcome.employee_contribution - entry.tax;
            entry.balances.insert("oa".to_string(), accounts.oa);
            entry.balances.insert("sa".to_string(), accounts.sa);
            entry.balances.insert("ma".to_string(), accounts.ma);
            entry.balances.insert("ra".to_string(), accounts.ra);

            employee_total += outcome.employee_contribution;
            employer_total += outcome.employer_contribution;
            yearly_employee_outflow.push(outcome.employee_contribution);
            ledger.push(entry);
        }

        // Age 65: the RA funds CPF LIFE; OA and MA stay behind accruing
        let life = life::simulate(p, p.plan, accounts.ra);
        let horizon_years = (p.horizon_age - payout_age) as u32;
        let oa_at_horizon = kernel::compound_growth(accounts.oa, p.oa_rate, horizon_years);
        let ma_at_horizon = kernel::compound_growth(accounts.ma, p.ma_rate, horizon_years);
        let terminal_value = life.final_balance + oa_at_horizon + ma_at_horizon;

        let monthly_pension = life.monthly_payouts.first().copied().unwrap_or(0.0);
        let schedule = RetirementSchedule::new(payout_age, life.monthly_payouts.clone());
        let total_benefit = life.total_payout + terminal_value;

        let mut cash_flows = yearly_employee_outflow.iter().map(|c| -c).collect::<Vec<_>>();
        for y in 0..horizon_years {
            let mut receipt = schedule.annual_at_age(payout_age + y as u8);
            if y == horizon_years - 1 {
                receipt += terminal_value;
            }
            cash_flows.push(receipt);
        }
        let irr = kernel::irr(&cash_flows).ok();

        let points = horizon_years as usize + 1;
        let cumulative_contrib = vec![employee_total; points];
        let mut cumulative_benefit = vec![0.0; points];
        for i in 1..points {
            cumulative_benefit[i] =
                cumulative_benefit[i - 1] + schedule.annual_at_age(payout_age + (i - 1) as u8);
        }
        let payback_age = kernel::payback_age(payout_age, &cumulative_contrib, &cumulative_benefit);

        Ok(PensionResult {
            currency: self.currency_code().to_string(),
            retirement_age: payout_age,
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
    use crate::model::{EmploymentType, Gender};

    fn test_person() -> Person {
        Person::new(1994, Gender::Male, EmploymentType::Employee, 2024).unwrap()
    }

    fn test_inputs() -> (SalaryProfile, EconomicFactors) {
        // 6,000 SGD/mo from age 30, 2% growth
        let salary = SalaryProfile::new(6_000.0, 0.02, 30).unwrap();
        let economic = EconomicFactors::new(0.02, 0.07, 0.0, "SGD", "SGD").unwrap();
        (salary, economic)
    }

    #[test]
    fn test_full_projection_shape() {
        let calc = SingaporeCalculator::default();
        let (salary, economic) = test_inputs();
        let result = calc.calculate(&test_person(), &salary, &economic).unwrap();

        assert_eq!(result.work_years, 35);
        assert_eq!(result.retirement_age, 65);
        assert_eq!(result.schedule.monthly.len(), (100 - 65) * 12);
        assert!(result.monthly_pension > 0.0);
        assert!(result.irr.is_some());
    }

    #[test]
    fn test_ra_formed_at_55() {
        let calc = SingaporeCalculator::default();
        let (salary, economic) = test_inputs();
        let ledger = calc.annual_ledger(&test_person(), &salary, &economic).unwrap();

        let at_54 = ledger.iter().find(|e| e.age == 54).unwrap();
        let at_55 = ledger.iter().find(|e| e.age == 55).unwrap();
        assert_eq!(at_54.balance("ra"), 0.0);
        assert!(at_55.balance("ra") > 0.0);
        // SA is drained into the RA at 55
        assert!(at_55.balance("sa") < at_54.balance("sa"));
    }

    #[test]
    fn test_ma_respects_bhs_every_year() {
        let calc = SingaporeCalculator::default();
        let (salary, economic) = test_inputs();
        let ledger = calc.annual_ledger(&test_person(), &salary, &economic).unwrap();
        let p = SingaporeParams::default();
        let person = test_person();

        for entry in &ledger {
            let cap = accounts::bhs_limit(&p, entry.age, entry.year, person.year_at_age(65)).unwrap();
            assert!(
                entry.balance("ma") <= cap + 1e-6,
                "MA {} above BHS {} at age {}",
                entry.balance("ma"),
                cap,
                entry.age
            );
        }
    }

    #[test]
    fn test_wage_base_capped_monthly() {
        let calc = SingaporeCalculator::default();
        // 20,000/mo is far above the 6,800 ceiling
        let salary = SalaryProfile::new(20_000.0, 0.0, 30).unwrap();
        let economic = EconomicFactors::new(0.02, 0.07, 0.0, "SGD", "SGD").unwrap();
        let ledger = calc.annual_ledger(&test_person(), &salary, &economic).unwrap();
        assert!((ledger[0].contribution_base - 6_800.0 * 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_ledger_net_identity() {
        let calc = SingaporeCalculator::default();
        let (salary, economic) = test_inputs();
        let ledger = calc.annual_ledger(&test_person(), &salary, &economic).unwrap();
        for entry in &ledger {
            let identity = entry.gross_salary - entry.employee.total() - entry.tax;
            assert!((entry.net_income - identity).abs() < 1e-6);
            assert!(entry.net_income <= entry.gross_salary);
        }
    }

    #[test]
    fn test_plan_choice_changes_schedule() {
        let (salary, economic) = test_inputs();
        let person = test_person();

        let standard = SingaporeCalculator::default()
            .calculate(&person, &salary, &economic)
            .unwrap();
        let escalating = SingaporeCalculator::default()
            .with_plan(CpfLifePlan::Escalating)
            .calculate(&person, &salary, &economic)
            .unwrap();
        assert!(escalating.monthly_pension < standard.monthly_pension);
        // Same contributions either way
        assert!((escalating.employee_contributions - standard.employee_contributions).abs() < 1e-6);
    }
}
