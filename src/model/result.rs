//! Output contract: yearly ledger, retirement schedule, summary metrics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Contribution line items for one side (employee or employer) of one year.
///
/// Field names follow the Chinese payroll lines; other jurisdictions map
/// their own lines onto the nearest equivalent (US: OASDI -> pension,
/// Medicare -> medical, 401(k) deferral/match -> savings; SG: the whole CPF
/// share -> savings; UK/JP/TW: social insurance -> pension).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContributionLines {
    pub pension: f64,
    pub medical: f64,
    pub unemployment: f64,
    pub savings: f64,
    /// Lines with no shared bucket (work-injury, surtaxes).
    pub other: f64,
}

impl ContributionLines {
    pub fn total(&self) -> f64 {
        self.pension + self.medical + self.unemployment + self.savings + self.other
    }
}

/// One working year of the cash-flow ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearLedgerEntry {
    pub year: i32,
    pub age: u8,
    pub gross_salary: f64,
    /// Contribution base after floors/ceilings (annualized).
    pub contribution_base: f64,
    pub employee: ContributionLines,
    pub employer: ContributionLines,
    pub taxable_income: f64,
    pub tax: f64,
    /// Take-home: gross - employee contributions - tax.
    pub net_income: f64,
    /// End-of-year balances by sub-account ("pension_account",
    /// "housing_fund", "oa", "sa", "ma", "ra", "401k", ...).
    pub balances: BTreeMap<String, f64>,
}

impl YearLedgerEntry {
    pub fn new(year: i32, age: u8, gross_salary: f64) -> Self {
        Self {
            year,
            age,
            gross_salary,
            contribution_base: 0.0,
            employee: ContributionLines::default(),
            employer: ContributionLines::default(),
            taxable_income: 0.0,
            tax: 0.0,
            net_income: 0.0,
            balances: BTreeMap::new(),
        }
    }

    pub fn balance(&self, account: &str) -> f64 {
        self.balances.get(account).copied().unwrap_or(0.0)
    }
}

/// Monthly payouts from retirement through the modeling horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetirementSchedule {
    /// Age at the first payout month.
    pub start_age: u8,
    /// One entry per month, starting at `start_age`.
    pub monthly: Vec<f64>,
}

impl RetirementSchedule {
    pub fn new(start_age: u8, monthly: Vec<f64>) -> Self {
        Self { start_age, monthly }
    }

    /// Level schedule of `months` payments.
    pub fn level(start_age: u8, amount: f64, months: usize) -> Self {
        Self {
            start_age,
            monthly: vec![amount; months],
        }
    }

    pub fn total(&self) -> f64 {
        self.monthly.iter().sum()
    }

    /// Payout in the first month at `age`, if the schedule covers it.
    pub fn payout_at_age(&self, age: u8) -> Option<f64> {
        if age < self.start_age {
            return None;
        }
        let idx = (age - self.start_age) as usize * 12;
        self.monthly.get(idx).copied()
    }

    /// Sum of the 12 payouts of the year starting at `age`.
    pub fn annual_at_age(&self, age: u8) -> f64 {
        if age < self.start_age {
            return 0.0;
        }
        let idx = (age - self.start_age) as usize * 12;
        self.monthly.iter().skip(idx).take(12).sum()
    }
}

/// Full result of one calculator run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionResult {
    /// ISO currency code every amount below is denominated in.
    pub currency: String,
    pub retirement_age: u8,
    pub work_years: u32,

    /// Monthly pension at retirement (first retirement month).
    pub monthly_pension: f64,
    pub employee_contributions: f64,
    pub employer_contributions: f64,
    pub total_contributions: f64,
    /// Lifetime benefits until the modeling horizon, incl. lump sums.
    pub total_benefit: f64,

    /// (total_benefit - employee_contributions) / employee_contributions.
    pub roi: f64,
    /// Annual IRR of the signed cash-flow stream; None when the stream has
    /// no sign change or bisection fails to converge.
    pub irr: Option<f64>,
    /// Fractional age at which cumulative benefits catch up with cumulative
    /// employee contributions; None if never within the horizon.
    pub payback_age: Option<f64>,

    pub ledger: Vec<YearLedgerEntry>,
    pub schedule: RetirementSchedule,
}

impl PensionResult {
    /// ROI given benefits and employee contributions; 0 when nothing was
    /// contributed.
    pub fn compute_roi(total_benefit: f64, employee_contributions: f64) -> f64 {
        if employee_contributions > 0.0 {
            (total_benefit - employee_contributions) / employee_contributions
        } else {
            0.0
        }
    }
}
