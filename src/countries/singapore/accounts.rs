//! CPF account state and the fixed yearly event sequence
//!
//! Per year, in order: contributions, allocation across accounts, BHS check
//! on MA, interest accrual, second BHS check. The MA cap uses the calendar
//! year's BHS before 65 and the cohort-locked value from 65 on.

use serde::{Deserialize, Serialize};

use super::SingaporeParams;
use crate::error::Result;

/// Balances of the four CPF accounts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CpfAccounts {
    pub oa: f64,
    pub sa: f64,
    pub ma: f64,
    pub ra: f64,
}

impl CpfAccounts {
    pub fn total(&self) -> f64 {
        self.oa + self.sa + self.ma + self.ra
    }
}

/// What happened during one year of the sequence
#[derive(Debug, Clone, Copy)]
pub struct CpfYearOutcome {
    pub contribution_base: f64,
    pub employee_contribution: f64,
    pub employer_contribution: f64,
    /// MA overflow moved to SA or RA across both BHS checks.
    pub ma_overflow: f64,
    pub bhs_limit: f64,
    /// Interest credited across all four accounts.
    pub interest: f64,
}

/// Transfers made when the RA is formed at 55
#[derive(Debug, Clone, Copy)]
pub struct RaFormation {
    pub target: f64,
    pub from_sa: f64,
    pub from_oa: f64,
}

/// MA cap for this age/year: the prevailing BHS before 65, the cohort value
/// locked at the year the member turns 65 afterwards.
pub fn bhs_limit(params: &SingaporeParams, age: u8, year: i32, cohort_year_at_65: i32) -> Result<f64> {
    if age < 65 {
        params.bhs.get(year)
    } else {
        params.bhs.get(cohort_year_at_65)
    }
}

fn overflow_ma(accounts: &mut CpfAccounts, cap: f64, age: u8) -> f64 {
    if accounts.ma <= cap {
        return 0.0;
    }
    let overflow = accounts.ma - cap;
    accounts.ma = cap;
    if age < 55 {
        accounts.sa += overflow;
    } else {
        accounts.ra += overflow;
    }
    overflow
}

/// Run the five-step yearly sequence for `annual_wage_base` (already capped
/// at the monthly OW ceiling times twelve).
pub fn run_year(
    params: &SingaporeParams,
    accounts: &mut CpfAccounts,
    age: u8,
    year: i32,
    annual_wage_base: f64,
    cohort_year_at_65: i32,
) -> Result<CpfYearOutcome> {
    // 1. Contributions, bounded by the annual CPF limit
    let (ee_rate, er_rate) = *params.contribution_rates.get(age);
    let mut employee = annual_wage_base * ee_rate;
    let mut employer = annual_wage_base * er_rate;
    let total = employee + employer;
    if total > params.annual_limit {
        let scale = params.annual_limit / total;
        employee *= scale;
        employer *= scale;
    }
    let contribution = employee + employer;

    // 2. Allocation: middle share goes to SA before 55, to RA from 55 on
    let (oa_frac, mid_frac, ma_frac) = *params.allocation.get(age);
    accounts.oa += contribution * oa_frac;
    if age < 55 {
        accounts.sa += contribution * mid_frac;
    } else {
        accounts.ra += contribution * mid_frac;
    }
    accounts.ma += contribution * ma_frac;

    // 3. BHS check on contributions
    let cap = bhs_limit(params, age, year, cohort_year_at_65)?;
    let mut ma_overflow = overflow_ma(accounts, cap, age);

    // 4. Interest at each account's floor rate
    let before = accounts.total();
    accounts.oa *= 1.0 + params.oa_rate;
    accounts.sa *= 1.0 + params.sa_rate;
    accounts.ma *= 1.0 + params.ma_rate;
    accounts.ra *= 1.0 + params.ra_rate;
    let interest = accounts.total() - before;

    // 5. Interest may push MA over the cap again
    ma_overflow += overflow_ma(accounts, cap, age);

    Ok(CpfYearOutcome {
        contribution_base: annual_wage_base,
        employee_contribution: employee,
        employer_contribution: employer,
        ma_overflow,
        bhs_limit: cap,
        interest,
    })
}

/// Form the RA at 55: move SA first, then OA, up to the member's target
/// (never above ERS).
pub fn establish_ra(params: &SingaporeParams, accounts: &mut CpfAccounts, year: i32) -> Result<RaFormation> {
    let frs = params.frs.get(year)?;
    let target = params.ra_target.amount(frs, params.ers_multiplier, params.brs_multiplier);
    let target = target.min(frs * params.ers_multiplier);

    let from_sa = accounts.sa.min(target);
    accounts.sa -= from_sa;
    accounts.ra += from_sa;

    let shortfall = (target - accounts.ra).max(0.0);
    let from_oa = accounts.oa.min(shortfall);
    accounts.oa -= from_oa;
    accounts.ra += from_oa;

    Ok(RaFormation {
        target,
        from_sa,
        from_oa,
    })
}
