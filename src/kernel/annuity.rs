//! Annuity and accumulation primitives

/// Future value of a level yearly payment `pmt` over `n` years at rate `r`.
pub fn future_value(pmt: f64, rate: f64, n: u32) -> f64 {
    if rate.abs() < 1e-12 {
        return pmt * n as f64;
    }
    pmt * ((1.0 + rate).powi(n as i32) - 1.0) / rate
}

/// Principal compounded for `years` at a yearly rate.
pub fn compound_growth(principal: f64, rate: f64, years: u32) -> f64 {
    principal * (1.0 + rate).powi(years as i32)
}

/// Level monthly payment exhausting `balance` over `months` at
/// `yearly_rate / 12` per month. Payments at month end, interest accrues
/// before each payment.
pub fn monthly_annuity(balance: f64, yearly_rate: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let i = yearly_rate / 12.0;
    if i.abs() < 1e-12 {
        return balance / months as f64;
    }
    balance * i / (1.0 - (1.0 + i).powi(-(months as i32)))
}

/// First payment of an escalating schedule whose present value equals
/// `balance`: the monthly payment grows so that each yearly cohort of 12 is
/// `1 + yearly_escalation` times the previous cohort.
pub fn escalating_annuity(balance: f64, yearly_rate: f64, yearly_escalation: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let r = yearly_rate / 12.0;
    let g = yearly_escalation / 12.0;
    if (r - g).abs() < 1e-12 {
        return balance / months as f64;
    }
    balance * (r - g) / (1.0 - ((1.0 + g) / (1.0 + r)).powi(months as i32))
}
