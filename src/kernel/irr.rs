//! Internal Rate of Return, NPV, and payback-age calculation
//!
//! Cash flows are yearly and signed: working-year contributions negative,
//! retirement receipts positive, indexed from year 0.

/// Why an IRR could not be produced. Callers report this as `irr = None`
/// in results rather than a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrrError {
    /// All cash flows share one sign; no root exists.
    NoSignChange,
    /// Bisection failed to tighten below tolerance within the iteration cap.
    NoConvergence,
}

const IRR_LOW: f64 = -0.99;
const IRR_HIGH: f64 = 5.0;
const IRR_TOLERANCE: f64 = 1e-7;
const IRR_MAX_ITERATIONS: u32 = 200;

/// Net present value of yearly cash flows at a given rate.
pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, &cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Yearly rate `r` with `NPV(r) = 0`, found by bisection on [-0.99, 5.0].
pub fn irr(cash_flows: &[f64]) -> Result<f64, IrrError> {
    let has_positive = cash_flows.iter().any(|&cf| cf > 1e-10);
    let has_negative = cash_flows.iter().any(|&cf| cf < -1e-10);
    if !has_positive || !has_negative {
        return Err(IrrError::NoSignChange);
    }

    let mut low = IRR_LOW;
    let mut high = IRR_HIGH;
    let mut npv_low = npv(cash_flows, low);
    let npv_high = npv(cash_flows, high);
    if npv_low * npv_high > 0.0 {
        // Signs change in the stream but not over the search interval
        return Err(IrrError::NoConvergence);
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv(cash_flows, mid);

        if npv_mid.abs() < IRR_TOLERANCE || (high - low) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }

        if npv_low * npv_mid < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    Err(IrrError::NoConvergence)
}

/// Smallest fractional age at which cumulative benefits reach cumulative
/// employee contributions. Both slices are indexed from `start_age`
/// (entry `i` is the cumulative value at age `start_age + i`), linearly
/// interpolated between the two surrounding yearly points. `None` when the
/// benefit curve never catches up within the horizon.
pub fn payback_age(start_age: u8, cumulative_contrib: &[f64], cumulative_benefit: &[f64]) -> Option<f64> {
    let n = cumulative_contrib.len().min(cumulative_benefit.len());
    let gap = |i: usize| cumulative_benefit[i] - cumulative_contrib[i];

    for i in 0..n {
        if gap(i) >= 0.0 {
            if i == 0 {
                return Some(start_age as f64);
            }
            let prev = gap(i - 1);
            let cur = gap(i);
            let frac = if (cur - prev).abs() < 1e-12 {
                0.0
            } else {
                -prev / (cur - prev)
            };
            return Some(start_age as f64 + (i - 1) as f64 + frac);
        }
    }
    None
}
