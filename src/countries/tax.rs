//! Progressive marginal tax evaluation shared by the bracket-table countries

use serde::{Deserialize, Serialize};

/// A marginal bracket table: `(upper_bound, rate)` pairs in ascending order,
/// the last bracket open-ended with `upper_bound = f64::INFINITY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressiveTax {
    brackets: Vec<(f64, f64)>,
}

impl ProgressiveTax {
    pub fn new(brackets: Vec<(f64, f64)>) -> Self {
        Self { brackets }
    }

    /// Marginal tax on `taxable` (already net of deductions), floored at 0.
    pub fn tax(&self, taxable: f64) -> f64 {
        if taxable <= 0.0 {
            return 0.0;
        }
        let mut tax = 0.0;
        let mut lower = 0.0;
        for &(upper, rate) in &self.brackets {
            if taxable > lower {
                let in_bracket = taxable.min(upper) - lower;
                tax += in_bracket * rate;
                lower = upper;
            } else {
                break;
            }
        }
        tax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bracket() -> ProgressiveTax {
        ProgressiveTax::new(vec![(10_000.0, 0.10), (f64::INFINITY, 0.20)])
    }

    #[test]
    fn test_marginal_evaluation() {
        let t = two_bracket();
        assert!((t.tax(5_000.0) - 500.0).abs() < 1e-9);
        assert!((t.tax(10_000.0) - 1_000.0).abs() < 1e-9);
        assert!((t.tax(15_000.0) - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_and_negative() {
        let t = two_bracket();
        assert_eq!(t.tax(0.0), 0.0);
        assert_eq!(t.tax(-100.0), 0.0);
    }

    #[test]
    fn test_bracket_monotonicity() {
        // tax(a) <= tax(b) and tax(b) - tax(a) <= b - a for a < b
        let t = two_bracket();
        let incomes = [0.0, 100.0, 9_999.0, 10_000.0, 10_001.0, 50_000.0, 200_000.0];
        for w in incomes.windows(2) {
            let (a, b) = (w[0], w[1]);
            assert!(t.tax(a) <= t.tax(b));
            assert!(t.tax(b) - t.tax(a) <= b - a + 1e-9);
        }
    }
}
