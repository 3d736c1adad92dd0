//! Salary-amount parsing: `cny10000`, `10000usd`, `S$5,000`, bare digits

use serde::{Deserialize, Serialize};

use crate::currency::{is_supported_currency, SUPPORTED_CURRENCIES};
use crate::error::{PensionError, Result};

/// Currency used for bare numeric input.
pub const DEFAULT_INPUT_CURRENCY: &str = "CNY";

/// An amount tagged with its ISO currency code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub amount: f64,
    pub currency: String,
}

impl CurrencyAmount {
    pub fn new(amount: f64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_uppercase(),
        }
    }
}

impl std::fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// Multi-character symbols first so `S$` wins over `$`.
const SYMBOL_MAP: &[(&str, &str)] = &[
    ("HK$", "HKD"),
    ("NT$", "TWD"),
    ("S$", "SGD"),
    ("C$", "CAD"),
    ("A$", "AUD"),
    ("R$", "BRL"),
    ("CHF", "CHF"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "CNY"),
    ("₩", "KRW"),
    ("₹", "INR"),
    ("₽", "RUB"),
];

/// Parse a salary-amount string. Accepted forms, case-insensitive and with
/// whitespace/commas ignored: `<code><digits>`, `<digits><code>`,
/// `<symbol><digits>`, and bare `<digits>` (default CNY).
pub fn parse_amount(input: &str) -> Result<CurrencyAmount> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    if cleaned.is_empty() {
        return Err(PensionError::ParseError("empty amount".to_string()));
    }

    // Bare number
    if let Ok(v) = cleaned.parse::<f64>() {
        return finish(v, DEFAULT_INPUT_CURRENCY, input);
    }

    // <code><digits>  e.g. cny10000
    let lower = cleaned.to_lowercase();
    for &(code, _, _) in SUPPORTED_CURRENCIES {
        if let Some(rest) = lower.strip_prefix(&code.to_lowercase()) {
            if let Ok(v) = rest.parse::<f64>() {
                return finish(v, code, input);
            }
        }
        // <digits><code>  e.g. 10000usd
        if let Some(rest) = lower.strip_suffix(&code.to_lowercase()) {
            if let Ok(v) = rest.parse::<f64>() {
                return finish(v, code, input);
            }
        }
    }

    // <symbol><digits>  e.g. ¥10000, S$5000 (symbols matched case-insensitively)
    let upper = cleaned.to_uppercase();
    for &(symbol, code) in SYMBOL_MAP {
        if let Some(rest) = upper.strip_prefix(symbol) {
            if let Ok(v) = rest.parse::<f64>() {
                return finish(v, code, input);
            }
        }
    }

    // A code-looking prefix that is not supported gets the currency error,
    // anything else the parse error.
    let prefix: String = cleaned.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if prefix.len() == 3 && !is_supported_currency(&prefix) {
        return Err(PensionError::UnknownCurrency {
            code: prefix.to_uppercase(),
            suggestion: crate::currency::suggest_currency(&prefix).map(str::to_string),
        });
    }
    Err(PensionError::ParseError(format!("unrecognized amount '{}'", input)))
}

fn finish(amount: f64, code: &str, original: &str) -> Result<CurrencyAmount> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(PensionError::ParseError(format!(
            "amount in '{}' must be a non-negative number",
            original
        )));
    }
    Ok(CurrencyAmount::new(amount, code))
}

/// Compact form accepted back by `parse_amount`: `cny10000`.
pub fn format_compact(amount: f64, code: &str) -> String {
    format!("{}{}", code.to_lowercase(), amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prefix() {
        let a = parse_amount("cny10000").unwrap();
        assert_eq!(a, CurrencyAmount::new(10000.0, "CNY"));
        let b = parse_amount("USD5000").unwrap();
        assert_eq!(b.currency, "USD");
    }

    #[test]
    fn test_code_suffix() {
        let a = parse_amount("5000usd").unwrap();
        assert_eq!(a, CurrencyAmount::new(5000.0, "USD"));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(parse_amount("¥10000").unwrap().currency, "CNY");
        assert_eq!(parse_amount("$1200").unwrap().currency, "USD");
        assert_eq!(parse_amount("S$5000").unwrap().currency, "SGD");
        assert_eq!(parse_amount("HK$800").unwrap().currency, "HKD");
        assert_eq!(parse_amount("NT$900").unwrap().currency, "TWD");
        assert_eq!(parse_amount("£250").unwrap().currency, "GBP");
    }

    #[test]
    fn test_bare_digits_default_cny() {
        let a = parse_amount("12000").unwrap();
        assert_eq!(a, CurrencyAmount::new(12000.0, "CNY"));
    }

    #[test]
    fn test_whitespace_and_commas_ignored() {
        let a = parse_amount(" cny 10,000 ").unwrap();
        assert_eq!(a.amount, 10000.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("hello").is_err());
        assert!(parse_amount("cny").is_err());
        assert!(parse_amount("-500usd").is_err());
    }

    #[test]
    fn test_unknown_code_suggests() {
        match parse_amount("use5000") {
            Err(PensionError::UnknownCurrency { code, suggestion }) => {
                assert_eq!(code, "USE");
                assert_eq!(suggestion.as_deref(), Some("USD"));
            }
            other => panic!("expected UnknownCurrency, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_all_codes() {
        for &(code, _, _) in SUPPORTED_CURRENCIES {
            let s = format_compact(2500.0, code);
            let parsed = parse_amount(&s).unwrap();
            assert_eq!(parsed, CurrencyAmount::new(2500.0, code), "code {}", code);
        }
    }
}
