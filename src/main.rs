//! Pension System CLI
//!
//! Drives the analysis runner from a salary amount and a set of country
//! codes, e.g. `pension_system cny15000 --CN,US,SG --annual`.

use std::process::ExitCode;

use chrono::Datelike;
use pension_system::currency::{supported_codes, SUPPORTED_CURRENCIES};
use pension_system::model::{EmploymentType, Gender, Person};
use pension_system::runner::CountryAnalysis;
use pension_system::{parse_amount, AnalysisRequest, AnalysisRunner, PensionError};

const USAGE: &str = "\
Usage: pension_system [OPTIONS] <AMOUNT>

Arguments:
  <AMOUNT>        Monthly salary, e.g. cny15000, 5000usd, S$6000, 12000

Options:
  --<CODES>               Comma-separated country codes, e.g. --CN,US,SG (default: CN)
  --annual                Emit the full year-by-year ledger as JSON
  --list-plugins          List registered country calculators
  --test-plugins          Run a smoke calculation through every calculator
  --supported-currencies  List the supported currency codes
  --birth-year <YEAR>     Birth year (default: start age years before today)
  --start-age <AGE>       Contribution start age (default: 30)
  --gender <male|female>  Gender (default: male)
  --civil-servant         Model a civil servant instead of an employee
  --growth <RATE>         Annual salary growth rate (default: 0.02)
  --inflation <RATE>      Inflation rate (default: 0.02)
  --return <RATE>         Investment return rate (default: 0.07)
  --ss-return <RATE>      Social-security notional rate (default: 0.0)
  --retire-age <AGE>      Override the statutory retirement age
  --terminal-age <AGE>    Override the modeling terminal age
  --display <CODE>        Display currency for comparisons (default: CNY)
  -h, --help              Show this help";

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run() -> Result<(), PensionError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") || args.is_empty() {
        println!("{}", USAGE);
        return Ok(());
    }

    if args.iter().any(|a| a == "--supported-currencies") {
        println!("Supported currencies:");
        for (code, name, symbol) in SUPPORTED_CURRENCIES {
            println!("  {}  {:3}  {}", code, symbol, name);
        }
        return Ok(());
    }

    let runner = AnalysisRunner::with_defaults();

    if args.iter().any(|a| a == "--list-plugins") {
        println!("Registered calculators:");
        for code in runner.registry().list_codes() {
            let calc = runner.registry().get(&code)?;
            println!("  {}  {}  ({})", code, calc.country_name(), calc.currency_code());
        }
        return Ok(());
    }

    if args.iter().any(|a| a == "--test-plugins") {
        return test_plugins(&runner);
    }

    let options = parse_options(&args)?;
    let results = runner.run(&options.request)?;

    if options.annual {
        print_annual_json(&results)?;
    } else {
        print_comparison(&results);
    }
    Ok(())
}

struct CliOptions {
    request: AnalysisRequest,
    annual: bool,
}

fn parse_options(args: &[String]) -> Result<CliOptions, PensionError> {
    let mut amount = None;
    let mut codes: Vec<String> = vec!["CN".to_string()];
    let mut annual = false;
    let mut birth_year = None;
    let mut start_age: u8 = 30;
    let mut gender = Gender::Male;
    let mut employment = EmploymentType::Employee;
    let mut growth = 0.02;
    let mut inflation = 0.02;
    let mut investment_return = 0.07;
    let mut ss_return = 0.0;
    let mut retire_age = None;
    let mut terminal_age = None;
    let mut display = "CNY".to_string();

    let parse_err = |flag: &str, value: &str| {
        PensionError::ParseError(format!("invalid value '{}' for {}", value, flag))
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut take_value = |flag: &str| -> Result<String, PensionError> {
            iter.next()
                .cloned()
                .ok_or_else(|| PensionError::ParseError(format!("{} requires a value", flag)))
        };
        match arg.as_str() {
            "--annual" => annual = true,
            "--civil-servant" => employment = EmploymentType::CivilServant,
            "--birth-year" => {
                let v = take_value("--birth-year")?;
                birth_year = Some(v.parse().map_err(|_| parse_err("--birth-year", &v))?);
            }
            "--start-age" => {
                let v = take_value("--start-age")?;
                start_age = v.parse().map_err(|_| parse_err("--start-age", &v))?;
            }
            "--gender" => {
                gender = match take_value("--gender")?.to_lowercase().as_str() {
                    "male" => Gender::Male,
                    "female" => Gender::Female,
                    other => return Err(parse_err("--gender", other)),
                };
            }
            "--growth" => {
                let v = take_value("--growth")?;
                growth = v.parse().map_err(|_| parse_err("--growth", &v))?;
            }
            "--inflation" => {
                let v = take_value("--inflation")?;
                inflation = v.parse().map_err(|_| parse_err("--inflation", &v))?;
            }
            "--return" => {
                let v = take_value("--return")?;
                investment_return = v.parse().map_err(|_| parse_err("--return", &v))?;
            }
            "--ss-return" => {
                let v = take_value("--ss-return")?;
                ss_return = v.parse().map_err(|_| parse_err("--ss-return", &v))?;
            }
            "--retire-age" => {
                let v = take_value("--retire-age")?;
                retire_age = Some(v.parse().map_err(|_| parse_err("--retire-age", &v))?);
            }
            "--terminal-age" => {
                let v = take_value("--terminal-age")?;
                terminal_age = Some(v.parse().map_err(|_| parse_err("--terminal-age", &v))?);
            }
            "--display" => display = take_value("--display")?.to_uppercase(),
            flag if flag.starts_with("--") => {
                // Anything else in --X,Y form is the country-code selection
                codes = flag
                    .trim_start_matches("--")
                    .split(',')
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty())
                    .collect();
                if codes.is_empty() {
                    return Err(PensionError::ParseError(format!("no country codes in '{}'", flag)));
                }
            }
            positional => {
                if amount.is_some() {
                    return Err(PensionError::ParseError(format!(
                        "unexpected extra argument '{}'",
                        positional
                    )));
                }
                amount = Some(parse_amount(positional)?);
            }
        }
    }

    let salary = amount
        .ok_or_else(|| PensionError::ParseError("missing salary amount".to_string()))?;

    let current_year = chrono::Local::now().date_naive().year();
    let birth_year = birth_year.unwrap_or(current_year - start_age as i32);
    let person = Person::new(birth_year, gender, employment, birth_year + start_age as i32)?;

    Ok(CliOptions {
        request: AnalysisRequest {
            salary,
            country_codes: codes,
            person,
            contribution_start_age: start_age,
            salary_growth_rate: growth,
            inflation_rate: inflation,
            investment_return_rate: investment_return,
            social_security_return_rate: ss_return,
            retirement_age: retire_age,
            terminal_age,
            display_currency: display,
        },
        annual,
    })
}

fn print_comparison(results: &[CountryAnalysis]) {
    println!("Pension comparison ({} countries)", results.len());
    println!(
        "{:<4} {:<16} {:>6} {:>16} {:>18} {:>18} {:>8} {:>9}",
        "Code", "Country", "Age", "Monthly", "Contributions", "Benefits", "ROI", "Payback"
    );
    println!("{}", "-".repeat(102));

    for analysis in results {
        let r = &analysis.result;
        let payback = r
            .payback_age
            .map(|a| format!("{:.1}", a))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<16} {:>6} {:>12.2} {} {:>14.2} {} {:>14.2} {} {:>7.2} {:>9}",
            analysis.country_code,
            analysis.country_name,
            r.retirement_age,
            r.monthly_pension,
            r.currency,
            r.total_contributions,
            r.currency,
            r.total_benefit,
            r.currency,
            r.roi,
            payback,
        );
        if let Some(converted) = &analysis.converted {
            println!(
                "     in {}: monthly {:.2}, contributions {:.2}, benefits {:.2}",
                converted.currency,
                converted.monthly_pension,
                converted.total_contributions,
                converted.total_benefit,
            );
        }
    }
}

fn print_annual_json(results: &[CountryAnalysis]) -> Result<(), PensionError> {
    let mut value = serde_json::to_value(results)
        .map_err(|e| PensionError::ParseError(format!("serialization failed: {}", e)))?;
    round_numbers(&mut value);
    println!(
        "{}",
        serde_json::to_string_pretty(&value)
            .map_err(|e| PensionError::ParseError(format!("serialization failed: {}", e)))?
    );
    Ok(())
}

/// Round every float in the JSON tree to 2 decimals, ties to even.
fn round_numbers(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if n.as_i64().is_none() {
                    let rounded = (f * 100.0).round_ties_even() / 100.0;
                    if let Some(num) = serde_json::Number::from_f64(rounded) {
                        *n = num;
                    }
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(round_numbers),
        serde_json::Value::Object(map) => map.values_mut().for_each(round_numbers),
        _ => {}
    }
}

fn test_plugins(runner: &AnalysisRunner) -> Result<(), PensionError> {
    use pension_system::CurrencyAmount;

    println!("Running smoke calculations through every calculator...");
    let current_year = chrono::Local::now().date_naive().year();
    let person = Person::new(current_year - 30, Gender::Male, EmploymentType::Employee, current_year)?;
    let request = AnalysisRequest {
        salary: CurrencyAmount::new(15_000.0, "CNY"),
        country_codes: runner.registry().list_codes(),
        person,
        contribution_start_age: 30,
        salary_growth_rate: 0.02,
        inflation_rate: 0.02,
        investment_return_rate: 0.07,
        social_security_return_rate: 0.0,
        retirement_age: None,
        terminal_age: None,
        display_currency: "CNY".to_string(),
    };

    let results = runner.run(&request)?;
    for analysis in &results {
        let ok = analysis.result.monthly_pension.is_finite()
            && analysis.result.monthly_pension >= 0.0
            && !analysis.result.ledger.is_empty();
        println!(
            "  {}  {}  {}",
            analysis.country_code,
            if ok { "OK" } else { "FAIL" },
            format_args!(
                "monthly {:.2} {} over {} ledger years",
                analysis.result.monthly_pension,
                analysis.result.currency,
                analysis.result.ledger.len()
            )
        );
    }
    println!("Supported currencies: {}", supported_codes().join(", "));
    Ok(())
}
