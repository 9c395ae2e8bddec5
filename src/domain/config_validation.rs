//! Configuration validation.
//!
//! Checks every key a run reads before any data is loaded, so a bad INI file
//! fails fast with the section and key that caused it.

use crate::domain::error::SigtraderError;
use crate::domain::rule_signal::{DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const THRESHOLD_MIN: f64 = 0.0;
const THRESHOLD_MAX: f64 = 100.0;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SigtraderError {
    SigtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_data_path(config)?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_thresholds(config)?;
    validate_sweep(config)?;
    Ok(())
}

/// Read an optional numeric key, rejecting text that does not parse.
pub fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
    }
}

/// Read an optional YYYY-MM-DD key.
pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SigtraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, "invalid date format, expected YYYY-MM-DD")),
    }
}

/// Read a comma-separated list of numbers. An absent key is an empty list.
pub fn parse_number_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Vec<f64>, SigtraderError> {
    config
        .get_list(section, key)
        .unwrap_or_default()
        .iter()
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| invalid(section, key, format!("'{}' is not a number", item)))
        })
        .collect()
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    match config.get_string("data", "path") {
        Some(p) if !p.trim().is_empty() => Ok(()),
        _ => Err(SigtraderError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let start = parse_date(config, "data", "start_date")?;
    let end = parse_date(config, "data", "end_date")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid("data", "start_date", "start_date must not be after end_date"));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if let Some(value) = parse_number(config, "backtest", "initial_capital")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if let Some(value) = parse_number(config, "backtest", "risk_free_rate")? {
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn check_threshold(section: &str, key: &str, value: f64) -> Result<(), SigtraderError> {
    if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&value) {
        return Err(invalid(section, key, format!("{} must be between 0 and 100", key)));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let oversold = parse_number(config, "rules", "oversold")?
        .unwrap_or(DEFAULT_OVERSOLD);
    let overbought = parse_number(config, "rules", "overbought")?
        .unwrap_or(DEFAULT_OVERBOUGHT);

    check_threshold("rules", "oversold", oversold)?;
    check_threshold("rules", "overbought", overbought)?;
    if oversold >= overbought {
        return Err(invalid("rules", "oversold", "oversold must be below overbought"));
    }
    Ok(())
}

fn validate_sweep(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    if !config.has_section("sweep") {
        return Ok(());
    }
    let oversold = parse_number_list(config, "sweep", "oversold")?;
    let overbought = parse_number_list(config, "sweep", "overbought")?;

    for &v in &oversold {
        check_threshold("sweep", "oversold", v)?;
    }
    for &v in &overbought {
        check_threshold("sweep", "overbought", v)?;
    }
    if oversold.is_empty() || overbought.is_empty() {
        return Err(invalid(
            "sweep",
            "oversold",
            "sweep needs at least one oversold and one overbought level",
        ));
    }
    let any_valid = oversold.iter().any(|lo| overbought.iter().any(|hi| lo < hi));
    if !any_valid {
        return Err(invalid(
            "sweep",
            "overbought",
            "no oversold level is below any overbought level",
        ));
    }
    Ok(())
}
