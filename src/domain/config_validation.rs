//! Configuration validation.
//!
//! Validates every config field a run depends on before the engine starts.
//! Absent keys fall back to their defaults and are only rejected when
//! required.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_dates(config)?;
    validate_position_sizing(config)?;
    validate_pool(config)?;
    validate_momentum(config)?;
    validate_score_threshold(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_strategy_kind(config)?;
    validate_channel(config)?;
    validate_entry_filters(config)?;
    validate_ma_cross(config)?;
    Ok(())
}

pub fn validate_regime_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    at_least(config, "regime", "index_ma_days", 20, 1)?;
    if config.get_double("regime", "turnover_threshold", 800_000_000_000.0) < 0.0 {
        return Err(TraderError::invalid(
            "regime",
            "turnover_threshold",
            "turnover_threshold must be non-negative",
        ));
    }
    at_least(config, "regime", "chain_height_threshold", 4, 0)?;

    let placeholders = config.get_int("regime", "placeholder_checks", 0);
    if !(0..=4).contains(&placeholders) {
        return Err(TraderError::invalid(
            "regime",
            "placeholder_checks",
            "placeholder_checks must be between 0 and 4",
        ));
    }

    let offensive = config.get_int("regime", "offensive_score", 3);
    let defensive = config.get_int("regime", "defensive_score", 2);
    if defensive < 0 {
        return Err(TraderError::invalid(
            "regime",
            "defensive_score",
            "defensive_score must be non-negative",
        ));
    }
    if offensive < defensive {
        return Err(TraderError::invalid(
            "regime",
            "offensive_score",
            "offensive_score must not be below defensive_score",
        ));
    }
    if offensive > 4 + placeholders {
        return Err(TraderError::invalid(
            "regime",
            "offensive_score",
            "offensive_score exceeds the maximum attainable score",
        ));
    }
    Ok(())
}

/// Integer key with `default` when absent; rejected below `min`.
fn at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
) -> Result<(), TraderError> {
    if config.get_int(section, key, default) < min {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{key} must be at least {min}"),
        ));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_double("backtest", "initial_capital", 1_000_000.0);
    if value <= 0.0 {
        return Err(TraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_double("backtest", "commission_rate", 0.0003);
    if !(0.0..1.0).contains(&value) {
        return Err(TraderError::invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(TraderError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// Required `[backtest]` date in YYYY-MM-DD form.
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, TraderError> {
    match config.get_string("backtest", field) {
        None => Err(TraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TraderError::invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_position_sizing(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let fraction = config.get_double("backtest", "position_fraction", 0.2);
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(TraderError::invalid(
            "backtest",
            "position_fraction",
            "position_fraction must be in (0, 1]",
        ));
    }
    at_least(config, "backtest", "max_positions", 3, 1)
}

fn validate_pool(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_list("backtest", "pool") {
        Some(codes) if codes.is_empty() => Err(TraderError::invalid(
            "backtest",
            "pool",
            "pool must list at least one code",
        )),
        _ => Ok(()),
    }
}

fn validate_momentum(config: &dyn ConfigPort) -> Result<(), TraderError> {
    at_least(config, "backtest", "momentum_days", 30, 1)?;
    at_least(config, "backtest", "momentum_min_bars", 10, 1)?;
    at_least(config, "backtest", "top_k", 3, 1)
}

fn validate_score_threshold(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let value = config.get_int("backtest", "score_threshold", 3);
    if !(0..=u8::MAX as i64).contains(&value) {
        return Err(TraderError::invalid(
            "backtest",
            "score_threshold",
            "score_threshold must be a non-negative score",
        ));
    }
    Ok(())
}

fn validate_strategy_kind(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("strategy", "kind").as_deref().map(str::trim) {
        None | Some("channel") | Some("ma_cross") => Ok(()),
        Some(other) => Err(TraderError::invalid(
            "strategy",
            "kind",
            format!("unknown strategy kind '{other}', expected channel or ma_cross"),
        )),
    }
}

fn validate_channel(config: &dyn ConfigPort) -> Result<(), TraderError> {
    at_least(config, "strategy", "lookback_period", 120, 3)?;
    at_least(config, "strategy", "trough_distance", 10, 1)?;
    if config.get_double("strategy", "slope_threshold", 0.05) <= 0.0 {
        return Err(TraderError::invalid(
            "strategy",
            "slope_threshold",
            "slope_threshold must be positive",
        ));
    }
    if config.get_double("strategy", "prominence", 0.5) < 0.0 {
        return Err(TraderError::invalid(
            "strategy",
            "prominence",
            "prominence must be non-negative",
        ));
    }
    Ok(())
}

fn validate_entry_filters(config: &dyn ConfigPort) -> Result<(), TraderError> {
    at_least(config, "strategy", "min_history", 60, 1)?;
    at_least(config, "strategy", "ma_window", 10, 1)?;
    at_least(config, "strategy", "volume_ma_window", 10, 1)?;

    let band = config.get_double("strategy", "band_pct", 0.02);
    if !(0.0..1.0).contains(&band) {
        return Err(TraderError::invalid(
            "strategy",
            "band_pct",
            "band_pct must be in [0, 1)",
        ));
    }
    if config.get_double("strategy", "volume_multiplier", 1.2) < 0.0 {
        return Err(TraderError::invalid(
            "strategy",
            "volume_multiplier",
            "volume_multiplier must be non-negative",
        ));
    }
    let buffer = config.get_double("strategy", "stop_buffer", 0.98);
    if buffer <= 0.0 || buffer > 1.0 {
        return Err(TraderError::invalid(
            "strategy",
            "stop_buffer",
            "stop_buffer must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_ma_cross(config: &dyn ConfigPort) -> Result<(), TraderError> {
    at_least(config, "strategy", "short_ma", 20, 1)?;
    at_least(config, "strategy", "long_ma", 60, 1)?;
    if config.get_int("strategy", "short_ma", 20) >= config.get_int("strategy", "long_ma", 60) {
        return Err(TraderError::invalid(
            "strategy",
            "short_ma",
            "short_ma must be shorter than long_ma",
        ));
    }
    let stop = config.get_double("strategy", "stop_loss_pct", 0.10);
    if !(0.0..1.0).contains(&stop) {
        return Err(TraderError::invalid(
            "strategy",
            "stop_loss_pct",
            "stop_loss_pct must be in [0, 1)",
        ));
    }
    Ok(())
}
