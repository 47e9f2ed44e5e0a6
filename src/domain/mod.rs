//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod indicator;
pub mod peaks;
pub mod channel;
pub mod regime;
pub mod position;
pub mod portfolio;
pub mod market_data;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
