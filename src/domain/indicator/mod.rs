//! Commodity indicator helpers shared by the regime judge, the strategies
//! and the performance report.
//!
//! - [`sma`]: trailing and rolling simple moving averages
//! - [`momentum`]: percentage change over a calendar window
//! - [`stddev`]: mean and sample standard deviation

pub mod momentum;
pub mod sma;
pub mod stddev;
