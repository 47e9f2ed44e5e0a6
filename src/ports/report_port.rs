//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::metrics::PerformanceReport;
use std::path::Path;

/// Port for persisting a finished backtest.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        report: &PerformanceReport,
        output_dir: &Path,
    ) -> Result<(), TraderError>;
}
