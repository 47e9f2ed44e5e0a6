//! CSV report adapter implementing ReportPort.
//!
//! Writes `trades.csv`, `equity.csv` and a `summary.csv` of metric/value
//! pairs into the output directory, creating it when needed.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TraderError;
use crate::domain::metrics::PerformanceReport;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> TraderError {
    TraderError::Report {
        reason: format!("{}: {e}", path.display()),
    }
}

fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), TraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record([
        "code",
        "entry_date",
        "exit_date",
        "entry_price",
        "exit_price",
        "shares",
        "profit",
        "exit_reason",
    ])
    .map_err(|e| report_err(path, e))?;

    for trade in &result.portfolio.trades {
        wtr.write_record([
            trade.code.clone(),
            trade.entry_date.to_string(),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.entry_price),
            format!("{:.4}", trade.exit_price),
            trade.shares.to_string(),
            format!("{:.2}", trade.profit),
            trade.exit_reason.to_string(),
        ])
        .map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), TraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record(["date", "equity"])
        .map_err(|e| report_err(path, e))?;
    for point in &result.portfolio.equity_curve {
        wtr.write_record([point.date.to_string(), format!("{:.2}", point.equity)])
            .map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

fn write_summary(
    result: &BacktestResult,
    report: &PerformanceReport,
    path: &Path,
) -> Result<(), TraderError> {
    let optional = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}"));

    let mut rows: Vec<(String, String)> = vec![
        ("initial_capital".into(), format!("{:.2}", report.initial_capital)),
        ("final_equity".into(), format!("{:.2}", report.final_equity)),
        ("total_return".into(), format!("{:.6}", report.total_return)),
        ("benchmark_return".into(), optional(report.benchmark_return)),
        ("excess_return".into(), optional(report.excess_return)),
        ("max_drawdown".into(), format!("{:.6}", report.max_drawdown)),
        (
            "max_drawdown_duration".into(),
            report.max_drawdown_duration.to_string(),
        ),
        ("sharpe_ratio".into(), format!("{:.4}", report.sharpe_ratio)),
        ("total_trades".into(), report.total_trades.to_string()),
        ("trades_won".into(), report.trades_won.to_string()),
        ("trades_lost".into(), report.trades_lost.to_string()),
        ("win_rate".into(), format!("{:.4}", report.win_rate)),
        ("profit_factor".into(), format!("{:.4}", report.profit_factor)),
        ("avg_win".into(), format!("{:.2}", report.avg_win)),
        ("avg_loss".into(), format!("{:.2}", report.avg_loss)),
        ("largest_win".into(), format!("{:.2}", report.largest_win)),
        ("largest_loss".into(), format!("{:.2}", report.largest_loss)),
        ("avg_holding_days".into(), format!("{:.2}", report.avg_holding_days)),
    ];
    for (reason, count) in &report.exits_by_reason {
        rows.push((format!("exits_{reason}"), count.to_string()));
    }
    if let Some(regime) = &result.final_regime {
        rows.push(("final_regime".into(), regime.label.to_string()));
        rows.push(("final_regime_score".into(), regime.score.to_string()));
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record(["metric", "value"])
        .map_err(|e| report_err(path, e))?;
    for (metric, value) in rows {
        wtr.write_record([metric, value])
            .map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        report: &PerformanceReport,
        output_dir: &Path,
    ) -> Result<(), TraderError> {
        fs::create_dir_all(output_dir).map_err(|e| report_err(output_dir, e))?;
        write_trades(result, &output_dir.join("trades.csv"))?;
        write_equity(result, &output_dir.join("equity.csv"))?;
        write_summary(result, report, &output_dir.join("summary.csv"))?;
        info!(dir = %output_dir.display(), "report written");
        Ok(())
    }
}
