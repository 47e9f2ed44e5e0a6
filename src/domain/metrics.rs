//! Performance statistics over a finished run.
//!
//! Returns are fractions (0.10 = 10%). Drawdown is reported as a
//! non-positive fraction of the running peak.

use super::indicator::stddev::{mean, sample_stddev};
use super::ohlcv::PriceBar;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::ExitReason;
use std::collections::BTreeMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    /// Price-only change of the benchmark over the window.
    pub benchmark_return: Option<f64>,
    pub excess_return: Option<f64>,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
    pub exits_by_reason: BTreeMap<ExitReason, usize>,
}

impl PerformanceReport {
    pub fn compute(portfolio: &Portfolio, benchmark: &[PriceBar]) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let trades = &portfolio.trades;
        let initial_capital = portfolio.initial_capital;

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let benchmark_return = match (benchmark.first(), benchmark.last()) {
            (Some(first), Some(last)) if first.close > 0.0 => {
                Some((last.close - first.close) / first.close)
            }
            _ => None,
        };
        let excess_return = benchmark_return.map(|b| total_return - b);

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let sharpe_ratio = compute_sharpe(equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_holding_days = 0i64;
        let mut exits_by_reason = BTreeMap::new();

        for trade in trades {
            let profit = trade.profit;
            if trade.is_win() {
                trades_won += 1;
                total_wins += profit;
                largest_win = largest_win.max(profit);
            } else {
                trades_lost += 1;
                total_losses += profit.abs();
                largest_loss = largest_loss.max(profit.abs());
            }
            total_holding_days += trade.holding_days();
            *exits_by_reason.entry(trade.exit_reason).or_insert(0) += 1;
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_holding_days = if total_trades > 0 {
            total_holding_days as f64 / total_trades as f64
        } else {
            0.0
        };

        PerformanceReport {
            initial_capital,
            final_equity,
            total_return,
            benchmark_return,
            excess_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_days,
            exits_by_reason,
        }
    }
}

/// Deepest `(value - running_max) / running_max`, and the longest run of
/// consecutive points spent below a prior peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_duration = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((point.equity - peak) / peak);
        }
        current_duration += 1;
        max_duration = max_duration.max(current_duration);
    }

    (max_dd, max_duration)
}

/// Annualized mean over sample standard deviation of daily returns.
/// Zero with fewer than two returns or no variation.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let (prev, curr) = (w[0].equity, w[1].equity);
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    match (mean(&returns), sample_stddev(&returns)) {
        (Some(m), Some(sd)) if sd > 0.0 => m / sd * TRADING_DAYS_PER_YEAR.sqrt(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Trade;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: start() + Duration::days(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_portfolio(equity: &[f64], trades: Vec<Trade>) -> Portfolio {
        let initial = equity.first().copied().unwrap_or(100_000.0);
        let mut portfolio = Portfolio::new(initial, 0.0003);
        portfolio.trades = trades;
        portfolio.equity_curve = make_equity_curve(equity);
        portfolio
    }

    fn make_trade(code: &str, profit: f64, days: i64, reason: ExitReason) -> Trade {
        Trade {
            code: code.to_string(),
            entry_date: start(),
            exit_date: start() + Duration::days(days),
            entry_price: 100.0,
            exit_price: 100.0 + profit / 100.0,
            shares: 100,
            profit,
            exit_reason: reason,
        }
    }

    fn benchmark(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start() + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
                turnover: 0.0,
            })
            .collect()
    }

    #[test]
    fn empty_portfolio() {
        let portfolio = Portfolio::new(100_000.0, 0.0003);
        let report = PerformanceReport::compute(&portfolio, &[]);
        assert_abs_diff_eq!(report.total_return, 0.0);
        assert_abs_diff_eq!(report.final_equity, 100_000.0);
        assert_eq!(report.total_trades, 0);
        assert!(report.benchmark_return.is_none());
        assert!(report.excess_return.is_none());
        assert_abs_diff_eq!(report.sharpe_ratio, 0.0);
    }

    #[test]
    fn total_and_benchmark_returns() {
        let portfolio = make_portfolio(&[100_000.0, 105_000.0, 110_000.0], vec![]);
        let report = PerformanceReport::compute(&portfolio, &benchmark(&[3000.0, 3100.0, 3150.0]));
        assert_abs_diff_eq!(report.total_return, 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(report.benchmark_return.unwrap(), 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(report.excess_return.unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn negative_total_return() {
        let portfolio = make_portfolio(&[100_000.0, 90_000.0], vec![]);
        let report = PerformanceReport::compute(&portfolio, &[]);
        assert_abs_diff_eq!(report.total_return, -0.10, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_is_negative_fraction_of_peak() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let (dd, _) = compute_drawdown(&curve);
        assert_abs_diff_eq!(dd, (80.0 - 110.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_duration() {
        let curve = make_equity_curve(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0, 120.0, 119.0]);
        let (_, duration) = compute_drawdown(&curve);
        assert_eq!(duration, 4);
    }

    #[test]
    fn monotonic_curve_has_no_drawdown() {
        let curve = make_equity_curve(&[100.0, 100.0, 101.0, 105.0]);
        assert_eq!(compute_drawdown(&curve), (0.0, 0));
    }

    #[test]
    fn sharpe_uses_sample_stddev() {
        // Returns +10%, -10%, +10%.
        let curve = make_equity_curve(&[100.0, 110.0, 99.0, 108.9]);
        let returns = [0.1, -0.1, 0.1];
        let m = returns.iter().sum::<f64>() / 3.0;
        let var = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / 2.0;
        let expected = m / var.sqrt() * 252.0_f64.sqrt();
        assert_abs_diff_eq!(compute_sharpe(&curve), expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_zero_for_flat_curve() {
        let curve = make_equity_curve(&[100.0, 100.0, 100.0]);
        assert_abs_diff_eq!(compute_sharpe(&curve), 0.0);
        assert_abs_diff_eq!(compute_sharpe(&make_equity_curve(&[100.0, 101.0])), 0.0);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![
            make_trade("A", 100.0, 5, ExitReason::TakeProfit),
            make_trade("B", -50.0, 3, ExitReason::StopLoss),
            make_trade("C", 200.0, 10, ExitReason::TakeProfit),
            make_trade("D", 0.0, 2, ExitReason::StopLoss),
        ];
        let portfolio = make_portfolio(&[100_000.0, 100_250.0], trades);
        let report = PerformanceReport::compute(&portfolio, &[]);

        assert_eq!(report.total_trades, 4);
        assert_eq!(report.trades_won, 2);
        assert_eq!(report.trades_lost, 2);
        assert_abs_diff_eq!(report.win_rate, 0.5);
        assert_abs_diff_eq!(report.profit_factor, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.avg_win, 150.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.avg_loss, 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.largest_win, 200.0);
        assert_abs_diff_eq!(report.largest_loss, 50.0);
        assert_abs_diff_eq!(report.avg_holding_days, 5.0, epsilon = 1e-12);
        assert_eq!(report.exits_by_reason[&ExitReason::TakeProfit], 2);
        assert_eq!(report.exits_by_reason[&ExitReason::StopLoss], 2);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let trades = vec![make_trade("A", 100.0, 5, ExitReason::TakeProfit)];
        let portfolio = make_portfolio(&[100_000.0, 100_100.0], trades);
        let report = PerformanceReport::compute(&portfolio, &[]);
        assert!(report.profit_factor.is_infinite());
    }
}
