//! Backtest engine and daily event loop.
//!
//! Trading days come from the benchmark's bars inside the configured window.
//! Each day runs to completion in a fixed order:
//!
//! 1. exit pass over open positions, using each position's stored channel
//! 2. regime score for the day, or a forced full score
//! 3. admission: score at or above threshold and room under the position cap
//! 4. momentum ranking of the stock pool
//! 5. entry pass over the top candidates, buying a fraction of current cash
//! 6. day-end equity record
//!
//! The engine owns its portfolio for the run. Concurrent runs need their own
//! engine and share nothing.

use crate::domain::channel::{detect, ChannelParams};
use crate::domain::error::TraderError;
use crate::domain::indicator::momentum::window_momentum;
use crate::domain::market_data::MarketData;
use crate::domain::ohlcv::{closes, PriceBar};
use crate::domain::portfolio::{BuyOutcome, Portfolio};
use crate::domain::price_series::PriceSeries;
use crate::domain::regime::{RegimeConfig, RegimeJudge, RegimeResult};
use crate::domain::strategy::Strategy;
use crate::ports::alert_port::AlertSink;
use crate::ports::data_port::MarketDataSource;
use crate::ports::feed_port::MarketFeed;
use chrono::NaiveDate;
use tracing::{debug, info};

pub const DEFAULT_STOCK_POOL: [&str; 6] = ["600519", "601318", "600036", "000651", "000858", "002475"];

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumConfig {
    pub window_days: i64,
    pub min_bars: usize,
    pub top_k: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        MomentumConfig {
            window_days: 30,
            min_bars: 10,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub benchmark_code: String,
    pub regime_index_code: String,
    pub score_threshold: u8,
    pub force_offensive: bool,
    pub max_positions: usize,
    pub position_fraction: f64,
    pub stock_pool: Vec<String>,
    pub momentum: MomentumConfig,
    /// Channel fitted at entry and stored on the position.
    pub channel: ChannelParams,
    pub regime: RegimeConfig,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            initial_capital: 1_000_000.0,
            commission_rate: 0.0003,
            benchmark_code: "000001".into(),
            regime_index_code: "000001".into(),
            score_threshold: 3,
            force_offensive: false,
            max_positions: 3,
            position_fraction: 0.2,
            stock_pool: DEFAULT_STOCK_POOL.iter().map(|c| c.to_string()).collect(),
            momentum: MomentumConfig::default(),
            channel: ChannelParams::default(),
            regime: RegimeConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub trading_days: Vec<NaiveDate>,
    /// Regime on the last trading day.
    pub final_regime: Option<RegimeResult>,
    /// Benchmark bars inside the backtest window.
    pub benchmark: Vec<PriceBar>,
}

pub struct BacktestEngine<'a> {
    config: &'a BacktestConfig,
    strategy: &'a dyn Strategy,
    source: &'a dyn MarketDataSource,
    feed: &'a dyn MarketFeed,
    alerts: &'a dyn AlertSink,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(
        config: &'a BacktestConfig,
        strategy: &'a dyn Strategy,
        source: &'a dyn MarketDataSource,
        feed: &'a dyn MarketFeed,
        alerts: &'a dyn AlertSink,
    ) -> Self {
        Self {
            config,
            strategy,
            source,
            feed,
            alerts,
        }
    }

    pub fn run(&self) -> Result<BacktestResult, TraderError> {
        let config = self.config;
        info!(
            strategy = self.strategy.name(),
            start = %config.start_date,
            end = %config.end_date,
            threshold = config.score_threshold,
            force_offensive = config.force_offensive,
            "starting backtest"
        );

        let data = MarketData::load(
            self.source,
            &config.stock_pool,
            &[
                config.benchmark_code.as_str(),
                config.regime_index_code.as_str(),
            ],
        );

        let benchmark = data
            .get(&config.benchmark_code)
            .ok_or_else(|| TraderError::NoBenchmark {
                code: config.benchmark_code.clone(),
            })?;
        let window = benchmark.between(config.start_date, config.end_date);
        if window.is_empty() {
            return Err(TraderError::NoTradingDays {
                code: config.benchmark_code.clone(),
                start: config.start_date,
                end: config.end_date,
            });
        }
        let trading_days: Vec<NaiveDate> = window.iter().map(|b| b.date).collect();

        let empty_index = PriceSeries::empty(config.regime_index_code.as_str());
        let regime_index = data.get(&config.regime_index_code).unwrap_or(&empty_index);
        let judge = RegimeJudge::new(config.regime.clone(), self.feed);

        let mut portfolio = Portfolio::new(config.initial_capital, config.commission_rate);
        let mut final_regime = None;

        for &day in &trading_days {
            self.exit_pass(day, &data, &mut portfolio);

            let regime = if config.force_offensive {
                RegimeResult::forced_offensive(day, &config.regime)
            } else {
                judge.score(day, regime_index)
            };
            debug!(%day, score = regime.score, label = %regime.label, "regime");

            if regime.score >= config.score_threshold
                && portfolio.position_count() < config.max_positions
            {
                let candidates =
                    momentum_candidates(&data, &config.stock_pool, day, &config.momentum);
                self.entry_pass(day, &candidates, &data, &mut portfolio);
            }

            portfolio.record_equity(day, &data);
            final_regime = Some(regime);
        }

        info!(
            days = trading_days.len(),
            trades = portfolio.trades.len(),
            open_positions = portfolio.position_count(),
            final_equity = portfolio.equity_curve.last().map(|p| p.equity),
            "backtest complete"
        );

        Ok(BacktestResult {
            portfolio,
            trading_days,
            final_regime,
            benchmark: window.to_vec(),
        })
    }

    fn exit_pass(&self, day: NaiveDate, data: &MarketData, portfolio: &mut Portfolio) {
        let held: Vec<String> = portfolio.positions.keys().cloned().collect();
        for code in held {
            let Some(series) = data.get(&code) else {
                continue;
            };
            let signal = match portfolio.get_position(&code) {
                Some(position) => self.strategy.check_exit(series, day, position),
                None => continue,
            };
            let Some(signal) = signal else {
                continue;
            };
            if let Some(trade) = portfolio.sell(&code, day, signal.price, signal.reason) {
                info!(
                    code = %trade.code,
                    %day,
                    price = trade.exit_price,
                    reason = %trade.exit_reason,
                    profit = trade.profit,
                    "sell"
                );
                self.alerts.notify(&format!(
                    "{day} SELL {} x{} @ {:.2} ({}) profit {:.2}",
                    trade.code, trade.shares, trade.exit_price, trade.exit_reason, trade.profit
                ));
            }
        }
    }

    fn entry_pass(
        &self,
        day: NaiveDate,
        candidates: &[String],
        data: &MarketData,
        portfolio: &mut Portfolio,
    ) {
        for code in candidates {
            if portfolio.has_position(code) {
                continue;
            }
            let Some(series) = data.get(code) else {
                continue;
            };
            if !self.strategy.check_entry(series, day) {
                continue;
            }

            let history = closes(series.up_to(day));
            let Some(channel) = detect(&history, &self.config.channel) else {
                debug!(code = %code, %day, "entry signal without channel, skipped");
                continue;
            };

            let budget = portfolio.cash * self.config.position_fraction;
            if let BuyOutcome::Filled { shares, price, .. } =
                portfolio.buy(code, day, budget, channel, data)
            {
                info!(code = %code, %day, shares, price, "buy");
                self.alerts
                    .notify(&format!("{day} BUY {code} x{shares} @ {price:.2}"));
            }

            if portfolio.position_count() >= self.config.max_positions {
                break;
            }
        }
    }
}

/// Rank `pool` by momentum over the configured window and keep the top
/// `top_k` with strictly positive momentum. Ties keep pool order.
pub fn momentum_candidates(
    data: &MarketData,
    pool: &[String],
    date: NaiveDate,
    config: &MomentumConfig,
) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = pool
        .iter()
        .filter_map(|code| {
            let series = data.get(code)?;
            let m = window_momentum(series.bars(), date, config.window_days, config.min_bars)?;
            (m > 0.0).then_some((code, m))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(config.top_k)
        .map(|(code, _)| code.clone())
        .collect()
}

/// Run one independent backtest per admission threshold.
pub fn run_threshold_sweep(
    base: &BacktestConfig,
    thresholds: &[u8],
    strategy: &dyn Strategy,
    source: &dyn MarketDataSource,
    feed: &dyn MarketFeed,
    alerts: &dyn AlertSink,
) -> Result<Vec<(u8, BacktestResult)>, TraderError> {
    thresholds
        .iter()
        .map(|&threshold| {
            let config = BacktestConfig {
                score_threshold: threshold,
                ..base.clone()
            };
            let result = BacktestEngine::new(&config, strategy, source, feed, alerts).run()?;
            Ok((threshold, result))
        })
        .collect()
}
