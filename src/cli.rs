//! CLI definition and dispatch.
//!
//! The composition root: every adapter and config value the engine sees is
//! built here from the INI file.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::alert_adapter::{FileAlertSink, LogAlertSink};
use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::feed_adapter::{CsvFeedAdapter, NoFeed};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    run_threshold_sweep, BacktestConfig, BacktestEngine, BacktestResult, MomentumConfig,
    DEFAULT_STOCK_POOL,
};
use crate::domain::channel::{detect, ChannelParams};
use crate::domain::config_validation::{
    parse_date, validate_backtest_config, validate_regime_config, validate_strategy_config,
};
use crate::domain::error::TraderError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::ohlcv::closes;
use crate::domain::regime::{RegimeConfig, RegimeJudge, RegimeResult};
use crate::domain::strategy::{
    ChannelStrategy, ChannelStrategyConfig, MaCrossConfig, MaCrossStrategy, Strategy,
};
use crate::logging::init_logging;
use crate::ports::alert_port::AlertSink;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataSource;
use crate::ports::feed_port::MarketFeed;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "channeltrader", about = "Trend-channel backtester")]
pub struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bypass the regime judge and trade every day
        #[arg(long)]
        force_offensive: bool,
        /// Override [backtest] score_threshold
        #[arg(long)]
        threshold: Option<u8>,
        /// Report directory, overrides [report] dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run one backtest per regime score threshold
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_delimiter = ',', default_value = "3,2,1")]
        thresholds: Vec<u8>,
    },
    /// Print the trend channel for one instrument
    Channel {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        /// Evaluation date, defaults to the last bar
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the market regime for one date
    Regime {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    match cli.command {
        Command::Backtest {
            config,
            force_offensive,
            threshold,
            output,
        } => run_backtest(&config, force_offensive, threshold, output.as_ref()),
        Command::Sweep { config, thresholds } => run_sweep(&config, &thresholds),
        Command::Channel { config, code, date } => run_channel(&config, &code, date),
        Command::Regime { config, date } => run_regime(&config, date),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: TraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn validate_all(adapter: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_backtest_config(adapter)?;
    validate_strategy_config(adapter)?;
    validate_regime_config(adapter)
}

fn run_backtest(
    config_path: &Path,
    force_offensive: bool,
    threshold: Option<u8>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }

    // Stage 3: Build config and strategy
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    bt_config.force_offensive |= force_offensive;
    if let Some(t) = threshold {
        bt_config.score_threshold = t;
    }
    let strategy = build_strategy(&adapter);
    eprintln!("Strategy: {}", strategy.name());

    // Stage 4: Collaborators
    let source = build_data_source(&adapter);
    let feed = match build_feed(&adapter) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    let alerts = build_alert_sink(&adapter);
    let output = output_path
        .cloned()
        .or_else(|| adapter.get_string("report", "dir").map(PathBuf::from));

    run_backtest_pipeline(
        &bt_config,
        strategy.as_ref(),
        &source,
        feed.as_ref(),
        alerts.as_ref(),
        output.as_deref(),
    )
}

/// Stages 5-7: run the engine, print the summary, write the report.
pub fn run_backtest_pipeline(
    bt_config: &BacktestConfig,
    strategy: &dyn Strategy,
    source: &dyn MarketDataSource,
    feed: &dyn MarketFeed,
    alerts: &dyn AlertSink,
    output: Option<&Path>,
) -> ExitCode {
    // Stage 5: Run backtest
    eprintln!(
        "Running backtest: {} codes, {} to {}, threshold {}{}",
        bt_config.stock_pool.len(),
        bt_config.start_date,
        bt_config.end_date,
        bt_config.score_threshold,
        if bt_config.force_offensive {
            " (forced offensive)"
        } else {
            ""
        },
    );
    let result = match BacktestEngine::new(bt_config, strategy, source, feed, alerts).run() {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    eprintln!("  Processed: {} trading days", result.trading_days.len());

    // Stage 6: Metrics and console summary
    let report = PerformanceReport::compute(&result.portfolio, &result.benchmark);
    print_summary("Backtest Results", &result, &report);

    // Stage 7: Report files
    if let Some(dir) = output {
        if let Err(e) = CsvReportAdapter::new().write(&result, &report, dir) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(title: &str, result: &BacktestResult, report: &PerformanceReport) {
    let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0));

    eprintln!("\n=== {title} ===");
    eprintln!("Initial Capital:  {:.2}", report.initial_capital);
    eprintln!("Final Equity:     {:.2}", report.final_equity);
    eprintln!("Total Return:     {:.2}%", report.total_return * 100.0);
    eprintln!("Benchmark:        {}", pct(report.benchmark_return));
    eprintln!("Excess Return:    {}", pct(report.excess_return));
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.2}%", report.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", report.total_trades);
    eprintln!("Win Rate:         {:.1}%", report.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", report.profit_factor);
    eprintln!("Avg Win:          {:.2}", report.avg_win);
    eprintln!("Avg Loss:         {:.2}", report.avg_loss);
    eprintln!("Largest Win:      {:.2}", report.largest_win);
    eprintln!("Largest Loss:     {:.2}", report.largest_loss);
    eprintln!("Avg Holding Days: {:.1}", report.avg_holding_days);

    if !report.exits_by_reason.is_empty() {
        eprintln!("\n=== Exits ===");
        for (reason, count) in &report.exits_by_reason {
            eprintln!("  {reason}: {count}");
        }
    }
    if let Some(regime) = &result.final_regime {
        eprintln!("\nFinal Regime:     {} (score {})", regime.label, regime.score);
    }
    let open = result.portfolio.position_count();
    if open > 0 {
        eprintln!("Open Positions:   {open}");
    }
}

fn run_sweep(config_path: &Path, thresholds: &[u8]) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }
    let base = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = build_strategy(&adapter);
    let source = build_data_source(&adapter);
    let feed = match build_feed(&adapter) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    let alerts = build_alert_sink(&adapter);

    eprintln!(
        "Sweeping thresholds {:?} over {} to {}",
        thresholds, base.start_date, base.end_date
    );
    let runs = match run_threshold_sweep(
        &base,
        thresholds,
        strategy.as_ref(),
        &source,
        feed.as_ref(),
        alerts.as_ref(),
    ) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    for (threshold, result) in &runs {
        let report = PerformanceReport::compute(&result.portfolio, &result.benchmark);
        print_summary(&format!("Threshold >= {threshold}"), result, &report);
    }
    ExitCode::SUCCESS
}

fn run_channel(config_path: &Path, code: &str, date: Option<NaiveDate>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(e);
    }
    let params = build_channel_params(&adapter);
    let source = build_data_source(&adapter);

    let series = match source.get_series(code) {
        Ok(Some(s)) => s,
        Ok(None) => {
            return fail(TraderError::Data {
                reason: format!("no data for {code}"),
            });
        }
        Err(e) => return fail(e),
    };
    let Some(last) = series.bars().last() else {
        return fail(TraderError::Data {
            reason: format!("no data for {code}"),
        });
    };
    let date = date.unwrap_or(last.date);
    let history = series.up_to(date);
    let Some(today) = history.last() else {
        return fail(TraderError::Data {
            reason: format!("{code} has no bars on or before {date}"),
        });
    };

    eprintln!("Channel for {code} as of {date} ({} bars)", history.len());
    match detect(&closes(history), &params) {
        Some(ch) => {
            let idx = history.len() - 1;
            eprintln!("Slope:            {:.4}", ch.slope);
            eprintln!("Intercept:        {:.4}", ch.intercept);
            eprintln!("Width:            {:.4}", ch.width());
            eprintln!(
                "Anchors:          {} ({}), {} ({})",
                ch.p1_index, history[ch.p1_index].date, ch.p2_index, history[ch.p2_index].date
            );
            eprintln!(
                "Upper Peak:       {} ({})",
                ch.peak_index, history[ch.peak_index].date
            );
            eprintln!("Close:            {:.2}", today.close);
            eprintln!("Lower Rail:       {:.2}", ch.lower_at(idx));
            eprintln!("Upper Rail:       {:.2}", ch.upper_at(idx));
        }
        None => eprintln!("No qualifying channel."),
    }
    ExitCode::SUCCESS
}

fn run_regime(config_path: &Path, date: NaiveDate) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_regime_config(&adapter) {
        return fail(e);
    }
    let regime = build_regime_config(&adapter);
    let index_code = adapter
        .get_string("backtest", "regime_index")
        .unwrap_or_else(|| "000001".to_string());
    let source = build_data_source(&adapter);
    let feed = match build_feed(&adapter) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };

    let index = match source.get_index_series(&index_code) {
        Ok(Some(s)) => s,
        Ok(None) => {
            return fail(TraderError::NoBenchmark { code: index_code });
        }
        Err(e) => return fail(e),
    };

    let result = RegimeJudge::new(regime, feed.as_ref()).score(date, &index);
    print_regime(&index_code, &result);
    ExitCode::SUCCESS
}

fn print_regime(index_code: &str, result: &RegimeResult) {
    eprintln!("Regime for {} (index {index_code})", result.date);
    if let Some(checks) = &result.checks {
        eprintln!("  Index Trend:    {:?}", checks.index_trend);
        eprintln!("  Turnover:       {:?}", checks.turnover);
        eprintln!("  Chain Height:   {:?}", checks.chain_height);
        eprintln!("  Northbound:     {:?}", checks.northbound);
    }
    eprintln!("Score:            {}", result.score);
    eprintln!("Label:            {}", result.label);
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        return fail(e);
    }
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = build_strategy(&adapter);

    eprintln!("\nStrategy:         {}", strategy.name());
    eprintln!(
        "Window:           {} to {}",
        bt_config.start_date, bt_config.end_date
    );
    eprintln!("Pool:             {}", bt_config.stock_pool.join(","));
    eprintln!("Score Threshold:  {}", bt_config.score_threshold);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn usize_key(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    adapter.get_int(section, key, default as i64).max(0) as usize
}

pub fn build_channel_params(adapter: &dyn ConfigPort) -> ChannelParams {
    let d = ChannelParams::default();
    ChannelParams {
        lookback_period: usize_key(adapter, "strategy", "lookback_period", d.lookback_period),
        trough_distance: usize_key(adapter, "strategy", "trough_distance", d.trough_distance),
        min_slope: adapter.get_double("strategy", "slope_threshold", d.min_slope),
        prominence: adapter.get_double("strategy", "prominence", d.prominence),
    }
}

pub fn build_regime_config(adapter: &dyn ConfigPort) -> RegimeConfig {
    let d = RegimeConfig::default();
    let small = |key: &str, default: u8| {
        adapter
            .get_int("regime", key, i64::from(default))
            .clamp(0, i64::from(u8::MAX)) as u8
    };
    RegimeConfig {
        index_ma_days: usize_key(adapter, "regime", "index_ma_days", d.index_ma_days),
        turnover_threshold: adapter.get_double("regime", "turnover_threshold", d.turnover_threshold),
        chain_height_threshold: adapter
            .get_int("regime", "chain_height_threshold", i64::from(d.chain_height_threshold))
            .clamp(0, i64::from(u32::MAX)) as u32,
        offensive_score: small("offensive_score", d.offensive_score),
        defensive_score: small("defensive_score", d.defensive_score),
        placeholder_checks: small("placeholder_checks", d.placeholder_checks),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TraderError> {
    let start_date = parse_date(adapter, "start_date")?;
    let end_date = parse_date(adapter, "end_date")?;
    let d = BacktestConfig::new(start_date, end_date);
    let m = MomentumConfig::default();

    let score_threshold = adapter.get_int("backtest", "score_threshold", i64::from(d.score_threshold));
    let score_threshold = u8::try_from(score_threshold).map_err(|_| {
        TraderError::invalid(
            "backtest",
            "score_threshold",
            "score_threshold must be a non-negative score",
        )
    })?;

    let stock_pool = adapter
        .get_list("backtest", "pool")
        .unwrap_or_else(|| DEFAULT_STOCK_POOL.iter().map(|c| c.to_string()).collect());

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", d.initial_capital),
        commission_rate: adapter.get_double("backtest", "commission_rate", d.commission_rate),
        benchmark_code: adapter
            .get_string("backtest", "benchmark")
            .unwrap_or(d.benchmark_code),
        regime_index_code: adapter
            .get_string("backtest", "regime_index")
            .unwrap_or(d.regime_index_code),
        score_threshold,
        force_offensive: adapter.get_bool("backtest", "force_offensive", d.force_offensive),
        max_positions: usize_key(adapter, "backtest", "max_positions", d.max_positions),
        position_fraction: adapter.get_double("backtest", "position_fraction", d.position_fraction),
        stock_pool,
        momentum: MomentumConfig {
            window_days: adapter.get_int("backtest", "momentum_days", m.window_days),
            min_bars: usize_key(adapter, "backtest", "momentum_min_bars", m.min_bars),
            top_k: usize_key(adapter, "backtest", "top_k", m.top_k),
        },
        channel: build_channel_params(adapter),
        regime: build_regime_config(adapter),
    })
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Box<dyn Strategy> {
    let kind = adapter
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "channel".to_string());

    if kind.trim() == "ma_cross" {
        let d = MaCrossConfig::default();
        return Box::new(MaCrossStrategy::new(MaCrossConfig {
            short_ma: usize_key(adapter, "strategy", "short_ma", d.short_ma),
            long_ma: usize_key(adapter, "strategy", "long_ma", d.long_ma),
            stop_loss_pct: adapter.get_double("strategy", "stop_loss_pct", d.stop_loss_pct),
        }));
    }

    let d = ChannelStrategyConfig::default();
    Box::new(ChannelStrategy::new(ChannelStrategyConfig {
        channel: build_channel_params(adapter),
        min_history: usize_key(adapter, "strategy", "min_history", d.min_history),
        band_pct: adapter.get_double("strategy", "band_pct", d.band_pct),
        ma_window: usize_key(adapter, "strategy", "ma_window", d.ma_window),
        volume_ma_window: usize_key(adapter, "strategy", "volume_ma_window", d.volume_ma_window),
        volume_multiplier: adapter.get_double("strategy", "volume_multiplier", d.volume_multiplier),
        stop_buffer: adapter.get_double("strategy", "stop_buffer", d.stop_buffer),
    }))
}

pub fn build_data_source(adapter: &dyn ConfigPort) -> CsvDataAdapter {
    let dir = adapter
        .get_string("data", "dir")
        .unwrap_or_else(|| "storage/stock_data".to_string());
    CsvDataAdapter::new(PathBuf::from(dir))
}

pub fn build_feed(adapter: &dyn ConfigPort) -> Result<Box<dyn MarketFeed>, TraderError> {
    match adapter.get_string("feed", "dir") {
        Some(dir) => Ok(Box::new(CsvFeedAdapter::from_dir(Path::new(&dir))?)),
        None => Ok(Box::new(NoFeed)),
    }
}

pub fn build_alert_sink(adapter: &dyn ConfigPort) -> Box<dyn AlertSink> {
    match adapter.get_string("alert", "file") {
        Some(path) => Box::new(FileAlertSink::new(PathBuf::from(path))),
        None => Box::new(LogAlertSink),
    }
}
