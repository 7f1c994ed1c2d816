//! QuantLab CLI — run, sweep, and strategy listing commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config and/or flags
//! - `sweep`: evaluate a parameter grid and print the ranked table
//! - `strategies`: list strategy kinds with their parameters and defaults

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quantlab_core::domain::PriceSeries;
use quantlab_core::strategy::StrategyKind;
use quantlab_runner::export::{save_run_artifacts, save_sweep_artifacts};
use quantlab_runner::grid::{GridAxis, ParameterGrid};
use quantlab_runner::runner::run_single_backtest;
use quantlab_runner::sweep::ParameterSweep;
use quantlab_runner::{
    load_csv, synthetic_series, BacktestConfig, BacktestResult, RankingMetric, SweepResult,
    SweepSection,
};

#[derive(Parser)]
#[command(name = "quantlab", about = "QuantLab CLI: single-asset strategy backtester")]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where prices come from and what to run on them; shared by `run` and `sweep`.
#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Daily OHLCV CSV file (Date,Open,High,Low,Close[,Adj Close],Volume).
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate N synthetic weekday bars instead of reading a file.
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Strategy kind (overrides the config).
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Strategy parameter override, repeatable (e.g. --param long_window=50).
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Initial capital (overrides the config).
    #[arg(long)]
    capital: Option<f64>,

    /// Output directory for artifacts. Nothing is written without it.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Sweep a parameter grid and rank the results.
    Sweep {
        #[command(flatten)]
        args: RunArgs,

        /// Grid axis, repeatable: name=v1,v2,... or name=start:end:step.
        #[arg(long = "grid", value_name = "AXIS")]
        grid: Vec<String>,

        /// Ranking metric (overrides the config).
        #[arg(long)]
        rank_by: Option<RankingMetric>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Evaluate combinations on the calling thread only.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// List strategy kinds, their parameters, and defaults.
    Strategies,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { args } => run_backtest_cmd(args),
        Commands::Sweep {
            args,
            grid,
            rank_by,
            top,
            sequential,
        } => run_sweep_cmd(args, grid, rank_by, top, sequential),
        Commands::Strategies => {
            print_strategies();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &RunArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };
    if let Some(kind) = args.strategy {
        if kind != config.strategy.kind {
            switch_strategy(&mut config, kind);
        }
    }
    for raw in &args.params {
        let (name, value) = split_assignment(raw)?;
        let value: f64 = value
            .parse()
            .with_context(|| format!("--param {name}: '{value}' is not a number"))?;
        config.strategy.params.insert(name, value);
    }
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    config.validate()?;
    Ok(config)
}

/// Parameters and grid axes belong to the old kind; drop both.
fn switch_strategy(config: &mut BacktestConfig, kind: StrategyKind) {
    if let Some(section) = config.sweep.as_mut() {
        let dropped: Vec<&str> = section.grid.axes().map(|(name, _)| name).collect();
        if !dropped.is_empty() {
            warn!(
                from = %config.strategy.kind,
                to = %kind,
                axes = %dropped.join(","),
                "strategy overridden, config grid axes dropped"
            );
            section.grid = ParameterGrid::default();
        }
    }
    config.strategy.kind = kind;
    config.strategy.params = Default::default();
}

fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("expected NAME=VALUE, got '{raw}'"),
    }
}

fn load_series(args: &RunArgs, config: &BacktestConfig) -> Result<PriceSeries> {
    let symbol = &config.backtest.symbol;
    match (&args.data, args.synthetic) {
        (Some(path), _) => Ok(load_csv(path, symbol)?),
        (None, Some(n)) => Ok(synthetic(symbol, n)),
        (None, None) => {
            bail!("no price data: pass --data <file.csv> or --synthetic <N>")
        }
    }
}

fn synthetic(symbol: &str, n: usize) -> PriceSeries {
    warn!(symbol, bars = n, "using SYNTHETIC price data");
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default();
    synthetic_series(symbol, start, n)
}

fn run_backtest_cmd(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let series = load_series(&args, &config)?;
    let cost = config.cost_model()?;

    let result = run_single_backtest(
        config.strategy.kind,
        &series,
        &config.strategy.params,
        cost.as_ref(),
        &config.run_settings(),
    )
    .with_context(|| format!("{} backtest failed", config.strategy.kind))?;

    print_summary(&result);

    if let Some(out) = &args.out {
        let run_dir = save_run_artifacts(&result, out)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_sweep_cmd(
    args: RunArgs,
    grid_args: Vec<String>,
    rank_by: Option<RankingMetric>,
    top: usize,
    sequential: bool,
) -> Result<()> {
    let mut config = resolve_config(&args)?;
    let section = config.sweep.get_or_insert_with(SweepSection::default);
    for raw in &grid_args {
        let (name, spec) = split_assignment(raw)?;
        section.grid.add_axis(name, &parse_axis(name, spec)?)?;
    }
    if let Some(metric) = rank_by {
        section.ranking = metric;
    }
    if sequential {
        section.parallel = false;
    }

    let series = load_series(&args, &config)?;
    let cost = config.cost_model()?;
    let series = series.slice_dates(config.backtest.start_date, config.backtest.end_date);

    let result = ParameterSweep::new(config.sweep_options()).sweep(
        config.strategy.kind,
        &series,
        &config.parameter_grid(),
        config.backtest.initial_capital,
        cost.as_ref(),
        None,
    )?;

    print_sweep(&result, top);

    if let Some(out) = &args.out {
        save_sweep_artifacts(&result, out)?;
        println!("Artifacts saved to: {}", out.display());
    }
    Ok(())
}

fn parse_axis(name: &str, spec: &str) -> Result<GridAxis> {
    let number = |s: &str| -> Result<f64> {
        s.trim()
            .parse()
            .with_context(|| format!("--grid {name}: '{s}' is not a number"))
    };
    if let Some((start, rest)) = spec.split_once(':') {
        let Some((end, step)) = rest.split_once(':') else {
            bail!("--grid {name}: range must be start:end:step");
        };
        return Ok(GridAxis::Range {
            start: number(start)?,
            end: number(end)?,
            step: number(step)?,
        });
    }
    let values = spec
        .split(',')
        .map(number)
        .collect::<Result<Vec<_>>>()?;
    Ok(GridAxis::Values(values))
}

fn print_summary(result: &BacktestResult) {
    let m = &result.report;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Strategy:       {} ({})", result.strategy, result.params);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!(
        "Bars:           {} ({} warmup)",
        m.bar_count, result.warmup_bars
    );
    println!("Cost Model:     {}", result.cost_model);
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Volatility:     {:.2}%", m.annualized_volatility * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Calmar:         {:.3}", m.calmar_ratio);
    println!(
        "Max Drawdown:   {:.2}% ({} bars)",
        m.max_drawdown * 100.0,
        m.max_drawdown_duration
    );
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Final Equity:   {:.2}", m.final_equity);
    if let Some(b) = &m.benchmark {
        println!();
        println!("--- Buy & Hold ---");
        println!("Total Return:   {:.2}%", b.total_return * 100.0);
        println!("Sharpe:         {:.3}", b.sharpe_ratio);
        println!("Max Drawdown:   {:.2}%", b.max_drawdown * 100.0);
        println!("Excess Return:  {:+.2}%", b.excess_return * 100.0);
    }
    println!();
}

fn print_sweep(result: &SweepResult, top: usize) {
    println!();
    println!(
        "=== Sweep: {} ({} combinations, ranked by {}) ===",
        result.strategy, result.grid_size, result.ranking
    );
    println!(
        "{:>4}  {:>9}  {:>8}  {:>8}  {:>9}  {:>6}  params",
        "rank", "return", "sharpe", "calmar", "max_dd", "trades"
    );
    for (i, row) in result.top_n(top).iter().enumerate() {
        let r = &row.report;
        println!(
            "{:>4}  {:>8.2}%  {:>8.3}  {:>8.3}  {:>8.2}%  {:>6}  {}",
            i + 1,
            r.total_return * 100.0,
            r.sharpe_ratio,
            r.calmar_ratio,
            r.max_drawdown * 100.0,
            r.trade_count,
            row.params
        );
    }
    if result.len() > top {
        println!("  ... {} more", result.len() - top);
    }
    if !result.skipped.is_empty() {
        println!();
        println!("--- Skipped ({}) ---", result.skipped.len());
        for s in &result.skipped {
            println!("  [{}] {}: {}", s.index, s.params, s.reason);
        }
    }
    if result.cancelled {
        println!();
        println!("WARNING: sweep was cancelled; results are partial");
    }
    println!();
}

fn print_strategies() {
    for kind in StrategyKind::ALL {
        if kind.is_placeholder() {
            println!("{kind}  (not implemented)");
            continue;
        }
        println!("{kind}");
        for spec in kind.parameters() {
            println!("  {:<14} {:>8}  {}", spec.name, spec.default, spec.description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_value_axis() {
        assert_eq!(
            parse_axis("w", "5, 10,20").unwrap(),
            GridAxis::Values(vec![5.0, 10.0, 20.0])
        );
    }

    #[test]
    fn parses_range_axis() {
        assert_eq!(
            parse_axis("w", "10:50:10").unwrap(),
            GridAxis::Range {
                start: 10.0,
                end: 50.0,
                step: 10.0
            }
        );
        assert!(parse_axis("w", "10:50").is_err());
        assert!(parse_axis("w", "a,b").is_err());
    }

    #[test]
    fn assignment_requires_name() {
        assert_eq!(split_assignment("x = 3").unwrap(), ("x", "3"));
        assert!(split_assignment("=3").is_err());
        assert!(split_assignment("x3").is_err());
    }

    #[test]
    fn cli_parses_sweep_flags() {
        let cli = Cli::try_parse_from([
            "quantlab",
            "sweep",
            "--synthetic",
            "300",
            "--strategy",
            "ma-crossover",
            "--grid",
            "short_window=5,10",
            "--grid",
            "long_window=20:60:20",
            "--rank-by",
            "calmar",
            "--top",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Sweep {
                args,
                grid,
                rank_by,
                top,
                ..
            } => {
                assert_eq!(args.synthetic, Some(300));
                assert_eq!(args.strategy, Some(StrategyKind::MaCrossover));
                assert_eq!(grid.len(), 2);
                assert_eq!(rank_by, Some(RankingMetric::Calmar));
                assert_eq!(top, 3);
            }
            _ => panic!("expected sweep"),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = Cli::try_parse_from([
            "quantlab",
            "run",
            "--synthetic",
            "100",
            "--strategy",
            "mean_reversion",
            "--param",
            "window=15",
            "--capital",
            "2500",
        ])
        .unwrap();
        let Commands::Run { args } = cli.command else {
            panic!("expected run");
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.strategy.kind, StrategyKind::MeanReversion);
        assert_eq!(config.strategy.params.get("window"), Some(15.0));
        assert_eq!(config.backtest.initial_capital, 2500.0);
        let series = load_series(&args, &config).unwrap();
        assert_eq!(series.len(), 100);
    }

    #[test]
    fn strategy_override_drops_stale_grid() {
        let mut config = BacktestConfig::from_toml(
            "[strategy]\nkind = \"ma_crossover\"\nparams = { short_window = 5 }\n\
             [sweep]\nranking = \"calmar\"\n[sweep.grid]\nlong_window = [20, 40]\n",
        )
        .unwrap();
        switch_strategy(&mut config, StrategyKind::TrendFollowing);
        assert_eq!(config.strategy.kind, StrategyKind::TrendFollowing);
        assert!(config.strategy.params.is_empty());
        let section = config.sweep.as_ref().unwrap();
        assert_eq!(section.grid.size(), 1);
        assert_eq!(section.ranking, RankingMetric::Calmar);
        assert_eq!(config.parameter_grid().combinations().len(), 1);
    }

    #[test]
    fn data_and_synthetic_conflict() {
        assert!(Cli::try_parse_from([
            "quantlab",
            "run",
            "--data",
            "prices.csv",
            "--synthetic",
            "10"
        ])
        .is_err());
    }

    #[test]
    fn missing_data_source_is_an_error() {
        let cli = Cli::try_parse_from(["quantlab", "run"]).unwrap();
        let Commands::Run { args } = cli.command else {
            panic!("expected run");
        };
        let config = resolve_config(&args).unwrap();
        assert!(load_series(&args, &config).is_err());
    }
}
