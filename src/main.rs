use anyhow::{Context, bail};
use backtester::BacktestParameters;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use core_types::{BacktestStatus, Fill, Order, OrderSide, OrderStatus, OrderType, StrategyKind};
use engine::TradingCore;
use ledger::OrderFilter;
use market_data::{InMemoryHistory, random_walk};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// The main entry point for the Meridian trading analytics application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = configuration::load_config().context("Failed to load config.toml")?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Backtest(args) => handle_backtest(args, config).await,
        Commands::Demo(args) => handle_demo(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A trading analytics core: ledgers, metrics, and a backtest simulator.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a strategy backtest over a seeded synthetic price series.
    Backtest(BacktestArgs),
    /// Replay a small scripted session against the live ledgers.
    Demo(DemoArgs),
}

#[derive(Parser)]
struct BacktestArgs {
    /// The instrument symbol to trade; must exist in config.toml.
    #[arg(long)]
    symbol: String,

    /// The strategy to run: "market-making" or "momentum".
    #[arg(long, default_value = "momentum")]
    strategy: String,

    /// The start date of the simulated period (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// The end date of the simulated period (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Starting capital for the run.
    #[arg(long)]
    capital: Option<Decimal>,

    /// Seed for the synthetic price walk; the same seed replays identically.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// The first price of the synthetic series.
    #[arg(long, default_value = "100")]
    initial_price: Decimal,
}

#[derive(Parser)]
struct DemoArgs {
    /// The instrument symbol to trade; must exist in config.toml.
    #[arg(long)]
    symbol: String,
}

fn parse_strategy(name: &str) -> anyhow::Result<StrategyKind> {
    match name {
        "market-making" => Ok(StrategyKind::MarketMaking),
        "momentum" => Ok(StrategyKind::Momentum),
        other => bail!("Unknown strategy {other:?}; expected \"market-making\" or \"momentum\""),
    }
}

fn at_midnight(date: NaiveDate) -> anyhow::Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .context("invalid date")
}

// ==============================================================================
// Backtest Command Logic
// ==============================================================================

/// Builds a synthetic history, runs the backtest to completion, and renders
/// the performance report.
async fn handle_backtest(args: BacktestArgs, config: configuration::Config) -> anyhow::Result<()> {
    let strategy = parse_strategy(&args.strategy)?;
    let start = at_midnight(args.from.unwrap_or(config.backtest.start_date))?;
    let end = at_midnight(args.to.unwrap_or(config.backtest.end_date))?;
    let capital = args.capital.unwrap_or(config.backtest.initial_capital);

    let periods = usize::try_from((end - start).num_days().max(0))
        .context("backtest period does not fit in a day count")?;
    println!(
        "Backtesting {} on {} over {} daily periods (seed {})",
        args.strategy, args.symbol, periods, args.seed
    );

    let series = random_walk(
        start,
        periods,
        Duration::days(1),
        args.initial_price,
        config.simulation.synthetic_volatility_pct,
        args.seed,
    );
    let mut history = InMemoryHistory::new();
    history.insert_series(&args.symbol, series);

    let core = TradingCore::new(config, Arc::new(history));
    let run_id = core
        .start_backtest(BacktestParameters {
            strategy,
            instruments: vec![args.symbol],
            start,
            end,
            initial_capital: capital,
        })
        .await?;
    tracing::info!(run_id = %run_id, "backtest started");

    let run = loop {
        let run = core.backtest_result(run_id).await?;
        if run.status != BacktestStatus::Running {
            break run;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    };

    match run.status {
        BacktestStatus::Complete => {
            let report = run
                .report
                .context("completed run is missing its report")?;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Initial capital".to_string(), report.initial_capital.to_string()]);
            table.add_row(vec!["Final equity".to_string(), report.final_equity.round_dp(2).to_string()]);
            table.add_row(vec!["Net profit".to_string(), report.total_net_profit.round_dp(2).to_string()]);
            table.add_row(vec!["Total return %".to_string(), report.total_return_pct.round_dp(4).to_string()]);
            table.add_row(vec!["Annualized return %".to_string(), fmt_opt(report.annualized_return_pct)]);
            table.add_row(vec!["Max drawdown %".to_string(), report.max_drawdown_pct.round_dp(4).to_string()]);
            table.add_row(vec!["Sharpe ratio".to_string(), fmt_opt(report.sharpe_ratio)]);
            table.add_row(vec!["Closed trades".to_string(), report.total_trades.to_string()]);
            table.add_row(vec!["Win rate %".to_string(), fmt_opt(report.win_rate_pct)]);
            println!("{table}");
            Ok(())
        }
        BacktestStatus::Failed => {
            bail!(
                "Backtest failed: {}",
                run.failure.unwrap_or_else(|| "unknown failure".to_string())
            )
        }
        status => bail!("Backtest ended in unexpected status {status}"),
    }
}

fn fmt_opt(value: Option<Decimal>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.round_dp(4).to_string())
}

// ==============================================================================
// Demo Command Logic
// ==============================================================================

/// Exercises the live surface: registers a strategy, books a buy and a
/// partially-filled sell, and prints the resulting ledgers and metrics.
async fn handle_demo(args: DemoArgs, config: configuration::Config) -> anyhow::Result<()> {
    let core = TradingCore::new(config, Arc::new(InMemoryHistory::new()));
    let strategy_id = core
        .register_strategy(
            "demo-mm",
            StrategyKind::MarketMaking,
            vec![args.symbol.clone()],
        )
        .await?;

    let now = Utc::now();
    core.update_price(&args.symbol, dec!(102)).await?;

    let buy_id = Uuid::new_v4();
    core.submit_order(Order::new(
        buy_id,
        &args.symbol,
        OrderSide::Buy,
        OrderType::Limit,
        10,
        Some(dec!(100)),
        strategy_id,
        now,
    ))
    .await?;
    core.record_fill(
        Fill::new(buy_id, &args.symbol, 10, dec!(100), now),
        OrderStatus::Complete,
    )
    .await?;

    let sell_id = Uuid::new_v4();
    core.submit_order(Order::new(
        sell_id,
        &args.symbol,
        OrderSide::Sell,
        OrderType::Limit,
        10,
        Some(dec!(105)),
        strategy_id,
        now,
    ))
    .await?;
    core.record_fill(
        Fill::new(sell_id, &args.symbol, -4, dec!(105), now),
        OrderStatus::Pending,
    )
    .await?;

    let mut orders = Table::new();
    orders
        .load_preset(UTF8_FULL)
        .set_header(vec!["Order", "Side", "Status", "Filled"]);
    for order in core.query_orders(&OrderFilter::new()).await {
        orders.add_row(vec![
            order.id.to_string(),
            order.side.to_string(),
            order.status.to_string(),
            format!("{}/{}", order.filled_quantity, order.quantity),
        ]);
    }
    println!("{orders}");

    let mut positions = Table::new();
    positions
        .load_preset(UTF8_FULL)
        .set_header(vec!["Symbol", "Net Qty", "Avg Entry", "Realized P&L"]);
    for position in core.list_positions(Some(&[strategy_id])).await {
        positions.add_row(vec![
            position.symbol.clone(),
            position.net_quantity.to_string(),
            fmt_opt(position.avg_entry_price),
            position.realized_pnl.to_string(),
        ]);
    }
    println!("{positions}");

    let metrics = core.metrics_report(Some(strategy_id)).await?;
    println!(
        "Realized {} | Unrealized {} | Total {} | Trades {} (win rate {})",
        metrics.realized_pnl,
        metrics.unrealized_pnl,
        metrics.total_pnl,
        metrics.total_trades,
        fmt_opt(metrics.win_rate_pct),
    );
    Ok(())
}
