//! CLI definition and dispatch.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::adapters::csv_bar_adapter::{read_bars_file, CsvBarAdapter};
use crate::adapters::csv_trade_journal::CsvTradeJournal;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::paper_order_adapter::PaperOrderAdapter;
use crate::adapters::replay_feed::ReplayFeed;
use crate::adapters::synthetic_market_adapter::SyntheticMarketAdapter;
use crate::domain::bar::Bar;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::validate_engine_config;
use crate::domain::coordinator::{Collaborators, CycleReport, ExecutionCoordinator, SymbolOutcome};
use crate::domain::error::EngineError;
use crate::domain::events::{NotificationKind, TradeRecord};
use crate::domain::position::ClosedTrade;
use crate::domain::session::{Scheduler, SessionClock, SessionPhase, Task};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::trade_record_port::TradeRecordPort;

#[derive(Parser, Debug)]
#[command(name = "crosstrader", about = "EMA crossover intraday trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trading loop until interrupted
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single scan cycle now and exit
        #[arg(long)]
        once: bool,
    },
    /// Replay a CSV bar file through the engine with paper fills
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        bars: PathBuf,
        #[arg(long)]
        symbol: String,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, once } => run_engine(&config, once),
        Command::Replay {
            config,
            bars,
            symbol,
        } => run_replay(&config, &bars, &symbol),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        error!(file = %path.display(), error = %err, "failed to load config");
        ExitCode::from(&err)
    })
}

/// Load, build and validate the engine configuration at `path`.
pub fn build_engine_config(path: &PathBuf) -> Result<EngineConfig, ExitCode> {
    let adapter = load_config(path)?;
    let config = EngineConfig::from_port(&adapter).and_then(|config| {
        validate_engine_config(&config)?;
        Ok(config)
    });
    config.map_err(|err| {
        error!(file = %path.display(), error = %err, "invalid configuration");
        ExitCode::from(&err)
    })
}

/// Journal used when `[journal] trades_file` is empty.
struct DiscardJournal;

impl TradeRecordPort for DiscardJournal {
    fn record_trade(&self, _record: &TradeRecord) -> Result<(), EngineError> {
        Ok(())
    }
}

fn run_engine(config_path: &PathBuf, once: bool) -> ExitCode {
    info!(file = %config_path.display(), "loading config");
    let config = match build_engine_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if !config.mock_trading {
        let err = EngineError::config_invalid(
            "session",
            "mock_trading",
            "no broker adapter is available; set mock_trading = true",
        );
        error!(error = %err, "cannot start live trading");
        return (&err).into();
    }

    let started_at = Local::now().naive_local();
    let market: Box<dyn MarketDataPort> = match &config.data.dir {
        Some(dir) => {
            info!(dir = %dir.display(), "reading bars from CSV files");
            Box::new(CsvBarAdapter::new(dir.clone()))
        }
        None => {
            warn!(seed = config.data.seed, "using synthetic market data");
            Box::new(SyntheticMarketAdapter::new(config.data.seed, started_at))
        }
    };
    let journal: Box<dyn TradeRecordPort> = match &config.trades_file {
        Some(path) => match CsvTradeJournal::open(path) {
            Ok(j) => Box::new(j),
            Err(err) => {
                error!(file = %path.display(), error = %err, "cannot open trade journal");
                return (&err).into();
            }
        },
        None => Box::new(DiscardJournal),
    };
    let orders = PaperOrderAdapter::new();
    let notifier = LogNotifier::new();

    let ports = Collaborators {
        market: market.as_ref(),
        orders: &orders,
        journal: journal.as_ref(),
        notifier: &notifier,
    };
    let mut coordinator = match ExecutionCoordinator::new(&config, ports) {
        Ok(c) => c,
        Err(err) => {
            error!(error = %err, "failed to build coordinator");
            return (&err).into();
        }
    };

    if once {
        let report = coordinator.scan_cycle(started_at);
        print_cycle(&report);
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let err = EngineError::from(e);
            error!(error = %err, "failed to start runtime");
            return (&err).into();
        }
    };

    coordinator.announce(
        NotificationKind::SystemStarted,
        &format!(
            "Trading System Started (mock mode), watching {}",
            coordinator.watchlist().join(", ")
        ),
    );
    let scheduler = Scheduler::new(config.session.clone());
    runtime.block_on(drive(&mut coordinator, scheduler, config.session.poll_interval));

    let open = coordinator.ledger().symbols();
    if !open.is_empty() {
        warn!(positions = ?open, "stopping with open positions");
    }
    coordinator.announce(
        NotificationKind::SystemStopped,
        &format!(
            "Trading System Stopped, day pnl {:.2}",
            coordinator.risk().realized_pnl_today()
        ),
    );
    ExitCode::SUCCESS
}

/// Poll the scheduler until Ctrl-C. A tick's work always finishes before
/// the interrupt is observed.
async fn drive(coordinator: &mut ExecutionCoordinator<'_>, mut scheduler: Scheduler, poll: Duration) {
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Local::now().naive_local();
                for task in scheduler.tick(now) {
                    if let Some(report) = dispatch(coordinator, &mut scheduler, task, now) {
                        print_cycle(&report);
                    }
                }
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!(error = %err, "signal handler failed");
                }
                info!("shutdown requested");
                break;
            }
        }
    }
}

/// Run one scheduler task against the coordinator. Positions a force exit
/// could not close are handed back to the scheduler for another attempt.
pub fn dispatch(
    coordinator: &mut ExecutionCoordinator<'_>,
    scheduler: &mut Scheduler,
    task: Task,
    now: NaiveDateTime,
) -> Option<CycleReport> {
    match task {
        Task::SessionStart(date) => {
            info!(%date, "new trading session");
            coordinator.reset_session();
            None
        }
        Task::Scan => Some(coordinator.scan_cycle(now)),
        Task::ForceExit => {
            let report = coordinator.force_exit_all(now);
            let still_open = coordinator.ledger().count();
            if still_open > 0 {
                warn!(open = still_open, "force exit incomplete, retrying next poll");
            }
            scheduler.force_exit_finished(still_open);
            Some(report)
        }
    }
}

fn print_cycle(report: &CycleReport) {
    for (symbol, outcome) in &report.outcomes {
        match outcome {
            SymbolOutcome::Entered {
                quantity,
                fill_price,
            } => println!("{}  BUY  {symbol} {quantity} @ {fill_price:.2}", report.at),
            SymbolOutcome::Exited(trade) => println!(
                "{}  SELL {symbol} {} @ {:.2} ({}) pnl {:.2}",
                report.at, trade.quantity, trade.exit_price, trade.reason, trade.pnl
            ),
            SymbolOutcome::Failed(err) => println!("{}  FAIL {symbol}: {err}", report.at),
            SymbolOutcome::Idle | SymbolOutcome::Skipped(_) => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub bars: usize,
    pub sessions: usize,
    pub entries: usize,
    pub failures: usize,
    pub trades: Vec<ClosedTrade>,
}

impl ReplaySummary {
    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    fn absorb(&mut self, report: &CycleReport) {
        self.entries += report.entries();
        self.failures += report.failures().len();
        self.trades.extend(report.exits().into_iter().cloned());
    }
}

/// Feed `bars` one at a time through a coordinator watching only `symbol`.
///
/// Bar timestamps go through the session clock the live loop uses: scans
/// run only while trading, and the first bar at or after the force-exit time
/// flattens the book. Each trading day starts with a session reset, and
/// anything still open is flattened at the last bar of the day.
pub fn run_replay_pipeline(config: &EngineConfig, symbol: &str, bars: Vec<Bar>) -> Result<ReplaySummary, EngineError> {
    let mut config = config.clone();
    config.watchlist = vec![symbol.to_string()];

    let clock = SessionClock::new(config.session.clone());
    let feed = ReplayFeed::new(symbol, bars);
    let orders = PaperOrderAdapter::new();
    let journal = DiscardJournal;
    let notifier = LogNotifier::new();
    let mut coordinator = ExecutionCoordinator::new(
        &config,
        Collaborators {
            market: &feed,
            orders: &orders,
            journal: &journal,
            notifier: &notifier,
        },
    )?;

    let mut summary = ReplaySummary::default();
    let mut session: Option<NaiveDate> = None;
    let mut last_seen: Option<NaiveDateTime> = None;

    while let Some((date, at)) = feed.peek().map(|b| (b.date(), b.timestamp)) {
        if session != Some(date) {
            if let Some(prev) = last_seen {
                if !coordinator.ledger().is_empty() {
                    summary.absorb(&coordinator.force_exit_all(prev));
                }
            }
            coordinator.reset_session();
            session = Some(date);
            summary.sessions += 1;
        }

        feed.advance();
        summary.bars += 1;
        match clock.phase(at.time()) {
            SessionPhase::PreOpen => {}
            SessionPhase::Trading => summary.absorb(&coordinator.scan_cycle(at)),
            SessionPhase::ForceExitWindow | SessionPhase::Closed => {
                if !coordinator.ledger().is_empty() {
                    summary.absorb(&coordinator.force_exit_all(at));
                }
            }
        }
        last_seen = Some(at);
    }

    if let Some(at) = last_seen {
        if !coordinator.ledger().is_empty() {
            summary.absorb(&coordinator.force_exit_all(at));
        }
    }
    Ok(summary)
}

fn run_replay(config_path: &PathBuf, bars_path: &PathBuf, symbol: &str) -> ExitCode {
    let config = match build_engine_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let symbol = symbol.trim().to_uppercase();

    let bars = match read_bars_file(bars_path, &symbol) {
        Ok(b) => b,
        Err(err) => {
            error!(file = %bars_path.display(), error = %err, "failed to read bars");
            return (&err).into();
        }
    };
    info!(symbol = %symbol, bars = bars.len(), "replaying");

    let summary = match run_replay_pipeline(&config, &symbol, bars) {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "replay failed");
            return (&err).into();
        }
    };

    for trade in &summary.trades {
        println!(
            "{}  {}  {} x{} {:.2} -> {:.2}  {:<26} pnl {:>10.2}",
            trade.opened_at,
            trade.closed_at,
            trade.symbol,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.reason.to_string(),
            trade.pnl
        );
    }
    println!(
        "\n{} bars over {} sessions, {} trades, {} failures, total pnl {:.2}",
        summary.bars,
        summary.sessions,
        summary.trades.len(),
        summary.failures,
        summary.total_pnl()
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let config = match build_engine_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    println!("Strategy:  EMA({}) / EMA({})", config.strategy.fast_period, config.strategy.slow_period);
    println!(
        "Exits:     stop loss {:.2}%, take profit {:.2}%",
        config.strategy.stop_loss_pct * 100.0,
        config.strategy.take_profit_pct * 100.0
    );
    println!(
        "Risk:      capital {:.2}, {:.2}% per trade, max {} positions, daily loss limit {:.2}%",
        config.risk.capital,
        config.risk.risk_fraction * 100.0,
        config.risk.max_concurrent_positions,
        config.risk.daily_loss_limit_fraction * 100.0
    );
    println!(
        "Session:   {} - {}, force exit {}, scan every {}s",
        config.session.open,
        config.session.close,
        config.session.force_exit,
        config.session.scan_interval.as_secs()
    );
    println!("Watchlist: {}", config.watchlist.join(", "));
    println!("Mode:      {}", if config.mock_trading { "mock" } else { "live" });
    println!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
