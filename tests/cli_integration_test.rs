//! CLI integration tests.
//!
//! Tests cover:
//! - Config loading and validation from INI files on disk
//! - The validate, run --once and replay commands end to end
//! - A simulated trading day driven through the scheduler
//! - The replay pipeline over in-memory bars

mod common;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use clap::Parser;
use common::*;
use crosstrader::cli::{self, Cli};
use crosstrader::domain::config::MinQuantityPolicy;
use crosstrader::domain::coordinator::{Collaborators, ExecutionCoordinator};
use crosstrader::domain::events::TradeStatus;
use crosstrader::domain::session::{Scheduler, Task};
use crosstrader::domain::signal::SignalReason;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn succeeded(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn run_cli(args: &[&str]) -> ExitCode {
    let mut argv = vec!["crosstrader"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

fn write_bars_csv(path: &Path, rows: &[(&str, f64)]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for (ts, close) in rows {
        content.push_str(&format!("{ts},{close},{close},{close},{close},1000\n"));
    }
    std::fs::write(path, content).unwrap();
}

const VALID_INI: &str = r#"
[strategy]
fast_period = 5
slow_period = 13
stop_loss_pct = 0.015
take_profit_pct = 0.03

[risk]
capital = 200000
risk_per_trade = 0.01
max_positions = 2
daily_loss_limit = 0.04
min_quantity_policy = floor_to_one

[session]
open = 09:30
close = 16:00
force_exit = 15:45
scan_interval_secs = 60
poll_interval_secs = 10
mock_trading = true

[watchlist]
symbols = aapl, msft, AAPL

[data]
interval = 1minute
lookback = 50

[journal]
trades_file =
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_engine_config_valid_full() {
        let file = write_temp_ini(VALID_INI);
        let config = cli::build_engine_config(&PathBuf::from(file.path())).unwrap();

        assert_eq!(config.strategy.fast_period, 5);
        assert_eq!(config.strategy.slow_period, 13);
        assert_relative_eq!(config.strategy.stop_loss_pct, 0.015);
        assert_relative_eq!(config.risk.capital, 200_000.0);
        assert_eq!(config.risk.max_concurrent_positions, 2);
        assert_eq!(config.risk.min_quantity_policy, MinQuantityPolicy::FloorToOne);
        assert_eq!(config.session.scan_interval, Duration::from_secs(60));
        assert_eq!(config.session.force_exit.to_string(), "15:45:00");
        assert_eq!(config.watchlist, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(config.data.bar_interval, "1minute");
        assert_eq!(config.data.lookback, 50);
        assert!(config.mock_trading);
        assert!(config.trades_file.is_none());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_temp_ini("");
        let config = cli::build_engine_config(&PathBuf::from(file.path())).unwrap();

        assert_eq!(config.strategy.fast_period, 9);
        assert_eq!(config.strategy.slow_period, 21);
        assert_eq!(config.risk.min_quantity_policy, MinQuantityPolicy::Reject);
        assert_eq!(config.watchlist.len(), 5);
    }

    #[test]
    fn fast_not_below_slow_is_rejected() {
        let file = write_temp_ini("[strategy]\nfast_period = 21\nslow_period = 9\n");
        assert!(cli::build_engine_config(&PathBuf::from(file.path())).is_err());
    }

    #[test]
    fn force_exit_after_close_is_rejected() {
        let file = write_temp_ini("[session]\nclose = 15:30\nforce_exit = 15:45\n");
        assert!(cli::build_engine_config(&PathBuf::from(file.path())).is_err());
    }

    #[test]
    fn unknown_quantity_policy_is_rejected() {
        let file = write_temp_ini("[risk]\nmin_quantity_policy = round_up\n");
        assert!(cli::build_engine_config(&PathBuf::from(file.path())).is_err());
    }

    #[test]
    fn malformed_numbers_and_flags_are_rejected() {
        let file = write_temp_ini("[risk]\ncapital = 1,00,000\nrisk_per_trade = 2%\n[session]\nmock_trading = ture\n");
        assert!(cli::build_engine_config(&PathBuf::from(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_rejected() {
        let path = PathBuf::from("/nonexistent/path/crosstrader.ini");
        assert!(cli::load_config(&path).is_err());
        assert!(cli::build_engine_config(&path).is_err());
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let file = write_temp_ini(VALID_INI);
        let path = file.path().to_str().unwrap();
        assert!(succeeded(run_cli(&["validate", "-c", path])));
    }

    #[test]
    fn validate_rejects_bad_config() {
        let file = write_temp_ini("[risk]\nrisk_per_trade = 1.5\n");
        let path = file.path().to_str().unwrap();
        assert!(!succeeded(run_cli(&["validate", "-c", path])));
    }

    #[test]
    fn live_trading_without_broker_refuses_to_start() {
        let file = write_temp_ini("[session]\nmock_trading = false\n");
        let path = file.path().to_str().unwrap();
        assert!(!succeeded(run_cli(&["run", "-c", path, "--once"])));
    }

    #[test]
    fn run_once_trades_from_csv_and_journals() {
        let dir = tempfile::TempDir::new().unwrap();
        let rows: Vec<(String, f64)> = bars_from_closes(&BULLISH)
            .iter()
            .map(|b| (b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(), b.close))
            .collect();
        let rows: Vec<(&str, f64)> = rows.iter().map(|(t, c)| (t.as_str(), *c)).collect();
        write_bars_csv(&dir.path().join("X.csv"), &rows);

        let journal = dir.path().join("logs").join("trades.csv");
        let ini = format!(
            "[strategy]\nfast_period = 2\nslow_period = 4\n\n\
             [risk]\ncapital = 100000\n\n\
             [watchlist]\nsymbols = X\n\n\
             [data]\ndir = {}\nlookback = 10\n\n\
             [journal]\ntrades_file = {}\n",
            dir.path().display(),
            journal.display()
        );
        let file = write_temp_ini(&ini);

        assert!(succeeded(run_cli(&["run", "-c", file.path().to_str().unwrap(), "--once"])));

        let content = std::fs::read_to_string(&journal).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",X,BUY,2000,100.00,EMA Bullish Crossover,0.00,EXECUTED"));
    }

    #[test]
    fn replay_command_reads_bars_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let bars_path = dir.path().join("tcs.csv");
        write_bars_csv(
            &bars_path,
            &[
                ("2024-03-04 09:15:00", 100.0),
                ("2024-03-04 09:20:00", 99.0),
                ("2024-03-04 09:25:00", 98.0),
                ("2024-03-04 09:30:00", 97.0),
                ("2024-03-04 09:35:00", 96.0),
                ("2024-03-04 09:40:00", 95.0),
                ("2024-03-04 09:45:00", 100.0),
            ],
        );
        let file = write_temp_ini("[strategy]\nfast_period = 2\nslow_period = 4\n");

        let code = run_cli(&[
            "replay",
            "-c",
            file.path().to_str().unwrap(),
            "--bars",
            bars_path.to_str().unwrap(),
            "--symbol",
            "tcs",
        ]);
        assert!(succeeded(code));
    }

    #[test]
    fn replay_command_missing_bars_fails() {
        let file = write_temp_ini("");
        let code = run_cli(&[
            "replay",
            "-c",
            file.path().to_str().unwrap(),
            "--bars",
            "/nonexistent/bars.csv",
            "--symbol",
            "TCS",
        ]);
        assert!(!succeeded(code));
    }
}

mod scheduled_day {
    use super::*;

    #[test]
    fn day_enters_once_and_flattens_at_force_exit() {
        let config = test_config(&["X"]);
        let market = MockMarket::new().with_closes("X", &BULLISH);
        let orders = MockOrders::new();
        let journal = RecordingJournal::new();
        let notifier = RecordingNotifier::new();
        let mut coord = ExecutionCoordinator::new(
            &config,
            Collaborators {
                market: &market,
                orders: &orders,
                journal: &journal,
                notifier: &notifier,
            },
        )
        .unwrap();
        let mut scheduler = Scheduler::new(config.session.clone());

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut now = day.and_hms_opt(9, 0, 0).unwrap();
        let end = day.and_hms_opt(15, 40, 0).unwrap();
        let mut tasks = Vec::new();
        let mut reports = Vec::new();

        while now <= end {
            for task in scheduler.tick(now) {
                tasks.push(task);
                if let Some(report) = cli::dispatch(&mut coord, &mut scheduler, task, now) {
                    reports.push(report);
                }
            }
            now += chrono::Duration::seconds(30);
        }

        assert_eq!(tasks[0], Task::SessionStart(day));
        assert_eq!(tasks.iter().filter(|t| **t == Task::ForceExit).count(), 1);
        let entries: usize = reports.iter().map(|r| r.entries()).sum();
        assert_eq!(entries, 1);

        let exits: Vec<_> = reports.iter().flat_map(|r| r.exits()).collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, SignalReason::ForceExit);
        assert_eq!(exits[0].closed_at, day.and_hms_opt(15, 15, 0).unwrap());
        assert!(coord.ledger().is_empty());
        assert_eq!(orders.count(), 2);
    }

    #[test]
    fn rejected_force_exit_is_retried_before_midnight() {
        let config = test_config(&["X"]);
        let market = MockMarket::new().with_closes("X", &BULLISH);
        let orders = MockOrders::new();
        let journal = RecordingJournal::new();
        let notifier = RecordingNotifier::new();
        let mut coord = ExecutionCoordinator::new(
            &config,
            Collaborators {
                market: &market,
                orders: &orders,
                journal: &journal,
                notifier: &notifier,
            },
        )
        .unwrap();
        let mut scheduler = Scheduler::new(config.session.clone());

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let rejecting_at = day.and_hms_opt(15, 15, 0).unwrap();
        let mut now = day.and_hms_opt(9, 0, 0).unwrap();
        let end = day.and_hms_opt(23, 59, 30).unwrap();
        let mut force_exits = 0;
        let mut reports = Vec::new();

        while now <= end {
            if now == rejecting_at {
                orders.reject("X");
            } else {
                orders.accept("X");
            }
            for task in scheduler.tick(now) {
                if task == Task::ForceExit {
                    force_exits += 1;
                }
                if let Some(report) = cli::dispatch(&mut coord, &mut scheduler, task, now) {
                    reports.push(report);
                }
            }
            now += chrono::Duration::seconds(30);
        }

        assert!(coord.ledger().is_empty());
        assert_eq!(force_exits, 2);
        let exits: Vec<_> = reports.iter().flat_map(|r| r.exits()).collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].reason, SignalReason::ForceExit);
        assert_eq!(exits[0].closed_at, day.and_hms_opt(15, 15, 30).unwrap());
        assert_eq!(journal.with_status(TradeStatus::Failed).len(), 1);
        // buy, rejected sell, accepted sell
        assert_eq!(orders.count(), 3);
    }

    #[test]
    fn force_exit_keeps_retrying_after_close() {
        let config = test_config(&["X"]);
        let market = MockMarket::new().with_closes("X", &BULLISH);
        let orders = MockOrders::new();
        let journal = RecordingJournal::new();
        let notifier = RecordingNotifier::new();
        let mut coord = ExecutionCoordinator::new(
            &config,
            Collaborators {
                market: &market,
                orders: &orders,
                journal: &journal,
                notifier: &notifier,
            },
        )
        .unwrap();
        let mut scheduler = Scheduler::new(config.session.clone());

        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let accept_from = day.and_hms_opt(15, 45, 0).unwrap();
        let mut now = day.and_hms_opt(9, 15, 0).unwrap();
        let end = day.and_hms_opt(16, 0, 0).unwrap();
        let mut last_exit = None;

        while now <= end {
            for task in scheduler.tick(now) {
                if now >= day.and_hms_opt(15, 15, 0).unwrap() && now < accept_from {
                    orders.reject("X");
                } else {
                    orders.accept("X");
                }
                if let Some(report) = cli::dispatch(&mut coord, &mut scheduler, task, now) {
                    if let Some(trade) = report.exits().first() {
                        last_exit = Some(trade.closed_at);
                    }
                }
            }
            now += chrono::Duration::seconds(30);
        }

        assert!(coord.ledger().is_empty());
        assert_eq!(last_exit, Some(accept_from));
    }
}

mod replay_pipeline {
    use super::*;

    #[test]
    fn single_crossing_enters_exactly_once() {
        let mut config = test_config(&[]);
        config.strategy.take_profit_pct = 0.0;
        let mut closes = vec![100.0, 99.0, 98.0, 97.0, 96.0, 95.0];
        closes.extend((0..15).map(|i| 96.0 + i as f64));

        let summary = cli::run_replay_pipeline(&config, "X", bars_from_closes(&closes)).unwrap();

        assert_eq!(summary.bars, closes.len());
        assert_eq!(summary.sessions, 1);
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.trades.len(), 1);
        let trade = &summary.trades[0];
        assert_eq!(trade.reason, SignalReason::ForceExit);
        assert_relative_eq!(trade.entry_price, 97.0);
        assert_relative_eq!(trade.exit_price, 110.0);
        assert_relative_eq!(summary.total_pnl(), trade.pnl);
        assert!(summary.total_pnl() > 0.0);
    }

    #[test]
    fn stop_loss_inside_replay() {
        let config = test_config(&[]);
        let mut closes = BULLISH.to_vec();
        closes.push(98.9);

        let summary = cli::run_replay_pipeline(&config, "X", bars_from_closes(&closes)).unwrap();

        assert_eq!(summary.trades.len(), 1);
        assert_eq!(summary.trades[0].reason, SignalReason::StopLoss);
        assert_relative_eq!(summary.total_pnl(), -2200.0, epsilon = 1e-6);
    }

    #[test]
    fn positions_are_flattened_at_each_day_boundary() {
        let config = test_config(&[]);
        let day_one = bars_from_closes(&BULLISH);
        let day_two_start = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let day_two = bars_from_closes_at(day_two_start, &BULLISH);
        let mut bars = day_one.clone();
        bars.extend(day_two);

        let summary = cli::run_replay_pipeline(&config, "X", bars).unwrap();

        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.trades.len(), 2);
        let first = &summary.trades[0];
        assert_eq!(first.reason, SignalReason::ForceExit);
        assert_eq!(first.closed_at, day_one[6].timestamp);
        assert_relative_eq!(first.exit_price, 100.0);
    }

    #[test]
    fn replay_flattens_at_force_exit_time() {
        let config = test_config(&[]);
        let start = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(14, 40, 0)
            .unwrap();
        // Entry at 15:10, then a 15:15 bar at 101 and a 15:20 bar below the stop.
        let mut closes = BULLISH.to_vec();
        closes.extend([101.0, 95.0]);

        let summary = cli::run_replay_pipeline(&config, "X", bars_from_closes_at(start, &closes)).unwrap();

        assert_eq!(summary.entries, 1);
        assert_eq!(summary.trades.len(), 1);
        let trade = &summary.trades[0];
        assert_eq!(trade.reason, SignalReason::ForceExit);
        assert_eq!(trade.closed_at, start + chrono::Duration::minutes(35));
        assert_relative_eq!(trade.exit_price, 101.0);
    }

    #[test]
    fn replay_never_enters_outside_trading_hours() {
        let config = test_config(&[]);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let pre_open = bars_from_closes_at(day.and_hms_opt(8, 40, 0).unwrap(), &BULLISH);
        let after_cutoff = bars_from_closes_at(day.and_hms_opt(15, 15, 0).unwrap(), &BULLISH);

        let summary = cli::run_replay_pipeline(&config, "X", pre_open).unwrap();
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.bars, 7);

        let summary = cli::run_replay_pipeline(&config, "X", after_cutoff).unwrap();
        assert_eq!(summary.entries, 0);
        assert!(summary.trades.is_empty());
    }

    #[test]
    fn empty_history_produces_empty_summary() {
        let summary = cli::run_replay_pipeline(&test_config(&[]), "X", Vec::new()).unwrap();
        assert_eq!(summary.bars, 0);
        assert!(summary.trades.is_empty());
        assert_relative_eq!(summary.total_pnl(), 0.0);
    }
}
