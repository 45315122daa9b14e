//! Concrete adapter implementations for ports.

pub mod csv_bar_adapter;
pub mod csv_trade_journal;
pub mod file_config_adapter;
pub mod log_notifier;
pub mod paper_order_adapter;
pub mod replay_feed;
pub mod synthetic_market_adapter;
