//! Port traits for the engine's external collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod notifier_port;
pub mod order_port;
pub mod trade_record_port;
