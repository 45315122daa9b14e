//! Core domain types and logic.

pub mod bar;
pub mod config;
pub mod config_validation;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod indicator;
pub mod ledger;
pub mod order;
pub mod position;
pub mod risk;
pub mod session;
pub mod signal;
