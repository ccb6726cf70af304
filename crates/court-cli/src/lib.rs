//! Court reservations CLI library.
//!
//! This crate provides the command-line interface for booking the club court,
//! spending coins, and recording cash settlements.

pub mod cli;
pub mod commands;
mod config;
pub mod weather;

pub use cli::{
    AccountAction, Cli, CoinsAction, Commands, Decision, OpenPlayArgs, Outcome, PaymentsAction,
    Role, ScheduleAction,
};
pub use config::Config;
