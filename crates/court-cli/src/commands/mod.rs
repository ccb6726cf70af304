//! CLI subcommand implementations.

pub mod account;
pub mod book;
pub mod coins;
pub mod payments;
pub mod quote;
pub mod schedule;
pub mod settle;
pub mod util;
