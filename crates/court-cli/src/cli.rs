//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use court_core::{AccountId, BookingId, EntryId, MembershipClass, PaymentId};
use rust_decimal::Decimal;

/// Court reservations and coin ledger.
///
/// Books the club court on an hourly grid, charges coins for bookings, and
/// records cash settlement of finished sessions.
#[derive(Debug, Parser)]
#[command(name = "court", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage member accounts.
    #[command(subcommand)]
    Account(AccountAction),

    /// Reserve the court.
    Book {
        /// Acting account.
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: AccountId,

        /// Date: YYYY-MM-DD, today, tomorrow, or +Nd.
        date: String,

        /// First hour, e.g. 09:00.
        start: String,

        /// Hour the booking ends, e.g. 11:00.
        end: String,

        /// Other players, comma separated.
        #[arg(long = "with", value_delimiter = ',', value_name = "ACCOUNTS")]
        with: Vec<AccountId>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Cancel a booking and refund its coins.
    Cancel {
        booking: BookingId,

        /// Acting account.
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: AccountId,
    },

    /// Price a session without booking it.
    Quote {
        /// Players, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        roster: Vec<AccountId>,

        /// Session length in hours.
        #[arg(long)]
        hours: u32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record cash paid for a finished booking.
    Settle {
        booking: BookingId,

        /// Amount paid for the whole session.
        amount: Decimal,

        /// Paying account.
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: AccountId,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Record cash paid for an open-play session.
    OpenPlay(OpenPlayArgs),

    /// List finished bookings an account has not paid for.
    Dues {
        #[arg(long = "as", value_name = "ACCOUNT")]
        actor: AccountId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show court availability.
    #[command(subcommand)]
    Schedule(ScheduleAction),

    /// Coin balances, history, and grants.
    #[command(subcommand)]
    Coins(CoinsAction),

    /// Payment records.
    #[command(subcommand)]
    Payments(PaymentsAction),
}

#[derive(Debug, Subcommand)]
pub enum AccountAction {
    /// Register an account.
    Add {
        name: String,

        /// Membership class: standard or reduced-rate.
        #[arg(long, default_value = "standard")]
        class: MembershipClass,

        /// Grant the admin role.
        #[arg(long)]
        admin: bool,

        /// Book without spending coins.
        #[arg(long)]
        exempt: bool,

        /// Membership fees are outstanding.
        #[arg(long)]
        fees_unpaid: bool,

        /// Coins credited on creation.
        #[arg(long, default_value_t = 0)]
        balance: i64,
    },

    /// List accounts.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Change account flags.
    Set {
        account: AccountId,

        #[arg(long)]
        class: Option<MembershipClass>,

        #[arg(long)]
        role: Option<Role>,

        #[arg(long)]
        approved: Option<bool>,

        #[arg(long)]
        active: Option<bool>,

        #[arg(long)]
        fees_paid: Option<bool>,

        #[arg(long)]
        exempt: Option<bool>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Member,
    Admin,
}

#[derive(Debug, Args)]
pub struct OpenPlayArgs {
    /// Amount paid.
    pub amount: Decimal,

    /// Paying account.
    #[arg(long = "as", value_name = "ACCOUNT")]
    pub actor: AccountId,

    /// Session date: YYYY-MM-DD, today, or -Nd.
    #[arg(long, default_value = "today")]
    pub date: String,

    /// Session label, e.g. saturday-am.
    #[arg(long)]
    pub label: String,

    #[arg(long)]
    pub hours: u32,

    /// Names of other attendees.
    #[arg(long = "attendee")]
    pub attendees: Vec<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleAction {
    /// Slot-by-slot availability for one day.
    Day {
        /// Date: YYYY-MM-DD, today, tomorrow, or +Nd.
        #[arg(default_value = "today")]
        date: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Availability for consecutive days.
    Week {
        /// First date shown.
        #[arg(long, default_value = "today")]
        start: String,

        /// Number of days.
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum CoinsAction {
    /// Show an account's balance.
    Balance { account: AccountId },

    /// Show an account's ledger entries.
    History {
        account: AccountId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask an admin for coins.
    Request {
        account: AccountId,
        amount: i64,

        #[arg(long, default_value = "coin request")]
        reason: String,
    },

    /// Approve or reject a coin request.
    Resolve {
        entry: EntryId,
        decision: Decision,
    },

    /// Credit coins directly.
    Grant {
        account: AccountId,
        amount: i64,

        #[arg(long, default_value = "admin grant")]
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Subcommand)]
pub enum PaymentsAction {
    /// List payment records; pending ones across all accounts by default.
    List {
        #[arg(long)]
        account: Option<AccountId>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mark a pending record paid or rejected.
    Resolve {
        payment: PaymentId,
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Outcome {
    Paid,
    Rejected,
}
