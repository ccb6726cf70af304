use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use court_core::{BookingRequest, EngineError, NoWeather, OpenPlaySession, SlotRange, WeatherProvider};
use court_db::{AccountUpdate, Database, DbError};
use tracing_subscriber::EnvFilter;

use court_cli::commands::{account, book, coins, payments, quote, schedule, settle, util};
use court_cli::weather::FileWeather;
use court_cli::{
    AccountAction, Cli, CoinsAction, Commands, Config, PaymentsAction, ScheduleAction,
};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path)
        .context("failed to open database")?
        .with_policy(config.policy.clone());
    Ok((db, config))
}

fn weather_provider(config: &Config) -> Box<dyn WeatherProvider> {
    match &config.weather_path {
        Some(path) => Box::new(FileWeather::load(path)),
        None => Box::new(NoWeather),
    }
}

/// Stable code printed with a failure, for scripts that wrap the CLI.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<DbError>() {
        return err.code();
    }
    if let Some(err) = err.downcast_ref::<EngineError>() {
        return err.code();
    }
    "error"
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn run(cli: &Cli, now: NaiveDateTime) -> Result<()> {
    let today = now.date();
    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Account(action) => match action {
            AccountAction::Add {
                name,
                class,
                admin,
                exempt,
                fees_unpaid,
                balance,
            } => account::add(
                &mut out,
                &mut db,
                account::AddOptions {
                    name: name.clone(),
                    class: *class,
                    admin: *admin,
                    exempt: *exempt,
                    fees_unpaid: *fees_unpaid,
                    balance: *balance,
                },
            )?,
            AccountAction::List { json } => account::list(&mut out, &db, *json)?,
            AccountAction::Set {
                account: account_id,
                class,
                role,
                approved,
                active,
                fees_paid,
                exempt,
            } => account::set(
                &mut out,
                &mut db,
                *account_id,
                AccountUpdate {
                    membership_class: *class,
                    role: role.map(Into::into),
                    approved: *approved,
                    active: *active,
                    fees_paid: *fees_paid,
                    exempt: *exempt,
                },
            )?,
        },
        Commands::Book {
            actor,
            date,
            start,
            end,
            with,
            notes,
        } => {
            let request = BookingRequest {
                date: util::parse_date(date, today)?,
                range: SlotRange::parse(start, end)?,
                roster: with.clone(),
                notes: notes.clone(),
            };
            book::run(&mut out, &mut db, *actor, request, now)?;
        }
        Commands::Cancel { booking, actor } => {
            book::cancel(&mut out, &mut db, *booking, *actor, now)?;
        }
        Commands::Quote {
            roster,
            hours,
            json,
        } => quote::run(&mut out, &db, roster, *hours, *json)?,
        Commands::Settle {
            booking,
            amount,
            actor,
            notes,
        } => settle::run(&mut out, &mut db, *booking, *actor, *amount, notes.as_deref(), now)?,
        Commands::OpenPlay(args) => {
            let session = OpenPlaySession {
                date: util::parse_date(&args.date, today)?,
                label: args.label.clone(),
                hours: args.hours,
                attendees: args.attendees.clone(),
            };
            settle::open_play(
                &mut out,
                &mut db,
                args.actor,
                &session,
                args.amount,
                args.notes.as_deref(),
                now,
            )?;
        }
        Commands::Dues { actor, json } => settle::dues(&mut out, &db, *actor, *json, now)?,
        Commands::Schedule(action) => {
            let weather = weather_provider(&config);
            match action {
                ScheduleAction::Day { date, json } => {
                    let date = util::parse_date(date, today)?;
                    schedule::day(&mut out, &db, date, weather.as_ref(), *json)?;
                }
                ScheduleAction::Week { start, days, json } => {
                    let start = util::parse_date(start, today)?;
                    schedule::week(&mut out, &db, start, *days, weather.as_ref(), *json, now)?;
                }
            }
        }
        Commands::Coins(action) => match action {
            CoinsAction::Balance { account: account_id } => {
                coins::balance(&mut out, &db, *account_id)?;
            }
            CoinsAction::History {
                account: account_id,
                json,
            } => coins::history(&mut out, &db, *account_id, *json)?,
            CoinsAction::Request {
                account: account_id,
                amount,
                reason,
            } => coins::request(&mut out, &mut db, *account_id, *amount, reason, now)?,
            CoinsAction::Resolve { entry, decision } => {
                coins::resolve(&mut out, &mut db, *entry, *decision, now)?;
            }
            CoinsAction::Grant {
                account: account_id,
                amount,
                reason,
            } => coins::grant(&mut out, &mut db, *account_id, *amount, reason, now)?,
        },
        Commands::Payments(action) => match action {
            PaymentsAction::List {
                account: account_id,
                json,
            } => payments::list(&mut out, &db, *account_id, *json)?,
            PaymentsAction::Resolve { payment, outcome } => {
                payments::resolve(&mut out, &mut db, *payment, *outcome, now)?;
            }
        },
    }

    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(&cli, Local::now().naive_local()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err:#}", error_code(&err));
            ExitCode::FAILURE
        }
    }
}
