//! Account registry commands.

use std::io::Write;

use anyhow::Result;
use court_core::{Account, AccountId, AccountRole, MembershipClass};
use court_db::{AccountUpdate, Database, NewAccount};

use crate::cli::Role;

/// Options for `court account add`.
#[derive(Debug, Clone)]
pub struct AddOptions {
    pub name: String,
    pub class: MembershipClass,
    pub admin: bool,
    pub exempt: bool,
    pub fees_unpaid: bool,
    pub balance: i64,
}

pub fn add<W: Write>(writer: &mut W, db: &mut Database, options: AddOptions) -> Result<()> {
    let account = db.create_account(&NewAccount {
        name: options.name,
        membership_class: options.class,
        role: if options.admin {
            AccountRole::Admin
        } else {
            AccountRole::Member
        },
        approved: true,
        fees_paid: !options.fees_unpaid,
        exempt: options.exempt,
        opening_balance: options.balance,
    })?;
    writeln!(
        writer,
        "Created account {} ({}, {}) with {} coins",
        account.id, account.name, account.membership_class, account.balance
    )?;
    Ok(())
}

fn flags(account: &Account) -> String {
    let mut flags = Vec::new();
    if account.role == AccountRole::Admin {
        flags.push("admin");
    }
    if account.exempt {
        flags.push("exempt");
    }
    if !account.fees_paid {
        flags.push("fees-unpaid");
    }
    if !account.approved {
        flags.push("unapproved");
    }
    if !account.active {
        flags.push("inactive");
    }
    flags.join(", ")
}

/// Writes accounts as a table.
pub fn format_accounts<W: Write>(writer: &mut W, accounts: &[Account]) -> Result<()> {
    if accounts.is_empty() {
        writeln!(writer, "No accounts.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "{:<4}  {:<20}  {:<12}  {:>7}  Flags",
        "ID", "Name", "Class", "Coins"
    )?;
    for account in accounts {
        let name: String = account.name.chars().take(20).collect();
        let line = format!(
            "{:<4}  {:<20}  {:<12}  {:>7}  {}",
            account.id,
            name,
            account.membership_class,
            account.balance,
            flags(account)
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let accounts = db.list_accounts()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&accounts)?)?;
    } else {
        format_accounts(writer, &accounts)?;
    }
    Ok(())
}

pub fn set<W: Write>(
    writer: &mut W,
    db: &mut Database,
    account_id: AccountId,
    update: AccountUpdate,
) -> Result<()> {
    let account = db.update_account(account_id, &update)?;
    let flags = flags(&account);
    writeln!(
        writer,
        "Updated account {} ({}, {}){}",
        account.id,
        account.name,
        account.membership_class,
        if flags.is_empty() {
            String::new()
        } else {
            format!(": {flags}")
        }
    )?;
    Ok(())
}

impl From<Role> for AccountRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Member => Self::Member,
            Role::Admin => Self::Admin,
        }
    }
}
