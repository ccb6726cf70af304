//! Account registry and identity snapshots.

use chrono::{Local, NaiveDateTime};
use court_core::{
    Account, AccountId, AccountRole, Actor, CreditKind, EngineError, MembershipClass, RosterMember,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Database, DbError, format_timestamp, ledger, parse_column};

/// Fields for registering an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub membership_class: MembershipClass,
    pub role: AccountRole,
    pub approved: bool,
    pub fees_paid: bool,
    pub exempt: bool,
    /// Coins credited as an approved grant on creation.
    pub opening_balance: i64,
}

impl NewAccount {
    pub fn member(name: impl Into<String>, membership_class: MembershipClass) -> Self {
        Self {
            name: name.into(),
            membership_class,
            role: AccountRole::Member,
            approved: true,
            fees_paid: true,
            exempt: false,
            opening_balance: 0,
        }
    }
}

/// Flag changes from the approval workflow. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub membership_class: Option<MembershipClass>,
    pub role: Option<AccountRole>,
    pub approved: Option<bool>,
    pub active: Option<bool>,
    pub fees_paid: Option<bool>,
    pub exempt: Option<bool>,
}

#[derive(Debug)]
struct AccountRow {
    id: i64,
    name: String,
    membership_class: String,
    balance: i64,
    approved: bool,
    active: bool,
    fees_paid: bool,
    role: String,
    exempt: bool,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, DbError> {
        Ok(Account {
            id: AccountId::new(self.id),
            membership_class: parse_column(&self.membership_class, "accounts", self.id)?,
            role: parse_column(&self.role, "accounts", self.id)?,
            name: self.name,
            balance: self.balance,
            approved: self.approved,
            active: self.active,
            fees_paid: self.fees_paid,
            exempt: self.exempt,
        })
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, name, membership_class, balance, approved, active, fees_paid, role, exempt";

fn read_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        name: row.get(1)?,
        membership_class: row.get(2)?,
        balance: row.get(3)?,
        approved: row.get(4)?,
        active: row.get(5)?,
        fees_paid: row.get(6)?,
        role: row.get(7)?,
        exempt: row.get(8)?,
    })
}

/// Loads an account, failing with `NotFound` if it does not exist.
pub(crate) fn load_account(conn: &Connection, id: AccountId) -> Result<Account, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"),
            [id.get()],
            read_account_row,
        )
        .optional()?
        .ok_or(EngineError::NotFound {
            entity: "account",
            id: id.get(),
        })?;
    row.into_account()
}

/// Resolves roster ids to their membership classes, preserving order.
pub(crate) fn roster_members(
    conn: &Connection,
    roster: &[AccountId],
) -> Result<Vec<RosterMember>, DbError> {
    roster
        .iter()
        .map(|id| -> Result<RosterMember, DbError> {
            let class: Option<String> = conn
                .query_row(
                    "SELECT membership_class FROM accounts WHERE id = ?",
                    [id.get()],
                    |row| row.get(0),
                )
                .optional()?;
            let class = class.ok_or_else(|| EngineError::InvalidRoster {
                reason: format!("account {id} does not exist"),
            })?;
            Ok(RosterMember {
                account_id: *id,
                membership_class: parse_column(&class, "accounts", id.get())?,
            })
        })
        .collect()
}

impl Database {
    /// Registers an account.
    pub fn create_account(&mut self, account: &NewAccount) -> Result<Account, DbError> {
        self.create_account_at(account, Local::now().naive_local())
    }

    pub fn create_account_at(
        &mut self,
        account: &NewAccount,
        now: NaiveDateTime,
    ) -> Result<Account, DbError> {
        court_core::ledger::check_amount(account.opening_balance)?;
        let created = self.write(|tx, _| {
            tx.execute(
                "
                INSERT INTO accounts
                (name, membership_class, approved, active, fees_paid, role, exempt, created_at)
                VALUES (?, ?, ?, 1, ?, ?, ?, ?)
                ",
                params![
                    account.name,
                    account.membership_class.as_str(),
                    account.approved,
                    account.fees_paid,
                    account.role.as_str(),
                    account.exempt,
                    format_timestamp(now),
                ],
            )?;
            let id = AccountId::new(tx.last_insert_rowid());
            if account.opening_balance > 0 {
                ledger::append_credit(
                    tx,
                    id,
                    account.opening_balance,
                    CreditKind::Granted,
                    "opening balance",
                    None,
                    now,
                )?;
            }
            load_account(tx, id)
        })?;
        tracing::info!(account_id = %created.id, name = %created.name, "account created");
        Ok(created)
    }

    /// Applies flag changes from the approval workflow.
    pub fn update_account(
        &mut self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, DbError> {
        self.write(|tx, _| {
            let mut account = load_account(tx, id)?;
            if let Some(class) = update.membership_class {
                account.membership_class = class;
            }
            if let Some(role) = update.role {
                account.role = role;
            }
            account.approved = update.approved.unwrap_or(account.approved);
            account.active = update.active.unwrap_or(account.active);
            account.fees_paid = update.fees_paid.unwrap_or(account.fees_paid);
            account.exempt = update.exempt.unwrap_or(account.exempt);

            tx.execute(
                "
                UPDATE accounts
                SET membership_class = ?, role = ?, approved = ?, active = ?, fees_paid = ?, exempt = ?
                WHERE id = ?
                ",
                params![
                    account.membership_class.as_str(),
                    account.role.as_str(),
                    account.approved,
                    account.active,
                    account.fees_paid,
                    account.exempt,
                    id.get(),
                ],
            )?;
            Ok(account)
        })
    }

    pub fn account(&self, id: AccountId) -> Result<Account, DbError> {
        load_account(&self.conn, id)
    }

    /// Lists accounts ordered by ID.
    pub fn list_accounts(&self) -> Result<Vec<Account>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id ASC"))?;
        let rows = stmt.query_map([], read_account_row)?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?.into_account()?);
        }
        Ok(accounts)
    }

    /// Identity snapshot for one request.
    pub fn actor(&self, id: AccountId) -> Result<Actor, DbError> {
        Ok(self.account(id)?.actor())
    }
}
