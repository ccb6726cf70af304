//! Time-limited feature access per account.

use chrono::{Local, NaiveDateTime};
use court_core::AccountId;
use rusqlite::{OptionalExtension, params};

use crate::accounts::load_account;
use crate::{Database, DbError, format_timestamp};

impl Database {
    /// Grants `feature` until `expires_at`, replacing any earlier grant.
    pub fn grant_feature(
        &mut self,
        account_id: AccountId,
        feature: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), DbError> {
        self.write(|tx, _| {
            load_account(tx, account_id)?;
            tx.execute(
                "
                INSERT INTO feature_grants (account_id, feature, expires_at) VALUES (?, ?, ?)
                ON CONFLICT (account_id, feature) DO UPDATE SET expires_at = excluded.expires_at
                ",
                params![account_id.get(), feature, format_timestamp(expires_at)],
            )?;
            Ok(())
        })?;
        tracing::info!(account_id = %account_id, feature, expires_at = %expires_at, "feature granted");
        Ok(())
    }

    /// Removes a grant. Returns whether one existed.
    pub fn revoke_feature(&mut self, account_id: AccountId, feature: &str) -> Result<bool, DbError> {
        let removed = self.write(|tx, _| {
            Ok(tx.execute(
                "DELETE FROM feature_grants WHERE account_id = ? AND feature = ?",
                params![account_id.get(), feature],
            )?)
        })?;
        Ok(removed > 0)
    }

    pub fn has_feature(&self, account_id: AccountId, feature: &str) -> Result<bool, DbError> {
        self.has_feature_at(account_id, feature, Local::now().naive_local())
    }

    /// Whether an unexpired grant covers `now`.
    pub fn has_feature_at(
        &self,
        account_id: AccountId,
        feature: &str,
        now: NaiveDateTime,
    ) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM feature_grants WHERE account_id = ? AND feature = ? AND expires_at > ?",
                params![account_id.get(), feature, format_timestamp(now)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::MembershipClass;

    use crate::NewAccount;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_grants_expire_and_can_be_extended() {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .create_account(&NewAccount::member("Pat", MembershipClass::Standard))
            .unwrap()
            .id;

        assert!(!db.has_feature_at(id, "weather", at("2026-03-01T00:00:00")).unwrap());

        db.grant_feature(id, "weather", at("2026-03-10T00:00:00")).unwrap();
        assert!(db.has_feature_at(id, "weather", at("2026-03-09T23:59:59")).unwrap());
        assert!(!db.has_feature_at(id, "weather", at("2026-03-10T00:00:00")).unwrap());
        assert!(!db.has_feature_at(id, "stats", at("2026-03-01T00:00:00")).unwrap());

        db.grant_feature(id, "weather", at("2026-04-01T00:00:00")).unwrap();
        assert!(db.has_feature_at(id, "weather", at("2026-03-20T00:00:00")).unwrap());

        assert!(db.revoke_feature(id, "weather").unwrap());
        assert!(!db.revoke_feature(id, "weather").unwrap());
        assert!(!db.has_feature_at(id, "weather", at("2026-03-20T00:00:00")).unwrap());
    }

    #[test]
    fn test_grant_requires_account() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db
            .grant_feature(AccountId::new(5), "weather", at("2026-03-10T00:00:00"))
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
