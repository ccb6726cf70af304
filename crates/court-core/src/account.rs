//! Member accounts and the per-request identity snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::AccountId;

/// Two-tier rate category of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipClass {
    Standard,
    ReducedRate,
}

impl MembershipClass {
    /// String representation for database storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ReducedRate => "reduced-rate",
        }
    }
}

impl fmt::Display for MembershipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MembershipClass {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" | "homeowner" => Ok(Self::Standard),
            "reduced-rate" | "reduced" | "non-homeowner" => Ok(Self::ReducedRate),
            _ => Err(EngineError::InvalidRoster {
                reason: format!("unknown membership class {s}"),
            }),
        }
    }
}

/// Administrative role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    #[default]
    Member,
    Admin,
}

impl AccountRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(EngineError::InvalidRoster {
                reason: format!("unknown role {s}"),
            }),
        }
    }
}

/// A club member. Accounts are deactivated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub membership_class: MembershipClass,
    /// Coin balance, never negative.
    pub balance: i64,
    pub approved: bool,
    pub active: bool,
    pub fees_paid: bool,
    pub role: AccountRole,
    /// Unlimited-balance accounts book at zero coin cost.
    pub exempt: bool,
}

impl Account {
    pub fn actor(&self) -> Actor {
        Actor {
            account_id: self.id,
            membership_class: self.membership_class,
            fees_paid: self.fees_paid,
            exempt: self.exempt,
            admin: self.role == AccountRole::Admin,
        }
    }
}

/// Identity snapshot trusted for the duration of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub account_id: AccountId,
    pub membership_class: MembershipClass,
    pub fees_paid: bool,
    pub exempt: bool,
    pub admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_class_roundtrip() {
        for class in [MembershipClass::Standard, MembershipClass::ReducedRate] {
            let parsed: MembershipClass = class.as_str().parse().unwrap();
            assert_eq!(parsed, class);
        }
        assert_eq!(
            "homeowner".parse::<MembershipClass>().unwrap(),
            MembershipClass::Standard
        );
        assert!("gold".parse::<MembershipClass>().is_err());
    }

    #[test]
    fn test_actor_reflects_role_and_flags() {
        let account = Account {
            id: AccountId::new(3),
            name: "Rosa".to_string(),
            membership_class: MembershipClass::ReducedRate,
            balance: 40,
            approved: true,
            active: true,
            fees_paid: true,
            role: AccountRole::Admin,
            exempt: false,
        };
        let actor = account.actor();
        assert_eq!(actor.account_id, AccountId::new(3));
        assert!(actor.admin);
        assert!(actor.fees_paid);
        assert!(!actor.exempt);
    }
}
