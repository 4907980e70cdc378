//! Roles
//! Mission: One authoritative role type, plus explicit per-resource mapping tables

use serde::{Deserialize, Serialize};
use std::fmt;

/// User roles for RBAC.
///
/// Stored and transmitted as the integers `1` (BFA) and `2` (staff).
/// BFA accounts are privileged; staff accounts are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Bfa,
    Staff,
}

impl Role {
    /// Wire/database code
    pub fn code(self) -> u8 {
        match self {
            Role::Bfa => 1,
            Role::Staff => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Role::Bfa),
            2 => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Bfa => "bfa",
            Role::Staff => "staff",
        }
    }

    fn privilege(self) -> u8 {
        match self {
            Role::Bfa => 2,
            Role::Staff => 1,
        }
    }

    /// True when this role grants at least the privileges of `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.privilege() >= required.privilege()
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Role::from_code(i64::from(code)).ok_or_else(|| format!("unknown role code {}", code))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// How a newly created lead is classified, chosen by the creator's role.
///
/// This table is separate from [`Role::satisfies`]: lead handlers branch on
/// it, authorization never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadKind {
    /// Lead sourced by the BFA themselves
    SelfSourced,
    /// Lead referred in by staff
    Referral,
}

impl LeadKind {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Bfa => LeadKind::SelfSourced,
            Role::Staff => LeadKind::Referral,
        }
    }
}
