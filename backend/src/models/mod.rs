//! Data models for the Mutuelle backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::loan_request::ApproverRole;

pub mod auth;
pub use auth::*;

/// Member of the association
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub first_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: MemberRole,
    /// National identification number
    pub npi: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            name: member.name,
            first_name: member.first_name,
            email: member.email,
            role: member.role,
            npi: member.npi,
            phone: member.phone,
            created_at: member.created_at,
        }
    }
}

/// Member roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "member_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Member,
    President,
    Secretary,
    Treasurer,
}

impl MemberRole {
    /// The approval slot this role may act on, if any
    pub fn approver_role(&self) -> Option<ApproverRole> {
        match self {
            MemberRole::Member => None,
            MemberRole::President => Some(ApproverRole::President),
            MemberRole::Secretary => Some(ApproverRole::Secretary),
            MemberRole::Treasurer => Some(ApproverRole::Treasurer),
        }
    }

    pub fn is_approver(&self) -> bool {
        self.approver_role().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Member => "MEMBER",
            MemberRole::President => "PRESIDENT",
            MemberRole::Secretary => "SECRETARY",
            MemberRole::Treasurer => "TREASURER",
        }
    }
}

impl From<ApproverRole> for MemberRole {
    fn from(role: ApproverRole) -> Self {
        match role {
            ApproverRole::President => MemberRole::President,
            ApproverRole::Secretary => MemberRole::Secretary,
            ApproverRole::Treasurer => MemberRole::Treasurer,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MEMBER" => Ok(MemberRole::Member),
            "PRESIDENT" => Ok(MemberRole::President),
            "SECRETARY" => Ok(MemberRole::Secretary),
            "TREASURER" => Ok(MemberRole::Treasurer),
            other => Err(format!("unknown member role '{}'", other)),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_maps_to_approver_slot() {
        assert_eq!(MemberRole::Member.approver_role(), None);
        assert_eq!(
            MemberRole::Secretary.approver_role(),
            Some(ApproverRole::Secretary)
        );
        for role in ApproverRole::ALL {
            assert_eq!(MemberRole::from(role).approver_role(), Some(role));
        }
    }

    #[test]
    fn test_member_role_parsing() {
        assert_eq!("treasurer".parse::<MemberRole>(), Ok(MemberRole::Treasurer));
        assert_eq!(" MEMBER ".parse::<MemberRole>(), Ok(MemberRole::Member));
        assert!("admin".parse::<MemberRole>().is_err());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let member = Member {
            id: Uuid::new_v4(),
            name: "Adjovi".to_string(),
            first_name: "Koffi".to_string(),
            email: "koffi@example.com".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            role: MemberRole::Member,
            npi: "1234567890".to_string(),
            phone: "+22997000000".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&member).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Koffi");
        assert_eq!(json["role"], "MEMBER");
    }
}
