//! Actor roles as resolved by the identity collaborator.
//!
//! Roles are never stored on a ticket except as point-in-time snapshots on
//! comments and history entries.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

/// Role of the user acting on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    SupportAgent,
    Moderator,
    Treasurer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::SupportAgent,
        Role::Moderator,
        Role::Treasurer,
        Role::Admin,
    ];

    /// Parse a role string as delivered by the identity service.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "user" => Ok(Self::User),
            "support_agent" => Ok(Self::SupportAgent),
            "moderator" => Ok(Self::Moderator),
            "treasurer" => Ok(Self::Treasurer),
            "admin" => Ok(Self::Admin),
            _ => Err(CoreError::Validation(format!(
                "Invalid role '{s}'. Must be one of: user, support_agent, moderator, treasurer, admin"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::SupportAgent => "support_agent",
            Self::Moderator => "moderator",
            Self::Treasurer => "treasurer",
            Self::Admin => "admin",
        }
    }

    /// Admin tier: `admin`, `moderator` and `support_agent`.
    ///
    /// Treasurers handle payments elsewhere in the product but get no
    /// elevated ticket permissions.
    pub fn is_admin_tier(&self) -> bool {
        match self {
            Self::Admin | Self::Moderator | Self::SupportAgent => true,
            Self::User | Self::Treasurer => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_db(s)
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: EntityId, role: Role) -> Self {
        Self { id, role }
    }
}
