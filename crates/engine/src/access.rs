//! Role and capability checks for client-side gating.
//!
//! The remote API stays the authority on permissions. These checks only let
//! a front-end hide actions a user cannot perform, and they take the
//! [`Session`] explicitly instead of reading it from ambient state.

use crate::{EngineError, Member, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateGroups,
    UpdateGroups,
    AddExpenses,
    ManageUsers,
}

impl Capability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateGroups => "create_groups",
            Self::UpdateGroups => "update_groups",
            Self::AddExpenses => "add_expenses",
            Self::ManageUsers => "manage_users",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Viewer,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Admin => &[
                Capability::CreateGroups,
                Capability::UpdateGroups,
                Capability::AddExpenses,
                Capability::ManageUsers,
            ],
            Self::Manager => &[
                Capability::CreateGroups,
                Capability::UpdateGroups,
                Capability::AddExpenses,
            ],
            Self::Viewer => &[Capability::AddExpenses],
        }
    }

    #[must_use]
    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "viewer" => Ok(Self::Viewer),
            other => Err(EngineError::PermissionDenied(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// The authenticated user, passed into operations that need permissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: Member,
    pub role: Role,
}

impl Session {
    #[must_use]
    pub fn new(user: Member, role: Role) -> Self {
        Self { user, role }
    }

    pub fn require(&self, capability: Capability) -> ResultEngine<()> {
        if self.role.can(capability) {
            return Ok(());
        }
        Err(EngineError::PermissionDenied(format!(
            "{} ({}) lacks {}",
            self.user,
            self.role.as_str(),
            capability.as_str()
        )))
    }
}
