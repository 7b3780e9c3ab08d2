//! Caller identity and capabilities.
//!
//! The authentication layer resolves a [`Role`] once per request and attaches
//! a [`CurrentUser`] to it. Authorization checks test permission membership,
//! never role-name equality.

use crate::error::BookingError;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

labelled_enum! {
    /// A single capability granted by a role.
    pub enum Permission {
        /// Create, edit and delete user accounts
        ManageUsers => "manage_users",
        /// Create, edit and delete roles
        ManageRoles => "manage_roles",
        /// Decide, list and delete any reservation
        ManageReservations => "manage_reservations",
        /// Read aggregate statistics
        ViewDashboard => "view_dashboard",
        /// Manage the equipment catalog
        ManageSystem => "manage_system",
        /// Read one's own reservations
        ViewOwnReservations => "view_own_reservations",
        /// Edit one's own profile
        EditOwnProfile => "edit_own_profile",
    }
}

/// A named set of permissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name as carried in tokens
    pub name: String,
    /// Granted capabilities
    pub permissions: BTreeSet<Permission>,
}

impl Role {
    /// Name of the built-in administrator role.
    pub const ADMIN: &'static str = "admin";
    /// Name of the built-in default role.
    pub const USER: &'static str = "user";

    /// Builds a role from an explicit permission list.
    #[must_use]
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// The administrator role: every permission.
    #[must_use]
    pub fn admin() -> Self {
        Self::new(Self::ADMIN, Permission::ALL.iter().copied())
    }

    /// The default role for registered users.
    #[must_use]
    pub fn user() -> Self {
        Self::new(
            Self::USER,
            [Permission::ViewOwnReservations, Permission::EditOwnProfile],
        )
    }

    /// Resolves a role name to its permission set.
    ///
    /// Unknown names get the default user permissions but keep their name.
    #[must_use]
    pub fn resolve(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case(Self::ADMIN) {
            Self::admin()
        } else {
            Self {
                name: name.trim().to_string(),
                ..Self::user()
            }
        }
    }

    /// Whether the role grants `permission`.
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Contact details used to address notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    /// User ID
    pub id: UserId,
    /// Email address
    pub email: String,
    /// Display name
    pub username: String,
}

/// The authenticated caller of an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User ID
    pub id: UserId,
    /// Email address
    pub email: String,
    /// Display name
    pub username: String,
    /// Resolved role
    pub role: Role,
}

impl CurrentUser {
    /// Whether the caller holds `permission`.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.role.has(permission)
    }

    /// Requires `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] when the role lacks it.
    pub fn require(&self, permission: Permission) -> Result<(), BookingError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(BookingError::Forbidden(format!(
                "permission '{permission}' required"
            )))
        }
    }

    /// Requires the caller to be `owner` or a reservation manager.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] otherwise.
    pub fn require_owner_or_manager(&self, owner: UserId) -> Result<(), BookingError> {
        if self.id == owner || self.can(Permission::ManageReservations) {
            Ok(())
        } else {
            Err(BookingError::Forbidden(
                "only the owner or an administrator may do this".to_string(),
            ))
        }
    }

    /// Contact details for notifications.
    #[must_use]
    pub fn contact(&self) -> UserContact {
        UserContact {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_has_every_permission() {
        let admin = Role::admin();
        for permission in Permission::ALL {
            assert!(admin.has(*permission));
        }
    }

    #[test]
    fn test_unknown_role_resolves_to_user_permissions() {
        let role = Role::resolve("technician");
        assert_eq!(role.name, "technician");
        assert!(role.has(Permission::ViewOwnReservations));
        assert!(!role.has(Permission::ManageReservations));
    }

    #[test]
    fn test_role_resolution_is_case_insensitive() {
        assert!(Role::resolve("Admin").has(Permission::ManageSystem));
    }

    #[test]
    fn test_owner_or_manager() {
        let user = member(Role::user());
        assert!(user.require_owner_or_manager(user.id).is_ok());
        assert!(matches!(
            user.require_owner_or_manager(UserId::new()),
            Err(BookingError::Forbidden(_))
        ));

        let admin = member(Role::admin());
        assert!(admin.require_owner_or_manager(UserId::new()).is_ok());
    }

    #[test]
    fn test_require_permission() {
        let user = member(Role::user());
        assert!(user.require(Permission::ManageSystem).is_err());
        assert!(user.require(Permission::EditOwnProfile).is_ok());
    }
}
