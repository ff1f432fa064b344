//! Per-request identity and the role/permission checks built on it

use std::collections::BTreeSet;

use crate::{
    error::AppError,
    models::user::{Permission, Role, User, UserProfile},
};

/// Authenticated user with everything needed for access decisions,
/// loaded once per request
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub profile: Option<UserProfile>,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// Active superusers hold every permission; inactive users hold none.
    pub fn has_perm(&self, permission: Permission) -> bool {
        if !self.user.is_active {
            return false;
        }
        self.user.is_superuser || self.permissions.contains(&permission)
    }

    /// Admin role or superuser
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.user.is_superuser || self.role() == Some(Role::Admin) {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

/// Role resolution result; keeps "not signed in" apart from "no profile"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleStatus {
    Anonymous,
    NoProfile,
    Assigned(Role),
}

/// Who is making the request
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(Principal),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(principal) => Some(principal),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.principal().map(|p| &p.user)
    }

    pub fn role_status(&self) -> RoleStatus {
        match self {
            Identity::Anonymous => RoleStatus::Anonymous,
            Identity::Authenticated(principal) => match principal.role() {
                Some(role) => RoleStatus::Assigned(role),
                None => RoleStatus::NoProfile,
            },
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role_status() == RoleStatus::Assigned(role)
    }

    pub fn has_perm(&self, permission: Permission) -> bool {
        self.principal().is_some_and(|p| p.has_perm(permission))
    }
}

pub fn is_admin(identity: &Identity) -> bool {
    identity.has_role(Role::Admin)
}

pub fn is_librarian(identity: &Identity) -> bool {
    identity.has_role(Role::Librarian)
}

pub fn is_member(identity: &Identity) -> bool {
    identity.has_role(Role::Member)
}

/// Per-request context handed to page handlers
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Identity,
    /// Request path, used as `next` when redirecting to the login page
    pub path: String,
}

impl RequestContext {
    /// Pass when `check` accepts the identity, otherwise redirect to login.
    pub fn require(&self, check: fn(&Identity) -> bool, what: &str) -> Result<(), AppError> {
        if check(&self.identity) {
            return Ok(());
        }
        match self.identity.role_status() {
            RoleStatus::NoProfile => tracing::warn!(
                user = self.identity.user().map(|u| u.username.as_str()),
                "{} denied: user has no profile",
                what
            ),
            status => tracing::debug!(?status, "{} denied", what),
        }
        Err(AppError::LoginRequired(self.path.clone()))
    }

    /// Permission gate that redirects to login when the permission is missing
    pub fn require_perm(&self, permission: Permission) -> Result<(), AppError> {
        if self.identity.has_perm(permission) {
            return Ok(());
        }
        tracing::debug!(%permission, path = %self.path, "permission missing, redirecting to login");
        Err(AppError::LoginRequired(self.path.clone()))
    }

    /// Permission gate that answers 403 when the permission is missing
    pub fn require_perm_or_forbid(&self, permission: Permission) -> Result<(), AppError> {
        if self.identity.has_perm(permission) {
            return Ok(());
        }
        Err(AppError::Authorization(format!("Permission {} required", permission)))
    }
}
