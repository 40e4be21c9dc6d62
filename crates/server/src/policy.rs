//! Who may do what.
//!
//! Role gates live in one capability table keyed by resource and action.
//! Record-level access (owner or admin) is checked separately by
//! [`ensure_owner_or_admin`] once the record has been loaded.

use crate::db::models::Role;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Project,
    Task,
    Report,
}

impl Resource {
    fn noun(self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Project => "project",
            Resource::Task => "task",
            Resource::Report => "report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    List,
    Update,
    Delete,
    Assign,
    /// List the regular users a task can be handed to.
    ListAssignable,
    /// Suspend, activate, delete or list accounts.
    Manage,
    /// Per-owner dashboards and analytics.
    OwnerReport,
    /// System-wide dashboards, analytics and listings.
    SystemReport,
    /// Status updates and listings restricted to the caller's own assignments.
    OwnAssignments,
}

const ALL: &[Role] = &[Role::Admin, Role::Moderator, Role::User];
const MANAGERS: &[Role] = &[Role::Moderator, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];
const MEMBERS: &[Role] = &[Role::User];

const CAPABILITIES: &[(Resource, Action, &[Role])] = &[
    (Resource::User, Action::ListAssignable, MANAGERS),
    (Resource::User, Action::Manage, ADMINS),
    (Resource::Report, Action::SystemReport, ADMINS),
    (Resource::Report, Action::OwnerReport, MANAGERS),
    (Resource::Project, Action::Create, MANAGERS),
    (Resource::Project, Action::Read, ALL),
    (Resource::Project, Action::List, ALL),
    (Resource::Project, Action::Update, ALL),
    (Resource::Project, Action::Delete, ALL),
    (Resource::Task, Action::Create, MANAGERS),
    (Resource::Task, Action::Read, ALL),
    (Resource::Task, Action::List, ALL),
    (Resource::Task, Action::Update, ALL),
    (Resource::Task, Action::Delete, ALL),
    (Resource::Task, Action::Assign, ALL),
    (Resource::Task, Action::OwnAssignments, MEMBERS),
];

/// Roles allowed to perform `action` on `resource`. Unlisted pairs allow nobody.
pub fn allowed_roles(resource: Resource, action: Action) -> &'static [Role] {
    CAPABILITIES
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, roles)| *roles)
        .unwrap_or(&[])
}

/// Fails with `Forbidden` unless the user's role is one of `allowed`.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "User role {} is not authorized to access this route",
        user.role
    )))
}

/// Role gate for `action` on `resource`.
pub fn require(user: &AuthUser, resource: Resource, action: Action) -> Result<()> {
    authorize(user, allowed_roles(resource, action))
}

/// Record-level gate: the creator of the record, or any admin.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: &str, resource: Resource) -> Result<()> {
    if user.id == owner_id || user.role == Role::Admin {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Not authorized to access this {}",
        resource.noun()
    )))
}
