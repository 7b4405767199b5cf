//! Access decisions for the HTTP surface.
//!
//! Two checks compose per endpoint: the role allow-list, then (where the
//! endpoint is org-scoped) the same-organization-or-superadmin rule. Handlers
//! run the role check first so callers outside the allow-list learn nothing
//! about organization membership.

use crate::models::Role;
use metrics::counter;
use service_core::error::AppError;

/// The caller's verified principal, resolved once per request by
/// `middleware::auth`. Each variant carries exactly what its role needs: an
/// admin or member is always scoped to one organization, a superadmin to
/// none, so states like "admin with no organization" cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Superadmin { subject: String },
    Admin { subject: String, org_id: String },
    Member { subject: String, org_id: String },
}

impl Identity {
    pub fn subject(&self) -> &str {
        match self {
            Identity::Superadmin { subject }
            | Identity::Admin { subject, .. }
            | Identity::Member { subject, .. } => subject,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Superadmin { .. } => Role::Superadmin,
            Identity::Admin { .. } => Role::Admin,
            Identity::Member { .. } => Role::Member,
        }
    }

    pub fn org_id(&self) -> Option<&str> {
        match self {
            Identity::Superadmin { .. } => None,
            Identity::Admin { org_id, .. } | Identity::Member { org_id, .. } => Some(org_id),
        }
    }
}

/// Role allow-list check. The denial message names both the required set and
/// the caller's actual role.
pub fn require_role(identity: &Identity, required: &[Role]) -> Result<(), AppError> {
    if required.contains(&identity.role()) {
        return Ok(());
    }

    counter!("authz_denied_total", "check" => "role").increment(1);
    let required_names = required
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::Forbidden(anyhow::anyhow!(
        "Access denied. Required roles: [{}]. Your role: {}",
        required_names,
        identity.role()
    )))
}

/// Organization-scope check: superadmins may touch any organization, every
/// other role only its own.
pub fn require_org_access(identity: &Identity, target_org_id: &str) -> Result<(), AppError> {
    match identity {
        Identity::Superadmin { .. } => Ok(()),
        Identity::Admin { org_id, .. } | Identity::Member { org_id, .. }
            if org_id == target_org_id =>
        {
            Ok(())
        }
        _ => {
            counter!("authz_denied_total", "check" => "org_scope").increment(1);
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Access denied. You can only access your own organization."
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn superadmin() -> Identity {
        Identity::Superadmin {
            subject: "user_root".to_string(),
        }
    }

    fn admin_of(org_id: &str) -> Identity {
        Identity::Admin {
            subject: "user_admin".to_string(),
            org_id: org_id.to_string(),
        }
    }

    fn member_of(org_id: &str) -> Identity {
        Identity::Member {
            subject: "user_member".to_string(),
            org_id: org_id.to_string(),
        }
    }

    #[test]
    fn role_in_allow_list_passes() {
        assert!(require_role(&superadmin(), &[Role::Superadmin]).is_ok());
        assert!(require_role(&admin_of("org_1"), &[Role::Superadmin, Role::Admin]).is_ok());
        assert!(
            require_role(
                &member_of("org_1"),
                &[Role::Superadmin, Role::Admin, Role::Member]
            )
            .is_ok()
        );
    }

    #[test]
    fn role_outside_allow_list_is_forbidden() {
        let err = require_role(&member_of("org_1"), &[Role::Superadmin, Role::Admin]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("superadmin, admin"));
        assert!(message.contains("Your role: member"));
    }

    #[test]
    fn superadmin_is_not_implicitly_an_admin() {
        // The invite-member endpoint is admin-only; the allow-list is exact.
        assert!(require_role(&superadmin(), &[Role::Admin]).is_err());
    }

    #[test]
    fn superadmin_bypasses_org_scope() {
        assert!(require_org_access(&superadmin(), "org_anything").is_ok());
    }

    #[test]
    fn own_org_is_accessible() {
        assert!(require_org_access(&admin_of("org_1"), "org_1").is_ok());
        assert!(require_org_access(&member_of("org_1"), "org_1").is_ok());
    }

    #[test]
    fn foreign_org_is_forbidden() {
        let err = require_org_access(&admin_of("org_1"), "org_2").unwrap_err();
        assert!(err.to_string().contains("your own organization"));
        assert!(require_org_access(&member_of("org_1"), "org_2").is_err());
    }

    #[test]
    fn identity_accessors_report_role_and_org() {
        assert_eq!(superadmin().role(), Role::Superadmin);
        assert_eq!(superadmin().org_id(), None);
        assert_eq!(admin_of("org_1").org_id(), Some("org_1"));
        assert_eq!(member_of("org_1").subject(), "user_member");
    }
}
