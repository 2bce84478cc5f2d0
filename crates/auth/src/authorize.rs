//! Role-based checks for privileged identity operations.
//!
//! - No IO
//! - No panics
//! - Pure policy over the closed role set

use serde::Serialize;

use crate::error::AuthzError;
use crate::principal::{Principal, Role};

/// Privileged operations guarded by role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Act as another principal for the rest of the session.
    Impersonate,
    /// Change status, account manager, or remove a principal.
    ManageWorkforce,
    /// Create another super-admin.
    AppointSuperAdmin,
    /// Read the audit trail.
    ReviewAudit,
}

impl Capability {
    pub fn granted_to(&self) -> &'static [Role] {
        match self {
            Capability::Impersonate => &[Role::SuperAdmin],
            Capability::ManageWorkforce => &[Role::SuperAdmin, Role::StaffAdmin],
            Capability::AppointSuperAdmin | Capability::ReviewAudit => &[Role::SuperAdmin],
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Capability::Impersonate => "impersonate other principals",
            Capability::ManageWorkforce => "manage workforce accounts",
            Capability::AppointSuperAdmin => "create super-admin accounts",
            Capability::ReviewAudit => "read the audit log",
        }
    }

    /// What registering a principal with `role` requires, if anything.
    /// Customers and store owners may sign themselves up.
    pub fn to_register(role: Role) -> Option<Capability> {
        match role {
            Role::Customer | Role::StoreOwner => None,
            Role::SuperAdmin => Some(Capability::AppointSuperAdmin),
            Role::StaffAdmin | Role::Technician | Role::Marketing => {
                Some(Capability::ManageWorkforce)
            }
        }
    }
}

/// Check that `principal` may exercise `capability`.
///
/// `None` means no authenticated principal.
pub fn authorize(principal: Option<&Principal>, capability: Capability) -> Result<(), AuthzError> {
    let principal = principal.ok_or(AuthzError::Unauthenticated)?;
    if capability.granted_to().contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: principal.role.to_string(),
            action: capability.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new("u1".into(), "h", "Name", "n@x.io", role)
    }

    #[test]
    fn only_super_admin_impersonates() {
        assert!(authorize(Some(&principal(Role::SuperAdmin)), Capability::Impersonate).is_ok());
        for role in Role::ALL.into_iter().filter(|r| *r != Role::SuperAdmin) {
            let err = authorize(Some(&principal(role)), Capability::Impersonate).unwrap_err();
            assert!(matches!(err, AuthzError::Forbidden { .. }));
        }
    }

    #[test]
    fn staff_admin_manages_workforce() {
        assert!(authorize(Some(&principal(Role::StaffAdmin)), Capability::ManageWorkforce).is_ok());
        assert!(authorize(Some(&principal(Role::Marketing)), Capability::ManageWorkforce).is_err());
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert_eq!(
            authorize(None, Capability::ManageWorkforce),
            Err(AuthzError::Unauthenticated)
        );
    }

    #[test]
    fn self_signup_roles_need_nothing() {
        assert_eq!(Capability::to_register(Role::Customer), None);
        assert_eq!(Capability::to_register(Role::StoreOwner), None);
        assert_eq!(
            Capability::to_register(Role::Technician),
            Some(Capability::ManageWorkforce)
        );
        let staff = principal(Role::StaffAdmin);
        assert!(authorize(Some(&staff), Capability::AppointSuperAdmin).is_err());
    }
}
