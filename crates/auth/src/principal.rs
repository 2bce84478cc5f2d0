//! Principal records owned by the identity directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storegate_core::{DomainError, PrincipalId};

/// Closed set of roles a principal can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    StoreOwner,
    StaffAdmin,
    Technician,
    Marketing,
    Customer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::StoreOwner,
        Role::StaffAdmin,
        Role::Technician,
        Role::Marketing,
        Role::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::StoreOwner => "store_owner",
            Role::StaffAdmin => "staff_admin",
            Role::Technician => "technician",
            Role::Marketing => "marketing",
            Role::Customer => "customer",
        }
    }

    /// Status a freshly registered principal of this role starts in.
    ///
    /// Store owners need platform approval before they become active.
    pub fn initial_status(&self) -> AccountStatus {
        match self {
            Role::StoreOwner => AccountStatus::Pending,
            _ => AccountStatus::Active,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

/// Account status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    /// Awaiting platform approval.
    Pending,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Pending => "pending",
        }
    }

    /// Whether the principal still holds its handle (anything but suspended).
    pub fn holds_handle(&self) -> bool {
        !matches!(self, AccountStatus::Suspended)
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            "pending" => Ok(AccountStatus::Pending),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Fields that only exist for some roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleProfile {
    StoreOwner {
        performance_score: u8,
        account_manager: Option<String>,
    },
    Standard,
}

impl RoleProfile {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::StoreOwner => RoleProfile::StoreOwner {
                performance_score: 0,
                account_manager: None,
            },
            _ => RoleProfile::Standard,
        }
    }
}

/// A directory record.
///
/// # Invariants
/// - `id` never changes after creation and is unique across the directory.
/// - `handle` is unique among principals that are not suspended.
/// - `profile` matches `role` (store-owner fields only on store owners).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub handle: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_origin: Option<String>,
    pub profile: RoleProfile,
}

impl Principal {
    pub fn new(
        id: PrincipalId,
        handle: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id,
            handle: handle.into(),
            display_name: display_name.into(),
            email: email.into(),
            role,
            status: role.initial_status(),
            last_login_at: None,
            last_origin: None,
            profile: RoleProfile::for_role(role),
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn is_suspended(&self) -> bool {
        self.status == AccountStatus::Suspended
    }

    pub fn account_manager(&self) -> Option<&str> {
        match &self.profile {
            RoleProfile::StoreOwner {
                account_manager, ..
            } => account_manager.as_deref(),
            RoleProfile::Standard => None,
        }
    }

    pub fn performance_score(&self) -> Option<u8> {
        match &self.profile {
            RoleProfile::StoreOwner {
                performance_score, ..
            } => Some(*performance_score),
            RoleProfile::Standard => None,
        }
    }
}

/// Input for self-service or administrative registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrincipal {
    pub full_name: String,
    pub handle: String,
    pub email: String,
    pub role: Role,
}

impl NewPrincipal {
    pub fn new(
        full_name: impl Into<String>,
        handle: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            handle: handle.into(),
            email: email.into(),
            role,
        }
    }

    /// Trim and validate the input, returning the normalized copy.
    pub fn validated(&self) -> Result<Self, DomainError> {
        let full_name = self.full_name.trim();
        let handle = self.handle.trim();
        let email = self.email.trim();

        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }
        if handle.is_empty() || handle.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                "handle must be non-empty and contain no whitespace",
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        Ok(Self {
            full_name: full_name.to_string(),
            handle: handle.to_string(),
            email: email.to_lowercase(),
            role: self.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_owners_start_pending_everyone_else_active() {
        assert_eq!(Role::StoreOwner.initial_status(), AccountStatus::Pending);
        assert_eq!(Role::Technician.initial_status(), AccountStatus::Active);
        assert_eq!(Role::Customer.initial_status(), AccountStatus::Active);
    }

    #[test]
    fn store_owner_fields_only_on_store_owners() {
        let owner = Principal::new("u9".into(), "o", "Owner", "o@x.io", Role::StoreOwner);
        assert_eq!(owner.performance_score(), Some(0));
        assert_eq!(owner.account_manager(), None);

        let tech = Principal::new("u10".into(), "t", "Tech", "t@x.io", Role::Technician);
        assert_eq!(tech.performance_score(), None);
        assert_eq!(tech.profile, RoleProfile::Standard);
    }

    #[test]
    fn role_parses_common_spellings() {
        assert_eq!("super-admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("STORE_OWNER".parse::<Role>().unwrap(), Role::StoreOwner);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn registration_input_is_validated_and_normalized() {
        let ok = NewPrincipal::new(" Dewi ", " dewi_k ", "Dewi@Example.com", Role::Marketing)
            .validated()
            .unwrap();
        assert_eq!(ok.full_name, "Dewi");
        assert_eq!(ok.handle, "dewi_k");
        assert_eq!(ok.email, "dewi@example.com");

        assert!(NewPrincipal::new("", "h", "a@b", Role::Customer).validated().is_err());
        assert!(NewPrincipal::new("N", "a b", "a@b", Role::Customer).validated().is_err());
        assert!(NewPrincipal::new("N", "h", "nope", Role::Customer).validated().is_err());
    }
}
