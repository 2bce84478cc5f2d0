//! Initial directory contents installed on first use.

use crate::principal::{AccountStatus, Principal, Role, RoleProfile};

/// A seeded principal together with its initial credential.
#[derive(Debug, Clone)]
pub struct SeedAccount {
    pub principal: Principal,
    pub credential: &'static str,
}

fn account(
    id: &str,
    handle: &str,
    name: &str,
    email: &str,
    role: Role,
    credential: &'static str,
) -> SeedAccount {
    SeedAccount {
        principal: Principal::new(id.into(), handle, name, email, role)
            .with_status(AccountStatus::Active),
        credential,
    }
}

fn store_owner(
    mut seed: SeedAccount,
    performance_score: u8,
    account_manager: Option<&str>,
) -> SeedAccount {
    seed.principal.profile = RoleProfile::StoreOwner {
        performance_score,
        account_manager: account_manager.map(str::to_string),
    };
    seed
}

/// The fixed initial set: one principal per role plus a suspended store owner.
pub fn default_accounts() -> Vec<SeedAccount> {
    let mut suspended_owner = store_owner(
        account(
            "u7",
            "owner_gadgetku",
            "Gadgetku Official",
            "admin@gadgetku.id",
            Role::StoreOwner,
            "gadgetku-2024",
        ),
        41,
        None,
    );
    suspended_owner.principal.status = AccountStatus::Suspended;

    vec![
        account(
            "u1",
            "superadmin",
            "Platform Super Admin",
            "root@storegate.io",
            Role::SuperAdmin,
            "super-secret-1",
        ),
        store_owner(
            account(
                "u2",
                "owner_acehtech",
                "Aceh Tech Store",
                "owner@acehtech.id",
                Role::StoreOwner,
                "acehtech-2024",
            ),
            92,
            Some("Rina Putri"),
        ),
        account(
            "u3",
            "staff_admin",
            "Siti Rahma",
            "siti@acehtech.id",
            Role::StaffAdmin,
            "staff-pass-123",
        ),
        account(
            "u4",
            "tech_budi",
            "Budi Santoso",
            "budi@acehtech.id",
            Role::Technician,
            "tech-budi-123",
        ),
        account(
            "u5",
            "marketing_sari",
            "Sari Wulandari",
            "sari@acehtech.id",
            Role::Marketing,
            "marketing-123",
        ),
        account(
            "u6",
            "customer_andi",
            "Andi Pratama",
            "andi@mail.id",
            Role::Customer,
            "customer-123",
        ),
        suspended_owner,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn seed_ids_and_handles_are_unique() {
        let seeds = default_accounts();
        let ids: HashSet<_> = seeds.iter().map(|s| s.principal.id.clone()).collect();
        let handles: HashSet<_> = seeds.iter().map(|s| s.principal.handle.clone()).collect();
        assert_eq!(ids.len(), seeds.len());
        assert_eq!(handles.len(), seeds.len());
    }

    #[test]
    fn every_role_is_represented() {
        let seeds = default_accounts();
        for role in Role::ALL {
            assert!(seeds.iter().any(|s| s.principal.role == role), "missing {role}");
        }
    }

    #[test]
    fn seeded_credentials_meet_default_length() {
        let min = crate::SecurityPolicy::default().min_credential_length;
        assert!(default_accounts().iter().all(|s| s.credential.len() >= min));
    }
}
