//! Identity directory: the durable set of principal records.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use storegate_core::{PrincipalId, StoreError};

use crate::error::DirectoryError;
use crate::principal::{AccountStatus, NewPrincipal, Principal, RoleProfile};
use crate::seed;

/// Storage-agnostic directory contract.
///
/// The directory exclusively owns principal records; every mutation targets a
/// single record and fails with `NotFound` when the id does not exist.
pub trait IdentityDirectory: Send + Sync {
    /// Install the seed principals if the directory is empty.
    ///
    /// Returns `true` when records were installed, `false` on a no-op.
    fn seed(&self) -> Result<bool, DirectoryError>;

    fn list(&self) -> Result<Vec<Principal>, DirectoryError>;

    /// Look up by login handle, preferring a principal that is not suspended.
    fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, DirectoryError>;

    fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, DirectoryError>;

    fn set_status(
        &self,
        id: &PrincipalId,
        status: AccountStatus,
    ) -> Result<Principal, DirectoryError>;

    /// Assign (or clear, with an empty name) a store owner's account manager.
    fn set_account_manager(
        &self,
        id: &PrincipalId,
        manager: &str,
    ) -> Result<Principal, DirectoryError>;

    fn remove(&self, id: &PrincipalId) -> Result<Principal, DirectoryError>;

    fn register(&self, input: NewPrincipal) -> Result<Principal, DirectoryError>;

    /// Stamp a successful login.
    fn record_login(
        &self,
        id: &PrincipalId,
        at: DateTime<Utc>,
        origin: &str,
    ) -> Result<Principal, DirectoryError>;
}

impl<D> IdentityDirectory for Arc<D>
where
    D: IdentityDirectory + ?Sized,
{
    fn seed(&self) -> Result<bool, DirectoryError> {
        (**self).seed()
    }

    fn list(&self) -> Result<Vec<Principal>, DirectoryError> {
        (**self).list()
    }

    fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, DirectoryError> {
        (**self).find_by_handle(handle)
    }

    fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, DirectoryError> {
        (**self).find_by_id(id)
    }

    fn set_status(
        &self,
        id: &PrincipalId,
        status: AccountStatus,
    ) -> Result<Principal, DirectoryError> {
        (**self).set_status(id, status)
    }

    fn set_account_manager(
        &self,
        id: &PrincipalId,
        manager: &str,
    ) -> Result<Principal, DirectoryError> {
        (**self).set_account_manager(id, manager)
    }

    fn remove(&self, id: &PrincipalId) -> Result<Principal, DirectoryError> {
        (**self).remove(id)
    }

    fn register(&self, input: NewPrincipal) -> Result<Principal, DirectoryError> {
        (**self).register(input)
    }

    fn record_login(
        &self,
        id: &PrincipalId,
        at: DateTime<Utc>,
        origin: &str,
    ) -> Result<Principal, DirectoryError> {
        (**self).record_login(id, at, origin)
    }
}

/// In-memory directory for tests/dev.
///
/// Records keep insertion order; a single `RwLock` makes each mutation atomic.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<Vec<Principal>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that already holds the seed principals.
    pub fn seeded() -> Result<Self, DirectoryError> {
        let directory = Self::new();
        directory.seed()?;
        Ok(directory)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Principal>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Poisoned("directory"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Principal>>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned("directory"))
    }

    fn update<F>(&self, id: &PrincipalId, mutate: F) -> Result<Principal, DirectoryError>
    where
        F: FnOnce(&mut Principal, &[Principal]) -> Result<(), DirectoryError>,
    {
        let mut records = self.write()?;
        let idx = records
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;

        // Mutate a copy so a rejected change leaves the record untouched.
        let mut updated = records[idx].clone();
        mutate(&mut updated, &records)?;
        records[idx] = updated.clone();
        Ok(updated)
    }
}

fn handle_held_by_other(records: &[Principal], handle: &str, except: &PrincipalId) -> bool {
    records
        .iter()
        .any(|p| &p.id != except && p.handle == handle && p.status.holds_handle())
}

impl IdentityDirectory for InMemoryDirectory {
    fn seed(&self) -> Result<bool, DirectoryError> {
        let mut records = self.write()?;
        if !records.is_empty() {
            return Ok(false);
        }
        records.extend(seed::default_accounts().into_iter().map(|s| s.principal));
        tracing::info!(count = records.len(), "seeded identity directory");
        Ok(true)
    }

    fn list(&self) -> Result<Vec<Principal>, DirectoryError> {
        Ok(self.read()?.clone())
    }

    fn find_by_handle(&self, handle: &str) -> Result<Option<Principal>, DirectoryError> {
        let records = self.read()?;
        let holder = records
            .iter()
            .find(|p| p.handle == handle && p.status.holds_handle());
        Ok(holder
            .or_else(|| records.iter().find(|p| p.handle == handle))
            .cloned())
    }

    fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, DirectoryError> {
        Ok(self.read()?.iter().find(|p| &p.id == id).cloned())
    }

    fn set_status(
        &self,
        id: &PrincipalId,
        status: AccountStatus,
    ) -> Result<Principal, DirectoryError> {
        self.update(id, |p, records| {
            // Reinstating a suspended account must not collide with a newer holder.
            if status.holds_handle()
                && !p.status.holds_handle()
                && handle_held_by_other(records, &p.handle, &p.id)
            {
                return Err(DirectoryError::HandleTaken(p.handle.clone()));
            }
            p.status = status;
            Ok(())
        })
    }

    fn set_account_manager(
        &self,
        id: &PrincipalId,
        manager: &str,
    ) -> Result<Principal, DirectoryError> {
        self.update(id, |p, _| match &mut p.profile {
            RoleProfile::StoreOwner {
                account_manager, ..
            } => {
                let manager = manager.trim();
                *account_manager = (!manager.is_empty()).then(|| manager.to_string());
                Ok(())
            }
            RoleProfile::Standard => Err(storegate_core::DomainError::validation(format!(
                "account managers only apply to store owners, not '{}'",
                p.role
            ))
            .into()),
        })
    }

    fn remove(&self, id: &PrincipalId) -> Result<Principal, DirectoryError> {
        let mut records = self.write()?;
        let idx = records
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        Ok(records.remove(idx))
    }

    fn register(&self, input: NewPrincipal) -> Result<Principal, DirectoryError> {
        let input = input.validated()?;
        let mut records = self.write()?;

        if records
            .iter()
            .any(|p| p.handle == input.handle && p.status.holds_handle())
        {
            return Err(DirectoryError::HandleTaken(input.handle));
        }

        let principal = Principal::new(
            PrincipalId::generate(),
            input.handle,
            input.full_name,
            input.email,
            input.role,
        );
        records.push(principal.clone());
        Ok(principal)
    }

    fn record_login(
        &self,
        id: &PrincipalId,
        at: DateTime<Utc>,
        origin: &str,
    ) -> Result<Principal, DirectoryError> {
        self.update(id, |p, _| {
            p.last_login_at = Some(at);
            p.last_origin = Some(origin.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Role;

    fn seeded() -> InMemoryDirectory {
        InMemoryDirectory::seeded().unwrap()
    }

    #[test]
    fn seed_is_idempotent() {
        let dir = InMemoryDirectory::new();
        assert!(dir.seed().unwrap());
        let count = dir.list().unwrap().len();
        assert!(!dir.seed().unwrap());
        assert_eq!(dir.list().unwrap().len(), count);
    }

    #[test]
    fn seed_is_noop_when_records_exist() {
        let dir = InMemoryDirectory::new();
        dir.register(NewPrincipal::new("Only One", "solo", "s@x.io", Role::Customer))
            .unwrap();
        assert!(!dir.seed().unwrap());
        assert_eq!(dir.list().unwrap().len(), 1);
    }

    #[test]
    fn finds_by_handle_and_id() {
        let dir = seeded();
        let owner = dir.find_by_handle("owner_acehtech").unwrap().unwrap();
        assert_eq!(owner.id.as_str(), "u2");
        assert_eq!(dir.find_by_id(&"u2".into()).unwrap().unwrap().handle, "owner_acehtech");
        assert!(dir.find_by_handle("nobody").unwrap().is_none());
        assert!(dir.find_by_id(&"u404".into()).unwrap().is_none());
    }

    #[test]
    fn register_defaults_status_by_role() {
        let dir = seeded();
        let owner = dir
            .register(NewPrincipal::new("New Shop", "owner_newshop", "n@shop.id", Role::StoreOwner))
            .unwrap();
        assert_eq!(owner.status, AccountStatus::Pending);

        let tech = dir
            .register(NewPrincipal::new("Eko", "tech_eko", "eko@shop.id", Role::Technician))
            .unwrap();
        assert_eq!(tech.status, AccountStatus::Active);
        assert_ne!(owner.id, tech.id);
    }

    #[test]
    fn register_rejects_taken_handle() {
        let dir = seeded();
        let err = dir
            .register(NewPrincipal::new("Dup", "tech_budi", "d@x.io", Role::Technician))
            .unwrap_err();
        assert_eq!(err, DirectoryError::HandleTaken("tech_budi".into()));
    }

    #[test]
    fn suspended_handle_can_be_reused_but_not_reinstated_over_new_holder() {
        let dir = seeded();
        // u7 (owner_gadgetku) is seeded suspended.
        let fresh = dir
            .register(NewPrincipal::new("Gadgetku 2", "owner_gadgetku", "g2@x.io", Role::StoreOwner))
            .unwrap();

        let found = dir.find_by_handle("owner_gadgetku").unwrap().unwrap();
        assert_eq!(found.id, fresh.id);

        let err = dir.set_status(&"u7".into(), AccountStatus::Active).unwrap_err();
        assert!(matches!(err, DirectoryError::HandleTaken(_)));
        assert!(dir.find_by_id(&"u7".into()).unwrap().unwrap().is_suspended());
    }

    #[test]
    fn mutations_on_missing_id_fail_not_found() {
        let dir = seeded();
        let missing: PrincipalId = "u404".into();
        assert!(matches!(
            dir.set_status(&missing, AccountStatus::Suspended),
            Err(DirectoryError::NotFound(_))
        ));
        assert!(matches!(
            dir.set_account_manager(&missing, "Rina"),
            Err(DirectoryError::NotFound(_))
        ));
        assert!(matches!(dir.remove(&missing), Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn account_manager_only_for_store_owners() {
        let dir = seeded();
        let owner = dir.set_account_manager(&"u2".into(), "Yusuf").unwrap();
        assert_eq!(owner.account_manager(), Some("Yusuf"));

        let cleared = dir.set_account_manager(&"u2".into(), "  ").unwrap();
        assert_eq!(cleared.account_manager(), None);

        let err = dir.set_account_manager(&"u4".into(), "Yusuf").unwrap_err();
        assert!(matches!(err, DirectoryError::Invalid(_)));
    }

    #[test]
    fn remove_deletes_record() {
        let dir = seeded();
        let removed = dir.remove(&"u5".into()).unwrap();
        assert_eq!(removed.handle, "marketing_sari");
        assert!(dir.find_by_id(&"u5".into()).unwrap().is_none());
    }

    #[test]
    fn record_login_stamps_time_and_origin() {
        let dir = seeded();
        let at = Utc::now();
        let p = dir.record_login(&"u3".into(), at, "10.0.0.9").unwrap();
        assert_eq!(p.last_login_at, Some(at));
        assert_eq!(p.last_origin.as_deref(), Some("10.0.0.9"));
    }
}
