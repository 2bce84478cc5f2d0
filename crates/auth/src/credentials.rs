//! Credential verification.
//!
//! Credentials belong to a principal, never to a handle: a handle can pass
//! from a suspended or removed account to a new one, and the new holder must
//! start without a credential. The authentication engine resolves the handle
//! first and asks [`CredentialVerifier`] about that principal.
//!
//! Stored values are Argon2id hashes in PHC string format.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use storegate_core::{PrincipalId, StoreError};

use crate::error::CredentialError;
use crate::policy::SecurityPolicy;
use crate::seed::SeedAccount;

/// Answers whether a credential is valid for a principal.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, principal: &PrincipalId, credential: &str) -> Result<bool, CredentialError>;
}

impl<V> CredentialVerifier for Arc<V>
where
    V: CredentialVerifier + ?Sized,
{
    fn verify(&self, principal: &PrincipalId, credential: &str) -> Result<bool, CredentialError> {
        (**self).verify(principal, credential)
    }
}

/// A verifier whose credentials can be administered.
pub trait CredentialStore: CredentialVerifier {
    /// Set or replace the credential for `principal`.
    fn enroll(&self, principal: &PrincipalId, credential: &str) -> Result<(), CredentialError>;

    /// Drop the credential for `principal`; returns whether one existed.
    fn revoke(&self, principal: &PrincipalId) -> Result<bool, CredentialError>;
}

impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    fn enroll(&self, principal: &PrincipalId, credential: &str) -> Result<(), CredentialError> {
        (**self).enroll(principal, credential)
    }

    fn revoke(&self, principal: &PrincipalId) -> Result<bool, CredentialError> {
        (**self).revoke(principal)
    }
}

/// Hash `credential` into a PHC string with a fresh random salt.
pub fn hash_credential(argon2: &Argon2<'_>, credential: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(credential.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(format!("hash error: {e}")))
}

/// Check `credential` against a stored PHC string.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an error.
pub fn verify_credential(
    argon2: &Argon2<'_>,
    credential: &str,
    phc: &str,
) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| CredentialError::Hash(format!("invalid hash format: {e}")))?;
    match argon2.verify_password(credential.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hash(format!("verify error: {e}"))),
    }
}

/// Argon2id with the policy's memory and iteration costs.
pub fn policy_argon2(policy: &SecurityPolicy) -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(
        policy.credential_hash_memory_kib,
        policy.credential_hash_iterations,
        1,
        None,
    )
    .map_err(|e| CredentialError::Hash(format!("invalid argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Reduced-cost Argon2id for unit tests only.
#[cfg(test)]
pub(crate) fn fast_argon2() -> Argon2<'static> {
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// In-memory credential table keyed by principal id. Only hashes are kept.
pub struct InMemoryCredentialStore {
    hashes: RwLock<HashMap<PrincipalId, String>>,
    argon2: Argon2<'static>,
    min_length: usize,
}

impl core::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("min_length", &self.min_length)
            .finish_non_exhaustive()
    }
}

impl InMemoryCredentialStore {
    /// An empty store hashing with Argon2id defaults (19 MiB, 2 passes).
    pub fn new(min_length: usize) -> Self {
        Self::with_hasher(min_length, Argon2::default())
    }

    /// An empty store hashing with explicit Argon2 parameters.
    pub fn with_hasher(min_length: usize, argon2: Argon2<'static>) -> Self {
        Self {
            hashes: RwLock::new(HashMap::new()),
            argon2,
            min_length,
        }
    }

    /// An empty store using the policy's length rule and hash costs.
    pub fn for_policy(policy: &SecurityPolicy) -> Result<Self, CredentialError> {
        Ok(Self::with_hasher(
            policy.min_credential_length,
            policy_argon2(policy)?,
        ))
    }

    /// A store holding the seed accounts' credentials.
    pub fn with_seed(min_length: usize, seeds: &[SeedAccount]) -> Result<Self, CredentialError> {
        Self::new(min_length).seeded(seeds)
    }

    /// Install the seed accounts' credentials, bypassing the length rule.
    pub fn seeded(self, seeds: &[SeedAccount]) -> Result<Self, CredentialError> {
        {
            let mut hashes = self
                .hashes
                .write()
                .map_err(|_| StoreError::Poisoned("credential"))?;
            for seed in seeds {
                hashes.insert(
                    seed.principal.id.clone(),
                    hash_credential(&self.argon2, seed.credential)?,
                );
            }
        }
        Ok(self)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self
            .hashes
            .read()
            .map_err(|_| StoreError::Poisoned("credential"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl CredentialVerifier for InMemoryCredentialStore {
    fn verify(&self, principal: &PrincipalId, credential: &str) -> Result<bool, CredentialError> {
        // Clone out so the Argon2 work runs without the read lock held.
        let stored = self
            .hashes
            .read()
            .map_err(|_| StoreError::Poisoned("credential"))?
            .get(principal)
            .cloned();
        match stored {
            Some(phc) => verify_credential(&self.argon2, credential, &phc),
            None => Ok(false),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn enroll(&self, principal: &PrincipalId, credential: &str) -> Result<(), CredentialError> {
        if credential.chars().count() < self.min_length {
            return Err(CredentialError::TooShort {
                min: self.min_length,
            });
        }
        let phc = hash_credential(&self.argon2, credential)?;
        self.hashes
            .write()
            .map_err(|_| StoreError::Poisoned("credential"))?
            .insert(principal.clone(), phc);
        Ok(())
    }

    fn revoke(&self, principal: &PrincipalId) -> Result<bool, CredentialError> {
        let mut hashes = self
            .hashes
            .write()
            .map_err(|_| StoreError::Poisoned("credential"))?;
        Ok(hashes.remove(principal).is_some())
    }
}
