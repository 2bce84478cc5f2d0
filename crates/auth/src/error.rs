//! Error taxonomy for the identity subsystem.
//!
//! Each component returns its own error type; [`IdentityError`] is the
//! umbrella the facade and transports work with.

use thiserror::Error;

use storegate_core::{DomainError, PrincipalId, StoreError};

/// Identity directory failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("principal not found: {0}")]
    NotFound(PrincipalId),

    #[error("handle already taken: {0}")]
    HandleTaken(String),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Credential store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential must be at least {min} characters")]
    TooShort { min: usize },

    /// Hashing failed or a stored hash could not be parsed.
    #[error("credential hash: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Login failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Handle/credential mismatch or unknown handle.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked; retry in {remaining_seconds}s")]
    AccountLocked { remaining_seconds: u64 },

    #[error("account is suspended")]
    AccountSuspended,

    /// The session is already authenticated; log out first.
    #[error("session already authenticated")]
    SessionActive,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Store(e) => AuthError::Store(e),
            // A record vanishing mid-login is treated like an unknown handle.
            DirectoryError::NotFound(_)
            | DirectoryError::HandleTaken(_)
            | DirectoryError::Invalid(_) => AuthError::InvalidCredentials,
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Store(e) => AuthError::Store(e),
            other => AuthError::Store(StoreError::unavailable(other.to_string())),
        }
    }
}

/// Impersonation state-machine failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImpersonationError {
    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("forbidden: only a super-admin may impersonate")]
    Forbidden,

    #[error("principal not found: {0}")]
    NotFound(PrincipalId),

    #[error("an impersonation is already active")]
    AlreadyImpersonating,

    #[error("no impersonation is active")]
    NotImpersonating,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DirectoryError> for ImpersonationError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ImpersonationError::NotFound(id),
            DirectoryError::Store(e) => ImpersonationError::Store(e),
            other => ImpersonationError::Store(StoreError::unavailable(other.to_string())),
        }
    }
}

/// Role-based authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: role '{role}' may not {action}")]
    Forbidden { role: String, action: &'static str },
}

/// Every failure kind the identity subsystem reports to its callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked; retry in {remaining_seconds}s")]
    AccountLocked { remaining_seconds: u64 },

    #[error("account is suspended")]
    AccountSuspended,

    #[error("session already authenticated")]
    SessionActive,

    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("an impersonation is already active")]
    AlreadyImpersonating,

    #[error("no impersonation is active")]
    NotImpersonating,

    #[error("handle already taken: {0}")]
    HandleTaken(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for IdentityError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => IdentityError::InvalidCredentials,
            AuthError::AccountLocked { remaining_seconds } => {
                IdentityError::AccountLocked { remaining_seconds }
            }
            AuthError::AccountSuspended => IdentityError::AccountSuspended,
            AuthError::SessionActive => IdentityError::SessionActive,
            AuthError::Store(e) => IdentityError::Store(e),
        }
    }
}

impl From<ImpersonationError> for IdentityError {
    fn from(err: ImpersonationError) -> Self {
        match err {
            ImpersonationError::NotAuthenticated => IdentityError::Unauthenticated,
            ImpersonationError::Forbidden => IdentityError::Forbidden(err.to_string()),
            ImpersonationError::NotFound(id) => IdentityError::NotFound(id.to_string()),
            ImpersonationError::AlreadyImpersonating => IdentityError::AlreadyImpersonating,
            ImpersonationError::NotImpersonating => IdentityError::NotImpersonating,
            ImpersonationError::Store(e) => IdentityError::Store(e),
        }
    }
}

impl From<DirectoryError> for IdentityError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => IdentityError::NotFound(id.to_string()),
            DirectoryError::HandleTaken(h) => IdentityError::HandleTaken(h),
            DirectoryError::Invalid(e) => IdentityError::from(e),
            DirectoryError::Store(e) => IdentityError::Store(e),
        }
    }
}

impl From<CredentialError> for IdentityError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::TooShort { .. } => IdentityError::Validation(err.to_string()),
            CredentialError::Hash(msg) => IdentityError::Store(StoreError::unavailable(msg)),
            CredentialError::Store(e) => IdentityError::Store(e),
        }
    }
}

impl From<AuthzError> for IdentityError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => IdentityError::Unauthenticated,
            AuthzError::Forbidden { .. } => IdentityError::Forbidden(err.to_string()),
        }
    }
}

impl From<DomainError> for IdentityError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                IdentityError::Validation(msg)
            }
        }
    }
}
