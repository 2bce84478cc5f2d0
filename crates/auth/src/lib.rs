//! `storegate-auth`: identity and access control.
//!
//! Directory, credentials, lockout, authentication, sessions and
//! impersonation. Storage sits behind traits; HTTP lives elsewhere.

pub mod authn;
pub mod authorize;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod identity;
pub mod impersonation;
pub mod lockout;
pub mod notify;
pub mod policy;
pub mod principal;
pub mod seed;
pub mod session;

pub use authn::AuthService;
pub use authorize::{Capability, authorize};
pub use credentials::{
    CredentialStore, CredentialVerifier, InMemoryCredentialStore, hash_credential, policy_argon2,
    verify_credential,
};
pub use directory::{IdentityDirectory, InMemoryDirectory};
pub use error::{
    AuthError, AuthzError, CredentialError, DirectoryError, IdentityError, ImpersonationError,
};
pub use identity::IdentityService;
pub use impersonation::ImpersonationManager;
pub use lockout::{AttemptOutcome, LockStatus, LockoutEngine, LockoutRecord};
pub use notify::{EventSink, SessionEvent, SessionEventKind, SessionNotifier, Subscription};
pub use policy::SecurityPolicy;
pub use principal::{AccountStatus, NewPrincipal, Principal, Role, RoleProfile};
pub use seed::{SeedAccount, default_accounts};
pub use session::{Session, SessionRegistry, SessionState};
