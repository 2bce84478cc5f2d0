use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::Duration;
use proptest::prelude::*;
use storegate_audit::{AuditActor, AuditCategory, AuditFilter, NewAuditEntry, Severity};
use storegate_auth::{
    AccountStatus, IdentityError, IdentityService, NewPrincipal, Role, SecurityPolicy,
    SessionEventKind, SessionState,
};
use storegate_core::ManualClock;

const ORIGIN: &str = "203.0.113.7";

/// Default policy with cheap credential hashing.
fn test_policy() -> SecurityPolicy {
    SecurityPolicy {
        credential_hash_memory_kib: 1024,
        credential_hash_iterations: 1,
        ..SecurityPolicy::default()
    }
}

fn service() -> (IdentityService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let svc = IdentityService::in_memory(test_policy(), clock.clone())
        .expect("in-memory service");
    (svc, clock)
}

fn audit_count(svc: &IdentityService) -> usize {
    svc.audit_entries(&AuditFilter::all()).unwrap().len()
}

#[test]
fn five_wrong_credentials_lock_the_account_for_sixty_seconds() {
    let (svc, clock) = service();
    let session = svc.open_session();

    for _ in 0..4 {
        assert_eq!(
            svc.login(&session, "owner_acehtech", "wrong-guess", ORIGIN),
            Err(IdentityError::InvalidCredentials)
        );
    }
    assert_eq!(
        svc.login(&session, "owner_acehtech", "wrong-guess", ORIGIN),
        Err(IdentityError::AccountLocked {
            remaining_seconds: 60
        })
    );

    clock.advance(Duration::seconds(10));
    assert_eq!(
        svc.login(&session, "owner_acehtech", "wrong-guess", ORIGIN),
        Err(IdentityError::AccountLocked {
            remaining_seconds: 50
        })
    );
    // The correct credential is refused too, and the lock is not extended.
    assert_eq!(
        svc.login(&session, "owner_acehtech", "acehtech-2024", ORIGIN),
        Err(IdentityError::AccountLocked {
            remaining_seconds: 50
        })
    );
    assert_eq!(svc.lockout().snapshot("owner_acehtech").unwrap().unwrap().attempts, 5);

    clock.advance(Duration::seconds(50));
    let p = svc
        .login(&session, "owner_acehtech", "acehtech-2024", ORIGIN)
        .unwrap();
    assert_eq!(p.id.as_str(), "u2");
    assert!(!svc.lockout().check_lockout("owner_acehtech").unwrap().is_locked);
}

#[test]
fn lock_engagement_is_audited_once() {
    let (svc, _clock) = service();
    let session = svc.open_session();
    for _ in 0..5 {
        let _ = svc.login(&session, "tech_budi", "wrong-guess", ORIGIN);
    }

    let locks = svc
        .audit_entries(&AuditFilter::all().with_category(AuditCategory::Security))
        .unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].action, "Account locked");
    assert_eq!(locks[0].actor_id, AuditActor::ANONYMOUS);
}

#[test]
fn reset_then_failure_counts_one() {
    let (svc, _clock) = service();
    let lockout = svc.lockout();
    lockout.record_failed_attempt("customer_andi").unwrap();
    lockout.record_failed_attempt("customer_andi").unwrap();
    lockout.reset("customer_andi").unwrap();
    assert_eq!(lockout.record_failed_attempt("customer_andi").unwrap().attempts, 1);
}

#[test]
fn current_principal_is_empty_before_login_and_after_logout() {
    let (svc, _clock) = service();
    let session = svc.open_session();
    assert!(svc.current_principal(&session).is_none());

    svc.login(&session, "marketing_sari", "marketing-123", ORIGIN)
        .unwrap();
    assert_eq!(svc.current_principal(&session).unwrap().id.as_str(), "u5");

    svc.logout(&session, ORIGIN).unwrap();
    assert!(svc.current_principal(&session).is_none());
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn only_super_admin_may_impersonate() {
    let (svc, _clock) = service();
    let accounts = [
        ("owner_acehtech", "acehtech-2024"),
        ("staff_admin", "staff-pass-123"),
        ("tech_budi", "tech-budi-123"),
        ("marketing_sari", "marketing-123"),
        ("customer_andi", "customer-123"),
    ];

    for (handle, credential) in accounts {
        let session = svc.open_session();
        let me = svc.login(&session, handle, credential, ORIGIN).unwrap();
        let before = audit_count(&svc);

        let err = svc
            .start_impersonation(&session, &"u6".into(), ORIGIN)
            .unwrap_err();
        assert!(matches!(err, IdentityError::Forbidden(_)), "{handle}: {err:?}");
        assert_eq!(svc.current_principal(&session).unwrap().id, me.id);
        assert!(!svc.is_impersonating(&session));
        assert_eq!(audit_count(&svc), before);
    }
}

#[test]
fn impersonation_scenario() {
    let (svc, _clock) = service();
    let session = svc.open_session();
    let admin = svc
        .login(&session, "superadmin", "super-secret-1", ORIGIN)
        .unwrap();

    svc.start_impersonation(&session, &"u6".into(), ORIGIN)
        .unwrap();
    assert_eq!(svc.current_principal(&session).unwrap().id.as_str(), "u6");
    assert!(svc.is_impersonating(&session));

    assert_eq!(
        svc.start_impersonation(&session, &"u2".into(), ORIGIN),
        Err(IdentityError::AlreadyImpersonating)
    );

    let restored = svc.stop_impersonation(&session, ORIGIN).unwrap();
    assert_eq!(restored.id, admin.id);
    assert_eq!(svc.current_principal(&session).unwrap().id, admin.id);
    assert!(!svc.is_impersonating(&session));
    assert_eq!(
        svc.stop_impersonation(&session, ORIGIN),
        Err(IdentityError::NotImpersonating)
    );
}

#[test]
fn each_audited_transition_writes_exactly_one_entry() {
    let (svc, _clock) = service();
    let session = svc.open_session();

    let check = |before: usize, category: AuditCategory, severity: Severity| {
        let entries = svc.audit_entries(&AuditFilter::all()).unwrap();
        assert_eq!(entries.len(), before + 1);
        assert_eq!(entries[0].category, category);
        assert_eq!(entries[0].severity, severity);
    };

    let n = audit_count(&svc);
    let _ = svc.login(&session, "owner_gadgetku", "gadgetku-2024", ORIGIN);
    check(n, AuditCategory::Authentication, Severity::Warn);

    let n = audit_count(&svc);
    svc.login(&session, "superadmin", "super-secret-1", ORIGIN)
        .unwrap();
    check(n, AuditCategory::Authentication, Severity::Info);

    let n = audit_count(&svc);
    svc.start_impersonation(&session, &"u4".into(), ORIGIN)
        .unwrap();
    check(n, AuditCategory::Security, Severity::Critical);

    let n = audit_count(&svc);
    svc.stop_impersonation(&session, ORIGIN).unwrap();
    check(n, AuditCategory::Security, Severity::Info);
}

#[test]
fn registration_status_depends_on_role() {
    let (svc, _clock) = service();
    let admin = svc.open_session();
    svc.login(&admin, "staff_admin", "staff-pass-123", ORIGIN)
        .unwrap();

    let owner = svc
        .register_principal(
            &admin,
            NewPrincipal::new("Hendra", "owner_hendra", "hendra@example.id", Role::StoreOwner),
            None,
            ORIGIN,
        )
        .unwrap();
    assert_eq!(owner.status, AccountStatus::Pending);

    let tech = svc
        .register_principal(
            &admin,
            NewPrincipal::new("Indra", "tech_indra", "indra@example.id", Role::Technician),
            None,
            ORIGIN,
        )
        .unwrap();
    assert_eq!(tech.status, AccountStatus::Active);

    assert!(matches!(
        svc.register_principal(
            &admin,
            NewPrincipal::new("Other", "tech_indra", "other@example.id", Role::Customer),
            None,
            ORIGIN,
        ),
        Err(IdentityError::HandleTaken(_))
    ));
}

#[test]
fn suspended_handle_can_be_reused() {
    let (svc, _clock) = service();
    let anon = svc.open_session();

    let p = svc
        .register_principal(
            &anon,
            NewPrincipal::new("Gadget Baru", "owner_gadgetku", "baru@example.id", Role::StoreOwner),
            Some("baru-gadget-1"),
            ORIGIN,
        )
        .unwrap();
    assert_ne!(p.id.as_str(), "u7");

    // Pending owners may sign in.
    let signed_in = svc
        .login(&anon, "owner_gadgetku", "baru-gadget-1", ORIGIN)
        .unwrap();
    assert_eq!(signed_in.id, p.id);
}

#[test]
fn reinstating_a_suspended_owner_lets_them_log_in() {
    let (svc, _clock) = service();
    let admin = svc.open_session();
    svc.login(&admin, "superadmin", "super-secret-1", ORIGIN)
        .unwrap();
    svc.set_status(&admin, &"u7".into(), AccountStatus::Active, ORIGIN)
        .unwrap();

    let owner = svc.open_session();
    let p = svc
        .login(&owner, "owner_gadgetku", "gadgetku-2024", ORIGIN)
        .unwrap();
    assert_eq!(p.id.as_str(), "u7");
}

#[test]
fn reused_handle_does_not_inherit_the_previous_credential() {
    let (svc, _clock) = service();
    let anon = svc.open_session();
    let newcomer = svc
        .register_principal(
            &anon,
            NewPrincipal::new("Gadget Lagi", "owner_gadgetku", "lagi@example.id", Role::StoreOwner),
            None,
            ORIGIN,
        )
        .unwrap();
    assert_eq!(newcomer.status, AccountStatus::Pending);

    assert_eq!(
        svc.login(&anon, "owner_gadgetku", "gadgetku-2024", ORIGIN),
        Err(IdentityError::InvalidCredentials)
    );
    assert!(svc.current_principal(&anon).is_none());
}

#[test]
fn removing_a_handle_squatter_leaves_the_original_credential_intact() {
    let (svc, _clock) = service();
    let anon = svc.open_session();
    let squatter = svc
        .register_principal(
            &anon,
            NewPrincipal::new("Not Gadgetku", "owner_gadgetku", "x@example.id", Role::StoreOwner),
            Some("attacker-pw-1"),
            ORIGIN,
        )
        .unwrap();

    let admin = svc.open_session();
    svc.login(&admin, "superadmin", "super-secret-1", ORIGIN)
        .unwrap();
    svc.remove_principal(&admin, &squatter.id, ORIGIN).unwrap();
    svc.set_status(&admin, &"u7".into(), AccountStatus::Active, ORIGIN)
        .unwrap();

    let attacker = svc.open_session();
    assert_eq!(
        svc.login(&attacker, "owner_gadgetku", "attacker-pw-1", ORIGIN),
        Err(IdentityError::InvalidCredentials)
    );
    let owner = svc.open_session();
    let p = svc
        .login(&owner, "owner_gadgetku", "gadgetku-2024", ORIGIN)
        .unwrap();
    assert_eq!(p.id.as_str(), "u7");
}

#[test]
fn workforce_mutations_need_a_manager() {
    let (svc, _clock) = service();
    let anon = svc.open_session();
    assert_eq!(
        svc.remove_principal(&anon, &"u4".into(), ORIGIN),
        Err(IdentityError::Unauthenticated)
    );

    let tech = svc.open_session();
    svc.login(&tech, "tech_budi", "tech-budi-123", ORIGIN)
        .unwrap();
    assert!(matches!(
        svc.set_account_manager(&tech, &"u2".into(), "Bayu", ORIGIN),
        Err(IdentityError::Forbidden(_))
    ));

    let admin = svc.open_session();
    svc.login(&admin, "staff_admin", "staff-pass-123", ORIGIN)
        .unwrap();
    let owner = svc
        .set_account_manager(&admin, &"u2".into(), "Bayu", ORIGIN)
        .unwrap();
    assert_eq!(owner.account_manager(), Some("Bayu"));
    assert!(matches!(
        svc.set_account_manager(&admin, &"u4".into(), "Bayu", ORIGIN),
        Err(IdentityError::Validation(_))
    ));
    assert!(matches!(
        svc.set_status(&admin, &"u404".into(), AccountStatus::Active, ORIGIN),
        Err(IdentityError::NotFound(_))
    ));
}

#[test]
fn collaborators_append_through_the_facade() {
    let (svc, _clock) = service();
    let entry = svc
        .append_audit_entry(
            NewAuditEntry::new(
                AuditActor::new("u5", "Sari"),
                "Promo created",
                AuditCategory::Financial,
                Severity::Info,
            )
            .details("PROMO10")
            .origin(ORIGIN),
        )
        .unwrap();

    let mine = svc.audit_entries(&AuditFilter::actor("u5")).unwrap();
    assert_eq!(mine, vec![entry]);
}

#[test]
fn session_changes_are_published() {
    let (svc, _clock) = service();
    let events = svc.subscribe();
    let session = svc.open_session();

    svc.login(&session, "superadmin", "super-secret-1", ORIGIN)
        .unwrap();
    svc.start_impersonation(&session, &"u6".into(), ORIGIN)
        .unwrap();
    svc.stop_impersonation(&session, ORIGIN).unwrap();
    svc.logout(&session, ORIGIN).unwrap();

    let kinds: Vec<_> = events.drain().into_iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SessionEventKind::LoggedIn,
            SessionEventKind::ImpersonationStarted,
            SessionEventKind::ImpersonationStopped,
            SessionEventKind::LoggedOut,
        ]
    );
}

#[test]
fn sessions_are_isolated() {
    let (svc, _clock) = service();
    let a = svc.open_session();
    let b = svc.open_session();

    svc.login(&a, "superadmin", "super-secret-1", ORIGIN).unwrap();
    svc.login(&b, "customer_andi", "customer-123", ORIGIN).unwrap();
    svc.start_impersonation(&a, &"u4".into(), ORIGIN).unwrap();

    assert_eq!(svc.current_principal(&b).unwrap().id.as_str(), "u6");
    assert!(!svc.is_impersonating(&b));
}

#[test]
fn racing_failures_never_lose_an_increment() {
    let clock = Arc::new(ManualClock::starting_now());
    let policy = SecurityPolicy {
        max_login_attempts: 1000,
        ..test_policy()
    };
    let svc = Arc::new(IdentityService::in_memory(policy, clock).unwrap());

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let session = svc.open_session();
                    let _ = svc.login(&session, "tech_budi", "not-it-at-all", ORIGIN);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let record = svc.lockout().snapshot("tech_budi").unwrap().unwrap();
    assert_eq!(record.attempts, 200);
}

#[test]
fn registry_sessions_expire_after_policy_timeout() {
    let (svc, clock) = service();
    let registry = svc.session_registry();
    let session = registry.open().unwrap();
    svc.login(&session, "tech_budi", "tech-budi-123", ORIGIN)
        .unwrap();

    clock.advance(Duration::minutes(29));
    assert!(registry.get(session.id()).unwrap().is_some());
    clock.advance(Duration::minutes(31));
    assert!(registry.get(session.id()).unwrap().is_none());
}

#[test]
fn notifier_delivers_across_threads() {
    let (svc, _clock) = service();
    let events = svc.subscribe();
    let svc = Arc::new(svc);

    let worker = {
        let svc = svc.clone();
        thread::spawn(move || {
            let session = svc.open_session();
            svc.login(&session, "customer_andi", "customer-123", ORIGIN)
                .unwrap();
        })
    };

    let event = events.recv_timeout(StdDuration::from_secs(5)).unwrap();
    assert_eq!(event.kind, SessionEventKind::LoggedIn);
    assert_eq!(event.principal_id.unwrap().as_str(), "u6");
    worker.join().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn lock_trips_exactly_at_threshold(max in 1u32..8) {
        let clock = Arc::new(ManualClock::starting_now());
        let policy = SecurityPolicy { max_login_attempts: max, ..test_policy() };
        let svc = IdentityService::in_memory(policy, clock).unwrap();
        let session = svc.open_session();

        for _ in 1..max {
            prop_assert_eq!(
                svc.login(&session, "customer_andi", "nope-nope", ORIGIN),
                Err(IdentityError::InvalidCredentials)
            );
        }
        let tripped = matches!(
            svc.login(&session, "customer_andi", "nope-nope", ORIGIN),
            Err(IdentityError::AccountLocked { .. })
        );
        prop_assert!(tripped);
        let locked_out = matches!(
            svc.login(&session, "customer_andi", "customer-123", ORIGIN),
            Err(IdentityError::AccountLocked { .. })
        );
        prop_assert!(locked_out);
    }
}
