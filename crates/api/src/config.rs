//! Process configuration read from `STOREGATE_*` environment variables.

use std::net::SocketAddr;

use anyhow::{Context, Result};

use storegate_auth::SecurityPolicy;
use storegate_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Whether `bind_addr` fell back to [`DEFAULT_BIND_ADDR`].
    pub bind_addr_defaulted: bool,
    pub log_format: LogFormat,
    pub policy: SecurityPolicy,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys take defaults;
    /// malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (bind_addr, bind_addr_defaulted): (SocketAddr, bool) = match lookup("STOREGATE_BIND_ADDR") {
            Some(raw) => (
                raw.trim()
                    .parse()
                    .with_context(|| format!("STOREGATE_BIND_ADDR: invalid address '{raw}'"))?,
                false,
            ),
            None => (DEFAULT_BIND_ADDR.parse()?, true),
        };

        let log_format = parse_or(&lookup, "STOREGATE_LOG_FORMAT", LogFormat::default())?;

        let defaults = SecurityPolicy::default();
        let policy = SecurityPolicy {
            mfa_required: parse_or(&lookup, "STOREGATE_MFA_REQUIRED", defaults.mfa_required)?,
            min_credential_length: parse_or(
                &lookup,
                "STOREGATE_MIN_CREDENTIAL_LENGTH",
                defaults.min_credential_length,
            )?,
            session_timeout_minutes: parse_or(
                &lookup,
                "STOREGATE_SESSION_TIMEOUT_MINUTES",
                defaults.session_timeout_minutes,
            )?,
            max_login_attempts: parse_or(
                &lookup,
                "STOREGATE_MAX_LOGIN_ATTEMPTS",
                defaults.max_login_attempts,
            )?,
            lockout_duration_seconds: parse_or(
                &lookup,
                "STOREGATE_LOCKOUT_SECONDS",
                defaults.lockout_duration_seconds,
            )?,
            ip_filtering_enabled: parse_or(
                &lookup,
                "STOREGATE_IP_FILTERING",
                defaults.ip_filtering_enabled,
            )?,
            audit_retention: parse_or(&lookup, "STOREGATE_AUDIT_RETENTION", defaults.audit_retention)?,
            audit_denied_impersonation: parse_or(
                &lookup,
                "STOREGATE_AUDIT_DENIED_IMPERSONATION",
                defaults.audit_denied_impersonation,
            )?,
            credential_hash_memory_kib: parse_or(
                &lookup,
                "STOREGATE_CREDENTIAL_HASH_MEMORY_KIB",
                defaults.credential_hash_memory_kib,
            )?,
            credential_hash_iterations: parse_or(
                &lookup,
                "STOREGATE_CREDENTIAL_HASH_ITERATIONS",
                defaults.credential_hash_iterations,
            )?,
        };

        Ok(Self {
            bind_addr,
            bind_addr_defaulted,
            log_format,
            policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}: invalid value '{raw}': {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ApiConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.bind_addr_defaulted);
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.policy, SecurityPolicy::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("STOREGATE_BIND_ADDR", "127.0.0.1:9000"),
            ("STOREGATE_LOG_FORMAT", "pretty"),
            ("STOREGATE_MAX_LOGIN_ATTEMPTS", "3"),
            ("STOREGATE_LOCKOUT_SECONDS", "120"),
            ("STOREGATE_AUDIT_DENIED_IMPERSONATION", "true"),
            ("STOREGATE_CREDENTIAL_HASH_MEMORY_KIB", "4096"),
        ])
        .unwrap();
        assert!(!cfg.bind_addr_defaulted);
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.policy.max_login_attempts, 3);
        assert_eq!(cfg.policy.lockout_duration_seconds, 120);
        assert!(cfg.policy.audit_denied_impersonation);
        assert_eq!(cfg.policy.credential_hash_memory_kib, 4096);
        assert_eq!(cfg.policy.credential_hash_iterations, 2);
        assert_eq!(cfg.policy.session_timeout_minutes, 30);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = config(&[("STOREGATE_MAX_LOGIN_ATTEMPTS", "five")]).unwrap_err();
        assert!(err.to_string().contains("STOREGATE_MAX_LOGIN_ATTEMPTS"));
        assert!(config(&[("STOREGATE_BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("STOREGATE_LOG_FORMAT", "xml")]).is_err());
    }
}
