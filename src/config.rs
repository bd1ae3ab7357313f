use std::collections::BTreeSet;
use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::engine::admission::AdmissionPolicy;
use crate::engine::credential::{CredentialPolicy, PasswordMode};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://academic_records.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub admission: AdmissionPolicy,
    pub credential: CredentialPolicy,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e.to_string()))?;

        let mut admission = AdmissionPolicy::default();
        if let Some(raw) = lookup("MAX_COURSES_PER_SEMESTER") {
            admission.max_courses_per_semester = parse_positive("MAX_COURSES_PER_SEMESTER", &raw)?;
        }

        let mut credential = CredentialPolicy::default();
        if let Some(raw) = lookup("CREDENTIAL_PASSWORD_LENGTH") {
            credential.password_length = parse_positive("CREDENTIAL_PASSWORD_LENGTH", &raw)?;
        }
        if let Some(raw) = lookup("CREDENTIAL_PASSWORD_ALPHABET") {
            credential.alphabet = parse_alphabet(&raw)?;
        }
        if let Some(raw) = lookup("CREDENTIAL_PASSWORD_MODE") {
            credential.mode = match raw.trim().to_ascii_lowercase().as_str() {
                "plaintext" | "plain" => PasswordMode::Plaintext,
                "hashed" | "hash" => PasswordMode::Hashed,
                other => {
                    return Err(invalid(
                        "CREDENTIAL_PASSWORD_MODE",
                        format!("expected plaintext or hashed, got {:?}", other),
                    ));
                }
            };
        }

        Ok(Self {
            database_url,
            bind_addr,
            admission,
            credential,
        })
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(invalid(key, "must be at least 1")),
        Ok(value) => Ok(value),
        Err(e) => Err(invalid(key, e.to_string())),
    }
}

fn parse_alphabet(raw: &str) -> Result<Vec<u8>, ConfigError> {
    const KEY: &str = "CREDENTIAL_PASSWORD_ALPHABET";
    let alphabet = raw.trim();
    if !alphabet.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(invalid(KEY, "only printable ASCII characters are allowed"));
    }
    let distinct: BTreeSet<u8> = alphabet.bytes().collect();
    if distinct.len() != alphabet.len() {
        return Err(invalid(KEY, "characters must not repeat"));
    }
    if distinct.len() < 2 {
        return Err(invalid(KEY, "needs at least two characters"));
    }
    Ok(alphabet.as_bytes().to_vec())
}
