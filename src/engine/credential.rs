use chrono::Utc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{AccessDenied, TransitionError};
use crate::models::{Certificate, Degree, DegreeStatus};

/// No 0/O, 1/I/L: the password is read off paper and typed back in.
pub const DEFAULT_PASSWORD_ALPHABET: &str = "ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const DEFAULT_PASSWORD_LENGTH: usize = 8;

const HASH_PREFIX: &str = "blake3:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordMode {
    #[default]
    Plaintext,
    Hashed,
}

/// Password policy for degree access gating. This is a usability convention
/// for casual gating, not a security control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub password_length: usize,
    pub alphabet: Vec<u8>,
    pub mode: PasswordMode,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            password_length: DEFAULT_PASSWORD_LENGTH,
            alphabet: DEFAULT_PASSWORD_ALPHABET.as_bytes().to_vec(),
            mode: PasswordMode::Plaintext,
        }
    }
}

impl DegreeStatus {
    /// pending -> approved, pending -> revoked, approved -> revoked.
    /// Revoked is terminal.
    pub fn can_transition_to(self, next: DegreeStatus) -> bool {
        matches!(
            (self, next),
            (DegreeStatus::Pending, DegreeStatus::Approved)
                | (DegreeStatus::Pending, DegreeStatus::Revoked)
                | (DegreeStatus::Approved, DegreeStatus::Revoked)
        )
    }
}

pub fn transition_degree(degree: &Degree, next: DegreeStatus) -> Result<Degree, TransitionError> {
    if !degree.status.can_transition_to(next) {
        return Err(TransitionError::InvalidTransition {
            from: degree.status.to_string(),
            to: next.to_string(),
        });
    }
    Ok(Degree {
        status: next,
        updated_at: Utc::now().to_rfc3339(),
        ..degree.clone()
    })
}

/// Random bytes drawn from v4 UUIDs, skipping the version and variant bytes.
fn random_bytes() -> impl Iterator<Item = u8> {
    std::iter::repeat_with(Uuid::new_v4).flat_map(|id| {
        let bytes = id.into_bytes();
        bytes
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, b)| b)
            .collect::<Vec<_>>()
    })
}

/// Generates a password from the policy alphabet. Rejection sampling keeps
/// every character equally likely.
pub fn generate_access_password(policy: &CredentialPolicy) -> String {
    let n = policy.alphabet.len().min(256);
    if n == 0 {
        return String::new();
    }
    let zone = 256 - (256 % n);
    random_bytes()
        .filter(|b| usize::from(*b) < zone)
        .take(policy.password_length)
        .map(|b| char::from(policy.alphabet[usize::from(b) % n]))
        .collect()
}

/// Produces the value stored in `degrees.access_password`.
pub fn seal_password(mode: PasswordMode, degree_id: &str, password: &str) -> String {
    match mode {
        PasswordMode::Plaintext => password.to_string(),
        PasswordMode::Hashed => hash_password(degree_id, password),
    }
}

/// Supplied secrets may not look like a sealed value, or unlock could not
/// tell the two storage modes apart.
pub fn check_supplied_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("access_password must not be empty".to_string());
    }
    if password.starts_with(HASH_PREFIX) {
        return Err(format!("access_password must not start with {:?}", HASH_PREFIX));
    }
    Ok(())
}

fn is_sealed_hash(stored: &str) -> bool {
    stored
        .strip_prefix(HASH_PREFIX)
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn hash_password(degree_id: &str, password: &str) -> String {
    let digest = blake3::hash(format!("{}:{}", degree_id, password).as_bytes());
    format!("{}{}", HASH_PREFIX, digest.to_hex())
}

/// Constant-time check of a supplied password against the stored value,
/// whichever mode it was sealed in.
pub fn verify_password(degree: &Degree, supplied: &str) -> bool {
    let stored = degree.access_password.as_bytes();
    let candidate = if is_sealed_hash(&degree.access_password) {
        hash_password(&degree.id, supplied)
    } else {
        supplied.to_string()
    };
    bool::from(stored.ct_eq(candidate.as_bytes()))
}

/// Releases the certificate view only for the matching secret. The status of
/// the degree plays no part in the decision.
pub fn unlock(degree: &Degree, supplied_password: &str) -> Result<Certificate, AccessDenied> {
    if !verify_password(degree, supplied_password) {
        return Err(AccessDenied);
    }
    Ok(Certificate {
        degree_id: degree.id.clone(),
        student_email: degree.student_email.clone(),
        degree_title: degree.degree_title.clone(),
        college_name: degree.college_name.clone(),
        graduation_date: degree.graduation_date.clone(),
        status: degree.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn degree(status: DegreeStatus, password: &str) -> Degree {
        Degree {
            id: "d1".to_string(),
            student_email: "ada@uni.edu".to_string(),
            degree_title: "BSc Computer Science".to_string(),
            college_name: "College of Engineering".to_string(),
            graduation_date: "2025-06-01".to_string(),
            status,
            access_password: password.to_string(),
            created_at: "2025-06-01T00:00:00Z".to_string(),
            updated_at: "2025-06-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_unlock_with_plaintext_secret() {
        let d = degree(DegreeStatus::Approved, "XK7P2Q9R");
        assert_eq!(unlock(&d, "wrong"), Err(AccessDenied));
        let cert = unlock(&d, "XK7P2Q9R").unwrap();
        assert_eq!(cert.degree_id, "d1");
        assert_eq!(cert.degree_title, "BSc Computer Science");
        assert_eq!(cert.status, DegreeStatus::Approved);
    }

    #[test]
    fn test_secret_guards_every_status() {
        for status in [DegreeStatus::Pending, DegreeStatus::Approved, DegreeStatus::Revoked] {
            let d = degree(status, "XK7P2Q9R");
            assert_eq!(unlock(&d, "XK7P2Q9"), Err(AccessDenied));
            assert_eq!(unlock(&d, ""), Err(AccessDenied));
            assert!(unlock(&d, "XK7P2Q9R").is_ok());
        }
    }

    #[test]
    fn test_hashed_mode_keeps_unlock_contract() {
        let sealed = seal_password(PasswordMode::Hashed, "d1", "XK7P2Q9R");
        assert!(sealed.starts_with("blake3:"));
        assert!(!sealed.contains("XK7P2Q9R"));

        let d = degree(DegreeStatus::Approved, &sealed);
        assert!(unlock(&d, "XK7P2Q9R").is_ok());
        assert_eq!(unlock(&d, "wrong"), Err(AccessDenied));
        assert_eq!(unlock(&d, &sealed), Err(AccessDenied));
    }

    #[test]
    fn test_prefixed_plaintext_still_unlocks() {
        let d = degree(DegreeStatus::Approved, "blake3:abc");
        assert!(unlock(&d, "blake3:abc").is_ok());
        assert_eq!(unlock(&d, "abc"), Err(AccessDenied));
    }

    #[test]
    fn test_supplied_password_rules() {
        assert!(check_supplied_password("XK7P2Q9R").is_ok());
        assert!(check_supplied_password("   ").is_err());
        assert!(check_supplied_password("blake3:abc").is_err());
    }

    #[test]
    fn test_hash_is_bound_to_degree() {
        assert_ne!(
            seal_password(PasswordMode::Hashed, "d1", "XK7P2Q9R"),
            seal_password(PasswordMode::Hashed, "d2", "XK7P2Q9R")
        );
        assert_eq!(seal_password(PasswordMode::Plaintext, "d1", "abc"), "abc");
    }

    #[test]
    fn test_generated_password_shape() {
        let policy = CredentialPolicy::default();
        for _ in 0..50 {
            let password = generate_access_password(&policy);
            assert_eq!(password.len(), 8);
            assert!(password.bytes().all(|b| policy.alphabet.contains(&b)));
            assert!(!password.contains(['0', 'O', '1', 'I', 'L']));
        }

        let long = CredentialPolicy {
            password_length: 40,
            ..CredentialPolicy::default()
        };
        assert_eq!(generate_access_password(&long).len(), 40);
    }

    #[test]
    fn test_degree_transitions() {
        use DegreeStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Revoked));
        assert!(Approved.can_transition_to(Revoked));
        assert!(!Revoked.can_transition_to(Approved));
        assert!(!Revoked.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Approved));

        let approved = transition_degree(&degree(Pending, "x"), Approved).unwrap();
        assert_eq!(approved.status, Approved);
        let revoked = transition_degree(&approved, Revoked).unwrap();
        assert_eq!(
            transition_degree(&revoked, Approved),
            Err(TransitionError::InvalidTransition {
                from: "revoked".to_string(),
                to: "approved".to_string(),
            })
        );
    }
}
