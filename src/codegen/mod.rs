//! Short code generation and alias validation
//!
//! Codes are sampled uniformly from `[A-Za-z0-9]` and checked for existence
//! against the link store. With a 62-char alphabet and the default length of
//! 6 the collision probability is roughly `active_codes / 62^6`, so the
//! retry loop is expected O(1); hitting the attempt bound means the alphabet
//! space is nearly exhausted and is reported as a configuration error.

use rand::RngExt;

use crate::error::{ServiceError, ServiceResult};
use crate::storage::Storage;

pub const DEFAULT_CODE_LENGTH: usize = 6;

const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Codes that collide with routing or admin surfaces and may never be
/// claimed as custom aliases.
const RESERVED_CODES: &[&str] = &[
    "admin",
    "api",
    "www",
    "static",
    "media",
    "dashboard",
    "accounts",
];

/// Generate a code of `length` that is not currently assigned to any link.
pub async fn generate_code(storage: &dyn Storage, length: usize) -> ServiceResult<String> {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let code = random_code(length);
        if !storage.code_exists(&code).await? {
            return Ok(code);
        }
    }
    Err(ServiceError::CodeSpaceExhausted(MAX_GENERATION_ATTEMPTS))
}

fn random_code(length: usize) -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Validate a user-chosen alias: alphanumeric plus hyphen, 1-50 chars, and
/// not on the reserved blocklist. Uniqueness is checked separately against
/// the store.
pub fn validate_alias(alias: &str) -> ServiceResult<()> {
    if alias.is_empty() || alias.len() > 50 {
        return Err(ServiceError::Validation(
            "custom alias must be 1-50 characters".to_string(),
        ));
    }

    if !alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ServiceError::Validation(
            "custom alias may only contain letters, digits, and hyphens".to_string(),
        ));
    }

    if RESERVED_CODES.contains(&alias.to_ascii_lowercase().as_str()) {
        return Err(ServiceError::Validation(format!(
            "'{alias}' is a reserved word and cannot be used as an alias"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_code_has_requested_length_and_charset() {
        for length in [1, 6, 12] {
            let code = random_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn random_codes_differ() {
        // 62^12 makes an accidental collision here effectively impossible
        assert_ne!(random_code(12), random_code(12));
    }

    #[test]
    fn alias_accepts_alphanumeric_and_hyphen() {
        assert!(validate_alias("my-link-2024").is_ok());
        assert!(validate_alias("a").is_ok());
        assert!(validate_alias(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn alias_rejects_bad_format() {
        assert!(validate_alias("").is_err());
        assert!(validate_alias(&"x".repeat(51)).is_err());
        assert!(validate_alias("under_score").is_err());
        assert!(validate_alias("has space").is_err());
        assert!(validate_alias("sn\u{00f6}").is_err());
    }

    #[test]
    fn alias_rejects_reserved_words() {
        assert!(validate_alias("admin").is_err());
        assert!(validate_alias("API").is_err());
        assert!(validate_alias("Dashboard").is_err());
        // Reserved words are exact matches, not prefixes
        assert!(validate_alias("admin2").is_ok());
    }
}
