use std::sync::LazyLock;

use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use lettre::Address;
use rand::rngs::OsRng;
use rand::Rng;
use regex::Regex;
use sha2::Sha256;

use crate::config::PasswordHashingConfig;
use crate::constants::OTP_LENGTH;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

// =============================================================================
// Email Addresses
// =============================================================================

/// Canonical form used for lookups and verification identifiers
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check: something@something.tld, no whitespace, and deliverable
/// as an SMTP recipient
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email) && email.parse::<Address>().is_ok()
}

// =============================================================================
// One-Time Passcodes
// =============================================================================

/// Generate a random 6-digit passcode (100000..=999999)
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Whether a submitted code has the shape of an issued one
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

fn otp_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::PasscodeHash(e.to_string()))
}

/// Keyed one-way hash of a passcode
///
/// `hash = HMAC-SHA256(secret, code)`, hex-encoded. Only this value is stored;
/// without the server secret a leaked row cannot be brute-forced offline.
pub fn hash_otp(code: &str, secret: &str) -> Result<String> {
    let mut mac = otp_mac(secret)?;
    mac.update(code.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compare a submitted passcode with a stored hash
pub fn verify_otp(code: &str, code_hash: &str, secret: &str) -> bool {
    let mut mac = match otp_mac(secret) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to create HMAC instance: {}", e);
            return false;
        }
    };

    mac.update(code.as_bytes());

    let expected = match hex::decode(code_hash) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Stored passcode hash is not valid hex");
            return false;
        }
    };

    mac.verify_slice(&expected).is_ok()
}

// =============================================================================
// Passwords
// =============================================================================

fn argon2(config: &PasswordHashingConfig) -> Result<Argon2<'static>> {
    let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
        .map_err(|e| AppError::PasswordHash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into an Argon2id PHC string
///
/// Runs on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password(password: &str, config: PasswordHashingConfig) -> Result<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        let hasher = argon2(&config)?;
        let salt = SaltString::generate(&mut OsRng);
        hasher
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::PasswordHash(e.to_string()))
    })
    .await?
}

/// Check a password against a stored PHC string
///
/// Cost parameters are read from the stored hash, so hashes made under
/// older settings keep verifying.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| AppError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(AppError::PasswordHash(e.to_string())),
        }
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hashing() -> PasswordHashingConfig {
        PasswordHashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    // =========================================================================
    // Email Tests
    // =========================================================================

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("a<b@example.co"));
        assert!(!is_valid_email("a,b@example.co"));
    }

    // =========================================================================
    // Passcode Tests
    // =========================================================================

    #[test]
    fn test_generate_otp_shape() {
        for _ in 0..200 {
            let code = generate_otp();
            assert!(is_well_formed_code(&code), "bad code {}", code);
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn test_is_well_formed_code() {
        assert!(is_well_formed_code("123456"));
        assert!(is_well_formed_code("000000"));

        assert!(!is_well_formed_code("12345"));
        assert!(!is_well_formed_code("1234567"));
        assert!(!is_well_formed_code("12a456"));
        assert!(!is_well_formed_code("١٢٣٤٥٦"));
    }

    #[test]
    fn test_hash_otp_deterministic() {
        let first = hash_otp("123456", "secret").unwrap();
        let second = hash_otp("123456", "secret").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_otp_never_plaintext() {
        let hash = hash_otp("123456", "secret").unwrap();
        assert!(!hash.contains("123456"));
    }

    #[test]
    fn test_hash_otp_depends_on_secret() {
        assert_ne!(hash_otp("123456", "secret-a").unwrap(), hash_otp("123456", "secret-b").unwrap());
        assert_ne!(hash_otp("123456", "secret").unwrap(), hash_otp("654321", "secret").unwrap());
    }

    #[test]
    fn test_verify_otp() {
        let hash = hash_otp("482913", "secret").unwrap();

        assert!(verify_otp("482913", &hash, "secret"));
        assert!(!verify_otp("482914", &hash, "secret"));
        assert!(!verify_otp("482913", &hash, "other-secret"));
        assert!(!verify_otp("482913", "not-hex", "secret"));
    }

    // =========================================================================
    // Password Tests
    // =========================================================================

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("correct horse", cheap_hashing()).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_password_hashes_are_salted() {
        let first = hash_password("same password", cheap_hashing()).await.unwrap();
        let second = hash_password("same password", cheap_hashing()).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify_password_rejects_malformed_hash() {
        let result = verify_password("anything", "plaintext-password").await;
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }

    #[tokio::test]
    async fn test_invalid_params_rejected() {
        let config = PasswordHashingConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        };
        let result = hash_password("password", config).await;
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }
}
