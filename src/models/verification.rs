use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a one-time passcode is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Signup,
    PasswordReset,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Signup => "signup",
            Purpose::PasswordReset => "password-reset",
        }
    }

    /// Store key for a pending verification: `<purpose>:<email>`.
    ///
    /// `email` must already be normalized.
    pub fn identifier(&self, email: &str) -> String {
        format!("{}:{}", self.as_str(), email)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON document kept in the `value` column of a verification row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPayload {
    /// Hex-encoded keyed hash of the passcode
    #[serde(rename = "codeHash")]
    pub code_hash: String,
    /// Failed comparisons so far
    #[serde(default)]
    pub attempts: u32,
}

impl VerificationPayload {
    pub fn new(code_hash: String) -> Self {
        Self {
            code_hash,
            attempts: 0,
        }
    }

    pub fn parse(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Copy of this payload with one more failed attempt recorded
    pub fn with_failed_attempt(&self) -> Self {
        Self {
            code_hash: self.code_hash.clone(),
            attempts: self.attempts.saturating_add(1),
        }
    }
}

/// Row of the `verifications` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationRecord {
    pub id: String,
    pub identifier: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
