use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role case-insensitively; unknown values fall back to `User`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "agent" => Role::Agent,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::normalize(&self.role)
    }

    /// Name shown for a new signup: the trimmed name if given, otherwise the
    /// local part of the email
    pub fn display_name(name: Option<&str>, email: &str) -> String {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => email.split('@').next().unwrap_or(email).to_string(),
        }
    }
}

/// Row of the `accounts` table: one login method linked to a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub account_id: String,
    pub provider_id: String,
    pub user_id: String,
    /// Argon2 PHC string; absent for social logins
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalize() {
        assert_eq!(Role::normalize("admin"), Role::Admin);
        assert_eq!(Role::normalize("AGENT"), Role::Agent);
        assert_eq!(Role::normalize(" User "), Role::User);
        assert_eq!(Role::normalize("superuser"), Role::User);
        assert_eq!(Role::normalize(""), Role::User);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!(Role::default().to_string(), "user");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            User::display_name(Some("  Abebe Kebede "), "abebe@example.com"),
            "Abebe Kebede"
        );
        assert_eq!(User::display_name(Some("   "), "abebe@example.com"), "abebe");
        assert_eq!(User::display_name(None, "hana@example.com"), "hana");
    }
}
