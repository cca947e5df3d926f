use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::{
    ERR_CODE_FORMAT, ERR_EMAIL_REQUIRED, ERR_INVALID_EMAIL, ERR_PASSWORD_TOO_SHORT,
    ERR_VERIFY_FIELDS_REQUIRED, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, Result};
use crate::security::{is_valid_email, is_well_formed_code, normalize_email};

/// Format a timestamp the way clients expect it: RFC 3339, millisecond
/// precision, `Z` suffix
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Require an email, normalize it, and check its shape
pub fn validated_email(email: Option<&str>) -> Result<String> {
    let email = email.map(normalize_email).unwrap_or_default();

    if email.is_empty() {
        return Err(AppError::InvalidInput(ERR_EMAIL_REQUIRED.to_string()));
    }

    if !is_valid_email(&email) {
        return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
    }

    Ok(email)
}

/// Inputs shared by the signup and password-reset completion endpoints
#[derive(Debug, Clone)]
pub struct VerifyFields {
    /// Normalized email
    pub email: String,
    pub password: String,
    /// Trimmed passcode, exactly six digits
    pub code: String,
}

impl VerifyFields {
    pub fn parse(
        email: Option<String>,
        password: Option<String>,
        code: Option<String>,
    ) -> Result<Self> {
        let email = email.as_deref().map(normalize_email).unwrap_or_default();
        let password = password.unwrap_or_default();
        let code = code.as_deref().map(str::trim).unwrap_or_default().to_string();

        if email.is_empty() || password.is_empty() || code.is_empty() {
            return Err(AppError::InvalidInput(
                ERR_VERIFY_FIELDS_REQUIRED.to_string(),
            ));
        }

        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput(ERR_INVALID_EMAIL.to_string()));
        }

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::InvalidInput(ERR_PASSWORD_TOO_SHORT.to_string()));
        }

        if !is_well_formed_code(&code) {
            return Err(AppError::InvalidInput(ERR_CODE_FORMAT.to_string()));
        }

        Ok(Self {
            email,
            password,
            code,
        })
    }
}
