//! One-time passcode issuance and verification.
//!
//! A pending verification lives in the `verifications` table under
//! `<purpose>:<email>`. Issuing replaces it; checking either consumes it
//! (expired, corrupted, exhausted), bumps its attempt counter (wrong code),
//! or hands it back to the caller, who must delete it in the same
//! transaction that completes the signup or reset.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::constants::{MAX_OTP_ATTEMPTS, OTP_EXPIRY_MINUTES};
use crate::db::verifications;
use crate::error::{OtpError, Result};
use crate::mail::{passcode_email, Mailer};
use crate::models::{Purpose, VerificationPayload, VerificationRecord};
use crate::security::{generate_otp, hash_otp, verify_otp};

/// Expiry reported for a code issued at `now`
pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_EXPIRY_MINUTES)
}

/// Issue a fresh passcode for `email` and mail it
///
/// Any pending verification for the same purpose and email is discarded.
/// If the email cannot be delivered the new record is deleted again, so a
/// code the user never received cannot be left pending.
///
/// `email` must already be normalized. Returns the expiry of the new code.
pub async fn issue(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    secret: &str,
    purpose: Purpose,
    email: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let code = generate_otp();
    let payload = VerificationPayload::new(hash_otp(&code, secret)?);
    let expires_at = expiry_from(now);

    let message = passcode_email(purpose, email, &code, OTP_EXPIRY_MINUTES);

    let id = verifications::replace(
        pool,
        &purpose.identifier(email),
        &payload.to_json()?,
        now,
        expires_at,
    )
    .await?;

    if let Err(e) = mailer.send(message).await {
        tracing::error!(purpose = %purpose, error = %e, "Passcode email failed, discarding code");
        if let Err(cleanup) = verifications::delete(pool, &id).await {
            tracing::error!("Failed to discard undelivered passcode: {}", cleanup);
        }
        return Err(e.into());
    }

    tracing::info!(purpose = %purpose, "Passcode issued");

    Ok(expires_at)
}

/// Check a submitted passcode against the pending verification
///
/// On success the record is returned still in place; the caller deletes it
/// as part of completing the flow. Every terminal failure deletes it here.
/// A wrong code only increments the attempt counter.
///
/// A comparison only counts once its outcome is written back over the exact
/// payload it was made against. If a concurrent check changed the record in
/// between, the submission is evaluated again against the fresh state, so
/// parallel guesses cannot share one attempt.
pub async fn check(
    pool: &SqlitePool,
    secret: &str,
    purpose: Purpose,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<VerificationRecord> {
    let identifier = purpose.identifier(email);

    loop {
        let record = verifications::find_by_identifier(pool, &identifier)
            .await?
            .ok_or(OtpError::NotFound(purpose))?;

        if record.is_expired(now) {
            verifications::delete(pool, &record.id).await?;
            tracing::info!(purpose = %purpose, "Expired passcode discarded");
            return Err(OtpError::Expired.into());
        }

        let payload = match VerificationPayload::parse(&record.value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to parse stored passcode payload: {}", e);
                verifications::delete(pool, &record.id).await?;
                return Err(OtpError::Corrupted.into());
            }
        };

        if payload.attempts >= MAX_OTP_ATTEMPTS {
            verifications::delete(pool, &record.id).await?;
            tracing::warn!(purpose = %purpose, "Passcode attempt limit reached");
            return Err(OtpError::TooManyAttempts.into());
        }

        let matched = verify_otp(code, &payload.code_hash, secret);
        let outcome = if matched {
            payload
        } else {
            payload.with_failed_attempt()
        };

        let claimed = verifications::compare_and_set_value(
            pool,
            &record.id,
            &record.value,
            &outcome.to_json()?,
            now,
        )
        .await?;
        if !claimed {
            tracing::debug!(purpose = %purpose, "Verification changed concurrently, re-checking");
            continue;
        }

        if !matched {
            tracing::info!(
                purpose = %purpose,
                attempts = outcome.attempts,
                "Incorrect passcode submitted"
            );
            return Err(OtpError::IncorrectCode.into());
        }

        return Ok(record);
    }
}
