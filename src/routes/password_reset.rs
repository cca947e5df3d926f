use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;

use crate::constants::{MSG_PASSWORD_RESET, MSG_RESET_CODE_SENT};
use crate::db::{users, verifications};
use crate::error::{AppError, Result};
use crate::models::Purpose;
use crate::otp;
use crate::routes::signup::{RequestOtpRequest, RequestOtpResponse, VerifiedResponse};
use crate::routes::validation::{format_timestamp, validated_email, VerifyFields};
use crate::security::hash_password;
use crate::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub code: Option<String>,
}

/// Email a password reset passcode
///
/// The response is identical whether or not the email belongs to an
/// account with a password login, so it cannot be used to discover
/// registered addresses. A code is only issued when it does.
pub async fn request_reset_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Result<Json<RequestOtpResponse>> {
    let Json(payload) = payload?;
    let email = validated_email(payload.email.as_deref())?;
    let now = Utc::now();

    let credential = match users::find_by_email(&state.db, &email).await? {
        Some(user) => users::find_credential_account(&state.db, &user.id).await?,
        None => None,
    };

    let expires_at = if credential.is_some() {
        otp::issue(
            &state.db,
            state.mailer.as_ref(),
            &state.config.otp_secret,
            Purpose::PasswordReset,
            &email,
            now,
        )
        .await?
    } else {
        tracing::info!("Password reset requested for email without a password login");
        otp::expiry_from(now)
    };

    Ok(Json(RequestOtpResponse {
        message: MSG_RESET_CODE_SENT.to_string(),
        expires_at: format_timestamp(expires_at),
    }))
}

/// Finish a password reset: check the passcode, then replace the password
pub async fn reset_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<VerifiedResponse>> {
    let Json(payload) = payload?;
    let fields = VerifyFields::parse(payload.email, payload.password, payload.code)?;
    let now = Utc::now();

    let record = otp::check(
        &state.db,
        &state.config.otp_secret,
        Purpose::PasswordReset,
        &fields.email,
        &fields.code,
        now,
    )
    .await?;

    let Some(user) = users::find_by_email(&state.db, &fields.email).await? else {
        verifications::delete(&state.db, &record.id).await?;
        return Err(AppError::UserNotFound);
    };

    let Some(account) = users::find_credential_account(&state.db, &user.id).await? else {
        verifications::delete(&state.db, &record.id).await?;
        return Err(AppError::NoPasswordLogin);
    };

    let password_hash = hash_password(&fields.password, state.config.password_hashing).await?;
    users::update_password(&state.db, &account.id, &password_hash, &record.id, now).await?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(Json(VerifiedResponse {
        message: MSG_PASSWORD_RESET.to_string(),
        email: fields.email,
    }))
}
