use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::constants::{MSG_ACCOUNT_CREATED, MSG_SIGNUP_CODE_SENT};
use crate::db::{users, verifications};
use crate::error::{AppError, Result};
use crate::models::{Purpose, Role, User};
use crate::otp;
use crate::routes::validation::{format_timestamp, validated_email, VerifyFields};
use crate::security::hash_password;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestOtpResponse {
    pub message: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifySignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub message: String,
    pub email: String,
}

/// Start a signup by emailing a passcode
///
/// Returns 409 Conflict if the email is already registered.
pub async fn request_signup_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Result<Json<RequestOtpResponse>> {
    let Json(payload) = payload?;
    let email = validated_email(payload.email.as_deref())?;

    if users::find_by_email(&state.db, &email).await?.is_some() {
        tracing::info!("Signup passcode requested for registered email");
        return Err(AppError::AccountExists);
    }

    let expires_at = otp::issue(
        &state.db,
        state.mailer.as_ref(),
        &state.config.otp_secret,
        Purpose::Signup,
        &email,
        Utc::now(),
    )
    .await?;

    Ok(Json(RequestOtpResponse {
        message: MSG_SIGNUP_CODE_SENT.to_string(),
        expires_at: format_timestamp(expires_at),
    }))
}

/// Finish a signup: check the passcode, then create the user and its
/// password login
///
/// The email is checked again after the passcode matches, since another
/// signup may have claimed it since the code was issued. Either way the
/// verification is consumed.
pub async fn verify_signup_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifySignupRequest>, JsonRejection>,
) -> Result<Json<VerifiedResponse>> {
    let Json(payload) = payload?;
    let fields = VerifyFields::parse(payload.email, payload.password, payload.code)?;
    let now = Utc::now();

    let record = otp::check(
        &state.db,
        &state.config.otp_secret,
        Purpose::Signup,
        &fields.email,
        &fields.code,
        now,
    )
    .await?;

    if users::find_by_email(&state.db, &fields.email).await?.is_some() {
        verifications::delete(&state.db, &record.id).await?;
        tracing::info!("Signup completed for an email registered in the meantime");
        return Err(AppError::AccountExists);
    }

    let password_hash = hash_password(&fields.password, state.config.password_hashing).await?;

    let new_user = users::NewUser {
        name: User::display_name(payload.name.as_deref(), &fields.email),
        email: fields.email.clone(),
        email_verified: true,
        role: Role::default(),
    };

    match users::create_with_credential(&state.db, &new_user, &password_hash, &record.id, now).await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "New user registered");
        }
        Err(AppError::AccountExists) => {
            // Lost a race with a concurrent signup; the transaction rolled back.
            verifications::delete(&state.db, &record.id).await?;
            return Err(AppError::AccountExists);
        }
        Err(e) => return Err(e),
    }

    Ok(Json(VerifiedResponse {
        message: MSG_ACCOUNT_CREATED.to_string(),
        email: fields.email,
    }))
}
