use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_SIGN_IN_FIELDS_REQUIRED, MSG_SIGNED_IN};
use crate::db::users;
use crate::error::{AppError, Result};
use crate::models::Role;
use crate::security::{normalize_email, verify_password};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignedInUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub message: String,
    pub user: SignedInUser,
}

/// Sign in with email and password
///
/// Unknown emails, accounts without a password login, and wrong passwords
/// all answer 401 with the same message.
pub async fn sign_in_email(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>> {
    let Json(payload) = payload?;
    let email = payload.email.as_deref().map(normalize_email).unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            ERR_SIGN_IN_FIELDS_REQUIRED.to_string(),
        ));
    }

    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let stored_hash = users::find_credential_account(&state.db, &user.id)
        .await?
        .and_then(|account| account.password)
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&password, &stored_hash).await? {
        tracing::info!(user_id = %user.id, "Sign-in with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "User signed in");

    let role = user.role();
    Ok(Json(SignInResponse {
        message: MSG_SIGNED_IN.to_string(),
        user: SignedInUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role,
        },
    }))
}
