pub mod health;
pub mod password_reset;
pub mod sign_in;
pub mod signup;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use health::health_check;
pub use password_reset::{request_reset_otp, reset_password};
pub use sign_in::sign_in_email;
pub use signup::{request_signup_otp, verify_signup_otp};

/// All HTTP routes of the service, bound to `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup/request-otp", post(request_signup_otp))
        .route("/auth/signup/verify-otp", post(verify_signup_otp))
        .route("/auth/forgot-password/request-otp", post(request_reset_otp))
        .route("/auth/forgot-password/reset", post(reset_password))
        .route("/auth/sign-in/email", post(sign_in_email))
        .with_state(state)
}
