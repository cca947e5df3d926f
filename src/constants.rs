/// Number of digits in a one-time passcode
pub const OTP_LENGTH: usize = 6;

/// How long an issued passcode stays valid (10 minutes)
pub const OTP_EXPIRY_MINUTES: i64 = 10;

/// Failed comparisons allowed before a pending verification is discarded
pub const MAX_OTP_ATTEMPTS: u32 = 5;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Provider id of password-based login accounts
pub const CREDENTIAL_PROVIDER: &str = "credential";

/// Product name used in outgoing email
pub const BRAND_NAME: &str = "HomeConnect";

// =============================================================================
// Response Messages
// =============================================================================

pub const ERR_INVALID_BODY: &str = "Request body must be a valid JSON object";

pub const ERR_EMAIL_REQUIRED: &str = "Email is required";

pub const ERR_INVALID_EMAIL: &str = "Please provide a valid email";

pub const ERR_VERIFY_FIELDS_REQUIRED: &str =
    "Email, password, and verification code are required";

pub const ERR_SIGN_IN_FIELDS_REQUIRED: &str = "Email and password are required";

pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";

pub const ERR_CODE_FORMAT: &str = "Verification code must be 6 digits";

pub const ERR_ACCOUNT_EXISTS: &str = "An account already exists for this email";

/// Returned for every password-reset request so callers cannot probe which
/// emails are registered.
pub const MSG_RESET_CODE_SENT: &str =
    "If an account exists with this email, a password reset code has been sent";

pub const MSG_SIGNUP_CODE_SENT: &str = "Verification code sent";

pub const MSG_ACCOUNT_CREATED: &str = "Account created successfully";

pub const MSG_PASSWORD_RESET: &str = "Password reset successfully";

pub const MSG_SIGNED_IN: &str = "Signed in successfully";
